//! The relational template catalog (spec.md §4.B).

use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::instrument;

use crate::client::RetryPolicy;
use crate::conf::Catalog as CatalogConf;
use crate::models::{Template, TemplateEdit, TemplateInsert};

use super::error::CatalogError;
use super::retry::is_transient;

/// Retries `op` up to `policy.max_retries` times on a classified connection
/// error, pausing `policy.base_delay` between attempts (spec.md §4.B: "100ms
/// pause and rebuild of the underlying connection" — `sqlx`'s pool already
/// owns reconnection, so "rebuild" here means letting the pool hand out a
/// fresh connection on the next attempt).
async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(val) => return Ok(val),
            Err(err) if attempt < policy.max_retries && is_transient(&err) => {
                attempt += 1;
                tokio::time::sleep(policy.base_delay).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// The Template Catalog (spec.md §4.B): name, description, image reference,
/// authors, visibility, VM count, deployment counter, creation timestamp.
#[derive(Clone)]
pub struct Catalog {
    pool: PgPool,
    policy: RetryPolicy,
}

impl Catalog {
    /// Connects with the bounded pool spec.md §4.B requires (25 max open /
    /// 25 idle / unlimited lifetime) and runs the idempotent table migration.
    pub async fn connect(conf: &CatalogConf) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(conf.max_connections)
            .min_connections(conf.max_connections)
            .max_lifetime(None)
            .connect(&conf.database_url)
            .await?;
        let catalog = Catalog {
            pool,
            policy: RetryPolicy::catalog(),
        };
        catalog.migrate().await?;
        Ok(catalog)
    }

    #[cfg(test)]
    pub fn from_pool(pool: PgPool) -> Self {
        Catalog {
            pool,
            policy: RetryPolicy::catalog(),
        }
    }

    async fn migrate(&self) -> Result<(), CatalogError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS templates (
                name TEXT PRIMARY KEY,
                description TEXT NOT NULL DEFAULT '',
                image_path TEXT,
                authors TEXT[] NOT NULL DEFAULT '{}',
                template_visible BOOLEAN NOT NULL DEFAULT TRUE,
                pod_visible BOOLEAN NOT NULL DEFAULT TRUE,
                vms_visible BOOLEAN NOT NULL DEFAULT TRUE,
                vm_count INTEGER NOT NULL DEFAULT 0,
                deployments INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(name = "catalog::list", skip(self), err(Debug))]
    pub async fn list(&self, visible_only: bool) -> Result<Vec<Template>, CatalogError> {
        with_retry(self.policy, || async {
            if visible_only {
                sqlx::query_as::<_, Template>(
                    "SELECT * FROM templates WHERE template_visible = TRUE ORDER BY name",
                )
                .fetch_all(&self.pool)
                .await
            } else {
                sqlx::query_as::<_, Template>("SELECT * FROM templates ORDER BY name")
                    .fetch_all(&self.pool)
                    .await
            }
        })
        .await
    }

    /// Returns the zero-value [`Template`] when absent — not an error,
    /// per spec.md §4.B.
    #[instrument(name = "catalog::get", skip(self), err(Debug))]
    pub async fn get(&self, name: &str) -> Result<Template, CatalogError> {
        with_retry(self.policy, || async {
            sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
        })
        .await
        .map(|opt| opt.unwrap_or_else(|| Template::absent(name)))
    }

    #[instrument(name = "catalog::insert", skip(self, insert), err(Debug))]
    pub async fn insert(&self, insert: &TemplateInsert) -> Result<(), CatalogError> {
        let now = Utc::now();
        with_retry(self.policy, || async {
            sqlx::query(
                r#"
                INSERT INTO templates
                    (name, description, authors, vm_count, template_visible,
                     pod_visible, vms_visible, deployments, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8)
                "#,
            )
            .bind(&insert.name)
            .bind(&insert.description)
            .bind(&insert.authors)
            .bind(insert.vm_count)
            .bind(insert.template_visible)
            .bind(insert.pod_visible)
            .bind(insert.vms_visible)
            .bind(now)
            .execute(&self.pool)
            .await
        })
        .await
        .map(|_| ())
    }

    /// Updates description/authors/vm_count/visibility; `image_path` only
    /// overwrites the stored value when `edit.image_path` is `Some`, so an
    /// edit omitting the image leaves the existing one intact (spec.md §4.B).
    #[instrument(name = "catalog::edit", skip(self, edit), err(Debug))]
    pub async fn edit(&self, name: &str, edit: &TemplateEdit) -> Result<(), CatalogError> {
        let current = self.get(name).await?;
        let description = edit.description.clone().unwrap_or(current.description);
        let authors = edit.authors.clone().unwrap_or(current.authors);
        let vm_count = edit.vm_count.unwrap_or(current.vm_count);
        let template_visible = edit.template_visible.unwrap_or(current.template_visible);
        let pod_visible = edit.pod_visible.unwrap_or(current.pod_visible);
        let vms_visible = edit.vms_visible.unwrap_or(current.vms_visible);
        let image_path = match &edit.image_path {
            Some(path) if !path.is_empty() => Some(path.clone()),
            _ => current.image_path,
        };
        with_retry(self.policy, || async {
            sqlx::query(
                r#"
                UPDATE templates
                SET description = $2, authors = $3, vm_count = $4,
                    template_visible = $5, pod_visible = $6, vms_visible = $7,
                    image_path = $8
                WHERE name = $1
                "#,
            )
            .bind(name)
            .bind(&description)
            .bind(&authors)
            .bind(vm_count)
            .bind(template_visible)
            .bind(pod_visible)
            .bind(vms_visible)
            .bind(&image_path)
            .execute(&self.pool)
            .await
        })
        .await
        .map(|_| ())
    }

    /// Deletes the row and, if set, the image blob it referenced.
    #[instrument(name = "catalog::delete", skip(self), err(Debug))]
    pub async fn delete(&self, name: &str) -> Result<(), CatalogError> {
        let existing = self.get(name).await?;
        with_retry(self.policy, || async {
            sqlx::query("DELETE FROM templates WHERE name = $1")
                .bind(name)
                .execute(&self.pool)
                .await
        })
        .await?;
        if let Some(path) = existing.image_path {
            if let Err(err) = tokio::fs::remove_file(&path).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    return Err(CatalogError::from(err));
                }
            }
        }
        Ok(())
    }

    #[instrument(name = "catalog::toggle_visibility", skip(self), err(Debug))]
    pub async fn toggle_visibility(&self, name: &str) -> Result<(), CatalogError> {
        with_retry(self.policy, || async {
            sqlx::query(
                "UPDATE templates SET template_visible = NOT template_visible WHERE name = $1",
            )
            .bind(name)
            .execute(&self.pool)
            .await
        })
        .await
        .map(|_| ())
    }

    /// Adjusts the deployment counter by `delta`; only ever called with `+1`
    /// on success (spec.md I4: never decreases, never incremented on abort).
    #[instrument(name = "catalog::add_deployment", skip(self), err(Debug))]
    pub async fn add_deployment(&self, name: &str, delta: i32) -> Result<(), CatalogError> {
        with_retry(self.policy, || async {
            sqlx::query("UPDATE templates SET deployments = deployments + $2 WHERE name = $1")
                .bind(name)
                .bind(delta)
                .execute(&self.pool)
                .await
        })
        .await
        .map(|_| ())
    }

    #[cfg(test)]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
