//! Read-only view of users and groups (spec.md §4.C).
//!
//! The engine uses this solely to widen a pod-ownership filter to include
//! groups the principal belongs to; the hypervisor's own user/group records
//! are a mirror maintained via `SyncRealm` (spec.md §4.A, §4.C).

use ldap3::{LdapConnAsync, Scope, SearchEntry};
use tokio::sync::RwLock;
use tracing::instrument;

use crate::client::RetryPolicy;
use crate::conf::Directory as DirectoryConf;

use super::error::{is_transient, DirectoryError};

struct Connection {
    ldap: ldap3::Ldap,
}

/// A directory client guarded by a read-write lock, reconnecting on a
/// classified connection error with a 2-retry budget (spec.md §5).
pub struct Directory {
    conf: DirectoryConf,
    conn: RwLock<Connection>,
    policy: RetryPolicy,
}

impl Directory {
    pub async fn connect(conf: DirectoryConf) -> Result<Self, DirectoryError> {
        let conn = Self::dial(&conf).await?;
        Ok(Directory {
            conf,
            conn: RwLock::new(conn),
            policy: RetryPolicy::directory(),
        })
    }

    async fn dial(conf: &DirectoryConf) -> Result<Connection, DirectoryError> {
        let (driver, mut ldap) = LdapConnAsync::new(&conf.url).await?;
        ldap3::drive!(driver);
        ldap.simple_bind(&conf.bind_dn, &conf.bind_password)
            .await?
            .success()?;
        Ok(Connection { ldap })
    }

    /// Replaces the held connection; used after a classified transient error.
    async fn reconnect(&self) -> Result<(), DirectoryError> {
        let fresh = Self::dial(&self.conf).await?;
        *self.conn.write().await = fresh;
        Ok(())
    }

    /// Resolves `username`'s group memberships.
    #[instrument(name = "directory::get_user_groups", skip(self), err(Debug))]
    pub async fn get_user_groups(&self, username: &str) -> Result<Vec<String>, DirectoryError> {
        let mut attempt = 0;
        loop {
            match self.search_groups(username).await {
                Ok(groups) => return Ok(groups),
                Err(DirectoryError::Ldap(msg))
                    if attempt < self.policy.max_retries && is_transient(&msg) =>
                {
                    attempt += 1;
                    self.reconnect().await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn search_groups(&self, username: &str) -> Result<Vec<String>, DirectoryError> {
        let mut conn = self.conn.write().await;
        let filter = format!("(&(objectClass=posixGroup)(memberUid={username}))");
        let (entries, _res) = conn
            .ldap
            .search(&self.conf.search_base, Scope::Subtree, &filter, vec!["cn"])
            .await?
            .success()?;
        let groups = entries
            .into_iter()
            .filter_map(|entry| {
                let entry = SearchEntry::construct(entry);
                entry.attrs.get("cn").and_then(|vals| vals.first().cloned())
            })
            .collect();
        Ok(groups)
    }

    /// A no-op bind probe used as a health check.
    pub async fn healthy(&self) -> bool {
        self.search_groups("__health__").await.is_ok()
    }
}
