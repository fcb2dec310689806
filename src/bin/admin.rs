//! `kamino-admin`: one binary, a handful of maintenance subcommands
//! (SPEC_FULL.md §10), mirroring the teacher's single-binary CLI shape.

use clap::{Parser, Subcommand};

use kamino::catalog::Catalog;
use kamino::client::{PveClient, RealmScope};
use kamino::conf::Conf;
use kamino::directory::Directory;
use kamino::engine::Engine;
use kamino::utils::trace;

#[derive(Parser, Debug)]
#[clap(version, author)]
struct AdminArgs {
    /// The path to load the config file from
    #[clap(short, long, default_value = "kamino.yml")]
    config: String,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconciles users or groups from the configured auth realm.
    SyncRealm {
        #[clap(value_enum)]
        scope: SyncScopeArg,
    },
    /// Lists template pools on the hypervisor with no catalog row.
    ListUnpublishedTemplates,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum SyncScopeArg {
    Users,
    Groups,
}

impl From<SyncScopeArg> for RealmScope {
    fn from(scope: SyncScopeArg) -> Self {
        match scope {
            SyncScopeArg::Users => RealmScope::Users,
            SyncScopeArg::Groups => RealmScope::Groups,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = AdminArgs::parse();
    let conf = Conf::new(&args.config).unwrap_or_else(|err| {
        panic!("failed to load config from {}: {err}", args.config);
    });
    conf.validate()
        .unwrap_or_else(|err| panic!("invalid configuration: {err}"));
    trace::init(conf.server.log_level);

    let hypervisor = PveClient::new(&conf.hypervisor)
        .unwrap_or_else(|err| panic!("failed to build hypervisor client: {err}"));
    let catalog = Catalog::connect(&conf.catalog)
        .await
        .unwrap_or_else(|err| panic!("failed to connect to catalog database: {err}"));
    let directory = Directory::connect(conf.directory.clone())
        .await
        .unwrap_or_else(|err| panic!("failed to connect to directory service: {err}"));
    let engine = Engine::new(
        hypervisor,
        catalog,
        directory,
        conf.engine.clone(),
        conf.hypervisor.clone(),
    );

    match args.command {
        Command::SyncRealm { scope } => {
            engine
                .sync_realm(scope.into())
                .await
                .unwrap_or_else(|err| panic!("realm sync failed: {err}"));
            println!("realm sync complete");
        }
        Command::ListUnpublishedTemplates => {
            let names = engine
                .list_unpublished_templates()
                .await
                .unwrap_or_else(|err| panic!("failed to list unpublished templates: {err}"));
            if names.is_empty() {
                println!("no unpublished template pools");
            } else {
                for name in names {
                    println!("{name}");
                }
            }
        }
    }
}
