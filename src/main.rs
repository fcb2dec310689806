//! The Kamino HTTP edge binary (spec.md §1, SPEC_FULL.md §10).

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;

use kamino::args::Args;
use kamino::catalog::Catalog;
use kamino::client::PveClient;
use kamino::conf::Conf;
use kamino::directory::Directory;
use kamino::routes::build_app;
use kamino::utils::{trace, AppState, Shared};

const MAX_BIND_ATTEMPTS: u32 = 10;
const BIND_RETRY_PAUSE: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() {
    let args = Args::parse();
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

    let shared = Shared::new(conf.clone(), hypervisor, catalog, directory);
    let state = AppState::new(shared);
    let app = build_app(state);

    let bind_addr: IpAddr = conf
        .server
        .interface
        .parse()
        .unwrap_or_else(|_| panic!("failed to parse interface addr {}", conf.server.interface));
    let addr = SocketAddr::new(bind_addr, conf.server.port);

    tracing::event!(tracing::Level::INFO, %addr, "binding kamino edge");

    let mut attempts = 0;
    loop {
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(err) => {
                tracing::event!(tracing::Level::ERROR, error = %err, "failed to bind listener");
                attempts += 1;
                assert!(attempts <= MAX_BIND_ATTEMPTS, "failed to bind to {addr} in {MAX_BIND_ATTEMPTS} attempts");
                tokio::time::sleep(BIND_RETRY_PAUSE).await;
                continue;
            }
        };
        match axum::serve(listener, app.clone()).await {
            Ok(()) => break,
            Err(err) => {
                tracing::event!(tracing::Level::ERROR, error = %err, "server loop exited with error");
            }
        }
        attempts += 1;
        assert!(attempts <= MAX_BIND_ATTEMPTS, "failed to bind to {addr} in {MAX_BIND_ATTEMPTS} attempts");
        tokio::time::sleep(BIND_RETRY_PAUSE).await;
    }
}
