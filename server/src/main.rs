use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tokio::net::TcpListener;

use server::config::Config;
use server::handlers;
use server::registry::Registry;
use server::server::serve;
use server::storage::DirectoryStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::from_env()?;
    log::info!("Starting whiteboard relay with {:?}", config);

    let store = Arc::new(DirectoryStore::new(config.save_dir.clone()));
    let registry = Arc::new(Registry::new(
        store,
        config.max_snapshot_bytes,
        config.write_timeout,
    ));

    let listener = TcpListener::bind(config.relay_addr)
        .await
        .with_context(|| format!("could not bind relay to {}", config.relay_addr))?;
    let relay = tokio::spawn(serve(listener, registry.clone()));

    let admin_registry = registry.clone();
    let admin = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(admin_registry.clone()))
            .configure(handlers::root)
    })
    .bind(config.admin_addr)
    .with_context(|| format!("could not bind admin interface to {}", config.admin_addr))?
    .run();

    tokio::select! {
        result = admin => result.context("admin interface failed")?,
        result = relay => result.context("relay task panicked")?.context("relay stopped")?,
    }

    registry.close_all().await;
    log::info!("Whiteboard relay stopped");
    Ok(())
}
