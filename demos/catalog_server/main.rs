//! Catalog server backed by in-memory storage
//!
//! ```text
//! BOOKREVIEW_TOKEN_SECRET=$(openssl rand -hex 32) \
//!     cargo run --example catalog_server -- demos/catalog_server/bookreview.yaml
//! ```
//!
//! Then:
//!
//! ```text
//! curl -X POST localhost:3000/auth/login \
//!     -H 'content-type: application/json' \
//!     -d '{"username":"admin","password":"change-me"}'
//! ```

use bookreview::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bookreview=debug,tower_http=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => CatalogConfig::from_yaml_file(&path)?,
        None => CatalogConfig::from_env(),
    };
    let addr = config.server.bind_addr.clone();

    ServerBuilder::new()
        .with_config(config)
        .with_storage(InMemoryStorage::new())
        .serve(&addr)
        .await
}
