use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::uri::Registry;

/// Accepts connections forever, one task per connection.
pub async fn run(cfg: &Config, registry: Arc<Registry>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.listen_addr))?;
    info!("Listening on {}", listener.local_addr()?);

    loop {
        let (socket, peer) = listener.accept().await?;
        debug!("Accepted connection from {}", peer);

        let registry = Arc::clone(&registry);
        let server_config = cfg.server.clone();
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, registry, &server_config);
            if let Err(e) = conn.run().await {
                error!("Connection error from {}: {}", peer, e);
            }
            debug!("Closed connection from {}", peer);
        });
    }
}
