//! Listener / acceptor
//!
//! Starts the state actor and spawns one session task per accepted
//! connection. A failing session never stops the accept loop.

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::server::{ChatServer, ServerHandle};
use crate::state::Store;

/// Bind `config.addr` and serve forever
pub async fn bind_and_serve(config: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(&config.addr).await?;
    info!(
        "Bulletin server listening on {} ({:?} framing)",
        listener.local_addr()?,
        config.framing
    );
    serve(listener, config).await;
    Ok(())
}

/// Accept connections on an already bound listener
pub async fn serve(listener: TcpListener, config: ServerConfig) {
    let server = start_state(&config);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let server = server.clone();
                let config = config.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, server, config).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Provision the store from `config` and start its actor
pub fn start_state(config: &ServerConfig) -> ServerHandle {
    let store = Store::new(config.board_capacity, &config.rooms);
    ChatServer::start(store, config.command_buffer)
}
