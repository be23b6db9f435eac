use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use log::{error, info, warn};
use tokio::net::TcpListener;

use crate::{Error, Result};
use crate::server::config::ServerConfig;
use crate::session::Session;

/// TCP accept loop producing one independent session per connection.
pub struct RtmpServer {
    /// Server configuration
    config: Arc<ServerConfig>,

    /// Connection ID counter
    connection_counter: AtomicU64,

    /// Currently active sessions
    active: Arc<AtomicUsize>,

    /// Shutdown flag
    shutdown: Arc<AtomicBool>,
}

impl RtmpServer {
    /// Create new server
    pub fn new(config: ServerConfig) -> Self {
        RtmpServer {
            config: Arc::new(config),
            connection_counter: AtomicU64::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get active session count
    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Listen and accept connections until shutdown
    pub async fn listen(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::connection(format!("Failed to bind {}: {}", addr, e)))?;

        info!("RTMP server listening on {}", addr);

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let (stream, peer_addr) = match listener.accept().await {
                Ok((s, a)) => (s, a),
                Err(e) => {
                    error!("Accept error: {}", e);
                    continue;
                }
            };

            if self.connection_count() >= self.config.max_connections {
                warn!("Connection limit reached, rejecting {}", peer_addr);
                drop(stream);
                continue;
            }

            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
            }

            let conn_id = self.connection_counter.fetch_add(1, Ordering::SeqCst);
            let session_id = format!("conn-{}", conn_id);
            info!("Session {}: accepted {}", session_id, peer_addr);

            let session = Session::with_settings(
                session_id.clone(),
                stream,
                self.config.session_settings(),
            );

            let active = self.active.clone();
            active.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                if let Err(e) = session.run().await {
                    error!("Session {}: terminated: {}", session_id, e);
                } else {
                    info!("Session {}: closed", session_id);
                }
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }

        info!("Server stopped");
        Ok(())
    }

    /// Request shutdown; the accept loop exits before the next accept
    pub fn shutdown(&self) {
        info!("Shutting down server");
        self.shutdown.store(true, Ordering::SeqCst);
    }
}
