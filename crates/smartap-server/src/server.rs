//! TLS listener and connection supervision

use crate::capture::CaptureSink;
use crate::config::ServerConfig;
use crate::connection::serve_connection;
use crate::dispatch::{Dispatcher, MessageHandler};
use crate::error::Result;
use crate::tls;
use parking_lot::Mutex;
use smartap_core::MessageIdGenerator;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// The listening server: one task per device connection.
pub struct Server<H: MessageHandler> {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher<H>>,
    capture: Option<Arc<CaptureSink>>,
    ids: Arc<MessageIdGenerator>,
    active: Arc<Mutex<HashSet<String>>>,
}

impl<H: MessageHandler + 'static> Server<H> {
    pub fn new(config: ServerConfig, handler: H) -> Result<Self> {
        let capture = match &config.analysis_dir {
            Some(dir) => Some(Arc::new(CaptureSink::open(dir)?)),
            None => None,
        };

        Ok(Self {
            config,
            dispatcher: Arc::new(Dispatcher::new(handler)),
            capture,
            ids: Arc::new(MessageIdGenerator::new()),
            active: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Outbound message-ID generator, shared across all connections.
    pub fn message_ids(&self) -> Arc<MessageIdGenerator> {
        Arc::clone(&self.ids)
    }

    /// Addresses of currently connected devices.
    pub fn active_peers(&self) -> Vec<String> {
        self.active.lock().iter().cloned().collect()
    }

    /// Accept loop. Runs until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let acceptor = tls::load_acceptor(&self.config.cert_path, &self.config.key_path)?;
        let listener = TcpListener::bind(self.config.addr()).await?;
        info!(addr = %self.config.addr(), "listening for device connections");

        loop {
            let (tcp, peer_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    return Ok(());
                }
            };

            let peer = peer_addr.to_string();
            let acceptor = acceptor.clone();
            let dispatcher = Arc::clone(&self.dispatcher);
            let capture = self.capture.clone();
            let active = Arc::clone(&self.active);

            tokio::spawn(async move {
                info!(%peer, "device connected");
                active.lock().insert(peer.clone());

                match acceptor.accept(tcp).await {
                    Ok(stream) => {
                        let result =
                            serve_connection(stream, &peer, &dispatcher, capture.as_deref()).await;
                        match result {
                            Ok(()) => info!(%peer, "session ended"),
                            Err(e) => warn!(%peer, error = %e, "session failed"),
                        }
                    }
                    Err(e) => error!(%peer, error = %e, "TLS handshake failed"),
                }

                active.lock().remove(&peer);
            });
        }
    }
}
