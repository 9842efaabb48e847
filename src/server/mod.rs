//! Foreground webhook server
//!
//! Serves the gateway router until SIGTERM, SIGINT or SIGHUP. SIGUSR1
//! reloads the corpus without dropping connections.

mod signals;

pub use signals::{ServerSignal, SignalHandler};

use crate::app::App;
use crate::config::{duration_field, read_secret, Config};
use crate::error::{ReplybotError, Result};
use crate::gateway::{router, LineReplyClient, SignatureVerifier, WebhookGateway};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct Server {
    config: Config,
    app: App,
}

impl Server {
    pub fn new(config: Config, app: App) -> Self {
        Self { config, app }
    }

    /// Build the gateway from the LINE credentials in the environment
    pub fn gateway(&self) -> Result<WebhookGateway> {
        let line = &self.config.line;

        let secret = read_secret(&line.channel_secret_env)?;
        let verifier = SignatureVerifier::new(secret.as_bytes()).map_err(|e| {
            ReplybotError::InvalidConfigValue {
                path: "line.channel_secret_env".to_string(),
                message: format!("Unusable channel secret: {}", e),
            }
        })?;

        let token = read_secret(&line.access_token_env)?;
        let sender = LineReplyClient::new(
            &line.api_base,
            token,
            duration_field("line.timeout", &line.timeout)?,
        )?;

        Ok(WebhookGateway::new(
            verifier,
            self.app.responder().clone(),
            Arc::new(sender),
        ))
    }

    /// Serve until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let gateway = Arc::new(self.gateway()?);
        let routes = router(gateway, &self.config.server.webhook_path);
        let mut signal_handler = SignalHandler::new()?;

        let listener = TcpListener::bind(&self.config.server.bind_addr)
            .await
            .map_err(|e| ReplybotError::Io {
                source: e,
                context: format!("Failed to bind {}", self.config.server.bind_addr),
            })?;

        tracing::info!(
            addr = %self.config.server.bind_addr,
            path = %self.config.server.webhook_path,
            entries = self.app.resolver().corpus().len(),
            "Webhook server listening"
        );

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut serving = tokio::spawn(async move {
            axum::serve(listener, routes)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        loop {
            tokio::select! {
                sig = signal_handler.wait() => match sig {
                    ServerSignal::Shutdown(name) => {
                        tracing::info!("Received {}, shutting down", name);
                        break;
                    }
                    ServerSignal::Reload => {
                        tracing::info!("Received SIGUSR1, reloading corpus");
                        if let Err(e) = self.app.refresh_corpus().await {
                            tracing::error!("Corpus reload failed, keeping previous snapshot: {}", e);
                        }
                    }
                },
                finished = &mut serving => {
                    return match finished {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(ReplybotError::Server(e.to_string())),
                        Err(e) => Err(ReplybotError::Server(e.to_string())),
                    };
                }
            }
        }

        let _ = stop_tx.send(());
        match serving.await {
            Ok(Ok(())) => {
                tracing::info!("Server stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(ReplybotError::Server(e.to_string())),
            Err(e) => Err(ReplybotError::Server(e.to_string())),
        }
    }
}
