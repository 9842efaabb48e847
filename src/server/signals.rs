// Unix signals controlling a running server

use crate::error::{ReplybotError, Result};
use tokio::signal::unix::{signal, Signal, SignalKind};

/// What the server should do after a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSignal {
    /// SIGTERM, SIGINT or SIGHUP
    Shutdown(&'static str),
    /// SIGUSR1: reload the corpus
    Reload,
}

pub struct SignalHandler {
    sigterm: Signal,
    sigint: Signal,
    sighup: Signal,
    sigusr1: Signal,
}

fn install(kind: SignalKind, name: &str) -> Result<Signal> {
    signal(kind).map_err(|e| ReplybotError::Io {
        source: e,
        context: format!("Failed to setup {} handler", name),
    })
}

impl SignalHandler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            sigterm: install(SignalKind::terminate(), "SIGTERM")?,
            sigint: install(SignalKind::interrupt(), "SIGINT")?,
            sighup: install(SignalKind::hangup(), "SIGHUP")?,
            sigusr1: install(SignalKind::user_defined1(), "SIGUSR1")?,
        })
    }

    /// Wait for the next signal we care about
    pub async fn wait(&mut self) -> ServerSignal {
        tokio::select! {
            _ = self.sigterm.recv() => ServerSignal::Shutdown("SIGTERM"),
            _ = self.sigint.recv() => ServerSignal::Shutdown("SIGINT"),
            _ = self.sighup.recv() => ServerSignal::Shutdown("SIGHUP"),
            _ = self.sigusr1.recv() => ServerSignal::Reload,
        }
    }
}
