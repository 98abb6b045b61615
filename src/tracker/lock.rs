use std::{
    io,
    net::{Ipv4Addr, SocketAddr, TcpListener},
};

use thiserror::Error;
use tracing::{debug, info};

/// Port bound for the lifetime of a tracker to keep other trackers out.
pub const DEFAULT_LOCK_PORT: u16 = 65432;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Another instance is already running (port {port} is taken)")]
    AlreadyRunning { port: u16 },

    #[error("Failed to acquire the instance lock on port {port}: {source}")]
    Io { port: u16, source: io::Error },
}

/// Process-wide exclusivity token. Holding the value keeps a loopback port bound; dropping it
/// releases the port. Nothing is ever accepted on the socket.
#[derive(Debug)]
pub struct InstanceLock {
    listener: TcpListener,
}

impl InstanceLock {
    pub fn acquire(port: u16) -> Result<Self, LockError> {
        let address = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        match TcpListener::bind(address) {
            Ok(listener) => {
                info!("Acquired instance lock on {address}");
                Ok(Self { listener })
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(LockError::AlreadyRunning { port })
            }
            Err(source) => Err(LockError::Io { port, source }),
        }
    }

    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|address| address.port())
            .unwrap_or_default()
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        debug!("Released instance lock on port {}", self.port());
    }
}
