// ABOUTME: A Dialer that records the addresses it is asked to reach.
// ABOUTME: Fails every dial, or never completes, so no network is touched.

use async_trait::async_trait;
use panda::ssh::Dialer;
use parking_lot::Mutex;
use std::io;
use tokio::io::DuplexStream;

#[derive(Default)]
pub struct RecordingDialer {
    pub addresses: Mutex<Vec<String>>,
    hang: bool,
}

impl RecordingDialer {
    /// Refuses every connection.
    pub fn refusing() -> Self {
        Self::default()
    }

    /// Never finishes connecting.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn dialed(&self) -> Vec<String> {
        self.addresses.lock().clone()
    }
}

#[async_trait]
impl Dialer for RecordingDialer {
    type Stream = DuplexStream;

    async fn dial(&self, addr: &str) -> io::Result<DuplexStream> {
        self.addresses.lock().push(addr.to_string());
        if self.hang {
            std::future::pending::<()>().await;
        }
        Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"))
    }
}
