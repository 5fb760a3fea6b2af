use tokio::net::TcpStream;

use super::Session;
use crate::config::ConnectOpts;
use crate::error::Result;

/// Builder for creating a [`Session`] with additional options
pub struct SessionBuilder {
    opts: ConnectOpts,
}

impl SessionBuilder {
    pub fn new(addr: &str) -> Self {
        Self {
            opts: ConnectOpts::new(addr),
        }
    }

    pub fn from_opts(opts: ConnectOpts) -> Self {
        Self { opts }
    }

    /// Default database for every query of the session
    pub fn database(mut self, name: &str) -> Self {
        self.opts.database = Some(name.to_string());
        self
    }

    /// Set connect and round-trip timeout in milliseconds
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.opts.timeout_ms = Some(ms);
        self
    }

    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.opts.max_message_size = bytes;
        self
    }

    pub fn opts(&self) -> &ConnectOpts {
        &self.opts
    }

    pub async fn build(self) -> Result<Session<TcpStream>> {
        self.opts.validate()?;
        Session::connect(self.opts).await
    }
}
