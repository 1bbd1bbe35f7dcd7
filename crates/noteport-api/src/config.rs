//! Server configuration loaded from the environment.

use std::net::SocketAddr;

use noteport_core::defaults;
use tracing::warn;

/// HTTP server settings.
///
/// | Variable | Default |
/// |----------|---------|
/// | `HOST` | `0.0.0.0` |
/// | `PORT` | `3000` |
/// | `MAX_BATCH_FILES` | `50` |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum number of files in one batch request.
    pub max_batch_files: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            max_batch_files: defaults::MAX_BATCH_FILES,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let base = Self::default();
        let host = std::env::var("HOST").unwrap_or(base.host);
        let port = env_parse("PORT", base.port);
        let max_batch_files = env_parse("MAX_BATCH_FILES", base.max_batch_files).max(1);
        Self {
            host,
            port,
            max_batch_files,
        }
    }

    pub fn with_max_batch_files(mut self, max: usize) -> Self {
        self.max_batch_files = max.max(1);
        self
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Upper bound on a whole request body: a full batch of maximum-size
    /// files plus multipart framing.
    pub fn max_request_bytes(&self) -> usize {
        self.max_batch_files
            .saturating_mul(defaults::MAX_BATCH_FILE_BYTES)
            .saturating_add(1024 * 1024)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            warn!(key, value = %v, "Ignoring unparseable environment value");
            default
        }),
        Err(_) => default,
    }
}
