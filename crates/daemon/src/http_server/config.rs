use std::net::SocketAddr;

use url::Url;

/// Headroom on top of the largest blob for base64 inflation and JSON framing
const BODY_OVERHEAD_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // Base URL share links are built against
    pub public_url: Url,
    // log level for http tracing
    pub log_level: tracing::Level,
    // Largest request body accepted, derived from the blob limit
    pub max_body_bytes: usize,
}

impl Config {
    pub fn new(listen_addr: SocketAddr, public_url: Option<Url>, max_blob_bytes: usize) -> Result<Self, ConfigError> {
        let public_url = match public_url {
            Some(url) => url,
            None => Url::parse(&format!("http://localhost:{}", listen_addr.port()))?,
        };
        tracing::info!(
            listen_addr = %listen_addr,
            public_url = %public_url,
            max_blob_bytes,
            "creating HTTP server config"
        );
        Ok(Self {
            listen_addr,
            public_url,
            log_level: tracing::Level::INFO,
            max_body_bytes: max_blob_bytes.saturating_mul(4) / 3 + BODY_OVERHEAD_BYTES,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
