//! Shared HTTP request settings applied to every curl handle of a job.

use std::collections::BTreeMap;
use std::time::Duration;

use curl::easy::{Easy, List};

use crate::config::FetchConfig;

const MIN_CHUNK_SIZE: usize = 1024;
const MAX_CHUNK_SIZE: usize = 512 * 1024;
const MAX_REDIRECTS: u32 = 10;
/// Abort a transfer that stays below this many bytes/s for [`LOW_SPEED_TIME`].
const LOW_SPEED_LIMIT: u32 = 1024;
const LOW_SPEED_TIME: Duration = Duration::from_secs(60);

/// Read-only request configuration, shared by the resolver and all fetchers
/// through an `Arc`. Each thread builds its own curl handle from it.
#[derive(Debug, Clone)]
pub struct HttpSession {
    pub user_agent: String,
    pub headers: BTreeMap<String, String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Receive buffer size, already clamped to what libcurl accepts.
    pub chunk_size: usize,
}

impl HttpSession {
    pub fn from_config(cfg: &FetchConfig) -> Self {
        Self {
            user_agent: cfg.user_agent.clone(),
            headers: cfg.headers.clone(),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
            chunk_size: clamp_chunk_size(cfg.chunk_size),
        }
    }

    /// Apply the session settings and `url` to a fresh or reused handle.
    ///
    /// Follows redirects, sends the User-Agent and caller headers, and arms the
    /// connect, low-speed and hard timeouts.
    pub(crate) fn configure(&self, easy: &mut Easy, url: &str) -> Result<(), curl::Error> {
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(MAX_REDIRECTS)?;
        easy.useragent(&self.user_agent)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(LOW_SPEED_LIMIT)?;
        easy.low_speed_time(LOW_SPEED_TIME)?;
        easy.timeout(self.request_timeout)?;
        easy.buffer_size(self.chunk_size)?;

        let mut list = List::new();
        for (k, v) in &self.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;
        Ok(())
    }
}

impl Default for HttpSession {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

fn clamp_chunk_size(n: usize) -> usize {
    n.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}
