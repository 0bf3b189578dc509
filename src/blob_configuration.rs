use std::time::Duration;
use crate::error::BlobError;

pub const MIN_BUFFER_SIZE: usize = 4096;
pub const MAX_BUFFER_SIZE: usize = 4 * 1024 * 1024;
/// Hard ceiling for `max_buffer_size`, the largest bound any platform accepts.
pub const BUFFER_SIZE_CEILING: usize = 64 * 1024 * 1024;
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
pub const HASH_CHUNK_SIZE: usize = 8192;

#[derive(Debug, Clone)]
pub struct BlobConfiguration {
    pub min_buffer_size: usize,
    pub max_buffer_size: usize,
    pub default_buffer_size: usize,
    pub hash_chunk_size: usize,
    pub connect_timeout: Duration,
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

pub struct BlobConfigurationBuilder {
    config: BlobConfiguration,
}

impl BlobConfigurationBuilder {
    fn new(config: BlobConfiguration) -> Self {
        Self {
            config
        }
    }

    pub fn set_buffer_size_bounds(mut self, min: usize, max: usize) -> BlobConfigurationBuilder {
        self.config.min_buffer_size = min;
        self.config.max_buffer_size = max;
        self
    }

    pub fn set_default_buffer_size(mut self, size: usize) -> BlobConfigurationBuilder {
        self.config.default_buffer_size = size;
        self
    }

    pub fn set_hash_chunk_size(mut self, size: usize) -> BlobConfigurationBuilder {
        self.config.hash_chunk_size = size;
        self
    }

    pub fn set_connect_timeout(mut self, timeout: Duration) -> BlobConfigurationBuilder {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn set_timeout(mut self, timeout: Duration) -> BlobConfigurationBuilder {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn set_user_agent(mut self, user_agent: impl Into<String>) -> BlobConfigurationBuilder {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> crate::error::Result<BlobConfiguration> {
        self.validate()
    }

    fn validate(self) -> crate::error::Result<BlobConfiguration> {
        let config = &self.config;
        if config.min_buffer_size == 0 || config.min_buffer_size > config.max_buffer_size {
            return Err(BlobError::invalid_argument(format!(
                "Invalid buffer size bounds: {}-{}",
                config.min_buffer_size, config.max_buffer_size
            )));
        }

        if config.max_buffer_size > BUFFER_SIZE_CEILING {
            return Err(BlobError::invalid_argument(format!(
                "Max buffer size must not exceed {}: {}",
                BUFFER_SIZE_CEILING, config.max_buffer_size
            )));
        }

        if !config.accepts_buffer_size(config.default_buffer_size) {
            return Err(BlobError::invalid_argument(format!(
                "Default buffer size must be {}-{}: {}",
                config.min_buffer_size, config.max_buffer_size, config.default_buffer_size
            )));
        }

        if config.hash_chunk_size == 0 {
            return Err(BlobError::invalid_argument("Hash chunk size must be positive"));
        }

        Ok(self.config)
    }
}

impl BlobConfiguration {
    pub fn new() -> BlobConfigurationBuilder {
        BlobConfigurationBuilder::new(BlobConfiguration::default())
    }

    pub fn accepts_buffer_size(&self, size: usize) -> bool {
        size >= self.min_buffer_size && size <= self.max_buffer_size
    }

    pub(crate) fn http_client(&self) -> crate::error::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| BlobError::download_failed(format!("Failed to build HTTP client: {}", e)))
    }
}

impl Default for BlobConfiguration {
    fn default() -> Self {
        Self {
            min_buffer_size: MIN_BUFFER_SIZE,
            max_buffer_size: MAX_BUFFER_SIZE,
            default_buffer_size: DEFAULT_BUFFER_SIZE,
            hash_chunk_size: HASH_CHUNK_SIZE,
            connect_timeout: Duration::from_secs(30),
            timeout: None,
            user_agent: concat!("buffered-blob/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
