//! Backend factory for creating backend instances from configuration.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;

use super::http::HttpBackend;
use crate::config::RemoteConfig;

/// Create a backend instance from the remote section of the configuration.
///
/// # Errors
/// Returns error if:
/// - Backend type is unknown
/// - The HTTP client cannot be constructed
pub fn create_backend(config: &RemoteConfig) -> Result<Arc<HttpBackend>> {
    match config.backend_type.as_str() {
        "rest" => {
            let backend = HttpBackend::new(&config.base_url, Duration::from_secs(config.request_timeout_secs))
                .map_err(|e| anyhow!("Failed to build REST backend: {}", e))?;
            Ok(Arc::new(backend))
        }
        _ => Err(anyhow!("Unknown backend type: {}", config.backend_type)),
    }
}
