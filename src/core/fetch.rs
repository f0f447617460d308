//! Fetching raw text for a concrete location.

use crate::error::{ConfigError, Result};
use crate::sources::Transport;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const HTTPS_SCHEME: &str = "https://";

/// Options for a single fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions<'a> {
    /// Headers sent with HTTP requests
    pub headers: Option<&'a BTreeMap<String, String>>,
    /// Whether absence is an error
    pub must_exist: bool,
}

/// Whether `location` is fetched over HTTP rather than read from disk.
pub fn is_http(location: &str) -> bool {
    location.starts_with(HTTPS_SCHEME)
}

/// Fetch the raw text at `location`.
///
/// Returns `Ok(None)` when the location does not exist and `must_exist` is
/// false.
///
/// # Errors
///
/// - [`ConfigError::NotFound`] if the location is missing and `must_exist` is set
/// - [`ConfigError::HttpStatus`] for any other non-success HTTP status
/// - [`ConfigError::Io`] for filesystem errors other than a missing file
pub async fn fetch(
    transport: &dyn Transport,
    location: &str,
    options: FetchOptions<'_>,
) -> Result<Option<String>> {
    if is_http(location) {
        fetch_http(transport, location, options).await
    } else {
        fetch_file(transport, location, options.must_exist).await
    }
}

async fn fetch_http(
    transport: &dyn Transport,
    url: &str,
    options: FetchOptions<'_>,
) -> Result<Option<String>> {
    let empty = BTreeMap::new();
    let response = transport
        .get(url, options.headers.unwrap_or(&empty))
        .await?;

    if response.is_success() {
        return Ok(Some(response.body));
    }

    if response.status == 404 {
        if options.must_exist {
            return Err(ConfigError::NotFound {
                location: url.to_string(),
            });
        }
        debug!(url, "get-http-data: not found, skipping");
        return Ok(None);
    }

    Err(ConfigError::HttpStatus {
        location: url.to_string(),
        status: response.status,
    })
}

async fn fetch_file(
    transport: &dyn Transport,
    path: &str,
    must_exist: bool,
) -> Result<Option<String>> {
    match transport.read_file(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if must_exist {
                return Err(ConfigError::NotFound {
                    location: path.to_string(),
                });
            }
            debug!(path, "get-file-data: not found, skipping");
            Ok(None)
        }
        Err(e) => Err(ConfigError::Io {
            location: path.to_string(),
            source: Arc::new(e),
        }),
    }
}
