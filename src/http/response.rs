//! Backend response transformation.
//!
//! # Responsibilities
//! - Rewrite `Location` headers that point back at the backend into
//!   host-relative paths, so clients are never redirected to an internal address
//! - Leave every other header and every foreign redirect untouched
//! - A redirect targets the backend only when host and effective port both match

use axum::http::{header, HeaderMap, HeaderValue};
use url::Url;

/// The backend's origin, used to recognise self-referencing redirects.
#[derive(Debug, Clone)]
pub struct BackendOrigin {
    host: String,
    port: Option<u16>,
}

impl BackendOrigin {
    /// Parse the configured backend base URL.
    pub fn parse(backend: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(backend)?;
        let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;
        Ok(Self {
            host: host.to_ascii_lowercase(),
            port: url.port_or_known_default(),
        })
    }

    fn matches(&self, location: &Url) -> bool {
        match location.host_str() {
            Some(host) => {
                host.eq_ignore_ascii_case(&self.host) && location.port_or_known_default() == self.port
            }
            None => false,
        }
    }
}

/// Rewrite every `Location` value that targets the backend to its path and query.
pub fn rewrite_location_headers(headers: &mut HeaderMap, backend: &BackendOrigin) {
    let locations: Vec<HeaderValue> = headers.get_all(header::LOCATION).iter().cloned().collect();
    if locations.is_empty() {
        return;
    }

    headers.remove(header::LOCATION);
    for value in locations {
        headers.append(header::LOCATION, rewrite_location(value, backend));
    }
}

fn rewrite_location(value: HeaderValue, backend: &BackendOrigin) -> HeaderValue {
    let Ok(raw) = value.to_str() else {
        return value;
    };
    let Ok(location) = Url::parse(raw) else {
        // Relative references are already host-relative.
        return value;
    };
    if !backend.matches(&location) {
        return value;
    }

    let mut relative = location.path().to_string();
    if let Some(query) = location.query() {
        relative.push('?');
        relative.push_str(query);
    }

    match HeaderValue::from_str(&relative) {
        Ok(rewritten) => {
            tracing::debug!(from = raw, to = %relative, "Rewrote backend redirect");
            rewritten
        }
        Err(_) => value,
    }
}
