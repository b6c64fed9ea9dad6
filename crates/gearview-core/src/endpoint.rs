//! Backend address handling

use thiserror::Error;
use url::Url;

/// Backend used when nothing else is configured (the generator's default port)
pub const DEFAULT_BACKEND: &str = "http://localhost:5000";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Backend address is empty")]
    Empty,
    #[error("Unsupported scheme in backend address: {0}")]
    UnsupportedScheme(String),
    #[error("Invalid backend address: {0}")]
    Invalid(#[from] url::ParseError),
}

/// Base URL of the model generation backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND.to_string(),
        }
    }
}

impl Endpoint {
    /// Create from a full URL or a bare `host:port`
    pub fn from_address(addr: &str) -> Result<Self, EndpointError> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(EndpointError::Empty);
        }

        let url = if addr.contains("://") {
            Url::parse(addr)?
        } else {
            // Assume plain address like "192.168.1.100:5000"
            Url::parse(&format!("http://{}", addr))?
        };
        if !matches!(url.scheme(), "http" | "https") {
            return Err(EndpointError::UnsupportedScheme(url.scheme().to_string()));
        }

        Ok(Self {
            base_url: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST` target for free-text commands
    pub fn generate_url(&self) -> String {
        self.join("generate-model")
    }

    /// `POST` target for parameter updates of one part type
    pub fn part_url(&self, part_type: &str) -> String {
        self.join(part_type)
    }

    /// Append one path segment, escaping it as needed
    fn join(&self, segment: &str) -> String {
        match Url::parse(&self.base_url) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(segment);
                }
                url.into()
            }
            // Unreachable for endpoints built by `from_address` or `default`
            Err(e) => {
                tracing::error!("Backend URL {} no longer parses: {}", self.base_url, e);
                self.base_url.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_address() {
        let e = Endpoint::from_address("192.168.1.100:5000").unwrap();
        assert_eq!(e.base_url(), "http://192.168.1.100:5000");

        let e = Endpoint::from_address("https://gen.example.com/").unwrap();
        assert_eq!(e.generate_url(), "https://gen.example.com/generate-model");

        assert_eq!(Endpoint::from_address("  "), Err(EndpointError::Empty));
        assert_eq!(
            Endpoint::from_address("ws://host"),
            Err(EndpointError::UnsupportedScheme("ws".to_string()))
        );
    }

    #[test]
    fn test_part_url() {
        let e = Endpoint::default();
        assert_eq!(e.part_url("gear"), "http://localhost:5000/gear");
        assert_eq!(e.part_url("a b"), "http://localhost:5000/a%20b");
        assert_eq!(e.part_url("x/y"), "http://localhost:5000/x%2Fy");

        let e = Endpoint::from_address("https://gen.example.com/api/").unwrap();
        assert_eq!(e.generate_url(), "https://gen.example.com/api/generate-model");
        assert_eq!(e.part_url("gear"), "https://gen.example.com/api/gear");
    }

    #[test]
    fn test_invalid_address() {
        assert!(matches!(
            Endpoint::from_address("host:port:extra"),
            Err(EndpointError::Invalid(_))
        ));
    }
}
