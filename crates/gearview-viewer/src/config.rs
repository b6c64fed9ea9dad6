//! Viewer configuration from URL query parameters
//!
//! - `?backend=host:port` - model generation backend (default `http://localhost:5000`)
//! - `?catalog=url` - part catalog TOML replacing the built-in one
//! - `?font=url` - TTF/OTF font added to the UI (for CJK text)
//! - `?lang=zh-CN` - speech recognition language
//! - `?model=gear` - static model to show on startup
//! - `?log=info` - log level

use bevy::prelude::*;
use gearview_core::Endpoint;

/// Speech recognition language used when `?lang=` is absent
pub const DEFAULT_SPEECH_LANG: &str = "zh-CN";

#[derive(Resource, Debug, Clone)]
pub struct ViewerConfig {
    pub endpoint: Endpoint,
    pub catalog_url: Option<String>,
    pub font_url: Option<String>,
    pub speech_lang: String,
    pub startup_model: Option<String>,
    pub log_level: tracing::Level,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            catalog_url: None,
            font_url: None,
            speech_lang: DEFAULT_SPEECH_LANG.to_string(),
            startup_model: None,
            log_level: tracing::Level::WARN,
        }
    }
}

impl ViewerConfig {
    /// Create config from the page URL
    #[cfg(target_arch = "wasm32")]
    pub fn from_browser() -> Self {
        let params = web_sys::window()
            .and_then(|window| window.location().href().ok())
            .and_then(|href| web_sys::Url::new(&href).ok())
            .map(|url| url.search_params());
        match params {
            Some(params) => Self::from_query(|key| params.get(key)),
            None => Self::default(),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_browser() -> Self {
        Self::default()
    }

    /// Create config from decoded query parameters, looked up by name
    pub fn from_query<F>(param: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(backend) = param("backend") {
            match Endpoint::from_address(&backend) {
                Ok(endpoint) => config.endpoint = endpoint,
                // Logging is not initialized yet
                Err(e) => web_warn(&format!("Ignoring ?backend={}: {}", backend, e)),
            }
        }

        config.catalog_url = non_empty(param("catalog"));
        config.font_url = non_empty(param("font"));
        config.startup_model = non_empty(param("model"));

        if let Some(lang) = non_empty(param("lang")) {
            config.speech_lang = lang;
        }

        if let Some(level) = param("log") {
            match level.parse::<tracing::Level>() {
                Ok(level) => config.log_level = level,
                Err(_) => web_warn(&format!("Ignoring ?log={}: not a log level", level)),
            }
        }

        config
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(target_arch = "wasm32")]
fn web_warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

#[cfg(not(target_arch = "wasm32"))]
fn web_warn(message: &str) {
    eprintln!("{}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::from_query(query(&[]));
        assert_eq!(config.endpoint.base_url(), "http://localhost:5000");
        assert_eq!(config.speech_lang, "zh-CN");
        assert!(config.catalog_url.is_none());
        assert_eq!(config.log_level, tracing::Level::WARN);
    }

    #[test]
    fn test_query_overrides() {
        let config = ViewerConfig::from_query(query(&[
            ("backend", "10.0.0.2:5000"),
            ("lang", "en-US"),
            ("model", "gear"),
            ("log", "debug"),
            ("font", "fonts/cjk.ttf"),
        ]));
        assert_eq!(config.endpoint.base_url(), "http://10.0.0.2:5000");
        assert_eq!(config.speech_lang, "en-US");
        assert_eq!(config.startup_model.as_deref(), Some("gear"));
        assert_eq!(config.font_url.as_deref(), Some("fonts/cjk.ttf"));
        assert_eq!(config.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = ViewerConfig::from_query(query(&[
            ("backend", "ftp://x"),
            ("log", "loud"),
            ("lang", ""),
        ]));
        assert_eq!(config.endpoint.base_url(), "http://localhost:5000");
        assert_eq!(config.log_level, tracing::Level::WARN);
        assert_eq!(config.speech_lang, "zh-CN");
    }
}
