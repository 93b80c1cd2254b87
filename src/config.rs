//! Process-wide configuration.
//!
//! Read once at startup from the environment (after `.env` is loaded) and shared
//! read-only with every handler through the router state.

use anyhow::{Context, Result};
use std::fmt;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TESSERACT_CMD: &str = "tesseract";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_MAX_UPLOAD_MB: usize = 100;

/// Service configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Verbose logging and error traces in 500 responses.
    pub debug: bool,
    /// Path (or name on `PATH`) of the tesseract binary.
    pub tesseract_cmd: String,
    /// Absent disables the vision model; image endpoints then always use OCR.
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Build the config from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got '{}'", raw))?,
            None => DEFAULT_PORT,
        };

        let max_upload_mb = match var("MAX_UPLOAD_MB") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_UPLOAD_MB must be an integer, got '{}'", raw))?,
            None => DEFAULT_MAX_UPLOAD_MB,
        };
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .with_context(|| format!("MAX_UPLOAD_MB is too large: {}", max_upload_mb))?;

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            debug: var("DEBUG").map(|v| parse_flag(&v)).unwrap_or(false),
            tesseract_cmd: var("TESSERACT_CMD")
                .unwrap_or_else(|| DEFAULT_TESSERACT_CMD.to_string()),
            google_api_key: var("GOOGLE_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            max_upload_bytes,
        })
    }

    /// `host:port` string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn vision_enabled(&self) -> bool {
        self.google_api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debug: false,
            tesseract_cmd: DEFAULT_TESSERACT_CMD.to_string(),
            google_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("debug", &self.debug)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field(
                "google_api_key",
                &self.google_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("gemini_model", &self.gemini_model)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "t" | "yes" | "y"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert!(!config.debug);
        assert_eq!(config.tesseract_cmd, "tesseract");
        assert!(config.google_api_key.is_none());
        assert!(!config.vision_enabled());
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("DEBUG", "Yes"),
            ("TESSERACT_CMD", "/opt/tesseract/bin/tesseract"),
            ("GOOGLE_API_KEY", "secret-key"),
            ("MAX_UPLOAD_MB", "5"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert!(config.debug);
        assert_eq!(config.tesseract_cmd, "/opt/tesseract/bin/tesseract");
        assert!(config.vision_enabled());
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_debug_flag_values() {
        for value in ["true", "1", "T", "y", "YES"] {
            assert!(config_from(&[("DEBUG", value)]).unwrap().debug, "{}", value);
        }
        for value in ["false", "0", "no", "off"] {
            assert!(!config_from(&[("DEBUG", value)]).unwrap().debug, "{}", value);
        }
    }

    #[test]
    fn test_empty_api_key_disables_vision() {
        let config = config_from(&[("GOOGLE_API_KEY", "  ")]).unwrap();
        assert!(!config.vision_enabled());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
    }

    #[test]
    fn test_oversized_upload_limit_is_rejected() {
        let huge = usize::MAX.to_string();
        let err = config_from(&[("MAX_UPLOAD_MB", huge.as_str())]).unwrap_err();
        assert!(err.to_string().contains("MAX_UPLOAD_MB is too large"));
    }

    #[test]
    fn test_debug_output_redacts_key() {
        let config = config_from(&[("GOOGLE_API_KEY", "secret-key")]).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
