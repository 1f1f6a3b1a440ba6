//! Error types for htmltext.

use std::io;

/// Errors produced by htmltext.
///
/// Only [`HtmlTextError::InvalidStrategy`] and the configuration-loading
/// variants ever abort a conversion. Resource failures are recovered
/// inside the resolvers and never reach the caller of a conversion.
#[derive(Debug, thiserror::Error)]
pub enum HtmlTextError {
    #[error("invalid resolution strategy: {0}")]
    InvalidStrategy(String),

    #[error("resource error: {0}")]
    Resource(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("bundle error: {0}")]
    Bundle(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HtmlTextError {
    /// True for errors that must abort a conversion call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidStrategy(_) | Self::Config(_) | Self::TomlParse(_)
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, HtmlTextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_strategy_display() {
        let e = HtmlTextError::InvalidStrategy("ftp".into());
        assert_eq!(format!("{e}"), "invalid resolution strategy: ftp");
    }

    #[test]
    fn resource_error_display() {
        let e = HtmlTextError::Resource("images/logo.png".into());
        assert_eq!(format!("{e}"), "resource error: images/logo.png");
    }

    #[test]
    fn network_error_display() {
        let e = HtmlTextError::Network("connection refused".into());
        assert_eq!(format!("{e}"), "network error: connection refused");
    }

    #[test]
    fn bundle_error_display() {
        let e = HtmlTextError::Bundle("path traversal not allowed".into());
        assert_eq!(format!("{e}"), "bundle error: path traversal not allowed");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e: HtmlTextError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("strategy = [[[").unwrap_err();
        let e: HtmlTextError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
        assert!(e.is_configuration());
    }

    #[test]
    fn json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: HtmlTextError = json_err.into();
        assert!(format!("{e}").contains("JSON error"));
    }

    #[test]
    fn only_config_errors_abort() {
        assert!(HtmlTextError::InvalidStrategy("x".into()).is_configuration());
        assert!(HtmlTextError::Config("x".into()).is_configuration());
        assert!(!HtmlTextError::Network("x".into()).is_configuration());
        assert!(!HtmlTextError::Resource("x".into()).is_configuration());
    }

    #[test]
    fn result_alias_err() {
        let r: Result<()> = Err(HtmlTextError::Resource("oops".into()));
        assert!(r.is_err());
    }
}
