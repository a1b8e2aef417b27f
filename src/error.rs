//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("context error: {0}")]
    Context(String),

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("usage: {0}")]
    Usage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(!e.to_string().is_empty());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn context_error_display() {
        let e = AppError::Context("expected object".into());
        assert!(e.to_string().contains("expected object"));
    }

    #[test]
    fn logger_error_display() {
        let e = AppError::Logger("already initialized".into());
        assert!(e.to_string().contains("already initialized"));
    }

    #[test]
    fn store_error_converts() {
        let e: AppError = crate::store::StoreError::EmptyKey.into();
        assert!(e.to_string().starts_with("store error"));
        assert!(e.source().is_some());
    }
}
