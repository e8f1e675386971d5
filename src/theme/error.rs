//! Template engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeError {
    /// A template could not be found or added
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template parse or render error
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Embedded template is not valid UTF-8
    #[error("Invalid template encoding: {0}")]
    InvalidEncoding(String),
}
