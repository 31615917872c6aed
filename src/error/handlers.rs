//! Standardized HTTP and network error mapping

use crate::error::{Result, ToolkitError};
use reqwest::StatusCode;

/// Standard error handler for HTTP responses
///
/// Non-success statuses are transport failures of the operation that was
/// attempted; the message names what the status means for that endpoint.
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Handle registry-related HTTP errors
    pub fn handle_registry_error(
        status: StatusCode,
        error_text: &str,
        operation: &str,
    ) -> ToolkitError {
        let message = match status.as_u16() {
            401 => format!("unauthorized (check registry credentials): {}", error_text),
            403 => format!("forbidden, insufficient permissions: {}", error_text),
            404 => format!("resource not found: {}", error_text),
            429 => format!("rate limited: {}", error_text),
            500 => format!("registry server error: {}", error_text),
            502 | 503 => format!("registry unavailable: {}", error_text),
            _ => format!("status {}: {}", status, error_text),
        };

        ToolkitError::transport(operation, message)
    }

    /// Handle Livy batch endpoint errors
    pub fn handle_livy_error(status: StatusCode, error_text: &str, operation: &str) -> ToolkitError {
        let message = match status.as_u16() {
            400 => format!("Livy rejected the request: {}", error_text),
            401 => "cluster credentials rejected".to_string(),
            403 => format!(
                "forbidden (is the X-Requested-By header allowed?): {}",
                error_text
            ),
            404 => format!("batch not found: {}", error_text),
            500 => format!("Livy server error: {}", error_text),
            502 | 503 => format!("Livy unavailable: {}", error_text),
            _ => format!("status {}: {}", status, error_text),
        };

        ToolkitError::transport(operation, message)
    }
}

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Categorize and format network errors with helpful context
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> ToolkitError {
        let message = if error.is_timeout() {
            format!("timeout: {}", error)
        } else if error.is_connect() {
            format!("connection error: {}", error)
        } else if error.is_decode() {
            format!("undecodable response body: {}", error)
        } else if error.to_string().contains("certificate") {
            format!("TLS certificate error: {}", error)
        } else {
            error.to_string()
        };

        ToolkitError::transport(context, message)
    }
}

/// Validation error utilities
pub struct ValidationErrorHandler;

impl ValidationErrorHandler {
    /// Standard endpoint URL validation
    pub fn validate_endpoint_url(url: &str, what: &str) -> Result<()> {
        if url.is_empty() {
            return Err(ToolkitError::Validation(format!("{} URL cannot be empty", what)));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolkitError::Validation(format!(
                "{} URL must include protocol (http:// or https://): {}",
                what, url
            )));
        }

        url::Url::parse(url)?;
        Ok(())
    }

    /// Standard credential validation
    pub fn validate_credentials(
        username: &Option<String>,
        password: &Option<String>,
    ) -> Result<()> {
        match (username, password) {
            (Some(_), None) => Err(ToolkitError::Validation(
                "Password is required when username is provided".to_string(),
            )),
            (None, Some(_)) => Err(ToolkitError::Validation(
                "Username is required when password is provided".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Standard numeric range validation
    pub fn validate_timeout(timeout: u64) -> Result<()> {
        if timeout == 0 {
            return Err(ToolkitError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if timeout > 86400 {
            return Err(ToolkitError::Validation(
                "Timeout cannot exceed 24 hours (86400 seconds)".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate_page_size(page_size: usize) -> Result<()> {
        if page_size == 0 || page_size > 1000 {
            return Err(ToolkitError::Validation(format!(
                "Page size must be between 1 and 1000, got {}",
                page_size
            )));
        }
        Ok(())
    }
}
