//! Input validation and sanitization

use crate::error::{AppError, Result};

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the filename of an uploaded archive
    pub fn validate_upload_filename(file_name: &str) -> Result<()> {
        if file_name.trim().is_empty() {
            return Err(AppError::Validation("upload filename cannot be empty".to_string()));
        }

        if !file_name.to_lowercase().ends_with(".zip") {
            return Err(AppError::Validation("please upload a .zip file".to_string()));
        }

        Ok(())
    }

    /// Validate an export display name
    pub fn validate_export_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("export name cannot be empty".to_string()));
        }

        if name.len() > 200 {
            return Err(AppError::Validation(
                "export name too long (max 200 characters)".to_string(),
            ));
        }

        if name.chars().any(char::is_control) {
            return Err(AppError::Validation(
                "export name contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate a category label (rename targets and move targets)
    pub fn validate_category_label(label: &str) -> Result<()> {
        if label.trim().is_empty() {
            return Err(AppError::Validation("category cannot be empty".to_string()));
        }

        if label.len() > 100 {
            return Err(AppError::Validation(
                "category too long (max 100 characters)".to_string(),
            ));
        }

        if label.chars().any(char::is_control) {
            return Err(AppError::Validation(
                "category contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate a search term
    pub fn validate_search_query(query: &str) -> Result<()> {
        if query.len() > 500 {
            return Err(AppError::Validation(
                "search term too long (max 500 characters)".to_string(),
            ));
        }

        Ok(())
    }

    /// Reduce an archive entry name to a safe file name component.
    ///
    /// Strips any directory structure and control characters; the caller
    /// prefixes the result with a fresh identifier to avoid collisions.
    #[must_use]
    pub fn sanitize_file_name(name: &str) -> String {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();

        if cleaned.trim().is_empty() {
            "unnamed".to_string()
        } else {
            cleaned
        }
    }
}
