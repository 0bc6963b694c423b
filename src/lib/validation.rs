//! Checks on command-line inputs, reported with [`CnsError`].

use std::fmt::Display;
use std::path::Path;

use crate::errors::{CnsError, Result};

/// Validate that a file exists.
///
/// ```
/// use utgcns_lib::validation::validate_file_exists;
///
/// assert!(validate_file_exists("/nonexistent/reads.fastq", "Read store").is_err());
/// ```
///
/// # Errors
/// Returns [`CnsError::MissingFile`] if it does not.
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(CnsError::MissingFile {
            description: description.to_string(),
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Validate each `(path, description)` pair in turn.
///
/// # Errors
/// Returns the error for the first missing file.
pub fn validate_files_exist<P: AsRef<Path>>(files: &[(P, &str)]) -> Result<()> {
    for (path, description) in files {
        validate_file_exists(path, description)?;
    }
    Ok(())
}

/// Validate that a value is strictly positive.
///
/// # Errors
/// Returns [`CnsError::InvalidParameter`] otherwise.
pub fn validate_positive<T: PartialOrd + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(CnsError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("must be > 0, got {value}"),
        });
    }
    Ok(())
}

/// Validate that a value is not negative.
///
/// # Errors
/// Returns [`CnsError::InvalidParameter`] otherwise.
pub fn validate_non_negative<T: PartialOrd + Display + Default>(
    value: T,
    name: &str,
) -> Result<()> {
    if value < T::default() {
        return Err(CnsError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("must be >= 0, got {value}"),
        });
    }
    Ok(())
}
