//! Input validation utilities
//!
//! Common validation functions for command-line parameters and file paths
//! with consistent, structured error messages.

use std::fmt::Display;
use std::path::Path;

use crate::errors::{FgkmerError, Result};
use crate::kmer::MAX_KMER_LEN;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input list")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use fgkmer_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/reads.fq", "Input FASTQ");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(FgkmerError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that a value is positive (> 0)
///
/// # Errors
/// Returns an error if the value is not positive
#[allow(clippy::needless_pass_by_value)]
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(FgkmerError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be positive (> 0), got: {value}"),
        });
    }
    Ok(())
}

/// Validate that a k-mer width fits the 2-bit packing of a u64
///
/// # Errors
/// Returns an error if the width is 0 or greater than 32
///
/// # Example
/// ```
/// use fgkmer_lib::validation::validate_kmer_len;
///
/// validate_kmer_len(27, "leader-len").unwrap();
/// assert!(validate_kmer_len(33, "leader-len").is_err());
/// ```
pub fn validate_kmer_len(len: usize, name: &str) -> Result<()> {
    if !(1..=MAX_KMER_LEN).contains(&len) {
        return Err(FgkmerError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("Must be between 1 and {MAX_KMER_LEN}, got: {len}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_file_exists_valid() {
        let temp_file = NamedTempFile::new().unwrap();
        validate_file_exists(temp_file.path(), "Test file").unwrap();
    }

    #[test]
    fn test_validate_file_exists_invalid() {
        let result = validate_file_exists("/nonexistent/input.txt", "Input list");
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Input list"));
        assert!(err_msg.contains("does not exist"));
    }

    #[test]
    fn test_validate_positive() {
        validate_positive(1, "threads").unwrap();
        validate_positive(100_usize, "splits").unwrap();

        let err_msg = validate_positive(0, "threads").unwrap_err().to_string();
        assert!(err_msg.contains("Invalid parameter 'threads'"));
        assert!(err_msg.contains("got: 0"));

        assert!(validate_positive(-5, "threads").is_err());
    }

    #[rstest]
    #[case(1, true)]
    #[case(16, true)]
    #[case(32, true)]
    #[case(0, false)]
    #[case(33, false)]
    fn test_validate_kmer_len(#[case] len: usize, #[case] should_succeed: bool) {
        let result = validate_kmer_len(len, "leader-len");
        assert_eq!(result.is_ok(), should_succeed, "width {len}");
    }
}
