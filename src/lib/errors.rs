//! Custom error types for fgkmer operations.

use thiserror::Error;

/// Result type alias for fgkmer operations
pub type Result<T> = std::result::Result<T, FgkmerError>;

/// Error type for fgkmer operations
#[derive(Error, Debug)]
pub enum FgkmerError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Anchor dictionary entry that cannot be encoded
    #[error("Invalid anchor '{anchor}': {reason}")]
    InvalidAnchor {
        /// The offending dictionary entry
        anchor: String,
        /// Explanation of the problem
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "FASTQ", "anchor dictionary")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A packed record block that cannot be decoded
    #[error("Malformed record block: {reason}")]
    MalformedBlock {
        /// Explanation of the problem
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter() {
        let error = FgkmerError::InvalidParameter {
            parameter: "leader-len".to_string(),
            reason: "must be between 1 and 32".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("Invalid parameter 'leader-len'"));
        assert!(msg.contains("between 1 and 32"));
    }

    #[test]
    fn test_invalid_anchor() {
        let error = FgkmerError::InvalidAnchor {
            anchor: "ACGN".to_string(),
            reason: "contains a non-ACGT base".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("Invalid anchor 'ACGN'"));
        assert!(msg.contains("non-ACGT"));
    }

    #[test]
    fn test_invalid_file_format() {
        let error = FgkmerError::InvalidFileFormat {
            file_type: "FASTQ".to_string(),
            path: "/path/to/reads.fq".to_string(),
            reason: "truncated record".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("Invalid FASTQ file"));
        assert!(msg.contains("truncated record"));
    }

    #[test]
    fn test_malformed_block() {
        let error = FgkmerError::MalformedBlock { reason: "3 trailing bytes".to_string() };
        assert!(format!("{error}").contains("3 trailing bytes"));
    }
}
