use std::error::Error;
use std::fmt;

/// Typed failures produced by ingestion and the two analysis engines.
///
/// Degenerate variables (fewer than 2 group levels after missing-value
/// removal) are not an error: the ANOVA engine reports them as
/// non-significant by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Unknown scaling method or out-of-range significance mode.
    InvalidParameter(String),
    /// Fewer than 3 samples or fewer than 2 usable variables after ingestion.
    InsufficientData(String),
    /// Class column values cannot be mapped to integer labels.
    LabelConversion(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            AnalysisError::InsufficientData(msg) => write!(f, "insufficient data: {}", msg),
            AnalysisError::LabelConversion(msg) => {
                write!(f, "cannot convert class labels: {}", msg)
            }
        }
    }
}

impl Error for AnalysisError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AnalysisError::InsufficientData("2 samples (minimum 3 required)".to_string());
        assert_eq!(
            format!("{}", err),
            "insufficient data: 2 samples (minimum 3 required)",
            "error display should carry the detail message"
        );
        let err = AnalysisError::InvalidParameter("unknown scaling method: range".to_string());
        assert!(
            format!("{}", err).contains("range"),
            "invalid parameter display should name the offending value"
        );
    }
}
