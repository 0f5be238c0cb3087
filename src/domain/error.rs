//! Error types for the collaborators around the simulation engine.
//!
//! The simulators themselves never fail: degenerate input yields `None`.
//! Everything that touches files, configuration or storage reports through
//! [`DcaBenchError`].

/// Top-level error type for dcabench.
#[derive(Debug, thiserror::Error)]
pub enum DcaBenchError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no result for strategy {strategy}: no usable candles in range or invalid parameters")]
    NoResult { strategy: String },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("storage query error: {reason}")]
    StorageQuery { reason: String },

    #[error("saved run {id} not found")]
    RunNotFound { id: i64 },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&DcaBenchError> for std::process::ExitCode {
    fn from(err: &DcaBenchError) -> Self {
        let code: u8 = match err {
            DcaBenchError::Io(_) | DcaBenchError::Report { .. } => 1,
            DcaBenchError::ConfigParse { .. }
            | DcaBenchError::ConfigMissing { .. }
            | DcaBenchError::ConfigInvalid { .. } => 2,
            DcaBenchError::Storage { .. }
            | DcaBenchError::StorageQuery { .. }
            | DcaBenchError::RunNotFound { .. } => 3,
            DcaBenchError::Data { .. } | DcaBenchError::NoResult { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_render_section_and_key() {
        let err = DcaBenchError::ConfigInvalid {
            section: "split_buy".into(),
            key: "splits".into(),
            reason: "splits must be positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [split_buy] splits: splits must be positive"
        );
    }

    #[test]
    fn io_error_converts_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DcaBenchError = io.into();
        assert!(matches!(err, DcaBenchError::Io(_)));
        assert_eq!(err.to_string(), "gone");
    }

    #[test]
    fn exit_codes_by_category() {
        use std::process::ExitCode;

        let cases = [
            (
                DcaBenchError::ConfigMissing {
                    section: "run".into(),
                    key: "strategy".into(),
                },
                ExitCode::from(2),
            ),
            (
                DcaBenchError::Storage {
                    reason: "locked".into(),
                },
                ExitCode::from(3),
            ),
            (
                DcaBenchError::NoResult {
                    strategy: "dca".into(),
                },
                ExitCode::from(5),
            ),
            (
                DcaBenchError::Report {
                    reason: "disk full".into(),
                },
                ExitCode::from(1),
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(
                format!("{:?}", ExitCode::from(&err)),
                format!("{:?}", expected)
            );
        }
    }
}
