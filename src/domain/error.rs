//! Engine error types.
//!
//! Warm-up shortfalls, degenerate indicator math and risk rejections are
//! ordinary values elsewhere in the domain; only conditions a caller must act
//! on are represented here.

/// Top-level error type for streamtrader.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
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

    #[error("strategy instance {name} is already registered")]
    DuplicateInstance { name: String },

    #[error("settlement failed for {instance}: {reason}")]
    Settlement { instance: String, reason: String },

    #[error("malformed tick at line {line}: {reason}")]
    Feed { line: u64, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Feed { .. } => 3,
            EngineError::DuplicateInstance { .. } | EngineError::Settlement { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
