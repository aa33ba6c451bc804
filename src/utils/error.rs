use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Input format error: {message}")]
    InputFormat { message: String },

    #[error("Transform error: {message}")]
    Transform { message: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Job '{job_name}' is already running")]
    DuplicateRun { job_name: String },

    #[error("Job '{job_name}' already completed for run token {run_token}")]
    JobAlreadyComplete { job_name: String, run_token: i64 },

    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<BatchError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤分類，決定 HTTP 狀態碼與 CLI 退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Transform,
    Persistence,
    Conflict,
    Config,
    Io,
}

impl BatchError {
    pub fn input_format(message: impl Into<String>) -> Self {
        Self::InputFormat {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InputFormat { .. } => ErrorCategory::Input,
            Self::Transform { .. } => ErrorCategory::Transform,
            Self::Persistence(_) => ErrorCategory::Persistence,
            Self::DuplicateRun { .. } | Self::JobAlreadyComplete { .. } => ErrorCategory::Conflict,
            Self::StepFailed { source, .. } => source.category(),
            Self::Io(_) => ErrorCategory::Io,
            Self::ConfigError { .. } | Self::InvalidConfigValue { .. } => ErrorCategory::Config,
        }
    }

    /// 拒絕啟動（而非執行中失敗）的錯誤
    pub fn is_rejection(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failure_keeps_inner_category() {
        let err = BatchError::StepFailed {
            step: "load".to_string(),
            source: Box::new(BatchError::input_format("missing file")),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.to_string().contains("missing file"));
    }

    #[test]
    fn test_duplicate_run_is_rejection() {
        let err = BatchError::DuplicateRun {
            job_name: "user-job".to_string(),
        };
        assert!(err.is_rejection());
        assert!(!BatchError::input_format("x").is_rejection());
    }
}
