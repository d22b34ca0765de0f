use thiserror::Error;

pub type TimecardResult<T> = Result<T, TimecardError>;

#[derive(Error, Debug)]
pub enum TimecardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad json: {0}")]
    InvalidRequest(String),

    #[error("need at least {required} rows (Sun..Sat), got {found}")]
    InsufficientRows { required: usize, found: usize },

    #[error("template load failed: {0}")]
    TemplateLoad(String),

    #[error("workbook write failed: {0}")]
    Workbook(String),

    #[error("xlsx serialization failed: {0}")]
    Serialization(String),
}

impl TimecardError {
    /// Request-shape errors are the caller's fault; everything else is ours.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TimecardError::InvalidRequest(_) | TimecardError::InsufficientRows { .. }
        )
    }
}

impl From<serde_json::Error> for TimecardError {
    fn from(err: serde_json::Error) -> Self {
        TimecardError::InvalidRequest(err.to_string())
    }
}
