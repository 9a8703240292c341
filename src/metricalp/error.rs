use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetricalpErrorCode {
    InvalidArgument,
    Config,
    ScriptLoad,
    Internal,
}

impl MetricalpErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricalpErrorCode::InvalidArgument => "metricalp/invalid-argument",
            MetricalpErrorCode::Config => "metricalp/config",
            MetricalpErrorCode::ScriptLoad => "metricalp/script-load",
            MetricalpErrorCode::Internal => "metricalp/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct MetricalpError {
    pub code: MetricalpErrorCode,
    message: String,
}

impl MetricalpError {
    pub fn new(code: MetricalpErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for MetricalpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for MetricalpError {}

pub type MetricalpResult<T> = Result<T, MetricalpError>;

pub fn invalid_argument(message: impl Into<String>) -> MetricalpError {
    MetricalpError::new(MetricalpErrorCode::InvalidArgument, message)
}

pub fn config_error(message: impl Into<String>) -> MetricalpError {
    MetricalpError::new(MetricalpErrorCode::Config, message)
}

pub fn script_load_error(message: impl Into<String>) -> MetricalpError {
    MetricalpError::new(MetricalpErrorCode::ScriptLoad, message)
}

pub fn internal_error(message: impl Into<String>) -> MetricalpError {
    MetricalpError::new(MetricalpErrorCode::Internal, message)
}
