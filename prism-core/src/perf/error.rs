use thiserror::Error;

pub type Result<T> = std::result::Result<T, PerfError>;

#[derive(Debug, Error)]
pub enum PerfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("profiler error: {message}")]
    Profiler { message: String },

    #[error("profiler command failed: {command} (exit={code:?})")]
    ProfilerExit { command: String, code: Option<i32> },
}

impl PerfError {
    /// Profiler failure not tied to an exit status.
    pub fn profiler(message: impl Into<String>) -> Self {
        Self::Profiler {
            message: message.into(),
        }
    }
}
