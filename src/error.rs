use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("problem index {index} out of range for a set of {len} problems")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unsupported shape: {0}")]
    UnsupportedShape(String),

    #[error("device {device} failure: {message}")]
    DeviceFailure { device: u32, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn device(device: u32, message: impl Into<String>) -> Error {
        Error::DeviceFailure {
            device,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
