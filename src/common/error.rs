use thiserror::Error;

use crate::common::types::ExplainStatus;

pub type Result<T> = std::result::Result<T, ExplainError>;

#[derive(Debug, Error)]
pub enum ExplainError {
    /// A required argument was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The limit query has no implementation on this platform or filesystem.
    #[error("{limit} is not supported on this platform")]
    Unsupported { limit: &'static str },

    /// The call is known but explanations for it are not provided.
    #[error("explaining {syscall} errors is not implemented")]
    NotImplemented { syscall: &'static str },

    #[error("error explanations are disabled for this session")]
    Disabled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown directive '{0}'")]
    UnknownDirective(String),

    #[error("{directive}: wrong number of parameters")]
    WrongArgCount { directive: &'static str },

    #[error("{directive}: expected Boolean parameter")]
    ExpectedBoolean { directive: &'static str },

    #[error("ExplainOptions: unknown ExplainOption '{0}'")]
    UnknownOption(String),

    #[error("ExplainVerbosity: unknown verbosity '{0}'")]
    UnknownVerbosity(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("error registering explanations for '{module}': {reason}")]
    Rejected { module: String, reason: String },

    #[error("no explanations registered for '{0}'")]
    NotRegistered(String),
}

impl From<&ExplainError> for ExplainStatus {
    fn from(err: &ExplainError) -> Self {
        match err {
            ExplainError::InvalidArgument(_) | ExplainError::Config(_) => {
                ExplainStatus::InvalidArgument
            }
            ExplainError::Unsupported { .. } => ExplainStatus::Unsupported,
            ExplainError::NotImplemented { .. } => ExplainStatus::NotImplemented,
            ExplainError::Disabled => ExplainStatus::Disabled,
            ExplainError::Registry(_) => ExplainStatus::IoError,
        }
    }
}
