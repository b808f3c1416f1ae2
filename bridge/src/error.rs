use netatmo2mqtt_common::{ConfigError, JoinError};
use thiserror::Error;

use crate::mqtt::PublishError;
use crate::netatmo::ApiError;

/// Failure category of a bridge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Authentication,
    Schema,
    Transport,
    Join,
    Publish,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Api(err) => err.kind(),
            Self::Join(_) => ErrorKind::Join,
            Self::Publish(_) => ErrorKind::Publish,
        }
    }
}
