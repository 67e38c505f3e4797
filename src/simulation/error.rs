//! Error types for the traffic simulation

use std::path::PathBuf;

use thiserror::Error;

use super::types::VehicleId;

/// Failures while looking up or wiring routes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("route '{0}' not found")]
    RouteNotFound(String),
    #[error("route '{0}' already exists")]
    DuplicateRoute(String),
    #[error("vehicle {0} is not registered")]
    VehicleNotFound(VehicleId),
}

/// Rejected route membership changes. These are reported, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MembershipError {
    #[error("vehicle {0} is already on the route")]
    Duplicate(VehicleId),
    #[error("route '{route}' is full ({capacity} vehicles)")]
    AtCapacity { route: String, capacity: usize },
}

/// Top level error of the crate
#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error in {}: {message}", file.display())]
    Config { file: PathBuf, message: String },
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl SimError {
    pub fn config(file: impl Into<PathBuf>, message: impl ToString) -> Self {
        SimError::Config {
            file: file.into(),
            message: message.to_string(),
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
