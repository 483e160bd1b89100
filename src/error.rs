//! Error types for the haul simulation

use thiserror::Error;

use crate::model::equipment::{ExcavatorId, TruckId};

/// Problems with scenario or engine input, raised before any run starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{entity}: missing `{field}` and no catalog preset provides it")]
    MissingField { entity: String, field: &'static str },

    #[error("{entity}: unknown model `{model}`")]
    UnknownModel { entity: String, model: String },

    #[error("{entity}: `{field}` must be {requirement}, got {value}")]
    InvalidValue {
        entity: String,
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u32 },

    #[error("{truck} is assigned to unknown {excavator}")]
    UnknownAssignment { truck: TruckId, excavator: ExcavatorId },

    #[error("route references unknown {0}")]
    UnknownRouteEndpoint(String),

    #[error("weather regime set is empty")]
    NoWeatherRegimes,

    #[error("repair time range [{low}, {high}] is invalid")]
    RepairRange { low: f64, high: f64 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{excavator} has {assigned} trucks assigned, capacity is {capacity}")]
    InvalidAssignment {
        excavator: ExcavatorId,
        assigned: usize,
        capacity: usize,
    },

    #[error("unknown {0}")]
    UnknownTruck(TruckId),

    #[error("unknown {0}")]
    UnknownExcavator(ExcavatorId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
