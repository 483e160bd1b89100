use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{positive, require};
use crate::error::ConfigError;

/// Identifier of a haul truck, as issued by the fleet records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TruckId(pub u32);

/// Identifier of a loading unit (excavator, face shovel or wheel loader)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExcavatorId(pub u32);

impl fmt::Display for TruckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "truck-{}", self.0)
    }
}

impl fmt::Display for ExcavatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "excavator-{}", self.0)
    }
}

/// A GPS position on the mine site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Location {
            latitude,
            longitude,
        }
    }

    /// Planar distance in km between two points
    ///
    /// Pit-scale distances are small enough that a flat projection with a
    /// fixed km-per-degree factor is sufficient.
    pub fn distance_km(&self, other: &Location, km_per_degree: f64) -> f64 {
        let d_lat = other.latitude - self.latitude;
        let d_lon = other.longitude - self.longitude;
        (d_lat * d_lat + d_lon * d_lon).sqrt() * km_per_degree
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Operational,
    MaintenanceDue,
    InMaintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcavatorStatus {
    #[default]
    Operational,
    Maintenance,
}

/// A haul truck and its live cycle state
///
/// `current_load` and `location` only change at transition points of the
/// haul cycle (load complete, travel complete, dump complete).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truck {
    pub id: TruckId,
    /// Catalog model name, if the record was built from a preset
    pub model: Option<String>,
    /// Rated payload in tonnes
    pub capacity: f64,
    /// km/h when carrying a payload
    pub max_speed_loaded: f64,
    /// km/h when running empty
    pub max_speed_empty: f64,
    /// L/km when loaded
    pub fuel_consumption_loaded: f64,
    /// L/km when empty
    pub fuel_consumption_empty: f64,
    /// Either 0 or `capacity`
    pub current_load: f64,
    pub location: Location,
    pub assigned_excavator: ExcavatorId,
    pub maintenance_status: MaintenanceStatus,
}

impl Truck {
    pub fn is_loaded(&self) -> bool {
        self.current_load > 0.0
    }

    /// Maximum speed for the current payload state
    pub fn base_speed(&self) -> f64 {
        if self.is_loaded() {
            self.max_speed_loaded
        } else {
            self.max_speed_empty
        }
    }

    /// Fuel burn for the current payload state (L/km)
    pub fn fuel_rate(&self) -> f64 {
        if self.is_loaded() {
            self.fuel_consumption_loaded
        } else {
            self.fuel_consumption_empty
        }
    }

    /// Average of loaded and empty burn; a full cycle covers both legs
    pub fn mean_fuel_rate(&self) -> f64 {
        (self.fuel_consumption_loaded + self.fuel_consumption_empty) / 2.0
    }

    /// Reject records the haul cycle cannot time
    pub fn validate(&self) -> Result<(), ConfigError> {
        let entity = self.id.to_string();
        positive(&entity, "capacity", self.capacity)?;
        positive(&entity, "max_speed_loaded", self.max_speed_loaded)?;
        positive(&entity, "max_speed_empty", self.max_speed_empty)?;
        require(
            &entity,
            "fuel_consumption_loaded",
            self.fuel_consumption_loaded,
            "non-negative",
            self.fuel_consumption_loaded >= 0.0,
        )?;
        require(
            &entity,
            "fuel_consumption_empty",
            self.fuel_consumption_empty,
            "non-negative",
            self.fuel_consumption_empty >= 0.0,
        )
    }

    pub fn fill(&mut self) {
        self.current_load = self.capacity;
    }

    pub fn empty(&mut self) {
        self.current_load = 0.0;
    }
}

/// A loading unit at the face
///
/// Static for the duration of a run; its queue is owned by the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excavator {
    pub id: ExcavatorId,
    pub model: Option<String>,
    /// Tonnes moved per bucket pass
    pub bucket_capacity: f64,
    /// Seconds per bucket pass
    pub cycle_time_secs: f64,
    /// L/h while operating
    pub fuel_consumption: f64,
    pub location: Location,
    pub status: ExcavatorStatus,
}

impl Excavator {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let entity = self.id.to_string();
        positive(&entity, "bucket_capacity", self.bucket_capacity)?;
        positive(&entity, "cycle_time_secs", self.cycle_time_secs)?;
        require(
            &entity,
            "fuel_consumption",
            self.fuel_consumption,
            "non-negative",
            self.fuel_consumption >= 0.0,
        )
    }

    /// Bucket passes needed to fill a truck of the given capacity
    pub fn passes_for(&self, truck_capacity: f64) -> u32 {
        (truck_capacity / self.bucket_capacity).ceil().max(1.0) as u32
    }

    /// Whole seconds needed to fill a truck of the given capacity
    pub fn loading_secs(&self, truck_capacity: f64) -> u64 {
        (self.passes_for(truck_capacity) as f64 * self.cycle_time_secs).round() as u64
    }
}
