//! Scenario files and engine settings
//!
//! A scenario is a JSON document with the fleet, the loading units, optional
//! per-pair route records and an `engine` block. Truck and excavator records
//! may name a catalog model; any explicit field overrides the preset.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, Result};
use crate::model::catalog::{loader_spec, truck_spec};
use crate::model::environment::{RouteKey, RouteMode, RouteSegment, Weather};
use crate::model::equipment::{
    Excavator, ExcavatorId, ExcavatorStatus, Location, MaintenanceStatus, Truck, TruckId,
};
use crate::model::haul_cycle::CycleParams;
use crate::model::mine_simulation::Scenario;
use crate::model::time::hours_to_secs;

/// Knobs of the engine itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: u64,
    /// Admission capacity applied to every excavator
    pub max_trucks_per_excavator: usize,
    pub dump_site: Location,
    pub dump_duration_secs: f64,
    /// Chance per cycle that a truck breaks down before departing
    pub breakdown_probability: f64,
    /// Inclusive [low, high] repair duration in hours
    pub repair_time_hours: (f64, f64),
    pub weather_interval_hours: f64,
    pub weather_regimes: Vec<Weather>,
    pub initial_weather: Weather,
    pub degradation_interval_hours: f64,
    /// Condition lost per degradation step in clear weather
    pub degradation_rate: f64,
    pub road_condition_floor: f64,
    pub route_mode: RouteMode,
    pub default_road_condition: f64,
    pub default_gradient: f64,
    pub km_per_degree: f64,
    /// Currency per litre, used by the fuel KPI
    pub fuel_price: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            seed: 42,
            max_trucks_per_excavator: 4,
            dump_site: Location::new(-25.7461, 28.2314),
            dump_duration_secs: 360.0,
            breakdown_probability: 0.02,
            repair_time_hours: (0.5, 2.0),
            weather_interval_hours: 1.0,
            weather_regimes: Weather::ALL.to_vec(),
            initial_weather: Weather::Clear,
            degradation_interval_hours: 0.25,
            degradation_rate: 0.002,
            road_condition_floor: 0.3,
            route_mode: RouteMode::Live,
            default_road_condition: 1.0,
            default_gradient: 0.0,
            km_per_degree: 111.0,
            fuel_price: 1.5,
        }
    }
}

pub(crate) fn require(
    entity: &str,
    field: &'static str,
    value: f64,
    requirement: &'static str,
    ok: bool,
) -> std::result::Result<(), ConfigError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            entity: entity.to_string(),
            field,
            requirement,
            value,
        })
    }
}

pub(crate) fn positive(entity: &str, field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    require(entity, field, value, "positive", value > 0.0)
}

impl EngineConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let entity = "engine";
        require(
            entity,
            "max_trucks_per_excavator",
            self.max_trucks_per_excavator as f64,
            "at least 1",
            self.max_trucks_per_excavator >= 1,
        )?;
        require(
            entity,
            "dump_duration_secs",
            self.dump_duration_secs,
            "non-negative",
            self.dump_duration_secs >= 0.0,
        )?;
        require(
            entity,
            "breakdown_probability",
            self.breakdown_probability,
            "within [0, 1]",
            (0.0..=1.0).contains(&self.breakdown_probability),
        )?;
        let (low, high) = self.repair_time_hours;
        if !(low.is_finite() && high.is_finite() && low >= 0.0 && low <= high) {
            return Err(ConfigError::RepairRange { low, high });
        }
        // Intervals must be at least a second or the process would spin in place
        require(
            entity,
            "weather_interval_hours",
            self.weather_interval_hours,
            "at least one second",
            hours_to_secs(self.weather_interval_hours) >= 1,
        )?;
        require(
            entity,
            "degradation_interval_hours",
            self.degradation_interval_hours,
            "at least one second",
            hours_to_secs(self.degradation_interval_hours) >= 1,
        )?;
        if self.weather_regimes.is_empty() {
            return Err(ConfigError::NoWeatherRegimes);
        }
        require(
            entity,
            "degradation_rate",
            self.degradation_rate,
            "non-negative",
            self.degradation_rate >= 0.0,
        )?;
        require(
            entity,
            "road_condition_floor",
            self.road_condition_floor,
            "within [0, 1]",
            (0.0..=1.0).contains(&self.road_condition_floor),
        )?;
        require(
            entity,
            "default_road_condition",
            self.default_road_condition,
            "within [0, 1]",
            (0.0..=1.0).contains(&self.default_road_condition),
        )?;
        require(
            entity,
            "default_gradient",
            self.default_gradient,
            "greater than -1",
            self.default_gradient > -1.0,
        )?;
        positive(entity, "km_per_degree", self.km_per_degree)?;
        require(
            entity,
            "fuel_price",
            self.fuel_price,
            "non-negative",
            self.fuel_price >= 0.0,
        )?;
        Ok(())
    }

    pub fn default_route(&self) -> RouteSegment {
        RouteSegment {
            road_condition: self.default_road_condition,
            weather_exposure: self.initial_weather,
            gradient: self.default_gradient,
        }
    }

    pub fn cycle_params(&self) -> CycleParams {
        CycleParams {
            dump_site: self.dump_site,
            dump_secs: self.dump_duration_secs.round() as u64,
            breakdown_probability: self.breakdown_probability,
            repair_hours: self.repair_time_hours,
            route_mode: self.route_mode,
            km_per_degree: self.km_per_degree,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TruckConfig {
    pub id: u32,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub max_speed_loaded: Option<f64>,
    #[serde(default)]
    pub max_speed_empty: Option<f64>,
    /// Single speed for both payload states, as flat fleet records carry
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub fuel_consumption_loaded: Option<f64>,
    #[serde(default)]
    pub fuel_consumption_empty: Option<f64>,
    /// Single burn rate for both payload states
    #[serde(default)]
    pub fuel_consumption_rate: Option<f64>,
    pub location: Location,
    pub assigned_excavator: u32,
    #[serde(default)]
    pub maintenance_status: MaintenanceStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExcavatorConfig {
    pub id: u32,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub bucket_capacity: Option<f64>,
    #[serde(default)]
    pub cycle_time_secs: Option<f64>,
    /// Tonnes per minute; stands in for bucket size and cycle time
    #[serde(default)]
    pub loading_rate: Option<f64>,
    #[serde(default)]
    pub fuel_consumption: Option<f64>,
    pub location: Location,
    #[serde(default)]
    pub status: ExcavatorStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub truck_id: u32,
    pub excavator_id: u32,
    #[serde(default)]
    pub road_condition: Option<f64>,
    #[serde(default)]
    pub weather: Option<Weather>,
    #[serde(default)]
    pub gradient: Option<f64>,
}

/// Top-level scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub trucks: Vec<TruckConfig>,
    pub excavators: Vec<ExcavatorConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub engine: EngineConfig,
}

fn pick(
    entity: &str,
    field: &'static str,
    candidates: &[Option<f64>],
) -> std::result::Result<f64, ConfigError> {
    candidates
        .iter()
        .flatten()
        .copied()
        .next()
        .ok_or_else(|| ConfigError::MissingField {
            entity: entity.to_string(),
            field,
        })
}

impl TruckConfig {
    pub fn build(&self) -> std::result::Result<Truck, ConfigError> {
        let entity = TruckId(self.id).to_string();
        let preset = match &self.model {
            Some(model) => Some(truck_spec(model).ok_or_else(|| ConfigError::UnknownModel {
                entity: entity.clone(),
                model: model.clone(),
            })?),
            None => None,
        };

        let capacity = pick(&entity, "capacity", &[self.capacity, preset.map(|p| p.capacity)])?;
        let max_speed_loaded = pick(
            &entity,
            "max_speed_loaded",
            &[self.max_speed_loaded, self.speed, preset.map(|p| p.max_speed_loaded)],
        )?;
        let max_speed_empty = pick(
            &entity,
            "max_speed_empty",
            &[self.max_speed_empty, self.speed, preset.map(|p| p.max_speed_empty)],
        )?;
        let fuel_consumption_loaded = pick(
            &entity,
            "fuel_consumption_loaded",
            &[
                self.fuel_consumption_loaded,
                self.fuel_consumption_rate,
                preset.map(|p| p.fuel_consumption_loaded),
            ],
        )?;
        let fuel_consumption_empty = pick(
            &entity,
            "fuel_consumption_empty",
            &[
                self.fuel_consumption_empty,
                self.fuel_consumption_rate,
                preset.map(|p| p.fuel_consumption_empty),
            ],
        )?;

        let truck = Truck {
            id: TruckId(self.id),
            model: self.model.clone(),
            capacity,
            max_speed_loaded,
            max_speed_empty,
            fuel_consumption_loaded,
            fuel_consumption_empty,
            current_load: 0.0,
            location: self.location,
            assigned_excavator: ExcavatorId(self.assigned_excavator),
            maintenance_status: self.maintenance_status,
        };
        truck.validate()?;
        Ok(truck)
    }
}

impl ExcavatorConfig {
    pub fn build(&self) -> std::result::Result<Excavator, ConfigError> {
        let entity = ExcavatorId(self.id).to_string();
        let preset = match &self.model {
            Some(model) => Some(loader_spec(model).ok_or_else(|| ConfigError::UnknownModel {
                entity: entity.clone(),
                model: model.clone(),
            })?),
            None => None,
        };

        // A loading rate in t/min is one "bucket" of that size per minute
        let bucket_capacity = pick(
            &entity,
            "bucket_capacity",
            &[self.bucket_capacity, self.loading_rate, preset.map(|p| p.bucket_capacity)],
        )?;
        let rate_cycle = self.loading_rate.map(|_| 60.0);
        let cycle_time_secs = pick(
            &entity,
            "cycle_time_secs",
            &[self.cycle_time_secs, rate_cycle, preset.map(|p| p.cycle_time_secs)],
        )?;
        let fuel_consumption = self
            .fuel_consumption
            .or(preset.map(|p| p.fuel_consumption))
            .unwrap_or(0.0);

        let excavator = Excavator {
            id: ExcavatorId(self.id),
            model: self.model.clone(),
            bucket_capacity,
            cycle_time_secs,
            fuel_consumption,
            location: self.location,
            status: self.status,
        };
        excavator.validate()?;
        Ok(excavator)
    }
}

impl RouteConfig {
    pub fn build(&self, engine: &EngineConfig) -> std::result::Result<(RouteKey, RouteSegment), ConfigError> {
        let key = RouteKey::new(TruckId(self.truck_id), ExcavatorId(self.excavator_id));
        let defaults = engine.default_route();
        let segment = RouteSegment {
            road_condition: self.road_condition.unwrap_or(defaults.road_condition),
            weather_exposure: self.weather.unwrap_or(defaults.weather_exposure),
            gradient: self.gradient.unwrap_or(defaults.gradient),
        };
        segment.validate(&key)?;
        Ok((key, segment))
    }
}

impl ScenarioConfig {
    /// Turn the raw file into engine inputs, checking every record
    pub fn build(&self) -> std::result::Result<(Scenario, EngineConfig), ConfigError> {
        self.engine.validate()?;

        let mut seen = HashSet::new();
        let mut excavators = Vec::with_capacity(self.excavators.len());
        for cfg in &self.excavators {
            if !seen.insert(cfg.id) {
                return Err(ConfigError::DuplicateId {
                    kind: "excavator",
                    id: cfg.id,
                });
            }
            excavators.push(cfg.build()?);
        }

        let mut seen = HashSet::new();
        let mut trucks = Vec::with_capacity(self.trucks.len());
        for cfg in &self.trucks {
            if !seen.insert(cfg.id) {
                return Err(ConfigError::DuplicateId {
                    kind: "truck",
                    id: cfg.id,
                });
            }
            trucks.push(cfg.build()?);
        }

        let routes = self
            .routes
            .iter()
            .map(|route| route.build(&self.engine))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let scenario = Scenario {
            trucks,
            excavators,
            routes,
        };
        scenario.validate()?;
        Ok((scenario, self.engine.clone()))
    }
}

/// Read and build a scenario file
pub fn load_scenario(path: &Path) -> Result<(Scenario, EngineConfig)> {
    info!(path = %path.display(), "loading scenario");
    let contents = fs::read_to_string(path)?;
    let config: ScenarioConfig = serde_json::from_str(&contents)?;
    let built = config.build()?;
    info!(
        trucks = built.0.trucks.len(),
        excavators = built.0.excavators.len(),
        routes = built.0.routes.len(),
        "scenario loaded"
    );
    Ok(built)
}
