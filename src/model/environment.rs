/// Environmental conditions that stretch or shrink travel times
///
/// Three independent multiplicative speed factors, each in (0, 1]:
/// - road: step function of the continuous road condition
/// - weather: lookup by current weather regime
/// - gradient: asymmetric, uphill costs more than downhill
///
/// The factor functions are pure. The mutable parts (current weather and
/// the per-route condition table) live in `Environment` and only change
/// inside the weather and degradation background processes.
use std::collections::BTreeMap;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::equipment::{ExcavatorId, TruckId};
use crate::config::require;
use crate::error::ConfigError;

/// Weather regimes, ordered from mildest to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Clear,
    LightRain,
    HeavyRain,
    Fog,
    Storm,
}

impl Weather {
    pub const ALL: [Weather; 5] = [
        Weather::Clear,
        Weather::LightRain,
        Weather::HeavyRain,
        Weather::Fog,
        Weather::Storm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Clear => "clear",
            Weather::LightRain => "light_rain",
            Weather::HeavyRain => "heavy_rain",
            Weather::Fog => "fog",
            Weather::Storm => "storm",
        }
    }

    /// Speed multiplier, strictly decreasing with severity
    pub fn speed_factor(&self) -> f64 {
        match self {
            Weather::Clear => 1.0,
            Weather::LightRain => 0.9,
            Weather::HeavyRain => 0.7,
            Weather::Fog => 0.6,
            Weather::Storm => 0.4,
        }
    }

    /// Road wear multiplier; 1.0 in clear weather
    pub fn severity(&self) -> f64 {
        1.0 / self.speed_factor()
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality grade of a haul road
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoadGrade {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl RoadGrade {
    /// Bucket a continuous condition in [0, 1] into a grade
    pub fn from_condition(condition: f64) -> Self {
        if condition >= 0.9 {
            RoadGrade::Excellent
        } else if condition >= 0.75 {
            RoadGrade::Good
        } else if condition >= 0.5 {
            RoadGrade::Fair
        } else if condition >= 0.3 {
            RoadGrade::Poor
        } else {
            RoadGrade::VeryPoor
        }
    }

    pub fn speed_factor(&self) -> f64 {
        match self {
            RoadGrade::Excellent => 1.0,
            RoadGrade::Good => 0.9,
            RoadGrade::Fair => 0.75,
            RoadGrade::Poor => 0.6,
            RoadGrade::VeryPoor => 0.4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoadGrade::Excellent => "excellent",
            RoadGrade::Good => "good",
            RoadGrade::Fair => "fair",
            RoadGrade::Poor => "poor",
            RoadGrade::VeryPoor => "very_poor",
        }
    }
}

pub fn road_factor(condition: f64) -> f64 {
    RoadGrade::from_condition(condition).speed_factor()
}

pub fn weather_factor(weather: Weather) -> f64 {
    weather.speed_factor()
}

/// Speed multiplier for a grade given as a decimal (0.08 = 8% uphill)
pub fn gradient_factor(gradient: f64) -> f64 {
    if gradient > 0.0 {
        1.0 / (1.0 + gradient * 2.0)
    } else {
        1.0 / (1.0 - gradient)
    }
}

/// Base speed scaled by the product of the three environmental factors
pub fn effective_speed(base_speed: f64, road_condition: f64, weather: Weather, gradient: f64) -> f64 {
    base_speed * road_factor(road_condition) * weather_factor(weather) * gradient_factor(gradient)
}

/// Which haul road a truck uses to reach its excavator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub truck: TruckId,
    pub excavator: ExcavatorId,
}

impl RouteKey {
    pub fn new(truck: TruckId, excavator: ExcavatorId) -> Self {
        RouteKey { truck, excavator }
    }
}

/// Characteristics of one haul road
///
/// `gradient` is the grade in the loaded direction (toward the dump);
/// the empty run back to the excavator sees the negated grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub road_condition: f64,
    pub weather_exposure: Weather,
    pub gradient: f64,
}

impl RouteSegment {
    pub fn validate(&self, key: &RouteKey) -> Result<(), ConfigError> {
        let entity = format!("route {} -> {}", key.truck, key.excavator);
        require(
            &entity,
            "road_condition",
            self.road_condition,
            "within [0, 1]",
            (0.0..=1.0).contains(&self.road_condition),
        )?;
        require(
            &entity,
            "gradient",
            self.gradient,
            "greater than -1",
            self.gradient > -1.0,
        )
    }

    /// Grade seen when travelling toward the dump (`loaded`) or back
    pub fn gradient_for(&self, toward_dump: bool) -> f64 {
        if toward_dump {
            self.gradient
        } else {
            -self.gradient
        }
    }
}

/// How a truck reads route conditions during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMode {
    /// Conditions captured once at run start and held fixed
    Snapshot,
    /// Live degrading table and current weather read at each departure
    #[default]
    Live,
}

/// Shared per-route road condition table
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    segments: BTreeMap<RouteKey, RouteSegment>,
    floor: f64,
    default_segment: RouteSegment,
}

impl RoadNetwork {
    pub fn new(floor: f64, default_segment: RouteSegment) -> Self {
        RoadNetwork {
            segments: BTreeMap::new(),
            floor,
            default_segment,
        }
    }

    pub fn insert(&mut self, key: RouteKey, segment: RouteSegment) {
        let segment = RouteSegment {
            road_condition: segment.road_condition.clamp(self.floor, 1.0),
            ..segment
        };
        self.segments.insert(key, segment);
    }

    /// Start tracking a route, seeding it from the defaults if unknown
    pub fn track(&mut self, key: RouteKey) {
        if !self.segments.contains_key(&key) {
            self.insert(key, self.default_segment);
        }
    }

    pub fn segment(&self, key: &RouteKey) -> RouteSegment {
        self.segments.get(key).copied().unwrap_or(self.default_segment)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RouteKey, &RouteSegment)> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Wear every tracked road by `rate` scaled by weather severity
    ///
    /// Conditions never rise and never drop below the floor.
    pub fn degrade(&mut self, rate: f64, weather: Weather) {
        let wear = rate * weather.severity();
        for segment in self.segments.values_mut() {
            segment.road_condition = (segment.road_condition - wear).max(self.floor);
        }
    }

    pub fn mean_condition(&self) -> f64 {
        if self.segments.is_empty() {
            return self.default_segment.road_condition;
        }
        let total: f64 = self.segments.values().map(|s| s.road_condition).sum();
        total / self.segments.len() as f64
    }
}

/// Mutable environmental state for one run
#[derive(Debug, Clone)]
pub struct Environment {
    pub weather: Weather,
    pub network: RoadNetwork,
}

impl Environment {
    pub fn new(weather: Weather, network: RoadNetwork) -> Self {
        Environment { weather, network }
    }

    /// Draw the next weather regime uniformly from `regimes`
    pub fn change_weather<R: Rng>(&mut self, rng: &mut R, regimes: &[Weather]) -> Weather {
        if let Some(next) = regimes.choose(rng) {
            self.weather = *next;
        }
        self.weather
    }

    /// Conditions a truck sees when departing now on `key`
    ///
    /// In snapshot mode `captured` holds the run-start copy of the route
    /// and weather is the route's recorded exposure.
    pub fn conditions(
        &self,
        key: &RouteKey,
        mode: RouteMode,
        captured: Option<&RouteSegment>,
    ) -> RouteSegment {
        match (mode, captured) {
            (RouteMode::Snapshot, Some(segment)) => *segment,
            _ => RouteSegment {
                weather_exposure: self.weather,
                ..self.network.segment(key)
            },
        }
    }
}
