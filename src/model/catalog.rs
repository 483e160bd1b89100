//! Equipment presets for common haul trucks and loading units
//!
//! Scenario files can name a model instead of spelling out every
//! performance figure; explicit fields still override the preset.

/// Performance figures for a loading unit model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderSpec {
    pub model: &'static str,
    pub kind: LoaderKind,
    /// Tonnes per bucket pass
    pub bucket_capacity: f64,
    /// Seconds per bucket pass
    pub cycle_time_secs: f64,
    pub maintenance_interval_hours: u32,
    /// L/h
    pub fuel_consumption: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    Excavator,
    FaceShovel,
    WheelLoader,
}

/// Performance figures for a haul truck model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruckSpec {
    pub model: &'static str,
    /// Rated payload in tonnes
    pub capacity: f64,
    pub empty_weight: f64,
    pub max_speed_loaded: f64,
    pub max_speed_empty: f64,
    /// L/km
    pub fuel_consumption_loaded: f64,
    /// L/km
    pub fuel_consumption_empty: f64,
    pub maintenance_interval_hours: u32,
}

const fn loader(
    model: &'static str,
    kind: LoaderKind,
    bucket_capacity: f64,
    cycle_time_secs: f64,
    maintenance_interval_hours: u32,
    fuel_consumption: f64,
) -> LoaderSpec {
    LoaderSpec {
        model,
        kind,
        bucket_capacity,
        cycle_time_secs,
        maintenance_interval_hours,
        fuel_consumption,
    }
}

#[allow(clippy::too_many_arguments)]
const fn truck(
    model: &'static str,
    capacity: f64,
    empty_weight: f64,
    max_speed_loaded: f64,
    max_speed_empty: f64,
    fuel_consumption_loaded: f64,
    fuel_consumption_empty: f64,
    maintenance_interval_hours: u32,
) -> TruckSpec {
    TruckSpec {
        model,
        capacity,
        empty_weight,
        max_speed_loaded,
        max_speed_empty,
        fuel_consumption_loaded,
        fuel_consumption_empty,
        maintenance_interval_hours,
    }
}

pub const LOADERS: &[LoaderSpec] = &[
    loader("CAT 336", LoaderKind::Excavator, 2.5, 25.0, 250, 28.0),
    loader("CAT 349", LoaderKind::Excavator, 3.5, 28.0, 250, 35.0),
    loader("CAT 395", LoaderKind::Excavator, 6.0, 32.0, 250, 45.0),
    loader("CAT 870", LoaderKind::Excavator, 7.5, 35.0, 300, 52.0),
    loader("CAT 2600", LoaderKind::Excavator, 15.0, 40.0, 350, 85.0),
    loader("CAT 2500", LoaderKind::FaceShovel, 13.0, 38.0, 300, 75.0),
    loader("CAT 3600", LoaderKind::FaceShovel, 20.0, 45.0, 400, 110.0),
    loader("CAT 966", LoaderKind::WheelLoader, 4.0, 45.0, 200, 25.0),
    loader("CAT 992", LoaderKind::WheelLoader, 12.0, 55.0, 200, 55.0),
    loader("CAT 993", LoaderKind::WheelLoader, 14.5, 58.0, 250, 65.0),
    loader("CAT 994", LoaderKind::WheelLoader, 19.0, 62.0, 300, 85.0),
];

pub const TRUCKS: &[TruckSpec] = &[
    truck("Bell B30E", 28.0, 22.7, 40.0, 50.0, 0.85, 0.55, 250),
    truck("Bell B45E", 41.0, 32.5, 35.0, 45.0, 1.0, 0.65, 250),
    truck("CAT 777E", 100.0, 64.0, 30.0, 40.0, 1.4, 0.9, 300),
    truck("CAT 785D", 140.0, 87.0, 25.0, 35.0, 1.8, 1.1, 300),
    truck("CAT 789C", 177.0, 98.0, 23.0, 33.0, 2.0, 1.3, 350),
    truck("CAT 789D", 181.0, 99.0, 23.0, 33.0, 2.1, 1.35, 350),
    truck("CAT 793C", 218.0, 123.0, 21.0, 31.0, 2.4, 1.6, 400),
    truck("CAT 793D", 227.0, 125.0, 21.0, 31.0, 2.5, 1.65, 400),
];

/// Look up a loading unit by model name (case-insensitive)
pub fn loader_spec(model: &str) -> Option<&'static LoaderSpec> {
    LOADERS
        .iter()
        .find(|spec| spec.model.eq_ignore_ascii_case(model.trim()))
}

/// Look up a haul truck by model name (case-insensitive)
pub fn truck_spec(model: &str) -> Option<&'static TruckSpec> {
    TRUCKS
        .iter()
        .find(|spec| spec.model.eq_ignore_ascii_case(model.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_presets_ignoring_case() {
        let spec = truck_spec("cat 785d").unwrap();
        assert_eq!(spec.capacity, 140.0);
        assert_eq!(spec.max_speed_empty, 35.0);

        let spec = loader_spec(" CAT 994 ").unwrap();
        assert_eq!(spec.kind, LoaderKind::WheelLoader);
        assert_eq!(spec.bucket_capacity, 19.0);
    }

    #[test]
    fn unknown_models_are_none() {
        assert!(truck_spec("Komatsu 930E").is_none());
        assert!(loader_spec("").is_none());
    }

    #[test]
    fn loaded_speed_never_exceeds_empty_speed() {
        for spec in TRUCKS {
            assert!(spec.max_speed_loaded < spec.max_speed_empty, "{}", spec.model);
            assert!(spec.fuel_consumption_loaded > spec.fuel_consumption_empty);
        }
    }
}
