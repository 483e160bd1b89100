/// Mine simulation - how trucks, excavators and the environment run together
///
/// This module ties the pieces into a run:
/// - an arena of trucks and excavators with id -> index maps
/// - one FIFO admission pool per excavator
/// - the truck processes plus the weather and road degradation processes
/// - a single seeded generator threaded through every random draw
///
/// `run` always starts from the initial records, so identical inputs and
/// seed give identical event logs no matter how often it is called.
use std::collections::{BTreeMap, HashMap, HashSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::environment::{Environment, RoadNetwork, RouteKey, RouteMode, RouteSegment, Weather};
use super::equipment::{
    Excavator, ExcavatorId, ExcavatorStatus, Location, MaintenanceStatus, Truck, TruckId,
};
use super::event_log::{Entity, EventKind, EventLog};
use super::haul_cycle::{CycleContext, CycleParams, TruckPhase, TruckProcess};
use super::resource::ResourcePool;
use super::time::{hours_to_secs, Scheduler, SimulationTime};
use crate::config::EngineConfig;
use crate::error::{ConfigError, Error, Result};

/// Every suspendable unit the scheduler can resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessId {
    /// Haul cycle of the truck at this arena index
    Truck(usize),
    Weather,
    Degradation,
}

/// Initial records a run starts from
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub trucks: Vec<Truck>,
    pub excavators: Vec<Excavator>,
    /// Optional precomputed route records per truck-excavator pair
    pub routes: Vec<(RouteKey, RouteSegment)>,
}

impl Scenario {
    /// Check every record is usable, ids are unique and every assignment
    /// and route points somewhere
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let mut excavators = HashSet::new();
        for excavator in &self.excavators {
            excavator.validate()?;
            if !excavators.insert(excavator.id) {
                return Err(ConfigError::DuplicateId {
                    kind: "excavator",
                    id: excavator.id.0,
                });
            }
        }
        let mut trucks = HashSet::new();
        for truck in &self.trucks {
            truck.validate()?;
            if !trucks.insert(truck.id) {
                return Err(ConfigError::DuplicateId {
                    kind: "truck",
                    id: truck.id.0,
                });
            }
            if !excavators.contains(&truck.assigned_excavator) {
                return Err(ConfigError::UnknownAssignment {
                    truck: truck.id,
                    excavator: truck.assigned_excavator,
                });
            }
        }
        for (key, segment) in &self.routes {
            segment.validate(key)?;
            if !trucks.contains(&key.truck) {
                return Err(ConfigError::UnknownRouteEndpoint(key.truck.to_string()));
            }
            if !excavators.contains(&key.excavator) {
                return Err(ConfigError::UnknownRouteEndpoint(key.excavator.to_string()));
            }
        }
        Ok(())
    }

    pub fn assignments(&self) -> BTreeMap<TruckId, ExcavatorId> {
        self.trucks
            .iter()
            .map(|truck| (truck.id, truck.assigned_excavator))
            .collect()
    }
}

/// Reject a truck -> excavator mapping that overloads any excavator
///
/// The engine itself never calls this; an over-assigned excavator just
/// builds a longer queue. Optimizers that need a hard limit check first.
pub fn validate_assignment(
    assignment: &BTreeMap<TruckId, ExcavatorId>,
    capacity: usize,
) -> Result<()> {
    let mut counts: BTreeMap<ExcavatorId, usize> = BTreeMap::new();
    for excavator in assignment.values() {
        *counts.entry(*excavator).or_default() += 1;
    }
    match counts.into_iter().find(|(_, assigned)| *assigned > capacity) {
        Some((excavator, assigned)) => Err(Error::InvalidAssignment {
            excavator,
            assigned,
            capacity,
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TruckSnapshot {
    pub id: TruckId,
    pub location: Location,
    pub current_load: f64,
    pub capacity: f64,
    pub mean_fuel_rate: f64,
    pub assigned_excavator: ExcavatorId,
    pub maintenance_status: MaintenanceStatus,
    pub phase: TruckPhase,
    pub cycles_completed: u32,
    pub breakdowns: u32,
    pub tonnes_hauled: f64,
    pub queue_hours: f64,
    pub distance_km: f64,
    pub fuel_litres: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExcavatorSnapshot {
    pub id: ExcavatorId,
    pub location: Location,
    pub status: ExcavatorStatus,
    pub capacity: usize,
    pub in_service: usize,
    /// Derived from the pool, which is authoritative
    pub queue_depth: usize,
    pub peak_queue: usize,
    pub admissions: u64,
}

/// Point-in-time view of a run for viewers
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub time_hours: f64,
    pub weather: Weather,
    pub mean_road_condition: f64,
    pub trucks: Vec<TruckSnapshot>,
    pub excavators: Vec<ExcavatorSnapshot>,
}

/// Complete haul simulation
pub struct Simulation {
    scenario: Scenario,
    config: EngineConfig,
    params: CycleParams,
    truck_index: HashMap<TruckId, usize>,
    excavator_index: HashMap<ExcavatorId, usize>,

    scheduler: Scheduler<ProcessId>,
    trucks: Vec<Truck>,
    processes: Vec<TruckProcess>,
    pools: Vec<ResourcePool<ProcessId>>,
    environment: Environment,
    log: EventLog,
    rng: ChaCha8Rng,
    started: bool,
}

impl Simulation {
    pub fn new(scenario: Scenario, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        scenario.validate()?;

        let truck_index = scenario
            .trucks
            .iter()
            .enumerate()
            .map(|(index, truck)| (truck.id, index))
            .collect();
        let excavator_index = scenario
            .excavators
            .iter()
            .enumerate()
            .map(|(index, excavator)| (excavator.id, index))
            .collect();
        let environment = Environment::new(
            config.initial_weather,
            RoadNetwork::new(config.road_condition_floor, config.default_route()),
        );

        let mut simulation = Simulation {
            params: config.cycle_params(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            scenario,
            config,
            truck_index,
            excavator_index,
            scheduler: Scheduler::new(),
            trucks: Vec::new(),
            processes: Vec::new(),
            pools: Vec::new(),
            environment,
            log: EventLog::new(),
            started: false,
        };
        simulation.reset();
        Ok(simulation)
    }

    /// Restore the initial records, fresh pools, roads and generator
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.log.clear();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.trucks = self.scenario.trucks.clone();
        self.pools = self
            .scenario
            .excavators
            .iter()
            .map(|_| ResourcePool::new(self.config.max_trucks_per_excavator))
            .collect();

        let mut network = RoadNetwork::new(
            self.config.road_condition_floor,
            self.config.default_route(),
        );
        for (key, segment) in &self.scenario.routes {
            network.insert(*key, *segment);
        }
        for truck in &self.trucks {
            network.track(RouteKey::new(truck.id, truck.assigned_excavator));
        }
        self.environment = Environment::new(self.config.initial_weather, network);

        let snapshot_routes = self.config.route_mode == RouteMode::Snapshot;
        self.processes = self
            .trucks
            .iter()
            .enumerate()
            .map(|(index, truck)| {
                let captured = snapshot_routes.then(|| {
                    self.environment
                        .network
                        .segment(&RouteKey::new(truck.id, truck.assigned_excavator))
                });
                TruckProcess::new(index, captured)
            })
            .collect();
        self.started = false;
    }

    /// Queue every process at time zero: trucks in fleet order, then the
    /// weather and degradation processes after their first interval
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        for index in 0..self.trucks.len() {
            self.scheduler.schedule_immediate(ProcessId::Truck(index));
        }
        self.scheduler.schedule(
            hours_to_secs(self.config.weather_interval_hours),
            ProcessId::Weather,
        );
        self.scheduler.schedule(
            hours_to_secs(self.config.degradation_interval_hours),
            ProcessId::Degradation,
        );
        self.started = true;
    }

    /// Run every resumption due by `target`, starting the run if needed
    pub fn advance_until(&mut self, target: SimulationTime) -> usize {
        self.start();

        let weather_secs = hours_to_secs(self.config.weather_interval_hours);
        let degradation_secs = hours_to_secs(self.config.degradation_interval_hours);
        let Simulation {
            scenario,
            config,
            params,
            excavator_index,
            scheduler,
            trucks,
            processes,
            pools,
            environment,
            log,
            rng,
            ..
        } = self;

        scheduler.advance_until(target, |scheduler, unit| match unit {
            ProcessId::Truck(index) => {
                let truck = &mut trucks[index];
                // Assignments are checked by `new` and `assign`
                let Some(&slot) = excavator_index.get(&truck.assigned_excavator) else {
                    warn!(
                        truck = %truck.id,
                        excavator = %truck.assigned_excavator,
                        "assigned excavator missing, truck parked"
                    );
                    return;
                };
                processes[index].resume(CycleContext {
                    truck,
                    excavator: &scenario.excavators[slot],
                    pool: &mut pools[slot],
                    environment: &*environment,
                    scheduler,
                    log: &mut *log,
                    rng: &mut *rng,
                    params: &*params,
                });
            }
            ProcessId::Weather => {
                let weather = environment.change_weather(&mut *rng, &config.weather_regimes);
                log.push(Entity::Environment, EventKind::WeatherChanged, scheduler.now());
                debug!(%weather, secs = scheduler.now().as_secs(), "weather changed");
                scheduler.schedule(weather_secs, ProcessId::Weather);
            }
            ProcessId::Degradation => {
                environment
                    .network
                    .degrade(config.degradation_rate, environment.weather);
                scheduler.schedule(degradation_secs, ProcessId::Degradation);
            }
        })
    }

    /// Run from the initial records for `duration_hours` of simulated time
    ///
    /// Units still mid-wait at the horizon are abandoned in place.
    pub fn run(&mut self, duration_hours: f64) -> EventLog {
        self.reset();
        info!(
            trucks = self.trucks.len(),
            excavators = self.scenario.excavators.len(),
            duration_hours,
            seed = self.config.seed,
            "starting run"
        );
        let resumed = self.advance_until(SimulationTime::from_hours(duration_hours));
        info!(resumed, events = self.log.len(), "run finished");
        self.log.clone()
    }

    /// Point a truck at another excavator for the next run
    ///
    /// Only the initial records change; a run in progress keeps its
    /// assignment until `reset` or `run`.
    pub fn assign(&mut self, truck: TruckId, excavator: ExcavatorId) -> Result<()> {
        let index = *self
            .truck_index
            .get(&truck)
            .ok_or(Error::UnknownTruck(truck))?;
        if !self.excavator_index.contains_key(&excavator) {
            return Err(Error::UnknownExcavator(excavator));
        }
        self.scenario.trucks[index].assigned_excavator = excavator;
        Ok(())
    }

    /// Apply a whole mapping; stops at the first unknown id
    pub fn assign_all(&mut self, assignment: &BTreeMap<TruckId, ExcavatorId>) -> Result<()> {
        for (truck, excavator) in assignment {
            self.assign(*truck, *excavator)?;
        }
        Ok(())
    }

    pub fn assignments(&self) -> BTreeMap<TruckId, ExcavatorId> {
        self.scenario.assignments()
    }

    pub fn snapshot(&self) -> Snapshot {
        let trucks = self
            .trucks
            .iter()
            .zip(&self.processes)
            .map(|(truck, process)| TruckSnapshot {
                id: truck.id,
                location: truck.location,
                current_load: truck.current_load,
                capacity: truck.capacity,
                mean_fuel_rate: truck.mean_fuel_rate(),
                assigned_excavator: truck.assigned_excavator,
                maintenance_status: truck.maintenance_status,
                phase: process.phase,
                cycles_completed: process.cycles_completed,
                breakdowns: process.breakdowns,
                tonnes_hauled: process.tonnes_hauled,
                queue_hours: SimulationTime::new(process.queue_secs).as_hours(),
                distance_km: process.distance_km,
                fuel_litres: process.fuel_litres,
            })
            .collect();
        let excavators = self
            .scenario
            .excavators
            .iter()
            .zip(&self.pools)
            .map(|(excavator, pool)| ExcavatorSnapshot {
                id: excavator.id,
                location: excavator.location,
                status: excavator.status,
                capacity: pool.capacity(),
                in_service: pool.in_service(),
                queue_depth: pool.queue_len(),
                peak_queue: pool.peak_queue(),
                admissions: pool.admissions(),
            })
            .collect();

        Snapshot {
            time_hours: self.scheduler.now().as_hours(),
            weather: self.environment.weather,
            mean_road_condition: self.environment.network.mean_condition(),
            trucks,
            excavators,
        }
    }

    pub fn now(&self) -> SimulationTime {
        self.scheduler.now()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn trucks(&self) -> &[Truck] {
        &self.trucks
    }

    pub fn truck(&self, id: TruckId) -> Option<&Truck> {
        self.truck_index.get(&id).map(|&index| &self.trucks[index])
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn pool(&self, id: ExcavatorId) -> Option<&ResourcePool<ProcessId>> {
        self.excavator_index.get(&id).map(|&index| &self.pools[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::equipment::tests::{excavator, truck};

    /// Trucks start at the dump site (origin); excavators sit 5-10 km away
    fn scenario(trucks: &[(u32, u32)], excavators: u32) -> Scenario {
        Scenario {
            trucks: trucks.iter().map(|&(id, exc)| truck(id, exc)).collect(),
            excavators: (1..=excavators)
                .map(|id| excavator(id, Location::new(0.05 * id as f64, 0.0)))
                .collect(),
            routes: Vec::new(),
        }
    }

    fn calm(capacity: usize) -> EngineConfig {
        EngineConfig {
            seed: 11,
            max_trucks_per_excavator: capacity,
            dump_site: Location::new(0.0, 0.0),
            breakdown_probability: 0.0,
            weather_regimes: vec![Weather::Clear],
            degradation_rate: 0.0,
            km_per_degree: 100.0,
            ..EngineConfig::default()
        }
    }

    fn truck_kinds(log: &EventLog, id: u32) -> Vec<EventKind> {
        log.for_truck(TruckId(id)).map(|r| r.kind).collect()
    }

    fn times_of(log: &EventLog, id: u32, kind: EventKind) -> Vec<SimulationTime> {
        log.for_truck(TruckId(id))
            .filter(|r| r.kind == kind)
            .map(|r| r.time)
            .collect()
    }

    #[test]
    fn single_truck_cycle_sequence() {
        let mut sim = Simulation::new(scenario(&[(1, 1)], 1), calm(1)).unwrap();
        let log = sim.run(2.0);

        let kinds = truck_kinds(&log, 1);
        assert_eq!(
            &kinds[..6],
            &[
                EventKind::TravelingToShovel,
                EventKind::QueuingAtShovel,
                EventKind::Loading,
                EventKind::TravelingToDump,
                EventKind::Dumping,
                EventKind::TravelingToShovel,
            ]
        );
        // 5 km at 40 km/h, then 7 passes of 40 s
        let times: Vec<u64> = log.for_truck(TruckId(1)).map(|r| r.time.as_secs()).take(5).collect();
        assert_eq!(times, vec![0, 450, 450, 730, 1330]);
    }

    #[test]
    fn second_truck_loads_after_first_releases() {
        let mut sim = Simulation::new(scenario(&[(1, 1), (2, 1)], 1), calm(1)).unwrap();
        let log = sim.run(1.0);

        let first_release = times_of(&log, 1, EventKind::TravelingToDump)[0];
        let second_loading = times_of(&log, 2, EventKind::Loading)[0];
        assert!(second_loading >= first_release);
        // Both queued at the same instant; truck 1 requested first
        assert_eq!(
            times_of(&log, 1, EventKind::QueuingAtShovel)[0],
            times_of(&log, 2, EventKind::QueuingAtShovel)[0]
        );
        assert!(times_of(&log, 1, EventKind::Loading)[0] < second_loading);
    }

    #[test]
    fn no_loading_without_arrival() {
        let config = EngineConfig {
            breakdown_probability: 0.3,
            repair_time_hours: (0.1, 0.4),
            ..calm(2)
        };
        let fleet: Vec<(u32, u32)> = (1..=8).map(|id| (id, 1 + id % 2)).collect();
        let mut sim = Simulation::new(scenario(&fleet, 2), config).unwrap();
        let log = sim.run(12.0);

        for (id, _) in &fleet {
            let arrivals = log.count_for(TruckId(*id), EventKind::TravelingToShovel);
            let loads = log.count_for(TruckId(*id), EventKind::Loading);
            assert!(loads <= arrivals, "truck {id}: {loads} loads, {arrivals} trips");
            assert!(loads > 0);
        }
    }

    #[test]
    fn admitted_trucks_never_exceed_capacity() {
        let fleet: Vec<(u32, u32)> = (1..=6).map(|id| (id, 1)).collect();
        let mut sim = Simulation::new(scenario(&fleet, 1), calm(2)).unwrap();
        let log = sim.run(8.0);

        // Service interval of each load: loading -> traveling_to_dump
        let mut edges: Vec<(SimulationTime, i32)> = Vec::new();
        for (id, _) in &fleet {
            let starts = times_of(&log, *id, EventKind::Loading);
            let ends = times_of(&log, *id, EventKind::TravelingToDump);
            for (i, start) in starts.iter().enumerate() {
                edges.push((*start, 1));
                if let Some(end) = ends.get(i) {
                    edges.push((*end, -1));
                }
            }
        }
        // Releases sort before admissions at the same instant
        edges.sort();
        let mut in_service = 0;
        for (_, delta) in edges {
            in_service += delta;
            assert!(in_service <= 2);
        }
    }

    #[test]
    fn admission_follows_arrival_order() {
        let fleet: Vec<(u32, u32)> = (1..=5).map(|id| (id, 1)).collect();
        let mut sim = Simulation::new(scenario(&fleet, 1), calm(1)).unwrap();
        let log = sim.run(6.0);

        let arrivals: Vec<TruckId> = log
            .iter()
            .filter(|r| r.kind == EventKind::QueuingAtShovel)
            .filter_map(|r| match r.entity {
                Entity::Truck(id) => Some(id),
                Entity::Environment => None,
            })
            .collect();
        let admissions: Vec<TruckId> = log
            .iter()
            .filter(|r| r.kind == EventKind::Loading)
            .filter_map(|r| match r.entity {
                Entity::Truck(id) => Some(id),
                Entity::Environment => None,
            })
            .collect();

        assert!(admissions.len() > 5);
        assert_eq!(&arrivals[..admissions.len()], &admissions[..]);
    }

    #[test]
    fn load_tracks_the_cycle() {
        let fleet: Vec<(u32, u32)> = (1..=4).map(|id| (id, 1)).collect();
        let config = EngineConfig {
            breakdown_probability: 0.2,
            repair_time_hours: (0.1, 0.3),
            ..calm(2)
        };
        let mut sim = Simulation::new(scenario(&fleet, 1), config).unwrap();
        sim.reset();

        for minute in 0..(6 * 60) {
            sim.advance_until(SimulationTime::new(minute * 60));
            for truck in sim.trucks() {
                assert!(truck.current_load <= truck.capacity);
                let last = sim.log().for_truck(truck.id).last().map(|r| r.kind);
                match last {
                    Some(EventKind::TravelingToDump) | Some(EventKind::Dumping) => {
                        assert_eq!(truck.current_load, truck.capacity)
                    }
                    _ => assert_eq!(truck.current_load, 0.0),
                }
            }
        }
    }

    #[test]
    fn identical_inputs_give_identical_logs() {
        let fleet: Vec<(u32, u32)> = (1..=6).map(|id| (id, 1 + id % 3)).collect();
        let config = EngineConfig {
            breakdown_probability: 0.1,
            weather_regimes: Weather::ALL.to_vec(),
            degradation_rate: 0.01,
            ..calm(2)
        };

        let mut a = Simulation::new(scenario(&fleet, 3), config.clone()).unwrap();
        let mut b = Simulation::new(scenario(&fleet, 3), config).unwrap();
        let first = a.run(10.0);
        assert_eq!(first, b.run(10.0));
        // Re-running the same instance starts over from the same records
        assert_eq!(first, a.run(10.0));
    }

    #[test]
    fn different_seeds_diverge() {
        let fleet: Vec<(u32, u32)> = (1..=6).map(|id| (id, 1)).collect();
        let config = EngineConfig {
            breakdown_probability: 0.3,
            ..calm(2)
        };
        let mut a = Simulation::new(scenario(&fleet, 1), config.clone()).unwrap();
        let mut b = Simulation::new(
            scenario(&fleet, 1),
            EngineConfig { seed: 12, ..config },
        )
        .unwrap();
        assert_ne!(a.run(10.0), b.run(10.0));
    }

    #[test]
    fn certain_breakdown_precedes_every_trip() {
        let config = EngineConfig {
            breakdown_probability: 1.0,
            repair_time_hours: (0.5, 1.5),
            ..calm(1)
        };
        let mut sim = Simulation::new(scenario(&[(1, 1), (2, 1)], 1), config).unwrap();
        let log = sim.run(24.0);

        for id in [1, 2] {
            let records: Vec<_> = log.for_truck(TruckId(id)).collect();
            let mut trips = 0;
            for (i, record) in records.iter().enumerate() {
                if record.kind != EventKind::TravelingToShovel {
                    continue;
                }
                trips += 1;
                assert!(i >= 2);
                assert_eq!(records[i - 1].kind, EventKind::Repaired);
                assert_eq!(records[i - 2].kind, EventKind::Breakdown);
                let repair = records[i - 2].time.duration_until(records[i - 1].time);
                assert!((1800..=5400).contains(&repair), "repair took {repair}s");
            }
            assert!(trips > 1);
            assert_eq!(records[0].kind, EventKind::Breakdown);
        }
    }

    #[test]
    fn horizon_abandons_units_mid_wait() {
        let mut sim = Simulation::new(scenario(&[(1, 1)], 1), calm(1)).unwrap();
        // Arrival at the shovel is due at 450 s
        let log = sim.run(400.0 / 3600.0);
        assert_eq!(truck_kinds(&log, 1), vec![EventKind::TravelingToShovel]);
        assert_eq!(sim.now().as_secs(), 400);
        assert_eq!(sim.snapshot().trucks[0].phase, TruckPhase::TravelingToShovel);
    }

    #[test]
    fn weather_changes_on_its_interval() {
        let config = EngineConfig {
            weather_regimes: vec![Weather::Fog],
            ..calm(1)
        };
        let mut sim = Simulation::new(scenario(&[], 1), config).unwrap();
        let log = sim.run(5.5);

        let times: Vec<u64> = log
            .iter()
            .filter(|r| r.kind == EventKind::WeatherChanged)
            .map(|r| r.time.as_secs())
            .collect();
        assert_eq!(times, vec![3600, 7200, 10800, 14400, 18000]);
        assert!(log.iter().all(|r| r.entity == Entity::Environment));
        assert_eq!(sim.environment().weather, Weather::Fog);
    }

    #[test]
    fn live_roads_degrade_and_slow_trips() {
        let config = EngineConfig {
            degradation_rate: 0.05,
            degradation_interval_hours: 0.25,
            route_mode: RouteMode::Live,
            ..calm(1)
        };
        let mut sim = Simulation::new(scenario(&[(1, 1)], 1), config).unwrap();
        let log = sim.run(12.0);

        let floor = sim.config().road_condition_floor;
        assert_eq!(sim.snapshot().mean_road_condition, floor);

        let departures = times_of(&log, 1, EventKind::TravelingToShovel);
        let arrivals = times_of(&log, 1, EventKind::QueuingAtShovel);
        let first_trip = departures[0].duration_until(arrivals[0]);
        let last = arrivals.len() - 1;
        let late_trip = departures[last].duration_until(arrivals[last]);
        assert!(late_trip > first_trip);
    }

    #[test]
    fn snapshot_roads_hold_trip_times() {
        let config = EngineConfig {
            degradation_rate: 0.05,
            route_mode: RouteMode::Snapshot,
            ..calm(1)
        };
        let mut sim = Simulation::new(scenario(&[(1, 1)], 1), config).unwrap();
        let log = sim.run(12.0);

        let departures = times_of(&log, 1, EventKind::TravelingToShovel);
        let arrivals = times_of(&log, 1, EventKind::QueuingAtShovel);
        // First departure leaves from the dump, like every later one
        let trips: HashSet<u64> = departures
            .iter()
            .zip(&arrivals)
            .map(|(d, a)| d.duration_until(*a))
            .collect();
        assert_eq!(trips.len(), 1);
    }

    #[test]
    fn precomputed_routes_shape_travel() {
        let mut fleet = scenario(&[(1, 1)], 1);
        fleet.routes.push((
            RouteKey::new(TruckId(1), ExcavatorId(1)),
            RouteSegment {
                road_condition: 0.8,
                weather_exposure: Weather::Clear,
                gradient: 0.0,
            },
        ));
        let mut sim = Simulation::new(fleet, calm(1)).unwrap();
        let log = sim.run(1.0);
        // 5 km at 40 * 0.9 km/h = 500 s
        assert_eq!(times_of(&log, 1, EventKind::QueuingAtShovel)[0].as_secs(), 500);
    }

    #[test]
    fn reassignment_applies_to_next_run() {
        let mut sim = Simulation::new(scenario(&[(1, 1)], 2), calm(1)).unwrap();
        let near = sim.run(1.0);
        sim.assign(TruckId(1), ExcavatorId(2)).unwrap();
        let far = sim.run(1.0);

        assert_eq!(sim.assignments()[&TruckId(1)], ExcavatorId(2));
        assert_eq!(sim.truck(TruckId(1)).unwrap().assigned_excavator, ExcavatorId(2));
        // Excavator 2 is twice as far away
        assert_eq!(times_of(&near, 1, EventKind::QueuingAtShovel)[0].as_secs(), 450);
        assert_eq!(times_of(&far, 1, EventKind::QueuingAtShovel)[0].as_secs(), 900);
    }

    #[test]
    fn assign_rejects_unknown_ids() {
        let mut sim = Simulation::new(scenario(&[(1, 1)], 1), calm(1)).unwrap();
        assert!(matches!(
            sim.assign(TruckId(9), ExcavatorId(1)),
            Err(Error::UnknownTruck(TruckId(9)))
        ));
        assert!(matches!(
            sim.assign(TruckId(1), ExcavatorId(9)),
            Err(Error::UnknownExcavator(ExcavatorId(9)))
        ));
    }

    #[test]
    fn over_assignment_only_lengthens_queues() {
        let fleet: Vec<(u32, u32)> = (1..=5).map(|id| (id, 1)).collect();
        let assignment = scenario(&fleet, 1).assignments();
        assert!(matches!(
            validate_assignment(&assignment, 2),
            Err(Error::InvalidAssignment {
                assigned: 5,
                capacity: 2,
                ..
            })
        ));
        assert!(validate_assignment(&assignment, 5).is_ok());

        // The engine runs it anyway
        let mut sim = Simulation::new(scenario(&fleet, 1), calm(2)).unwrap();
        sim.run(4.0);
        let pool = sim.pool(ExcavatorId(1)).unwrap();
        assert!(pool.peak_queue() > 0);
        assert!(pool.in_service() <= 2);
    }

    #[test]
    fn construction_rejects_bad_scenarios() {
        let bad = scenario(&[(1, 4)], 1);
        assert!(matches!(
            Simulation::new(bad, calm(1)),
            Err(Error::Config(ConfigError::UnknownAssignment { .. }))
        ));

        let mut bad = scenario(&[(1, 1)], 1);
        bad.routes.push((
            RouteKey::new(TruckId(3), ExcavatorId(1)),
            EngineConfig::default().default_route(),
        ));
        assert!(matches!(
            Simulation::new(bad, calm(1)),
            Err(Error::Config(ConfigError::UnknownRouteEndpoint(_)))
        ));

        let mut bad = scenario(&[(1, 1)], 1);
        bad.trucks[0].max_speed_loaded = 0.0;
        bad.trucks[0].max_speed_empty = 0.0;
        assert!(matches!(
            Simulation::new(bad, calm(1)),
            Err(Error::Config(ConfigError::InvalidValue { field: "max_speed_loaded", .. }))
        ));

        let mut bad = scenario(&[(1, 1)], 1);
        bad.excavators[0].bucket_capacity = 0.0;
        assert!(matches!(
            Simulation::new(bad, calm(1)),
            Err(Error::Config(ConfigError::InvalidValue { field: "bucket_capacity", .. }))
        ));

        let mut bad = scenario(&[(1, 1)], 1);
        bad.routes.push((
            RouteKey::new(TruckId(1), ExcavatorId(1)),
            RouteSegment {
                gradient: f64::NAN,
                ..EngineConfig::default().default_route()
            },
        ));
        assert!(matches!(
            Simulation::new(bad, calm(1)),
            Err(Error::Config(ConfigError::InvalidValue { field: "gradient", .. }))
        ));
    }

    #[test]
    fn instant_phases_still_advance_the_clock() {
        // Excavator at the dump, sub-second loading, no dump time
        let mut fast = scenario(&[(1, 1)], 1);
        fast.excavators[0].location = Location::new(0.0, 0.0);
        fast.excavators[0].bucket_capacity = 1000.0;
        fast.excavators[0].cycle_time_secs = 0.4;
        let config = EngineConfig {
            dump_duration_secs: 0.0,
            ..calm(1)
        };
        let mut sim = Simulation::new(fast, config).unwrap();

        let log = sim.run(0.01);
        assert_eq!(sim.now(), SimulationTime::new(36));
        // Each of the four timed phases takes one second
        let dumps = times_of(&log, 1, EventKind::Dumping);
        assert_eq!(
            dumps[..3],
            [
                SimulationTime::new(3),
                SimulationTime::new(7),
                SimulationTime::new(11),
            ]
        );
        // Cycles finish at 4, 8, .. 36 s
        assert_eq!(sim.snapshot().trucks[0].cycles_completed, 9);
    }

    #[test]
    fn snapshot_reports_fleet_state() {
        let fleet: Vec<(u32, u32)> = (1..=3).map(|id| (id, 1)).collect();
        let mut sim = Simulation::new(scenario(&fleet, 1), calm(1)).unwrap();
        sim.reset();
        // All three arrive at 450 s; one loads, two wait
        sim.advance_until(SimulationTime::new(450));

        let snap = sim.snapshot();
        assert_eq!(snap.time_hours, 0.125);
        assert_eq!(snap.excavators[0].in_service, 1);
        assert_eq!(snap.excavators[0].queue_depth, 2);
        let phases: Vec<TruckPhase> = snap.trucks.iter().map(|t| t.phase).collect();
        assert_eq!(
            phases,
            vec![TruckPhase::Loading, TruckPhase::Queuing, TruckPhase::Queuing]
        );
    }
}
