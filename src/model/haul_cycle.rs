//! The per-truck haul cycle state machine
//!
//! A truck loops through five phases for the whole run:
//!
//! ```text
//! travel to shovel -> queue -> load -> travel to dump -> dump -> (repeat)
//! ```
//!
//! Before each cycle a breakdown may be drawn; a broken truck waits out a
//! repair and then goes straight to travelling. Every phase ends either
//! because its duration elapsed (the scheduler resumes the truck) or
//! because the excavator's pool admitted it (the pool wakes the truck).
//! The phase stored on the process says which of these the next
//! resumption completes.
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, trace};

use super::environment::{effective_speed, Environment, RouteKey, RouteMode, RouteSegment};
use super::equipment::{Excavator, Location, MaintenanceStatus, Truck};
use super::event_log::{Entity, EventKind, EventLog};
use super::mine_simulation::ProcessId;
use super::resource::{Admission, ResourcePool};
use super::time::{hours_to_secs, Scheduler, SimulationTime};

/// Shortest wait of any timed phase; zero-length legs would stall the clock
const MIN_PHASE_SECS: u64 = 1;

/// What the truck is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TruckPhase {
    /// Not started yet
    #[default]
    Parked,
    Repairing,
    TravelingToShovel,
    Queuing,
    Loading,
    TravelingToDump,
    Dumping,
}

impl TruckPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruckPhase::Parked => "parked",
            TruckPhase::Repairing => "repairing",
            TruckPhase::TravelingToShovel => "to shovel",
            TruckPhase::Queuing => "queuing",
            TruckPhase::Loading => "loading",
            TruckPhase::TravelingToDump => "to dump",
            TruckPhase::Dumping => "dumping",
        }
    }
}

/// Run-wide constants the cycle needs
#[derive(Debug, Clone)]
pub struct CycleParams {
    pub dump_site: Location,
    pub dump_secs: u64,
    pub breakdown_probability: f64,
    /// Inclusive repair duration range in hours
    pub repair_hours: (f64, f64),
    pub route_mode: RouteMode,
    pub km_per_degree: f64,
}

/// Everything a truck touches while it is being resumed
///
/// Borrowed fresh from the simulation on every resumption; the process
/// itself only owns its phase and counters.
pub struct CycleContext<'a> {
    pub truck: &'a mut Truck,
    pub excavator: &'a Excavator,
    pub pool: &'a mut ResourcePool<ProcessId>,
    pub environment: &'a Environment,
    pub scheduler: &'a mut Scheduler<ProcessId>,
    pub log: &'a mut EventLog,
    pub rng: &'a mut ChaCha8Rng,
    pub params: &'a CycleParams,
}

impl CycleContext<'_> {
    fn emit(&mut self, kind: EventKind) {
        let now = self.scheduler.now();
        trace!(truck = %self.truck.id, event = %kind, secs = now.as_secs(), "haul event");
        self.log.push(Entity::Truck(self.truck.id), kind, now);
    }

    fn route_key(&self) -> RouteKey {
        RouteKey::new(self.truck.id, self.excavator.id)
    }
}

/// Counters and state of one truck's process
#[derive(Debug, Clone, Default, Serialize)]
pub struct TruckProcess {
    /// Arena index of the truck this process drives
    pub index: usize,
    pub phase: TruckPhase,
    pub phase_started: SimulationTime,
    pub cycles_completed: u32,
    pub breakdowns: u32,
    pub tonnes_hauled: f64,
    pub queue_secs: u64,
    pub distance_km: f64,
    pub fuel_litres: f64,
    /// Route copy taken at run start (snapshot mode only)
    #[serde(skip)]
    pub captured_route: Option<RouteSegment>,
    /// Distance and burn of the leg in progress, credited on arrival
    #[serde(skip)]
    leg: Option<(f64, f64)>,
}

impl TruckProcess {
    pub fn new(index: usize, captured_route: Option<RouteSegment>) -> Self {
        TruckProcess {
            index,
            captured_route,
            ..TruckProcess::default()
        }
    }

    fn enter(&mut self, phase: TruckPhase, now: SimulationTime) {
        self.phase = phase;
        self.phase_started = now;
    }

    /// Finish whatever the current phase was waiting for and start the next
    pub fn resume(&mut self, mut ctx: CycleContext<'_>) {
        match self.phase {
            TruckPhase::Parked => self.begin_cycle(&mut ctx),
            TruckPhase::Repairing => {
                ctx.truck.maintenance_status = MaintenanceStatus::Operational;
                ctx.emit(EventKind::Repaired);
                self.travel_to_shovel(&mut ctx);
            }
            TruckPhase::TravelingToShovel => self.arrive_at_shovel(&mut ctx),
            TruckPhase::Queuing => self.start_loading(&mut ctx),
            TruckPhase::Loading => self.finish_loading(&mut ctx),
            TruckPhase::TravelingToDump => self.arrive_at_dump(&mut ctx),
            TruckPhase::Dumping => {
                self.tonnes_hauled += ctx.truck.current_load;
                ctx.truck.empty();
                self.cycles_completed += 1;
                self.begin_cycle(&mut ctx);
            }
        }
    }

    fn begin_cycle(&mut self, ctx: &mut CycleContext<'_>) {
        // One draw per cycle keeps the random stream aligned across runs
        let roll: f64 = ctx.rng.gen();
        if roll < ctx.params.breakdown_probability {
            let (low, high) = ctx.params.repair_hours;
            let repair_hours = if high > low {
                ctx.rng.gen_range(low..=high)
            } else {
                low
            };
            let repair_secs = hours_to_secs(repair_hours);
            self.breakdowns += 1;
            ctx.truck.maintenance_status = MaintenanceStatus::InMaintenance;
            ctx.emit(EventKind::Breakdown);
            debug!(truck = %ctx.truck.id, repair_secs, "truck broke down");
            self.enter(TruckPhase::Repairing, ctx.scheduler.now());
            ctx.scheduler.schedule(repair_secs, ProcessId::Truck(self.index));
        } else {
            self.travel_to_shovel(ctx);
        }
    }

    /// Depart for the assigned excavator using the empty speed profile
    fn travel_to_shovel(&mut self, ctx: &mut CycleContext<'_>) {
        let destination = ctx.excavator.location;
        let secs = self.depart(ctx, destination, false).max(MIN_PHASE_SECS);
        ctx.emit(EventKind::TravelingToShovel);
        self.enter(TruckPhase::TravelingToShovel, ctx.scheduler.now());
        ctx.scheduler.schedule(secs, ProcessId::Truck(self.index));
    }

    fn arrive_at_shovel(&mut self, ctx: &mut CycleContext<'_>) {
        let location = ctx.excavator.location;
        self.arrive(ctx, location);
        ctx.emit(EventKind::QueuingAtShovel);
        self.enter(TruckPhase::Queuing, ctx.scheduler.now());
        match ctx.pool.request(ProcessId::Truck(self.index)) {
            Admission::Admitted => self.start_loading(ctx),
            Admission::Queued { position } => {
                trace!(truck = %ctx.truck.id, position, "waiting for excavator");
            }
        }
    }

    /// Admitted by the pool; fill the truck bucket by bucket
    fn start_loading(&mut self, ctx: &mut CycleContext<'_>) {
        let now = ctx.scheduler.now();
        self.queue_secs += self.phase_started.duration_until(now);
        let secs = ctx
            .excavator
            .loading_secs(ctx.truck.capacity)
            .max(MIN_PHASE_SECS);
        ctx.emit(EventKind::Loading);
        self.enter(TruckPhase::Loading, now);
        ctx.scheduler.schedule(secs, ProcessId::Truck(self.index));
    }

    fn finish_loading(&mut self, ctx: &mut CycleContext<'_>) {
        ctx.truck.fill();
        ctx.pool.release(ProcessId::Truck(self.index), ctx.scheduler);

        let secs = self
            .depart(ctx, ctx.params.dump_site, true)
            .max(MIN_PHASE_SECS);
        ctx.emit(EventKind::TravelingToDump);
        self.enter(TruckPhase::TravelingToDump, ctx.scheduler.now());
        ctx.scheduler.schedule(secs, ProcessId::Truck(self.index));
    }

    fn arrive_at_dump(&mut self, ctx: &mut CycleContext<'_>) {
        let location = ctx.params.dump_site;
        self.arrive(ctx, location);
        ctx.emit(EventKind::Dumping);
        self.enter(TruckPhase::Dumping, ctx.scheduler.now());
        ctx.scheduler.schedule(
            ctx.params.dump_secs.max(MIN_PHASE_SECS),
            ProcessId::Truck(self.index),
        );
    }

    /// Start a leg and return its duration in seconds
    fn depart(&mut self, ctx: &CycleContext<'_>, destination: Location, toward_dump: bool) -> u64 {
        let key = ctx.route_key();
        let route = ctx.environment.conditions(
            &key,
            ctx.params.route_mode,
            self.captured_route.as_ref(),
        );
        let speed = effective_speed(
            ctx.truck.base_speed(),
            route.road_condition,
            route.weather_exposure,
            route.gradient_for(toward_dump),
        );
        let km = ctx
            .truck
            .location
            .distance_km(&destination, ctx.params.km_per_degree);
        self.leg = Some((km, ctx.truck.fuel_rate()));
        hours_to_secs(km / speed)
    }

    fn arrive(&mut self, ctx: &mut CycleContext<'_>, location: Location) {
        if let Some((km, litres_per_km)) = self.leg.take() {
            self.distance_km += km;
            self.fuel_litres += km * litres_per_km;
        }
        ctx.truck.location = location;
    }
}
