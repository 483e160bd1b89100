/// Aggregate productivity figures derived from a run
use serde::Serialize;

use super::event_log::{EventKind, EventLog};
use super::mine_simulation::Snapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    /// Share of all events that are queuing events
    pub queuing_fraction: f64,
    /// Mean truck fuel rate (L/km) times fuel price
    pub fuel_cost_per_km: f64,
    /// Mean current load over mean capacity
    pub utilization: f64,
    pub cycles_completed: u32,
    pub breakdowns: u32,
    pub tonnes_hauled: f64,
    pub fuel_litres: f64,
    pub fuel_cost: f64,
    pub mean_queue_hours: f64,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl Kpis {
    pub fn compute(log: &EventLog, snapshot: &Snapshot, fuel_price: f64) -> Self {
        let queuing_fraction = if log.is_empty() {
            0.0
        } else {
            log.count(EventKind::QueuingAtShovel) as f64 / log.len() as f64
        };

        let trucks = &snapshot.trucks;
        let mean_capacity = mean(trucks.iter().map(|t| t.capacity));
        let utilization = if mean_capacity > 0.0 {
            mean(trucks.iter().map(|t| t.current_load)) / mean_capacity
        } else {
            0.0
        };
        let fuel_litres: f64 = trucks.iter().map(|t| t.fuel_litres).sum();

        Kpis {
            queuing_fraction,
            fuel_cost_per_km: mean(trucks.iter().map(|t| t.mean_fuel_rate)) * fuel_price,
            utilization,
            cycles_completed: trucks.iter().map(|t| t.cycles_completed).sum(),
            breakdowns: trucks.iter().map(|t| t.breakdowns).sum(),
            tonnes_hauled: trucks.iter().map(|t| t.tonnes_hauled).sum(),
            fuel_litres,
            fuel_cost: fuel_litres * fuel_price,
            mean_queue_hours: mean(trucks.iter().map(|t| t.queue_hours)),
        }
    }
}
