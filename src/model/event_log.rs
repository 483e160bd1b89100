/// The append-only trace a run produces
///
/// Each record says WHO (entity), WHAT (event kind) and WHEN (simulated
/// time). Records of one entity are in non-decreasing time order; the log
/// as a whole is in emission order, which is also time order because the
/// scheduler never goes backwards.
use std::fmt;
use std::io;

use serde::{Serialize, Serializer};

use super::equipment::TruckId;
use super::time::SimulationTime;

/// Closed set of event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TravelingToShovel,
    QueuingAtShovel,
    Loading,
    TravelingToDump,
    Dumping,
    Breakdown,
    Repaired,
    WeatherChanged,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TravelingToShovel => "traveling_to_shovel",
            EventKind::QueuingAtShovel => "queuing_at_shovel",
            EventKind::Loading => "loading",
            EventKind::TravelingToDump => "traveling_to_dump",
            EventKind::Dumping => "dumping",
            EventKind::Breakdown => "breakdown",
            EventKind::Repaired => "repaired",
            EventKind::WeatherChanged => "weather_changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Truck(TruckId),
    /// Weather and road background processes
    Environment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Truck(id) => id.fmt(f),
            Entity::Environment => f.write_str("environment"),
        }
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub entity: Entity,
    pub kind: EventKind,
    pub time: SimulationTime,
}

/// Flat row written to CSV, one per record
#[derive(Debug, Serialize)]
struct EventRow {
    entity: String,
    event: &'static str,
    timestamp_hours: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    pub fn push(&mut self, entity: Entity, kind: EventKind, time: SimulationTime) {
        self.records.push(EventRecord { entity, kind, time });
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records of one truck in emission order
    pub fn for_truck(&self, truck: TruckId) -> impl Iterator<Item = &EventRecord> {
        self.records
            .iter()
            .filter(move |record| record.entity == Entity::Truck(truck))
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.records.iter().filter(|record| record.kind == kind).count()
    }

    pub fn count_for(&self, truck: TruckId, kind: EventKind) -> usize {
        self.for_truck(truck).filter(|record| record.kind == kind).count()
    }

    /// Copy of the records sorted by time (stable, so ties keep emission order)
    pub fn sorted_by_time(&self) -> Vec<EventRecord> {
        let mut sorted = self.records.clone();
        sorted.sort_by_key(|record| record.time);
        sorted
    }

    /// Write the log as CSV with columns entity, event, timestamp_hours
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        for record in &self.records {
            out.serialize(EventRow {
                entity: record.entity.to_string(),
                event: record.kind.as_str(),
                timestamp_hours: record.time.as_hours(),
            })?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EventLog {
        let mut log = EventLog::new();
        log.push(Entity::Truck(TruckId(1)), EventKind::TravelingToShovel, SimulationTime::new(0));
        log.push(Entity::Truck(TruckId(2)), EventKind::TravelingToShovel, SimulationTime::new(0));
        log.push(Entity::Truck(TruckId(1)), EventKind::QueuingAtShovel, SimulationTime::new(600));
        log.push(Entity::Environment, EventKind::WeatherChanged, SimulationTime::new(3600));
        log.push(Entity::Truck(TruckId(1)), EventKind::Loading, SimulationTime::new(600));
        log
    }

    #[test]
    fn counts_by_kind_and_truck() {
        let log = sample();
        assert_eq!(log.len(), 5);
        assert_eq!(log.count(EventKind::TravelingToShovel), 2);
        assert_eq!(log.count_for(TruckId(1), EventKind::Loading), 1);
        assert_eq!(log.count_for(TruckId(2), EventKind::Loading), 0);
        assert_eq!(log.for_truck(TruckId(1)).count(), 3);
    }

    #[test]
    fn sorting_is_stable_on_ties() {
        let sorted = sample().sorted_by_time();
        let kinds: Vec<_> = sorted.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TravelingToShovel,
                EventKind::TravelingToShovel,
                EventKind::QueuingAtShovel,
                EventKind::Loading,
                EventKind::WeatherChanged,
            ]
        );
    }

    #[test]
    fn writes_csv_rows() {
        let mut buffer = Vec::new();
        sample().write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "entity,event,timestamp_hours");
        assert_eq!(lines[1], "truck-1,traveling_to_shovel,0.0");
        assert_eq!(lines[4], "environment,weather_changed,1.0");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn serializes_records_as_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json[0]["entity"], "truck-1");
        assert_eq!(json[0]["kind"], "traveling_to_shovel");
        assert_eq!(json[3]["entity"], "environment");
        assert_eq!(json[3]["time"], 3600);
    }
}
