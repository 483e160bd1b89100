pub mod catalog;
pub mod environment;
pub mod equipment;
pub mod event_log;
pub mod haul_cycle;
pub mod kpi;
pub mod mine_simulation;
pub mod resource;
pub mod time;
