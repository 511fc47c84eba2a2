//! Runtime performance readouts.
//!
//! [`MetricsAggregator`] smooths frame timing into EMA readouts and samples
//! process counters on a fixed tick. Counter sources are pluggable through
//! the traits in [`sensors`].

pub mod aggregator;
pub mod sensors;

pub use aggregator::{MetricSnapshot, MetricsAggregator, SensorAvailability, MIN_FRAME_DELTA_MS};
pub use sensors::{
    NullPower, NullSensors, PowerSensor, ProcSelfSensors, ProcessSensors, SysfsBattery,
};
