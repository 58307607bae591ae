//! Domain types shared across the engine and governance layers.

pub mod bar;
pub mod signal;

pub use bar::PriceBar;
pub use signal::{Finding, Severity, SignalEvent, StepError};
