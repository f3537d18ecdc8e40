//! Orbital mechanics module
//!
//! SGP4 propagation of loaded element sets, pass prediction for an
//! observer, and the per-tick snapshots the views consume.

pub mod observer;
pub mod passes;
pub mod propagation;
pub mod snapshot;
pub mod time;

pub use observer::{Qth, QthSmall};
pub use passes::{Pass, PassDetail, PredictSettings};
pub use propagation::{SatState, Satellite};
pub use snapshot::{Catalog, OrbitPredictor, OrbitSample, SatelliteSnapshot, Sgp4Predictor};
pub use time::SimulationClock;
