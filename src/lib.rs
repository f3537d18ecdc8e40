//! Satellite plotting core
//!
//! SGP4 propagation and pass prediction for a set of element sets, and two
//! views that plot them for an observer: a polar sky chart and a world map
//! with range circles and ground tracks. The views draw through
//! [`view::DrawingSurface`], so any renderer can sit behind them.

pub mod config;
pub mod core;
pub mod orbital;
pub mod tle;
pub mod view;
