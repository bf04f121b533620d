//! Deterministic simulation core for modular-robot fleets.
//!
//! This crate contains the whole simulation: a world of battery-powered
//! modules aggregated into robots, interdependent tasks the robots work
//! off by priority, charging stations, and stochastic component-failure
//! scenarios. Everything is plain data driven by an explicit step loop,
//! so runs are reproducible down to the RNG draw and unit-testable
//! without any runtime.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`agent`] | Per-robot control agents (recharge vs. priority work) |
//! | [`blueprint`] | Serde world descriptors, validation, world building |
//! | [`error`] | Simulation error type shared across the crate |
//! | [`geometry`] | 2D coordinates, tolerant comparison, bounded stepping |
//! | [`map`] | Charging-station registry |
//! | [`module`] | Modules (battery, wear, health) and their arena |
//! | [`risk`] | Failure-scenario trait and exponential failure model |
//! | [`robot`] | Robots as module aggregates, power draw, travel, mounting |
//! | [`simulator`] | Four-phase step loop and workload/wear metrics |
//! | [`task`] | Task hierarchy: manufacture, transport, assembly, charge |
//! | [`world`] | Owner of all entities, insertion-ordered collections |

pub mod agent;
pub mod blueprint;
pub mod error;
pub mod geometry;
pub mod map;
pub mod module;
pub mod risk;
pub mod robot;
pub mod simulator;
pub mod task;
pub mod world;

pub use blueprint::{BuiltWorld, WorldSpec};
pub use error::{SimError, SimResult};
pub use simulator::Simulator;
pub use world::World;
