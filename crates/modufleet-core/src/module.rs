//! Module — the smallest failable, chargeable unit — and the arena that
//! owns every module in a world.
//!
//! Battery and operating time are guarded by validated setters: both freeze
//! once the module enters the `Error` state, battery stays inside
//! `[0, max_battery]`, and operating time never decreases.

use crate::error::{SimError, SimResult};
use crate::geometry::Coord;
use crate::risk::RiskModel;

/// Static capacity descriptor for a module type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleType {
    pub name: String,
    pub max_battery: f64,
}

impl ModuleType {
    pub fn new(name: impl Into<String>, max_battery: f64) -> Self {
        Self {
            name: name.into(),
            max_battery,
        }
    }
}

/// Binary health state of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Active,
    Error,
}

/// Handle into a [`ModuleArena`]. Valid only for the arena that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub usize);

/// The smallest unit with its own battery, operating time, position and
/// health state.
#[derive(Debug, Clone)]
pub struct Module {
    ty: ModuleType,
    name: String,
    coordinate: Coord,
    battery: f64,
    operating_time: f64,
    state: ModuleState,
}

impl Module {
    pub fn new(
        ty: ModuleType,
        name: impl Into<String>,
        coordinate: impl Into<Coord>,
        battery: f64,
        operating_time: f64,
    ) -> SimResult<Self> {
        let name = name.into();
        if battery > ty.max_battery {
            return Err(SimError::validation(format!(
                "battery {} exceeds capacity {} on module '{}'",
                battery, ty.max_battery, name
            )));
        }
        if battery < 0.0 {
            return Err(SimError::validation(format!(
                "battery must be non-negative on module '{}'",
                name
            )));
        }
        if operating_time < 0.0 {
            return Err(SimError::validation(format!(
                "operating_time must be non-negative on module '{}'",
                name
            )));
        }
        Ok(Self {
            ty,
            name,
            coordinate: coordinate.into(),
            battery,
            operating_time,
            state: ModuleState::Active,
        })
    }

    pub fn ty(&self) -> &ModuleType {
        &self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinate(&self) -> Coord {
        self.coordinate
    }

    /// Only the owning robot or a transport task repositions a module.
    pub(crate) fn set_coordinate(&mut self, coordinate: Coord) {
        self.coordinate = coordinate;
    }

    pub fn battery(&self) -> f64 {
        self.battery
    }

    pub fn set_battery(&mut self, battery: f64) -> SimResult<()> {
        if self.state == ModuleState::Error {
            return Err(SimError::illegal_state(format!(
                "cannot update battery of malfunctioning module '{}'",
                self.name
            )));
        }
        if battery > self.ty.max_battery {
            return Err(SimError::validation(format!(
                "battery {} exceeds capacity {} on module '{}'",
                battery, self.ty.max_battery, self.name
            )));
        }
        if battery < 0.0 {
            return Err(SimError::validation(format!(
                "battery must be non-negative on module '{}'",
                self.name
            )));
        }
        self.battery = battery;
        Ok(())
    }

    pub fn operating_time(&self) -> f64 {
        self.operating_time
    }

    pub fn set_operating_time(&mut self, operating_time: f64) -> SimResult<()> {
        if self.state == ModuleState::Error {
            return Err(SimError::illegal_state(format!(
                "cannot update operating_time of malfunctioning module '{}'",
                self.name
            )));
        }
        if operating_time < 0.0 {
            return Err(SimError::validation(format!(
                "operating_time must be non-negative on module '{}'",
                self.name
            )));
        }
        if operating_time < self.operating_time {
            return Err(SimError::validation(format!(
                "operating_time may not decrease on module '{}'",
                self.name
            )));
        }
        self.operating_time = operating_time;
        Ok(())
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ModuleState::Active
    }

    /// Re-evaluate health against the given scenarios. The state resets to
    /// `Active`, then scenarios run in order; the first malfunction wins and
    /// later scenarios are not consulted.
    pub fn update_state(&mut self, scenarios: &mut [Box<dyn RiskModel>]) -> SimResult<()> {
        self.state = ModuleState::Active;
        for scenario in scenarios.iter_mut() {
            if scenario.malfunction(self.operating_time)? {
                self.state = ModuleState::Error;
                break;
            }
        }
        Ok(())
    }
}

/// Owns every module of a world. Handles are stable for the arena lifetime;
/// modules are never removed, only marked failed.
#[derive(Debug, Default)]
pub struct ModuleArena {
    modules: Vec<Module>,
}

impl ModuleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: Module) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.modules.push(module);
        id
    }

    pub fn get(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn get_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.0]
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| (ModuleId(i), m))
    }
}
