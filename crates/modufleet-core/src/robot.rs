//! Robot — an aggregate of modules — and its static type descriptor.
//!
//! A robot exclusively owns the battery/operating-time mutations of its
//! mounted modules. The mounted set starts equal to the required set and can
//! only shrink (failure, left behind) or grow back through an explicit
//! mount. Robot state is a pure function of missing components and battery
//! sufficiency; it is recomputed by `update_state`, never stored from
//! outside.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::geometry::Coord;
use crate::module::{ModuleArena, ModuleId};
use crate::risk::RiskModel;

/// A named capability dimension contributed by a robot's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceAttribute {
    Transport,
    Manufacture,
    Mobility,
}

/// Static bill of materials and capability vector for a robot type.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotType {
    pub name: String,
    /// Module-type name → number of modules of that type the robot needs.
    pub required_modules: BTreeMap<String, usize>,
    pub performance: BTreeMap<PerformanceAttribute, f64>,
    pub power_consumption: f64,
    pub recharge_trigger: f64,
}

impl RobotType {
    /// Performance value for an attribute; absent attributes contribute 0.
    pub fn performance(&self, attr: PerformanceAttribute) -> f64 {
        self.performance.get(&attr).copied().unwrap_or(0.0)
    }
}

/// Derived operational state of a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotState {
    Active,
    /// Battery insufficient for one power draw.
    NoEnergy,
    /// At least one required module is missing.
    Defective,
}

/// Handle for a robot in a world's robot list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RobotId(pub usize);

/// An aggregate of modules. Robots are identity, not value: they implement
/// neither `Clone` nor `Copy`, and replications rebuild them from their
/// descriptors.
#[derive(Debug)]
pub struct Robot {
    ty: RobotType,
    name: String,
    coordinate: Coord,
    mounted: Vec<ModuleId>,
    required: Vec<ModuleId>,
    state: RobotState,
}

impl Robot {
    /// Construct a robot from its full component list. The per-type counts
    /// of `components` must exactly match the type's required modules.
    pub fn new(
        ty: RobotType,
        name: impl Into<String>,
        coordinate: impl Into<Coord>,
        components: Vec<ModuleId>,
        modules: &ModuleArena,
    ) -> SimResult<Self> {
        let name = name.into();

        for (i, &id) in components.iter().enumerate() {
            if components[..i].contains(&id) {
                return Err(SimError::validation(format!(
                    "module '{}' listed twice in components of robot '{}'",
                    modules.get(id).name(),
                    name
                )));
            }
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for &id in &components {
            *counts.entry(modules.get(id).ty().name.as_str()).or_insert(0) += 1;
        }
        for (type_name, &required) in &ty.required_modules {
            let got = counts.get(type_name.as_str()).copied().unwrap_or(0);
            if got != required {
                return Err(SimError::validation(format!(
                    "robot '{}' requires {} module(s) of type '{}' but {} assigned",
                    name, required, type_name, got
                )));
            }
        }
        for type_name in counts.keys() {
            if !ty.required_modules.contains_key(*type_name) {
                return Err(SimError::validation(format!(
                    "robot '{}' was given a module of unrequested type '{}'",
                    name, type_name
                )));
            }
        }

        let mut robot = Self {
            ty,
            name,
            coordinate: coordinate.into(),
            mounted: components.clone(),
            required: components,
            state: RobotState::Active,
        };
        robot.update_state(modules);
        Ok(robot)
    }

    pub fn ty(&self) -> &RobotType {
        &self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinate(&self) -> Coord {
        self.coordinate
    }

    pub fn mounted(&self) -> &[ModuleId] {
        &self.mounted
    }

    pub fn required(&self) -> &[ModuleId] {
        &self.required
    }

    pub fn state(&self) -> RobotState {
        self.state
    }

    pub fn total_battery(&self, modules: &ModuleArena) -> f64 {
        self.mounted.iter().map(|&id| modules.get(id).battery()).sum()
    }

    pub fn total_max_battery(&self, modules: &ModuleArena) -> f64 {
        self.mounted
            .iter()
            .map(|&id| modules.get(id).ty().max_battery)
            .sum()
    }

    /// Required modules that are not currently mounted, in the order they
    /// appear in the required-component list. That order is the stable
    /// tie-break used by assembly tasks.
    pub fn missing_components(&self) -> Vec<ModuleId> {
        self.required
            .iter()
            .copied()
            .filter(|id| !self.mounted.contains(id))
            .collect()
    }

    /// Strictly more battery than one power draw needs.
    pub fn is_battery_sufficient(&self, modules: &ModuleArena) -> bool {
        self.total_battery(modules) > self.ty.power_consumption
    }

    pub fn is_battery_full(&self, modules: &ModuleArena) -> bool {
        self.total_battery(modules) == self.total_max_battery(modules)
    }

    /// Consume one step's power, draining the last-mounted module first and
    /// emptying each module before touching the previous one.
    pub fn draw_battery_power(&self, modules: &mut ModuleArena) -> SimResult<()> {
        if !self.is_battery_sufficient(modules) {
            return Err(SimError::illegal_state(format!(
                "battery below the amount needed for action on robot '{}'",
                self.name
            )));
        }
        let mut left = self.ty.power_consumption;
        for &id in self.mounted.iter().rev() {
            let module = modules.get_mut(id);
            let battery = module.battery();
            if left <= battery {
                module.set_battery(battery - left)?;
                return Ok(());
            }
            left -= battery;
            module.set_battery(0.0)?;
        }
        Ok(())
    }

    /// Apply one step of charge, topping up the first-mounted module first.
    /// Charge beyond total capacity is discarded.
    pub fn charge_battery_power(&self, rate: f64, modules: &mut ModuleArena) -> SimResult<()> {
        let mut left = rate;
        for &id in &self.mounted {
            let module = modules.get_mut(id);
            let max_battery = module.ty().max_battery;
            let headroom = max_battery - module.battery();
            if headroom < left {
                module.set_battery(max_battery)?;
                left -= headroom;
            } else {
                let battery = module.battery();
                module.set_battery(battery + left)?;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Move toward `target` by at most the Mobility performance value; all
    /// mounted modules follow the robot's new coordinate.
    pub fn travel(&mut self, target: Coord, modules: &mut ModuleArena) {
        let mobility = self.ty.performance(PerformanceAttribute::Mobility);
        self.coordinate = self.coordinate.step_toward(target, mobility);
        for &id in &self.mounted {
            modules.get_mut(id).set_coordinate(self.coordinate);
        }
    }

    /// Mount a required module that is active and positionally coincident.
    pub fn mount_module(&mut self, id: ModuleId, modules: &ModuleArena) -> SimResult<()> {
        let module = modules.get(id);
        if !module.is_active() {
            return Err(SimError::illegal_state(format!(
                "module '{}' cannot be mounted on robot '{}' due to a malfunction",
                module.name(),
                self.name
            )));
        }
        if !module.coordinate().within_range(self.coordinate) {
            return Err(SimError::illegal_state(format!(
                "module '{}' cannot be mounted on robot '{}' due to a coordinate mismatch",
                module.name(),
                self.name
            )));
        }
        if !self.required.contains(&id) {
            return Err(SimError::illegal_state(format!(
                "module '{}' is not a required component of robot '{}'",
                module.name(),
                self.name
            )));
        }
        if self.mounted.contains(&id) {
            return Err(SimError::illegal_state(format!(
                "module '{}' is already mounted on robot '{}'",
                module.name(),
                self.name
            )));
        }
        self.mounted.push(id);
        Ok(())
    }

    /// Prune the mounted set to modules that are active and coincident with
    /// the robot, then recompute the robot state.
    pub fn update_state(&mut self, modules: &ModuleArena) {
        let coordinate = self.coordinate;
        self.mounted.retain(|&id| {
            let module = modules.get(id);
            module.is_active() && module.coordinate().within_range(coordinate)
        });

        self.state = if !self.missing_components().is_empty() {
            RobotState::Defective
        } else if !self.is_battery_sufficient(modules) {
            RobotState::NoEnergy
        } else {
            RobotState::Active
        };
    }

    /// Run the mounted modules for one step: draw power, advance every
    /// mounted module's operating time by one unit, then evaluate failure
    /// against the given scenarios.
    pub fn operate(
        &mut self,
        modules: &mut ModuleArena,
        scenarios: &mut [Box<dyn RiskModel>],
    ) -> SimResult<()> {
        if self.state != RobotState::Active {
            return Err(SimError::illegal_state(format!(
                "robot '{}' is not active",
                self.name
            )));
        }
        self.draw_battery_power(modules)?;
        for &id in &self.mounted {
            let module = modules.get_mut(id);
            let t = module.operating_time();
            module.set_operating_time(t + 1.0)?;
        }
        for &id in &self.mounted {
            modules.get_mut(id).update_state(scenarios)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::tests::FixedRisk;
    use crate::module::{Module, ModuleType};

    fn cell() -> ModuleType {
        ModuleType::new("cell", 100.0)
    }

    fn drive() -> ModuleType {
        ModuleType::new("drive", 50.0)
    }

    fn carrier_type() -> RobotType {
        RobotType {
            name: "carrier".into(),
            required_modules: BTreeMap::from([("cell".to_string(), 1), ("drive".to_string(), 1)]),
            performance: BTreeMap::from([
                (PerformanceAttribute::Mobility, 5.0),
                (PerformanceAttribute::Transport, 1.0),
            ]),
            power_consumption: 10.0,
            recharge_trigger: 30.0,
        }
    }

    fn build_carrier(modules: &mut ModuleArena) -> Robot {
        let a = modules.insert(Module::new(cell(), "cell_0", (0.0, 0.0), 100.0, 0.0).unwrap());
        let b = modules.insert(Module::new(drive(), "drive_0", (0.0, 0.0), 50.0, 0.0).unwrap());
        Robot::new(carrier_type(), "r1", (0.0, 0.0), vec![a, b], modules).unwrap()
    }

    #[test]
    fn test_new_rejects_count_mismatch() {
        let mut modules = ModuleArena::new();
        let a = modules.insert(Module::new(cell(), "cell_0", (0.0, 0.0), 100.0, 0.0).unwrap());
        let err = Robot::new(carrier_type(), "r1", (0.0, 0.0), vec![a], &modules);
        assert!(matches!(err, Err(SimError::Validation(_))));
    }

    #[test]
    fn test_new_rejects_duplicate_component() {
        let mut modules = ModuleArena::new();
        let a = modules.insert(Module::new(cell(), "cell_0", (0.0, 0.0), 100.0, 0.0).unwrap());
        let err = Robot::new(carrier_type(), "r1", (0.0, 0.0), vec![a, a], &modules);
        assert!(matches!(err, Err(SimError::Validation(_))));
    }

    #[test]
    fn test_new_rejects_unrequested_type() {
        let mut modules = ModuleArena::new();
        let a = modules.insert(Module::new(cell(), "cell_0", (0.0, 0.0), 100.0, 0.0).unwrap());
        let b = modules.insert(Module::new(drive(), "drive_0", (0.0, 0.0), 50.0, 0.0).unwrap());
        let c = modules.insert(
            Module::new(ModuleType::new("arm", 10.0), "arm_0", (0.0, 0.0), 10.0, 0.0).unwrap(),
        );
        let mut ty = carrier_type();
        ty.required_modules.insert("cell".into(), 2);
        let err = Robot::new(ty, "r1", (0.0, 0.0), vec![a, b, c], &modules);
        assert!(matches!(err, Err(SimError::Validation(_))));
    }

    #[test]
    fn test_draw_drains_last_mounted_first() {
        let mut modules = ModuleArena::new();
        let robot = build_carrier(&mut modules);
        let [cell_id, drive_id] = [robot.mounted()[0], robot.mounted()[1]];

        // consumption 10 comes entirely out of the drive (mounted last)
        robot.draw_battery_power(&mut modules).unwrap();
        assert_eq!(modules.get(cell_id).battery(), 100.0);
        assert_eq!(modules.get(drive_id).battery(), 40.0);

        // drain the drive to zero, then spill into the cell
        for _ in 0..4 {
            robot.draw_battery_power(&mut modules).unwrap();
        }
        assert_eq!(modules.get(drive_id).battery(), 0.0);
        assert_eq!(modules.get(cell_id).battery(), 100.0);
        robot.draw_battery_power(&mut modules).unwrap();
        assert_eq!(modules.get(cell_id).battery(), 90.0);
    }

    #[test]
    fn test_draw_fails_when_insufficient() {
        let mut modules = ModuleArena::new();
        let robot = build_carrier(&mut modules);
        for _ in 0..14 {
            robot.draw_battery_power(&mut modules).unwrap();
        }
        // 10 left in total, not strictly more than the 10 consumption
        assert!(!robot.is_battery_sufficient(&modules));
        assert!(matches!(
            robot.draw_battery_power(&mut modules),
            Err(SimError::IllegalState(_))
        ));
    }

    #[test]
    fn test_charge_fills_first_mounted_first_and_discards_overflow() {
        let mut modules = ModuleArena::new();
        let robot = build_carrier(&mut modules);
        let [cell_id, drive_id] = [robot.mounted()[0], robot.mounted()[1]];
        modules.get_mut(cell_id).set_battery(0.0).unwrap();
        modules.get_mut(drive_id).set_battery(0.0).unwrap();

        robot.charge_battery_power(60.0, &mut modules).unwrap();
        assert_eq!(modules.get(cell_id).battery(), 60.0);
        assert_eq!(modules.get(drive_id).battery(), 0.0);

        robot.charge_battery_power(60.0, &mut modules).unwrap();
        assert_eq!(modules.get(cell_id).battery(), 100.0);
        assert_eq!(modules.get(drive_id).battery(), 20.0);

        // 30 needed to top up, the rest of the 100 is discarded
        robot.charge_battery_power(100.0, &mut modules).unwrap();
        assert!(robot.is_battery_full(&modules));
        assert_eq!(robot.total_battery(&modules), 150.0);
    }

    #[test]
    fn test_travel_moves_robot_and_modules() {
        let mut modules = ModuleArena::new();
        let mut robot = build_carrier(&mut modules);
        robot.travel(Coord::new(50.0, 0.0), &mut modules);
        assert!(robot.coordinate().within_range(Coord::new(5.0, 0.0)));
        for &id in robot.mounted() {
            assert!(modules.get(id).coordinate().within_range(robot.coordinate()));
        }

        // within mobility range: snaps exactly onto target
        robot.travel(Coord::new(7.0, 0.0), &mut modules);
        assert_eq!(robot.coordinate(), Coord::new(7.0, 0.0));
    }

    #[test]
    fn test_update_state_prunes_and_classifies() {
        let mut modules = ModuleArena::new();
        let mut robot = build_carrier(&mut modules);
        assert_eq!(robot.state(), RobotState::Active);

        // fail the drive: it gets pruned and the robot turns defective
        let drive_id = robot.mounted()[1];
        modules
            .get_mut(drive_id)
            .update_state(&mut vec![FixedRisk::boxed(true)])
            .unwrap();
        robot.update_state(&modules);
        assert_eq!(robot.state(), RobotState::Defective);
        assert_eq!(robot.missing_components(), vec![drive_id]);

        // recover the drive and remount
        modules
            .get_mut(drive_id)
            .update_state(&mut vec![FixedRisk::boxed(false)])
            .unwrap();
        robot.mount_module(drive_id, &modules).unwrap();
        robot.update_state(&modules);
        assert_eq!(robot.state(), RobotState::Active);

        // drain down to the insufficiency threshold
        let cell_id = robot.mounted()[0];
        modules.get_mut(cell_id).set_battery(0.0).unwrap();
        modules.get_mut(drive_id).set_battery(10.0).unwrap();
        robot.update_state(&modules);
        assert_eq!(robot.state(), RobotState::NoEnergy);
    }

    #[test]
    fn test_module_left_behind_is_dropped() {
        let mut modules = ModuleArena::new();
        let mut robot = build_carrier(&mut modules);
        let drive_id = robot.mounted()[1];
        // the transport family repositions modules; simulate one left behind
        modules.get_mut(drive_id).set_coordinate(Coord::new(9.0, 9.0));
        robot.update_state(&modules);
        assert_eq!(robot.missing_components(), vec![drive_id]);
        assert_eq!(robot.state(), RobotState::Defective);
    }

    #[test]
    fn test_mount_module_guards() {
        let mut modules = ModuleArena::new();
        let mut robot = build_carrier(&mut modules);
        let drive_id = robot.mounted()[1];

        // already mounted
        assert!(matches!(
            robot.mount_module(drive_id, &modules),
            Err(SimError::IllegalState(_))
        ));

        // out of range
        modules.get_mut(drive_id).set_coordinate(Coord::new(9.0, 9.0));
        robot.update_state(&modules);
        assert!(matches!(
            robot.mount_module(drive_id, &modules),
            Err(SimError::IllegalState(_))
        ));

        // unrequested module
        let stray = modules.insert(Module::new(cell(), "stray", (0.0, 0.0), 1.0, 0.0).unwrap());
        assert!(matches!(
            robot.mount_module(stray, &modules),
            Err(SimError::IllegalState(_))
        ));
    }

    #[test]
    fn test_operate_advances_operating_time() {
        let mut modules = ModuleArena::new();
        let mut robot = build_carrier(&mut modules);
        let before = robot.total_battery(&modules);
        robot.operate(&mut modules, &mut []).unwrap();
        assert_eq!(robot.total_battery(&modules), before - 10.0);
        for &id in robot.mounted() {
            assert_eq!(modules.get(id).operating_time(), 1.0);
        }
    }

    #[test]
    fn test_operate_requires_active_state() {
        let mut modules = ModuleArena::new();
        let mut robot = build_carrier(&mut modules);
        let cell_id = robot.mounted()[0];
        let drive_id = robot.mounted()[1];
        modules.get_mut(cell_id).set_battery(0.0).unwrap();
        modules.get_mut(drive_id).set_battery(5.0).unwrap();
        robot.update_state(&modules);
        assert!(matches!(
            robot.operate(&mut modules, &mut []),
            Err(SimError::IllegalState(_))
        ));
    }

    #[test]
    fn test_operate_evaluates_failures() {
        let mut modules = ModuleArena::new();
        let mut robot = build_carrier(&mut modules);
        let mut scenarios = vec![FixedRisk::boxed(true)];
        robot.operate(&mut modules, &mut scenarios).unwrap();
        for &id in robot.mounted() {
            assert!(!modules.get(id).is_active());
        }
    }
}
