//! World — the single owner of all simulation entities.
//!
//! Modules and tasks live in arenas, robots in a plain list indexed by
//! [`RobotId`]. Everything is insertion-ordered; the simulator iterates
//! these collections in order, which is what makes runs reproducible.

use crate::error::SimResult;
use crate::map::SimulationMap;
use crate::module::{Module, ModuleArena, ModuleId};
use crate::risk::RiskModel;
use crate::robot::{Robot, RobotId};
use crate::task::{Task, TaskArena, TaskId};

#[derive(Default)]
pub struct World {
    pub modules: ModuleArena,
    pub robots: Vec<Robot>,
    pub tasks: TaskArena,
    /// Work tasks in insertion order. Stations are tracked by `map` instead.
    pub work: Vec<TaskId>,
    pub map: SimulationMap,
    pub scenarios: Vec<Box<dyn RiskModel>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, module: Module) -> ModuleId {
        self.modules.insert(module)
    }

    pub fn add_robot(&mut self, robot: Robot) -> RobotId {
        let id = RobotId(self.robots.len());
        self.robots.push(robot);
        id
    }

    /// Insert a work task. Charging stations go through [`World::add_station`].
    pub fn add_task(&mut self, task: Task) -> TaskId {
        let id = self.tasks.insert(task);
        self.work.push(id);
        id
    }

    /// Insert a charging station and register it on the map.
    pub fn add_station(&mut self, task: Task) -> SimResult<TaskId> {
        let id = self.tasks.insert(task);
        self.map.register(id, &self.tasks)?;
        Ok(id)
    }

    pub fn add_scenario(&mut self, scenario: Box<dyn RiskModel>) {
        self.scenarios.push(scenario);
    }

    pub fn task_id(&self, name: &str) -> Option<TaskId> {
        self.tasks.id_of(name)
    }

    pub fn robot_id(&self, name: &str) -> Option<RobotId> {
        self.robots
            .iter()
            .position(|r| r.name() == name)
            .map(RobotId)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::module::ModuleType;
    use crate::robot::{PerformanceAttribute, RobotType};

    #[test]
    fn test_work_excludes_stations() {
        let mut world = World::new();
        let work = world.add_task(Task::manufacture("make", (0.0, 0.0), 2.0, 0.0).unwrap());
        let dock = world
            .add_station(Task::charge("dock", (1.0, 0.0), 5.0).unwrap())
            .unwrap();
        assert_eq!(world.work, vec![work]);
        assert_eq!(world.map.stations(), &[dock]);
        assert_eq!(world.tasks.len(), 2);
    }

    #[test]
    fn test_lookup_by_name() {
        let mut world = World::new();
        let cell = world.add_module(
            Module::new(ModuleType::new("cell", 10.0), "cell_0", (0.0, 0.0), 10.0, 0.0).unwrap(),
        );
        let ty = RobotType {
            name: "probe".into(),
            required_modules: BTreeMap::from([("cell".to_string(), 1)]),
            performance: BTreeMap::from([(PerformanceAttribute::Mobility, 1.0)]),
            power_consumption: 1.0,
            recharge_trigger: 2.0,
        };
        let robot = Robot::new(ty, "r1", (0.0, 0.0), vec![cell], &world.modules).unwrap();
        let id = world.add_robot(robot);
        assert_eq!(world.robot_id("r1"), Some(id));
        assert_eq!(world.robot_id("r2"), None);

        let t = world.add_task(Task::manufacture("make", (0.0, 0.0), 1.0, 0.0).unwrap());
        assert_eq!(world.task_id("make"), Some(t));
    }
}
