//! Transport tasks — hauling a payload (optionally a module) along a route.

use crate::error::{SimError, SimResult};
use crate::geometry::{Coord, COORD_TOLERANCE};
use crate::module::{ModuleArena, ModuleId};
use crate::robot::{PerformanceAttribute, Robot};

use super::Task;

/// Origin, destination and the resistance factor of a haul. Workload is
/// `resistance × |destination − origin|` by construction.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub origin: Coord,
    pub destination: Coord,
    pub resistance: f64,
}

impl Route {
    pub fn carrying_distance(&self) -> f64 {
        self.origin.distance(self.destination)
    }

    pub(super) fn check_workload(&self, task_name: &str, total_workload: f64) -> SimResult<()> {
        let expected = self.resistance * self.carrying_distance();
        if (total_workload - expected).abs() > COORD_TOLERANCE {
            return Err(SimError::validation(format!(
                "total_workload {} of task '{}' does not match resistance × carrying distance {}",
                total_workload, task_name, expected
            )));
        }
        Ok(())
    }
}

/// One step of a transport-family task. The payload advances toward the
/// destination at the slowest assigned robot's mobility divided by the
/// route resistance; every assigned robot is pulled along to the payload.
pub(super) fn update(
    task: &mut Task,
    route: Route,
    payload_module: Option<ModuleId>,
    deps_completed: bool,
    robots: &mut [Robot],
    modules: &mut ModuleArena,
) -> SimResult<bool> {
    if !task.is_performance_satisfied(robots) || !deps_completed {
        return Ok(false);
    }

    let mobilities: Vec<f64> = task
        .assigned
        .iter()
        .map(|&id| robots[id.0].ty().performance(PerformanceAttribute::Mobility))
        .collect();
    if mobilities.is_empty() || mobilities.iter().cloned().fold(0.0, f64::max) == 0.0 {
        return Ok(false);
    }

    let min_mobility = mobilities.iter().cloned().fold(f64::INFINITY, f64::min);
    let speed = min_mobility / route.resistance;

    task.coordinate = task.coordinate.step_toward(route.destination, speed);
    for &id in &task.assigned {
        let robot = &mut robots[id.0];
        robot.travel(task.coordinate, modules);
        if !robot.coordinate().within_range(task.coordinate) {
            return Err(SimError::illegal_state(format!(
                "robot '{}' cannot follow the payload of task '{}'",
                robot.name(),
                task.name
            )));
        }
    }

    let remaining = task.coordinate.distance(route.destination);
    task.completed_workload = task.total_workload - route.resistance * remaining;

    if let Some(module) = payload_module {
        modules.get_mut(module).set_coordinate(task.coordinate);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::module::{Module, ModuleType};
    use crate::robot::{RobotId, RobotType};
    use crate::task::TaskKind;

    fn mover_type(mobility: f64) -> RobotType {
        RobotType {
            name: "mover".into(),
            required_modules: BTreeMap::from([("cell".to_string(), 1)]),
            performance: BTreeMap::from([
                (PerformanceAttribute::Transport, 1.0),
                (PerformanceAttribute::Mobility, mobility),
            ]),
            power_consumption: 1.0,
            recharge_trigger: 10.0,
        }
    }

    fn mover(modules: &mut ModuleArena, mobility: f64, at: Coord) -> Robot {
        let n = modules.len();
        let id = modules.insert(
            Module::new(
                ModuleType::new("cell", 100.0),
                format!("cell_{}", n),
                at,
                100.0,
                0.0,
            )
            .unwrap(),
        );
        Robot::new(mover_type(mobility), format!("r{}", n), at, vec![id], modules).unwrap()
    }

    #[test]
    fn test_workload_must_match_route() {
        assert!(Task::transport("t", (0.0, 0.0), (10.0, 0.0), 2.0, 19.0).is_err());
        assert!(Task::transport("t", (0.0, 0.0), (10.0, 0.0), 2.0, 20.0).is_ok());
    }

    #[test]
    fn test_update_advances_payload_and_workload() {
        let mut modules = ModuleArena::new();
        let mut robots = vec![mover(&mut modules, 5.0, Coord::ORIGIN)];
        let mut task = Task::transport("t", (0.0, 0.0), (10.0, 0.0), 2.0, 20.0).unwrap();
        task.init_dependencies(vec![]).unwrap();
        task.assign_robot(RobotId(0), &robots[0]).unwrap();

        // speed = min mobility / resistance = 2.5
        assert!(task.update(true, &mut robots, &mut modules).unwrap());
        assert!(task.coordinate().within_range(Coord::new(2.5, 0.0)));
        assert!((task.completed_workload() - 5.0).abs() < 1e-8);
        assert!(robots[0].coordinate().within_range(task.coordinate()));

        // invariant: completed == total − resistance × remaining distance
        for _ in 0..3 {
            task.release_robot();
            task.assign_robot(RobotId(0), &robots[0]).unwrap();
            assert!(task.update(true, &mut robots, &mut modules).unwrap());
            let remaining = task.coordinate().distance(Coord::new(10.0, 0.0));
            assert!(
                (task.completed_workload() - (20.0 - 2.0 * remaining)).abs() < 1e-8
            );
        }
        assert!(task.is_completed());
        assert_eq!(task.coordinate(), Coord::new(10.0, 0.0));
    }

    #[test]
    fn test_update_requires_nonzero_mobility() {
        let mut modules = ModuleArena::new();
        let mut robots = vec![mover(&mut modules, 0.0, Coord::ORIGIN)];
        let mut task = Task::transport("t", (0.0, 0.0), (10.0, 0.0), 1.0, 10.0).unwrap();
        task.init_dependencies(vec![]).unwrap();
        task.assign_robot(RobotId(0), &robots[0]).unwrap();
        assert!(!task.update(true, &mut robots, &mut modules).unwrap());
    }

    #[test]
    fn test_update_gated_on_dependencies() {
        let mut modules = ModuleArena::new();
        let mut robots = vec![mover(&mut modules, 5.0, Coord::ORIGIN)];
        let mut task = Task::transport("t", (0.0, 0.0), (10.0, 0.0), 1.0, 10.0).unwrap();
        task.init_dependencies(vec![]).unwrap();
        task.assign_robot(RobotId(0), &robots[0]).unwrap();
        assert!(!task.update(false, &mut robots, &mut modules).unwrap());
        assert_eq!(task.completed_workload(), 0.0);
    }

    #[test]
    fn test_slowest_robot_sets_the_pace() {
        let mut modules = ModuleArena::new();
        let mut robots = vec![
            mover(&mut modules, 6.0, Coord::ORIGIN),
            mover(&mut modules, 2.0, Coord::ORIGIN),
        ];
        let mut task = Task::transport("t", (0.0, 0.0), (10.0, 0.0), 1.0, 10.0).unwrap();
        task.init_dependencies(vec![]).unwrap();
        task.assign_robot(RobotId(0), &robots[0]).unwrap();
        task.assign_robot(RobotId(1), &robots[1]).unwrap();
        assert!(task.update(true, &mut robots, &mut modules).unwrap());
        assert!(task.coordinate().within_range(Coord::new(2.0, 0.0)));
    }

    #[test]
    fn test_transport_module_moves_its_payload() {
        let mut modules = ModuleArena::new();
        let payload = modules.insert(
            Module::new(ModuleType::new("cell", 100.0), "payload", (0.0, 0.0), 50.0, 0.0)
                .unwrap(),
        );
        let mut robots = vec![mover(&mut modules, 5.0, Coord::ORIGIN)];
        let mut task = Task::transport_module(
            "haul",
            payload,
            &modules,
            (0.0, 0.0),
            (10.0, 0.0),
            1.0,
            10.0,
        )
        .unwrap();
        assert!(matches!(task.kind(), TaskKind::TransportModule { .. }));

        task.assign_robot(RobotId(0), &robots[0]).unwrap();
        assert!(task.update(true, &mut robots, &mut modules).unwrap());
        assert!(modules
            .get(payload)
            .coordinate()
            .within_range(Coord::new(5.0, 0.0)));

        task.release_robot();
        task.assign_robot(RobotId(0), &robots[0]).unwrap();
        assert!(task.update(true, &mut robots, &mut modules).unwrap());
        assert_eq!(modules.get(payload).coordinate(), Coord::new(10.0, 0.0));
        assert!(task.is_completed());
    }

    #[test]
    fn test_transport_module_origin_must_match_module() {
        let mut modules = ModuleArena::new();
        let payload = modules.insert(
            Module::new(ModuleType::new("cell", 100.0), "payload", (3.0, 0.0), 50.0, 0.0)
                .unwrap(),
        );
        let err = Task::transport_module(
            "haul",
            payload,
            &modules,
            (0.0, 0.0),
            (10.0, 0.0),
            1.0,
            10.0,
        );
        assert!(matches!(err, Err(SimError::Validation(_))));
    }

    #[test]
    fn test_robot_that_cannot_follow_fails_the_step() {
        let mut modules = ModuleArena::new();
        // resistance below 1 makes the payload faster than the robot
        let mut robots = vec![mover(&mut modules, 4.0, Coord::ORIGIN)];
        let mut task = Task::transport("t", (0.0, 0.0), (100.0, 0.0), 0.5, 50.0).unwrap();
        task.init_dependencies(vec![]).unwrap();
        task.assign_robot(RobotId(0), &robots[0]).unwrap();
        assert!(matches!(
            task.update(true, &mut robots, &mut modules),
            Err(SimError::IllegalState(_))
        ));
    }
}
