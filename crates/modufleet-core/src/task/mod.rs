//! Task hierarchy — dependency-gated units of work.
//!
//! Every task shares one contract: robots are assigned for the duration of
//! a single step, progress requires the assigned robots' summed performance
//! in the variant's attribute to reach 1.0, and prerequisite tasks must all
//! be complete. Variant behavior lives in the sibling modules; the common
//! state and validation live here.
//!
//! Like robots, tasks are identity: no `Clone`, rebuild from descriptors.

mod assembly;
mod charge;
mod manufacture;
mod transport;

pub use transport::Route;

use crate::error::{SimError, SimResult};
use crate::geometry::Coord;
use crate::module::{ModuleArena, ModuleId};
use crate::robot::{PerformanceAttribute, Robot, RobotId, RobotState};

/// Handle for a task in a world's task arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub usize);

/// Variant-specific task data.
#[derive(Debug, Clone, Copy)]
pub enum TaskKind {
    /// Stationary work advancing 1.0 workload per productive step.
    Manufacture,
    /// Move a payload from origin to destination at distance × resistance
    /// cost. The task coordinate is the payload's current position.
    Transport(Route),
    /// A transport whose payload is a specific module.
    TransportModule { route: Route, module: ModuleId },
    /// Self-assembly of one robot from its missing components.
    Assembly { robot: RobotId },
    /// A charging station: a standing resource, never complete.
    Charge { charging_speed: f64 },
}

/// A unit of work. Construction validates the static invariants of the
/// variant; progress happens through [`Task::update`] once per step.
#[derive(Debug)]
pub struct Task {
    name: String,
    coordinate: Coord,
    total_workload: f64,
    completed_workload: f64,
    dependencies: Option<Vec<TaskId>>,
    assigned: Vec<RobotId>,
    kind: TaskKind,
}

impl Task {
    fn base(
        name: impl Into<String>,
        coordinate: Coord,
        total_workload: f64,
        completed_workload: f64,
        dependencies: Option<Vec<TaskId>>,
        kind: TaskKind,
    ) -> SimResult<Self> {
        let name = name.into();
        if total_workload < 0.0 {
            return Err(SimError::validation(format!(
                "total_workload must be non-negative on task '{}'",
                name
            )));
        }
        if completed_workload < 0.0 {
            return Err(SimError::validation(format!(
                "completed_workload must be non-negative on task '{}'",
                name
            )));
        }
        if completed_workload > total_workload {
            return Err(SimError::validation(format!(
                "completed_workload exceeds total_workload on task '{}'",
                name
            )));
        }
        Ok(Self {
            name,
            coordinate,
            total_workload,
            completed_workload,
            dependencies,
            assigned: Vec::new(),
            kind,
        })
    }

    /// A stationary manufacture task.
    pub fn manufacture(
        name: impl Into<String>,
        coordinate: impl Into<Coord>,
        total_workload: f64,
        completed_workload: f64,
    ) -> SimResult<Self> {
        Self::base(
            name,
            coordinate.into(),
            total_workload,
            completed_workload,
            None,
            TaskKind::Manufacture,
        )
    }

    /// A transport task. The payload starts at the origin and
    /// `total_workload` must equal `resistance × |destination − origin|`.
    pub fn transport(
        name: impl Into<String>,
        origin: impl Into<Coord>,
        destination: impl Into<Coord>,
        resistance: f64,
        total_workload: f64,
    ) -> SimResult<Self> {
        let name = name.into();
        let route = Route {
            origin: origin.into(),
            destination: destination.into(),
            resistance,
        };
        route.check_workload(&name, total_workload)?;
        Self::base(
            name,
            route.origin,
            total_workload,
            0.0,
            None,
            TaskKind::Transport(route),
        )
    }

    /// A transport task whose payload is a module. The origin must coincide
    /// with the module's current coordinate.
    pub fn transport_module(
        name: impl Into<String>,
        module: ModuleId,
        modules: &ModuleArena,
        origin: impl Into<Coord>,
        destination: impl Into<Coord>,
        resistance: f64,
        total_workload: f64,
    ) -> SimResult<Self> {
        let name = name.into();
        let route = Route {
            origin: origin.into(),
            destination: destination.into(),
            resistance,
        };
        if !route.origin.within_range(modules.get(module).coordinate()) {
            return Err(SimError::validation(format!(
                "origin of task '{}' does not match the coordinate of module '{}'",
                name,
                modules.get(module).name()
            )));
        }
        route.check_workload(&name, total_workload)?;
        Self::base(
            name,
            route.origin,
            total_workload,
            0.0,
            Some(Vec::new()),
            TaskKind::TransportModule { route, module },
        )
    }

    /// A self-assembly task for one robot. The workload is the robot's
    /// missing-component count at creation time.
    pub fn assembly(
        name: impl Into<String>,
        robot: RobotId,
        robots: &[Robot],
    ) -> SimResult<Self> {
        let target = &robots[robot.0];
        let total_workload = target.missing_components().len() as f64;
        Self::base(
            name,
            target.coordinate(),
            total_workload,
            0.0,
            Some(Vec::new()),
            TaskKind::Assembly { robot },
        )
    }

    /// A charging station. Stations carry no workload semantics.
    pub fn charge(
        name: impl Into<String>,
        coordinate: impl Into<Coord>,
        charging_speed: f64,
    ) -> SimResult<Self> {
        Self::base(
            name,
            coordinate.into(),
            0.0,
            0.0,
            Some(Vec::new()),
            TaskKind::Charge { charging_speed },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinate(&self) -> Coord {
        self.coordinate
    }

    pub fn total_workload(&self) -> f64 {
        self.total_workload
    }

    pub fn completed_workload(&self) -> f64 {
        self.completed_workload
    }

    pub fn remaining_workload(&self) -> f64 {
        self.total_workload - self.completed_workload
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn is_charge(&self) -> bool {
        matches!(self.kind, TaskKind::Charge { .. })
    }

    /// Resolve the dependency set. May be called at most once; transport-
    /// module, assembly and charge tasks come with a fixed empty set.
    pub fn init_dependencies(&mut self, dependencies: Vec<TaskId>) -> SimResult<()> {
        if self.dependencies.is_some() {
            return Err(SimError::illegal_state(format!(
                "dependencies of task '{}' are already resolved",
                self.name
            )));
        }
        self.dependencies = Some(dependencies);
        Ok(())
    }

    /// The resolved dependency set; fails if it was never resolved.
    pub fn dependencies(&self) -> SimResult<&[TaskId]> {
        self.dependencies
            .as_deref()
            .ok_or_else(|| {
                SimError::uninitialized(format!(
                    "dependencies of task '{}' accessed before resolution",
                    self.name
                ))
            })
    }

    pub fn has_dependencies_resolved(&self) -> bool {
        self.dependencies.is_some()
    }

    /// Charge stations never complete; all other variants complete when the
    /// workload is done.
    pub fn is_completed(&self) -> bool {
        if self.is_charge() {
            return false;
        }
        self.completed_workload >= self.total_workload
    }

    /// The performance attribute this variant consumes, if any.
    pub fn performance_attribute(&self) -> Option<PerformanceAttribute> {
        match self.kind {
            TaskKind::Manufacture => Some(PerformanceAttribute::Manufacture),
            TaskKind::Transport(_) | TaskKind::TransportModule { .. } => {
                Some(PerformanceAttribute::Transport)
            }
            TaskKind::Assembly { .. } | TaskKind::Charge { .. } => None,
        }
    }

    /// True if the assigned robots' summed performance in this variant's
    /// attribute reaches 1.0. Variants without an attribute are satisfied
    /// by construction.
    pub fn is_performance_satisfied(&self, robots: &[Robot]) -> bool {
        match self.performance_attribute() {
            Some(attr) => {
                let total: f64 = self
                    .assigned
                    .iter()
                    .map(|&id| robots[id.0].ty().performance(attr))
                    .sum();
                total >= 1.0
            }
            None => true,
        }
    }

    /// Robots assigned during the current step.
    pub fn assigned(&self) -> &[RobotId] {
        &self.assigned
    }

    /// Register a robot for this step. The robot must be active and
    /// positionally coincident with the task.
    pub fn assign_robot(&mut self, id: RobotId, robot: &Robot) -> SimResult<()> {
        if robot.state() != RobotState::Active {
            return Err(SimError::illegal_state(format!(
                "robot '{}' in state {:?} assigned to task '{}'",
                robot.name(),
                robot.state(),
                self.name
            )));
        }
        if !robot.coordinate().within_range(self.coordinate) {
            return Err(SimError::illegal_state(format!(
                "robot '{}' with mismatched coordinates assigned to task '{}'",
                robot.name(),
                self.name
            )));
        }
        self.assigned.push(id);
        Ok(())
    }

    /// Clear the step-scoped assignment list.
    pub fn release_robot(&mut self) {
        self.assigned.clear();
    }

    /// Execute one step of this task. `deps_completed` is the caller's
    /// observation of `dependencies()` over the current task set. Returns
    /// true if the task made progress.
    pub fn update(
        &mut self,
        deps_completed: bool,
        robots: &mut [Robot],
        modules: &mut ModuleArena,
    ) -> SimResult<bool> {
        match self.kind {
            TaskKind::Manufacture => manufacture::update(self, deps_completed, robots),
            TaskKind::Transport(route) => {
                transport::update(self, route, None, deps_completed, robots, modules)
            }
            TaskKind::TransportModule { route, module } => {
                transport::update(self, route, Some(module), deps_completed, robots, modules)
            }
            TaskKind::Assembly { robot } => assembly::update(self, robot, robots, modules),
            TaskKind::Charge { charging_speed } => {
                charge::update(self, charging_speed, robots, modules)
            }
        }
    }
}

/// Owns every task of a world, work tasks and charging stations alike.
#[derive(Debug, Default)]
pub struct TaskArena {
    tasks: Vec<Task>,
}

impl TaskArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task: Task) -> TaskId {
        let id = TaskId(self.tasks.len());
        self.tasks.push(task);
        id
    }

    pub fn get(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    pub fn get_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id.0]
    }

    pub fn id_of(&self, name: &str) -> Option<TaskId> {
        self.tasks.iter().position(|t| t.name == name).map(TaskId)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.tasks.iter().enumerate().map(|(i, t)| (TaskId(i), t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_workload_validation() {
        assert!(Task::manufacture("t", (0.0, 0.0), -1.0, 0.0).is_err());
        assert!(Task::manufacture("t", (0.0, 0.0), 3.0, 4.0).is_err());
        assert!(Task::manufacture("t", (0.0, 0.0), 3.0, 3.0).is_ok());
    }

    #[test]
    fn test_dependencies_lifecycle() {
        let mut t = Task::manufacture("t", (0.0, 0.0), 3.0, 0.0).unwrap();
        assert!(matches!(
            t.dependencies(),
            Err(SimError::Uninitialized(_))
        ));
        t.init_dependencies(vec![TaskId(1)]).unwrap();
        assert_eq!(t.dependencies().unwrap(), &[TaskId(1)]);
        assert!(matches!(
            t.init_dependencies(vec![]),
            Err(SimError::IllegalState(_))
        ));
    }

    #[test]
    fn test_fixed_variants_come_with_empty_dependencies() {
        let t = Task::charge("dock", (0.0, 0.0), 5.0).unwrap();
        assert_eq!(t.dependencies().unwrap(), &[] as &[TaskId]);
        assert!(matches!(
            Task::charge("dock", (0.0, 0.0), 5.0)
                .unwrap()
                .init_dependencies(vec![]),
            Err(SimError::IllegalState(_))
        ));
    }

    #[test]
    fn test_charge_never_completes() {
        let t = Task::charge("dock", (0.0, 0.0), 5.0).unwrap();
        assert!(!t.is_completed());
    }

    #[test]
    fn test_performance_attribute_mapping() {
        let m = Task::manufacture("m", (0.0, 0.0), 1.0, 0.0).unwrap();
        assert_eq!(
            m.performance_attribute(),
            Some(PerformanceAttribute::Manufacture)
        );
        let t = Task::transport("t", (0.0, 0.0), (10.0, 0.0), 2.0, 20.0).unwrap();
        assert_eq!(
            t.performance_attribute(),
            Some(PerformanceAttribute::Transport)
        );
        let c = Task::charge("c", (0.0, 0.0), 5.0).unwrap();
        assert_eq!(c.performance_attribute(), None);
    }

    #[test]
    fn test_arena_lookup_by_name() {
        let mut arena = TaskArena::new();
        let a = arena.insert(Task::manufacture("alpha", (0.0, 0.0), 1.0, 0.0).unwrap());
        arena.insert(Task::manufacture("beta", (0.0, 0.0), 1.0, 0.0).unwrap());
        assert_eq!(arena.id_of("alpha"), Some(a));
        assert_eq!(arena.id_of("gamma"), None);
    }
}
