//! Blueprints — serde descriptors from which worlds are built.
//!
//! A [`WorldSpec`] is the declarative form of a fleet: module and robot
//! types, the concrete instances, tasks, stations, failure scenarios,
//! dependency edges and per-robot task priorities. `build` validates the
//! whole graph and produces a fresh [`World`]; building twice yields two
//! fully independent worlds, which is how replications work.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::geometry::Coord;
use crate::module::{Module, ModuleId, ModuleType};
use crate::risk::ExponentialFailure;
use crate::robot::{PerformanceAttribute, Robot, RobotType};
use crate::simulator::Simulator;
use crate::task::{Task, TaskId};
use crate::world::World;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleTypeSpec {
    pub max_battery: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    pub module_type: String,
    pub coordinate: Coord,
    pub battery: f64,
    #[serde(default)]
    pub operating_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotTypeSpec {
    pub required_modules: BTreeMap<String, usize>,
    pub performance: BTreeMap<PerformanceAttribute, f64>,
    pub power_consumption: f64,
    pub recharge_trigger: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotSpec {
    pub name: String,
    pub robot_type: String,
    pub coordinate: Coord,
    /// Module names, in mounting order.
    pub components: Vec<String>,
}

/// Declarative task descriptor. Assembly tasks are not declared; they are
/// generated for every robot built with missing components.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum TaskSpec {
    Manufacture {
        name: String,
        coordinate: Coord,
        total_workload: f64,
        #[serde(default)]
        completed_workload: f64,
    },
    Transport {
        name: String,
        origin: Coord,
        destination: Coord,
        resistance: f64,
        total_workload: f64,
    },
    /// The origin is the named module's coordinate at build time.
    TransportModule {
        name: String,
        module: String,
        destination: Coord,
        resistance: f64,
        total_workload: f64,
    },
}

impl TaskSpec {
    fn name(&self) -> &str {
        match self {
            TaskSpec::Manufacture { name, .. }
            | TaskSpec::Transport { name, .. }
            | TaskSpec::TransportModule { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSpec {
    pub name: String,
    pub coordinate: Coord,
    pub charging_speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ScenarioSpec {
    ExponentialFailure {
        name: String,
        failure_rate: f64,
        seed: u64,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSpec {
    #[serde(default)]
    pub module_types: BTreeMap<String, ModuleTypeSpec>,
    #[serde(default)]
    pub robot_types: BTreeMap<String, RobotTypeSpec>,
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub robots: Vec<RobotSpec>,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
    #[serde(default)]
    pub stations: Vec<StationSpec>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
    /// Task name → direct prerequisite task names. The stored dependency
    /// set of each task is the transitive closure of these edges.
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
    /// Robot name → ordered work-task names. Work tasks missing from a
    /// robot's list are appended in task insertion order, so every robot
    /// can always fall back to any open task.
    #[serde(default)]
    pub priorities: BTreeMap<String, Vec<String>>,
}

/// A built world together with the fully-expanded priority lists for it.
pub struct BuiltWorld {
    pub world: World,
    pub priorities: BTreeMap<String, Vec<String>>,
}

impl WorldSpec {
    /// Validate the blueprint and build a fresh world from it.
    pub fn build(&self) -> SimResult<BuiltWorld> {
        let mut world = World::new();

        // modules
        let mut module_ids: BTreeMap<&str, ModuleId> = BTreeMap::new();
        for spec in &self.modules {
            let ty = self.module_types.get(&spec.module_type).ok_or_else(|| {
                SimError::validation(format!(
                    "module '{}' references unknown module type '{}'",
                    spec.name, spec.module_type
                ))
            })?;
            if module_ids.contains_key(spec.name.as_str()) {
                return Err(SimError::validation(format!(
                    "duplicate module name '{}'",
                    spec.name
                )));
            }
            let module = Module::new(
                ModuleType::new(&spec.module_type, ty.max_battery),
                &spec.name,
                spec.coordinate,
                spec.battery,
                spec.operating_time,
            )?;
            module_ids.insert(&spec.name, world.add_module(module));
        }

        // robots; each module belongs to at most one robot
        let mut claimed: BTreeMap<ModuleId, &str> = BTreeMap::new();
        for spec in &self.robots {
            let ty = self.robot_types.get(&spec.robot_type).ok_or_else(|| {
                SimError::validation(format!(
                    "robot '{}' references unknown robot type '{}'",
                    spec.name, spec.robot_type
                ))
            })?;
            if world.robot_id(&spec.name).is_some() {
                return Err(SimError::validation(format!(
                    "duplicate robot name '{}'",
                    spec.name
                )));
            }
            let mut components = Vec::with_capacity(spec.components.len());
            for module_name in &spec.components {
                let id = *module_ids.get(module_name.as_str()).ok_or_else(|| {
                    SimError::validation(format!(
                        "robot '{}' references unknown module '{}'",
                        spec.name, module_name
                    ))
                })?;
                if let Some(owner) = claimed.get(&id) {
                    return Err(SimError::validation(format!(
                        "module '{}' assigned to both robot '{}' and robot '{}'",
                        module_name, owner, spec.name
                    )));
                }
                claimed.insert(id, &spec.name);
                components.push(id);
            }
            let robot_type = RobotType {
                name: spec.robot_type.clone(),
                required_modules: ty.required_modules.clone(),
                performance: ty.performance.clone(),
                power_consumption: ty.power_consumption,
                recharge_trigger: ty.recharge_trigger,
            };
            let robot = Robot::new(
                robot_type,
                &spec.name,
                spec.coordinate,
                components,
                &world.modules,
            )?;
            world.add_robot(robot);
        }

        // declared tasks
        for spec in &self.tasks {
            if world.task_id(spec.name()).is_some() {
                return Err(SimError::validation(format!(
                    "duplicate task name '{}'",
                    spec.name()
                )));
            }
            let task = match spec {
                TaskSpec::Manufacture {
                    name,
                    coordinate,
                    total_workload,
                    completed_workload,
                } => Task::manufacture(name, *coordinate, *total_workload, *completed_workload)?,
                TaskSpec::Transport {
                    name,
                    origin,
                    destination,
                    resistance,
                    total_workload,
                } => Task::transport(name, *origin, *destination, *resistance, *total_workload)?,
                TaskSpec::TransportModule {
                    name,
                    module,
                    destination,
                    resistance,
                    total_workload,
                } => {
                    let id = *module_ids.get(module.as_str()).ok_or_else(|| {
                        SimError::validation(format!(
                            "task '{}' references unknown module '{}'",
                            name, module
                        ))
                    })?;
                    let origin = world.modules.get(id).coordinate();
                    Task::transport_module(
                        name,
                        id,
                        &world.modules,
                        origin,
                        *destination,
                        *resistance,
                        *total_workload,
                    )?
                }
            };
            world.add_task(task);
        }

        // stations share the task namespace
        for spec in &self.stations {
            if world.task_id(&spec.name).is_some() {
                return Err(SimError::validation(format!(
                    "duplicate task name '{}'",
                    spec.name
                )));
            }
            world.add_station(Task::charge(&spec.name, spec.coordinate, spec.charging_speed)?)?;
        }

        // generated assembly tasks for robots built incomplete
        let declared_work = world.work.len();
        for index in 0..world.robots.len() {
            if world.robots[index].missing_components().is_empty() {
                continue;
            }
            let name = format!("assemble_{}", world.robots[index].name());
            if world.task_id(&name).is_some() {
                return Err(SimError::validation(format!(
                    "duplicate task name '{}'",
                    name
                )));
            }
            let task = Task::assembly(name, crate::robot::RobotId(index), &world.robots)?;
            world.add_task(task);
        }

        self.resolve_dependencies(&mut world)?;

        for spec in &self.scenarios {
            let ScenarioSpec::ExponentialFailure {
                name,
                failure_rate,
                seed,
            } = spec;
            world.add_scenario(Box::new(ExponentialFailure::new(name, *failure_rate, *seed)));
        }

        let priorities = self.expand_priorities(&world, declared_work)?;
        Ok(BuiltWorld { world, priorities })
    }

    /// Build the world and wrap it in a ready simulator.
    pub fn build_simulator(&self) -> SimResult<Simulator> {
        let built = self.build()?;
        Simulator::new(built.world, &built.priorities)
    }

    /// Resolve the declared dependency edges into per-task transitive
    /// closures and initialize every work task's dependency set.
    fn resolve_dependencies(&self, world: &mut World) -> SimResult<()> {
        let mut direct: BTreeMap<TaskId, Vec<TaskId>> = BTreeMap::new();
        for (task_name, dep_names) in &self.dependencies {
            let id = world.task_id(task_name).ok_or_else(|| {
                SimError::validation(format!(
                    "dependency entry for unknown task '{}'",
                    task_name
                ))
            })?;
            if world.tasks.get(id).has_dependencies_resolved() {
                return Err(SimError::validation(format!(
                    "task '{}' carries a fixed dependency set and cannot be listed",
                    task_name
                )));
            }
            let mut deps = Vec::with_capacity(dep_names.len());
            for dep_name in dep_names {
                let dep = world.task_id(dep_name).ok_or_else(|| {
                    SimError::validation(format!(
                        "task '{}' depends on unknown task '{}'",
                        task_name, dep_name
                    ))
                })?;
                if !world.work.contains(&dep) {
                    return Err(SimError::validation(format!(
                        "task '{}' depends on '{}', which is not a work task",
                        task_name, dep_name
                    )));
                }
                deps.push(dep);
            }
            direct.insert(id, deps);
        }

        let mut resolved: BTreeMap<TaskId, Vec<TaskId>> = BTreeMap::new();
        let mut stack = Vec::new();
        let roots: Vec<TaskId> = direct.keys().copied().collect();
        for id in roots {
            closure_of(id, &direct, &mut resolved, &mut stack, world)?;
        }

        let work = world.work.clone();
        for &id in &work {
            if world.tasks.get(id).has_dependencies_resolved() {
                continue;
            }
            let deps = resolved.get(&id).cloned().unwrap_or_default();
            world.tasks.get_mut(id).init_dependencies(deps)?;
        }
        Ok(())
    }

    /// Validate the declared priority lists. A declared list must be a
    /// permutation of the blueprint's own work tasks; a robot without a
    /// declared list gets them in insertion order. Generated assembly
    /// tasks are appended to every list, in insertion order.
    fn expand_priorities(
        &self,
        world: &World,
        declared_work: usize,
    ) -> SimResult<BTreeMap<String, Vec<String>>> {
        for robot_name in self.priorities.keys() {
            if world.robot_id(robot_name).is_none() {
                return Err(SimError::validation(format!(
                    "priority entry for unknown robot '{}'",
                    robot_name
                )));
            }
        }

        let declared_tasks = &world.work[..declared_work];
        let mut expanded = BTreeMap::new();
        for robot in &world.robots {
            let mut list: Vec<TaskId> = Vec::new();
            match self.priorities.get(robot.name()) {
                Some(declared) => {
                    for task_name in declared {
                        let id = world.task_id(task_name).ok_or_else(|| {
                            SimError::validation(format!(
                                "unknown task '{}' in priority list of robot '{}'",
                                task_name,
                                robot.name()
                            ))
                        })?;
                        if !declared_tasks.contains(&id) {
                            let reason = if world.work.contains(&id) {
                                "is a generated assembly task"
                            } else {
                                "is not a work task"
                            };
                            return Err(SimError::validation(format!(
                                "task '{}' in priority list of robot '{}' {}",
                                task_name,
                                robot.name(),
                                reason
                            )));
                        }
                        if list.contains(&id) {
                            return Err(SimError::validation(format!(
                                "task '{}' listed twice in priority list of robot '{}'",
                                task_name,
                                robot.name()
                            )));
                        }
                        list.push(id);
                    }
                    if list.len() != declared_tasks.len() {
                        let omitted = declared_tasks
                            .iter()
                            .copied()
                            .find(|id| !list.contains(id))
                            .map(|id| world.tasks.get(id).name())
                            .unwrap_or_default();
                        return Err(SimError::validation(format!(
                            "priority list of robot '{}' omits task '{}'",
                            robot.name(),
                            omitted
                        )));
                    }
                }
                None => list.extend_from_slice(declared_tasks),
            }
            list.extend_from_slice(&world.work[declared_work..]);
            expanded.insert(
                robot.name().to_string(),
                list.into_iter()
                    .map(|id| world.tasks.get(id).name().to_string())
                    .collect(),
            );
        }
        Ok(expanded)
    }
}

/// Depth-first transitive closure with cycle detection. The closure order
/// is direct dependencies first, then theirs, deduplicated.
fn closure_of(
    id: TaskId,
    direct: &BTreeMap<TaskId, Vec<TaskId>>,
    resolved: &mut BTreeMap<TaskId, Vec<TaskId>>,
    stack: &mut Vec<TaskId>,
    world: &World,
) -> SimResult<Vec<TaskId>> {
    if let Some(done) = resolved.get(&id) {
        return Ok(done.clone());
    }
    if stack.contains(&id) {
        return Err(SimError::validation(format!(
            "dependency cycle involving task '{}'",
            world.tasks.get(id).name()
        )));
    }
    stack.push(id);
    let mut closure: Vec<TaskId> = Vec::new();
    let deps = direct.get(&id).cloned().unwrap_or_default();
    for dep in deps {
        if !closure.contains(&dep) {
            closure.push(dep);
        }
        for transitive in closure_of(dep, direct, resolved, stack, world)? {
            if !closure.contains(&transitive) {
                closure.push(transitive);
            }
        }
    }
    stack.pop();
    resolved.insert(id, closure.clone());
    Ok(closure)
}
