//! The discrete-step simulation loop.
//!
//! Each step runs four phases over insertion-ordered collections:
//!
//! 1. every agent decides (recharge beats priority work) and either travels
//!    toward its task or registers on site,
//! 2. work tasks execute in insertion order; robots on tasks that made
//!    progress run their modules for a working step,
//! 3. charging stations execute and top up their docked robots,
//! 4. step-scoped assignments are dropped and robot states recomputed.
//!
//! Phase order is a fixed contract: assignment happens strictly before
//! execution, and state recomputation strictly after, so a module failure
//! during phase 2 only takes effect in the next step's decisions.

use std::collections::BTreeMap;

use crate::agent::RobotAgent;
use crate::error::{SimError, SimResult};
use crate::robot::RobotId;
use crate::world::World;

pub struct Simulator {
    world: World,
    agents: Vec<RobotAgent>,
    step_count: u64,
}

impl Simulator {
    /// Build a simulator over a fully-populated world. `priorities` maps
    /// every robot name to its ordered list of work-task names; tasks must
    /// exist, be work tasks and have their dependencies resolved. All
    /// scenarios are initialized here.
    pub fn new(mut world: World, priorities: &BTreeMap<String, Vec<String>>) -> SimResult<Self> {
        for &id in &world.work {
            if !world.tasks.get(id).has_dependencies_resolved() {
                return Err(SimError::illegal_state(format!(
                    "task '{}' has unresolved dependencies",
                    world.tasks.get(id).name()
                )));
            }
        }

        let mut agents = Vec::with_capacity(world.robots.len());
        for (index, robot) in world.robots.iter().enumerate() {
            let names = priorities.get(robot.name()).ok_or_else(|| {
                SimError::validation(format!(
                    "no priority list for robot '{}'",
                    robot.name()
                ))
            })?;
            let mut priority = Vec::with_capacity(names.len());
            for name in names {
                let id = world.task_id(name).ok_or_else(|| {
                    SimError::validation(format!(
                        "unknown task '{}' in priority list of robot '{}'",
                        name,
                        robot.name()
                    ))
                })?;
                if !world.work.contains(&id) {
                    return Err(SimError::validation(format!(
                        "task '{}' in priority list of robot '{}' is not a work task",
                        name,
                        robot.name()
                    )));
                }
                priority.push(id);
            }
            agents.push(RobotAgent::new(RobotId(index), priority));
        }

        for scenario in &mut world.scenarios {
            scenario.initialize()?;
        }

        Ok(Self {
            world,
            agents,
            step_count: 0,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn agents(&self) -> &[RobotAgent] {
        &self.agents
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// True once every work task is complete. Stations never complete and
    /// do not count.
    pub fn is_finished(&self) -> bool {
        self.world
            .work
            .iter()
            .all(|&id| self.world.tasks.get(id).is_completed())
    }

    /// Advance the simulation by one step.
    pub fn step(&mut self) -> SimResult<()> {
        let World {
            modules,
            robots,
            tasks,
            work,
            map,
            scenarios,
        } = &mut self.world;

        // phase 1: decide and move
        for agent in &mut self.agents {
            let robot = &mut robots[agent.robot().0];
            agent.set_state_idle();
            if agent.is_inactive(robot) {
                continue;
            }
            agent.decide_recharge(robot, modules, tasks, map.stations());
            agent.update_task(tasks);
            if agent.assigned_task().is_none() {
                continue;
            }
            if agent.is_on_site(robot, tasks)? {
                agent.ready(robot, tasks)?;
            } else {
                agent.travel(robot, modules, tasks, scenarios)?;
            }
        }

        // phase 2: execute work tasks in insertion order
        for &id in work.iter() {
            let deps_completed = tasks
                .get(id)
                .dependencies()?
                .iter()
                .all(|&dep| tasks.get(dep).is_completed());
            let executed = tasks.get_mut(id).update(deps_completed, robots, modules)?;
            if executed {
                let crew: Vec<RobotId> = tasks.get(id).assigned().to_vec();
                for rid in crew {
                    self.agents[rid.0].set_state_work(&mut robots[rid.0], modules, scenarios)?;
                }
            }
            tasks.get_mut(id).release_robot();
        }

        // phase 3: stations charge their docked robots
        for &id in map.stations() {
            tasks.get_mut(id).update(true, robots, modules)?;
            tasks.get_mut(id).release_robot();
        }

        // phase 4: clear step-scoped choices, recompute robot states
        for agent in &mut self.agents {
            let robot = &mut robots[agent.robot().0];
            agent.reset_task(robot, modules, tasks);
            robot.update_state(modules);
        }

        self.step_count += 1;
        Ok(())
    }

    /// Run until every work task is complete or `max_steps` is reached.
    /// Returns the number of steps taken.
    pub fn run(&mut self, max_steps: u64) -> SimResult<u64> {
        let start = self.step_count;
        while !self.is_finished() && self.step_count - start < max_steps {
            self.step()?;
        }
        Ok(self.step_count - start)
    }

    /// Workload still open across all work tasks.
    pub fn total_remaining_workload(&self) -> f64 {
        self.world
            .work
            .iter()
            .map(|&id| self.world.tasks.get(id).remaining_workload())
            .sum()
    }

    /// Population variance of remaining workload across work tasks.
    pub fn variance_remaining_workload(&self) -> f64 {
        variance(
            self.world
                .work
                .iter()
                .map(|&id| self.world.tasks.get(id).remaining_workload()),
        )
    }

    /// Population variance of operating time across all modules. A spread-
    /// out wear profile means some modules are much closer to failure than
    /// the fleet average.
    pub fn variance_operating_time(&self) -> f64 {
        variance(self.world.modules.iter().map(|(_, m)| m.operating_time()))
    }
}

fn variance(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
