//! Per-robot control agents.
//!
//! Each agent wraps exactly one robot and holds its task priority list. The
//! agent decides between recharging and working, drives the robot toward
//! the chosen task, and registers it there once on site. Agents hold no
//! world state of their own beyond the current choice; everything else is
//! recomputed each step from the world.

use crate::error::{SimError, SimResult};
use crate::module::ModuleArena;
use crate::risk::RiskModel;
use crate::robot::{Robot, RobotId, RobotState};
use crate::task::{TaskArena, TaskId};

/// What the agent did with its robot in the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    /// En route to the chosen task.
    Move,
    /// Docked at a charging station.
    Charge,
    /// On site and registered with the chosen task.
    Assigned,
    /// The chosen task executed with this robot this step.
    Work,
    NoEnergy,
    Defective,
}

pub struct RobotAgent {
    robot: RobotId,
    priority: Vec<TaskId>,
    assigned_task: Option<TaskId>,
    state: AgentState,
}

impl RobotAgent {
    pub fn new(robot: RobotId, priority: Vec<TaskId>) -> Self {
        Self {
            robot,
            priority,
            assigned_task: None,
            state: AgentState::Idle,
        }
    }

    pub fn robot(&self) -> RobotId {
        self.robot
    }

    pub fn priority(&self) -> &[TaskId] {
        &self.priority
    }

    pub fn assigned_task(&self) -> Option<TaskId> {
        self.assigned_task
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    fn is_pinned_to_station(&self, tasks: &TaskArena) -> bool {
        self.assigned_task
            .map(|id| tasks.get(id).is_charge())
            .unwrap_or(false)
    }

    /// Mirror an inoperable robot state. Returns true if the robot cannot
    /// act this step.
    pub fn is_inactive(&mut self, robot: &Robot) -> bool {
        match robot.state() {
            RobotState::NoEnergy => {
                self.state = AgentState::NoEnergy;
                true
            }
            RobotState::Defective => {
                self.state = AgentState::Defective;
                true
            }
            RobotState::Active => false,
        }
    }

    /// Pin the agent to the nearest charging station once the battery drops
    /// below the type's recharge trigger. An existing pin is sticky; it is
    /// only released by [`RobotAgent::reset_task`] when the battery is full.
    /// Equidistant stations resolve to the first one registered.
    pub fn decide_recharge(
        &mut self,
        robot: &Robot,
        modules: &ModuleArena,
        tasks: &TaskArena,
        stations: &[TaskId],
    ) {
        if self.is_pinned_to_station(tasks) {
            return;
        }
        if robot.total_battery(modules) >= robot.ty().recharge_trigger {
            return;
        }
        let position = robot.coordinate();
        let mut nearest: Option<(TaskId, f64)> = None;
        for &id in stations {
            let distance = position.distance(tasks.get(id).coordinate());
            match nearest {
                Some((_, best)) if distance >= best => {}
                _ => nearest = Some((id, distance)),
            }
        }
        if let Some((id, _)) = nearest {
            self.assigned_task = Some(id);
        }
    }

    /// Choose the first incomplete task on the priority list. Does nothing
    /// while pinned to a station.
    pub fn update_task(&mut self, tasks: &TaskArena) {
        if self.is_pinned_to_station(tasks) {
            return;
        }
        self.assigned_task = self
            .priority
            .iter()
            .copied()
            .find(|&id| !tasks.get(id).is_completed());
    }

    pub fn is_on_site(&self, robot: &Robot, tasks: &TaskArena) -> SimResult<bool> {
        let id = self.assigned_task.ok_or_else(|| {
            SimError::illegal_state(format!(
                "agent of robot '{}' checked for arrival without a task",
                robot.name()
            ))
        })?;
        Ok(robot.coordinate().within_range(tasks.get(id).coordinate()))
    }

    /// Move the robot one step toward the chosen task. Traveling is an
    /// operating step: it draws power and wears the modules.
    pub fn travel(
        &mut self,
        robot: &mut Robot,
        modules: &mut ModuleArena,
        tasks: &TaskArena,
        scenarios: &mut [Box<dyn RiskModel>],
    ) -> SimResult<()> {
        let id = self.assigned_task.ok_or_else(|| {
            SimError::illegal_state(format!(
                "agent of robot '{}' told to travel without a task",
                robot.name()
            ))
        })?;
        self.state = AgentState::Move;
        robot.travel(tasks.get(id).coordinate(), modules);
        robot.operate(modules, scenarios)
    }

    /// Register the robot with the chosen task for this step.
    pub fn ready(&mut self, robot: &Robot, tasks: &mut TaskArena) -> SimResult<()> {
        let id = self.assigned_task.ok_or_else(|| {
            SimError::illegal_state(format!(
                "agent of robot '{}' readied without a task",
                robot.name()
            ))
        })?;
        let task = tasks.get_mut(id);
        task.assign_robot(self.robot, robot)?;
        self.state = if task.is_charge() {
            AgentState::Charge
        } else {
            AgentState::Assigned
        };
        Ok(())
    }

    /// Drop the step-scoped task choice. A station pin survives until the
    /// robot's battery is full.
    pub fn reset_task(&mut self, robot: &Robot, modules: &ModuleArena, tasks: &TaskArena) {
        if self.is_pinned_to_station(tasks) && !robot.is_battery_full(modules) {
            return;
        }
        self.assigned_task = None;
    }

    /// The chosen task executed with this robot: run the modules for one
    /// working step.
    pub fn set_state_work(
        &mut self,
        robot: &mut Robot,
        modules: &mut ModuleArena,
        scenarios: &mut [Box<dyn RiskModel>],
    ) -> SimResult<()> {
        robot.operate(modules, scenarios)?;
        self.state = AgentState::Work;
        Ok(())
    }

    pub fn set_state_idle(&mut self) {
        self.state = AgentState::Idle;
    }
}
