//! Assembly tasks — rebuilding a robot from its missing components.

use crate::error::SimResult;
use crate::module::ModuleArena;
use crate::robot::{Robot, RobotId};

use super::Task;

/// One step of a self-assembly task: mount the first missing component (in
/// required-list order) that is active and coincident with the target
/// robot. Assemblies do not consume performance and have no prerequisites.
pub(super) fn update(
    task: &mut Task,
    target: RobotId,
    robots: &mut [Robot],
    modules: &mut ModuleArena,
) -> SimResult<bool> {
    if task.is_completed() {
        return Ok(false);
    }
    let robot = &mut robots[target.0];
    let coordinate = robot.coordinate();
    let candidate = robot.missing_components().into_iter().find(|&id| {
        let module = modules.get(id);
        module.is_active() && module.coordinate().within_range(coordinate)
    });
    match candidate {
        Some(id) => {
            robot.mount_module(id, modules)?;
            task.completed_workload += 1.0;
            Ok(true)
        }
        None => Ok(false),
    }
}
