//! Manufacture tasks — stationary work at a fixed site.

use crate::error::SimResult;
use crate::robot::Robot;

use super::Task;

/// One step of a manufacture task: advance the workload by exactly 1.0 when
/// the assigned performance and the prerequisites allow it.
pub(super) fn update(task: &mut Task, deps_completed: bool, robots: &mut [Robot]) -> SimResult<bool> {
    if !task.is_performance_satisfied(robots) || !deps_completed {
        return Ok(false);
    }
    task.completed_workload = (task.completed_workload + 1.0).min(task.total_workload);
    Ok(true)
}
