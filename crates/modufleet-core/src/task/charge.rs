//! Charging stations.

use crate::error::SimResult;
use crate::module::ModuleArena;
use crate::robot::Robot;

use super::Task;

/// One step of a charging station: every docked robot receives one step of
/// charge. Stations ignore performance and prerequisites and always report
/// progress so docked robots keep operating.
pub(super) fn update(
    task: &mut Task,
    charging_speed: f64,
    robots: &mut [Robot],
    modules: &mut ModuleArena,
) -> SimResult<bool> {
    for &id in &task.assigned {
        robots[id.0].charge_battery_power(charging_speed, modules)?;
    }
    Ok(true)
}
