//! Registry of charging stations on the simulation map.

use crate::error::{SimError, SimResult};
use crate::task::{TaskArena, TaskId};

/// Stations are kept apart from work tasks: agents consult this registry
/// when a battery drops below its recharge trigger, and the station order
/// here is the tie-break between equidistant stations.
#[derive(Debug, Default)]
pub struct SimulationMap {
    stations: Vec<TaskId>,
}

impl SimulationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a charging station. The task must be a charge task.
    pub fn register(&mut self, id: TaskId, tasks: &TaskArena) -> SimResult<()> {
        let task = tasks.get(id);
        if !task.is_charge() {
            return Err(SimError::validation(format!(
                "task '{}' registered as a charging station but is not one",
                task.name()
            )));
        }
        self.stations.push(id);
        Ok(())
    }

    pub fn stations(&self) -> &[TaskId] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn test_register_accepts_only_stations() {
        let mut tasks = TaskArena::new();
        let dock = tasks.insert(Task::charge("dock", (0.0, 0.0), 5.0).unwrap());
        let work = tasks.insert(Task::manufacture("work", (0.0, 0.0), 1.0, 0.0).unwrap());

        let mut map = SimulationMap::new();
        map.register(dock, &tasks).unwrap();
        assert!(map.register(work, &tasks).is_err());
        assert_eq!(map.stations(), &[dock]);
    }
}
