//! Canonical in-memory store of robot records.

use std::collections::BTreeMap;

use crate::types::{Robot, RobotId, RobotPatch, Timestamp};

/// Owns every robot in the fleet, keyed by id.
///
/// Iteration is always in ascending id order so assignment and snapshots are
/// deterministic. No cross-field checks happen here; the lifecycle engine is
/// responsible for keeping status and mission binding consistent.
#[derive(Debug, Default)]
pub struct FleetRegistry {
    robots: BTreeMap<RobotId, Robot>,
}

impl FleetRegistry {
    /// Build a fleet of `size` idle robots with ids `1..=size`.
    pub fn with_fleet(size: usize, now: Timestamp) -> Self {
        let robots = (1..=size as RobotId)
            .map(|id| (id, Robot::idle(id, now)))
            .collect();
        Self { robots }
    }

    /// Snapshot of all robots.
    pub fn list(&self) -> Vec<Robot> {
        self.robots.values().cloned().collect()
    }

    pub fn get(&self, id: RobotId) -> Option<&Robot> {
        self.robots.get(&id)
    }

    /// Merge `patch` into the robot and stamp `last_updated`.
    pub fn update(&mut self, id: RobotId, patch: RobotPatch, now: Timestamp) -> Option<&Robot> {
        let robot = self.robots.get_mut(&id)?;
        if let Some(status) = patch.status {
            robot.status = status;
        }
        if let Some(mission) = patch.current_mission_id {
            robot.current_mission_id = mission;
        }
        robot.last_updated = now;
        Some(robot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values()
    }

    /// Idle robots in registry order.
    pub fn idle(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values().filter(|robot| robot.is_idle())
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RobotStatus;
    use chrono::TimeDelta;

    #[test]
    fn fleet_starts_idle_in_id_order() {
        let registry = FleetRegistry::with_fleet(5, Timestamp::default());
        let ids: Vec<RobotId> = registry.list().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(registry.idle().count(), 5);
    }

    #[test]
    fn update_merges_fields_and_stamps_time() {
        let start = Timestamp::default();
        let mut registry = FleetRegistry::with_fleet(2, start);
        let later = start + TimeDelta::seconds(3);

        let robot = registry
            .update(2, RobotPatch::bind(RobotStatus::Assigned, 11), later)
            .expect("robot 2 exists")
            .clone();
        assert_eq!(robot.status, RobotStatus::Assigned);
        assert_eq!(robot.current_mission_id, Some(11));
        assert_eq!(robot.last_updated, later);

        // Status-only patch keeps the mission binding.
        let robot = registry
            .update(2, RobotPatch::status(RobotStatus::EnRoute), later)
            .expect("robot 2 exists");
        assert_eq!(robot.current_mission_id, Some(11));

        // Untouched robots keep their original stamp.
        assert_eq!(registry.get(1).map(|r| r.last_updated), Some(start));
    }

    #[test]
    fn update_unknown_robot_is_none() {
        let mut registry = FleetRegistry::with_fleet(1, Timestamp::default());
        assert!(registry
            .update(42, RobotPatch::idle(), Timestamp::default())
            .is_none());
        assert!(registry.get(42).is_none());
    }
}
