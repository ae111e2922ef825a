//! Assignment of idle robots to new missions.

use tracing::{debug, info};

use crate::engine::MissionStore;
use crate::registry::FleetRegistry;
use crate::types::{Mission, RobotId, RobotPatch, RobotStatus, Timestamp};

/// Run one creation tick.
///
/// Takes up to `batch_size` idle robots in registry order and gives each a
/// fresh mission. Returns the missions created, which is empty when no robot
/// is idle.
pub fn create_missions(
    registry: &mut FleetRegistry,
    missions: &mut MissionStore,
    batch_size: usize,
    now: Timestamp,
) -> Vec<Mission> {
    let selected: Vec<RobotId> = registry
        .idle()
        .take(batch_size)
        .map(|robot| robot.id)
        .collect();

    let mut created = Vec::with_capacity(selected.len());
    for robot_id in selected {
        let mission = missions.create(robot_id, now);
        registry.update(
            robot_id,
            RobotPatch::bind(RobotStatus::Assigned, mission.id),
            now,
        );
        info!(mission = mission.id, robot = robot_id, "mission created");
        created.push(mission);
    }

    debug!(created = created.len(), batch_size, "creation tick");
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn creates_full_batch_with_distinct_robots() {
        let now = Timestamp::default();
        let mut registry = FleetRegistry::with_fleet(5, now);
        let mut missions = MissionStore::new();

        let created = create_missions(&mut registry, &mut missions, 2, now);
        assert_eq!(created.len(), 2);
        let ids: HashSet<_> = created.iter().map(|m| m.id).collect();
        let robots: HashSet<_> = created.iter().map(|m| m.assigned_robot_id).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(robots.len(), 2);

        for mission in &created {
            let robot = registry.get(mission.assigned_robot_id).expect("robot exists");
            assert_eq!(robot.status, RobotStatus::Assigned);
            assert_eq!(robot.current_mission_id, Some(mission.id));
        }
    }

    #[test]
    fn picks_idle_robots_first_come_first_served() {
        let now = Timestamp::default();
        let mut registry = FleetRegistry::with_fleet(4, now);
        let mut missions = MissionStore::new();

        let first = create_missions(&mut registry, &mut missions, 2, now);
        let second = create_missions(&mut registry, &mut missions, 2, now);
        let robots: Vec<RobotId> = first
            .iter()
            .chain(second.iter())
            .map(|m| m.assigned_robot_id)
            .collect();
        assert_eq!(robots, vec![1, 2, 3, 4]);
    }

    #[test]
    fn partial_batch_when_few_robots_idle() {
        let now = Timestamp::default();
        let mut registry = FleetRegistry::with_fleet(3, now);
        let mut missions = MissionStore::new();

        create_missions(&mut registry, &mut missions, 2, now);
        let created = create_missions(&mut registry, &mut missions, 2, now);
        assert_eq!(created.len(), 1);
        assert_eq!(registry.idle().count(), 0);
    }

    #[test]
    fn no_idle_robots_creates_nothing() {
        let now = Timestamp::default();
        let mut registry = FleetRegistry::with_fleet(2, now);
        let mut missions = MissionStore::new();

        create_missions(&mut registry, &mut missions, 2, now);
        let created = create_missions(&mut registry, &mut missions, 2, now);
        assert!(created.is_empty());
        assert_eq!(missions.len(), 2);
    }
}
