//! Aggregate counters derived from fleet and mission snapshots.

use serde::{Deserialize, Serialize};

use crate::types::{Mission, MissionStage, Robot};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total_robots: usize,
    pub idle_robots: usize,
    pub total_missions: usize,
    /// Missions not yet completed or cancelled.
    pub active_missions: usize,
    pub completed_missions: usize,
    pub cancelled_missions: usize,
}

impl FleetStats {
    pub fn derive<'a>(
        robots: impl IntoIterator<Item = &'a Robot>,
        missions: impl IntoIterator<Item = &'a Mission>,
    ) -> Self {
        let mut stats = FleetStats::default();
        for robot in robots {
            stats.total_robots += 1;
            if robot.is_idle() {
                stats.idle_robots += 1;
            }
        }
        for mission in missions {
            stats.total_missions += 1;
            match mission.current_stage {
                MissionStage::Completed => stats.completed_missions += 1,
                MissionStage::Cancelled => stats.cancelled_missions += 1,
                _ => stats.active_missions += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RobotStatus, Timestamp};

    fn mission(id: u64, stage: MissionStage) -> Mission {
        Mission {
            id,
            assigned_robot_id: id,
            current_stage: stage,
            created_at: Timestamp::default(),
            stage_start_time: Timestamp::default(),
        }
    }

    #[test]
    fn counts_each_stage_bucket() {
        let now = Timestamp::default();
        let mut busy = Robot::idle(2, now);
        busy.status = RobotStatus::Delivering;
        busy.current_mission_id = Some(3);
        let robots = [Robot::idle(1, now), busy];
        let missions = [
            mission(1, MissionStage::Completed),
            mission(2, MissionStage::Cancelled),
            mission(3, MissionStage::Delivery),
            mission(4, MissionStage::Preparation),
        ];

        let stats = FleetStats::derive(&robots, &missions);
        assert_eq!(
            stats,
            FleetStats {
                total_robots: 2,
                idle_robots: 1,
                total_missions: 4,
                active_missions: 2,
                completed_missions: 1,
                cancelled_missions: 1,
            }
        );
    }

    #[test]
    fn serializes_dashboard_field_names() {
        let value = serde_json::to_value(FleetStats::default()).expect("serialize stats");
        for key in [
            "totalRobots",
            "idleRobots",
            "totalMissions",
            "activeMissions",
            "completedMissions",
            "cancelledMissions",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
