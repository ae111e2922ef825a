//! Mission lifecycle engine: mission records, stage timing, and cancellation.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::FleetError;
use crate::registry::FleetRegistry;
use crate::types::{Mission, MissionId, MissionStage, RobotId, RobotPatch, Timestamp};

/// Nominal time a mission spends in each timed stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageTable {
    pub preparation: Duration,
    pub travel: Duration,
    pub delivery: Duration,
    pub completed: Duration,
}

impl StageTable {
    /// Same duration for every stage; handy for accelerated runs.
    pub fn uniform(duration: Duration) -> Self {
        Self {
            preparation: duration,
            travel: duration,
            delivery: duration,
            completed: duration,
        }
    }

    /// Duration of `stage`; `None` for the untimed cancelled stage.
    pub fn duration(&self, stage: MissionStage) -> Option<Duration> {
        match stage {
            MissionStage::Preparation => Some(self.preparation),
            MissionStage::Travel => Some(self.travel),
            MissionStage::Delivery => Some(self.delivery),
            MissionStage::Completed => Some(self.completed),
            MissionStage::Cancelled => None,
        }
    }
}

impl Default for StageTable {
    fn default() -> Self {
        Self {
            preparation: Duration::from_secs(30),
            travel: Duration::from_secs(150),
            delivery: Duration::from_secs(60),
            completed: Duration::from_secs(5),
        }
    }
}

/// Owns every mission ever created. Records are never removed.
#[derive(Debug)]
pub struct MissionStore {
    missions: BTreeMap<MissionId, Mission>,
    next_id: MissionId,
}

impl MissionStore {
    pub fn new() -> Self {
        Self {
            missions: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create a mission in `Preparation` bound to `robot`.
    pub fn create(&mut self, robot: RobotId, now: Timestamp) -> Mission {
        let id = self.next_id;
        self.next_id += 1;
        let mission = Mission {
            id,
            assigned_robot_id: robot,
            current_stage: MissionStage::Preparation,
            created_at: now,
            stage_start_time: now,
        };
        self.missions.insert(id, mission.clone());
        mission
    }

    pub fn get(&self, id: MissionId) -> Option<&Mission> {
        self.missions.get(&id)
    }

    pub fn list(&self) -> Vec<Mission> {
        self.missions.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mission> {
        self.missions.values()
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    /// Move a mission along a legal edge and restart its stage timer.
    /// Returns the stage it left.
    fn transition(
        &mut self,
        id: MissionId,
        to: MissionStage,
        now: Timestamp,
    ) -> Result<MissionStage, FleetError> {
        let mission = self
            .missions
            .get_mut(&id)
            .ok_or(FleetError::MissionNotFound(id))?;
        if !mission.current_stage.can_transition_to(to) {
            return Err(FleetError::InvalidTransition {
                mission: id,
                from: mission.current_stage,
                to,
            });
        }
        let from = mission.current_stage;
        mission.current_stage = to;
        mission.stage_start_time = now;
        Ok(from)
    }
}

impl Default for MissionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts from one advancement pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Missions that moved to their next stage.
    pub transitioned: usize,
    /// Robots released after their mission's completed stage elapsed.
    pub released: usize,
    /// Bound missions skipped because they were missing or cancelled.
    pub skipped: usize,
}

/// Run one advancement tick.
///
/// Each bound mission moves at most one stage per call, and only once its
/// current stage has run for at least the nominal duration. Because this is
/// polled, a stage is observed complete up to one tick interval late.
pub fn advance(
    registry: &mut FleetRegistry,
    missions: &mut MissionStore,
    stages: &StageTable,
    now: Timestamp,
) -> AdvanceReport {
    let mut report = AdvanceReport::default();
    let bound: Vec<(RobotId, MissionId)> = registry
        .iter()
        .filter_map(|robot| robot.current_mission_id.map(|mission| (robot.id, mission)))
        .collect();

    for (robot_id, mission_id) in bound {
        let Some(mission) = missions.get(mission_id) else {
            report.skipped += 1;
            continue;
        };
        // Cancellation takes effect here: cancelled missions never advance.
        if mission.current_stage == MissionStage::Cancelled {
            report.skipped += 1;
            continue;
        }
        let stage = mission.current_stage;
        let Some(duration) = stages.duration(stage) else {
            continue;
        };
        // A stage start in the future (clock skew) counts as no time elapsed.
        let elapsed = (now - mission.stage_start_time)
            .to_std()
            .unwrap_or_default();
        if elapsed < duration {
            continue;
        }

        match stage.next() {
            Some(next) => {
                if let Err(err) = missions.transition(mission_id, next, now) {
                    debug!(mission = mission_id, error = %err, "transition refused");
                    continue;
                }
                if let Some(status) = next.robot_status() {
                    registry.update(robot_id, RobotPatch::status(status), now);
                }
                info!(
                    mission = mission_id,
                    robot = robot_id,
                    from = %stage,
                    to = %next,
                    "mission advanced"
                );
                report.transitioned += 1;
            }
            None => {
                registry.update(robot_id, RobotPatch::idle(), now);
                info!(mission = mission_id, robot = robot_id, "robot released");
                report.released += 1;
            }
        }
    }

    debug!(
        transitioned = report.transitioned,
        released = report.released,
        skipped = report.skipped,
        "advancement tick"
    );
    report
}

/// Cancel the mission bound to `robot_id` and release the robot.
///
/// Fails with `RobotNotFound` for unknown robots and `NoActiveMission` when the
/// robot is not bound, so repeating a cancel has no further effect.
pub fn cancel(
    registry: &mut FleetRegistry,
    missions: &mut MissionStore,
    robot_id: RobotId,
    now: Timestamp,
) -> Result<MissionId, FleetError> {
    let robot = registry
        .get(robot_id)
        .ok_or(FleetError::RobotNotFound(robot_id))?;
    let mission_id = robot
        .current_mission_id
        .ok_or(FleetError::NoActiveMission(robot_id))?;

    match missions.transition(mission_id, MissionStage::Cancelled, now) {
        Ok(from) => {
            info!(
                mission = mission_id,
                robot = robot_id,
                from = %from,
                "mission cancelled"
            );
        }
        // A dangling or already-cancelled binding still releases the robot.
        Err(err) => debug!(mission = mission_id, error = %err, "releasing robot without transition"),
    }
    registry.update(robot_id, RobotPatch::idle(), now);
    Ok(mission_id)
}
