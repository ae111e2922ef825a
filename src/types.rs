//! Shared identifiers, robot records, and the mission stage machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a robot; assigned once when the fleet is built.
pub type RobotId = u64;
/// Unique identifier for a mission; drawn from a monotonic counter.
pub type MissionId = u64;
/// Wall-clock instant used for every record timestamp.
pub type Timestamp = DateTime<Utc>;

/// What a robot is currently doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Idle,
    Assigned,
    EnRoute,
    Delivering,
    Completed,
}

impl RobotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RobotStatus::Idle => "idle",
            RobotStatus::Assigned => "assigned",
            RobotStatus::EnRoute => "en_route",
            RobotStatus::Delivering => "delivering",
            RobotStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase of a mission.
///
/// Non-cancelled missions walk `Preparation -> Travel -> Delivery -> Completed`
/// one step at a time. `Cancelled` is absorbing and can be entered from any
/// other stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStage {
    Preparation,
    Travel,
    Delivery,
    Completed,
    Cancelled,
}

impl MissionStage {
    /// Timed stages in execution order.
    pub const TIMED: [MissionStage; 4] = [
        MissionStage::Preparation,
        MissionStage::Travel,
        MissionStage::Delivery,
        MissionStage::Completed,
    ];

    /// The stage that follows this one, if any.
    pub fn next(self) -> Option<MissionStage> {
        match self {
            MissionStage::Preparation => Some(MissionStage::Travel),
            MissionStage::Travel => Some(MissionStage::Delivery),
            MissionStage::Delivery => Some(MissionStage::Completed),
            MissionStage::Completed | MissionStage::Cancelled => None,
        }
    }

    /// Robot status mirrored while a mission sits in this stage.
    pub fn robot_status(self) -> Option<RobotStatus> {
        match self {
            MissionStage::Preparation => Some(RobotStatus::Assigned),
            MissionStage::Travel => Some(RobotStatus::EnRoute),
            MissionStage::Delivery => Some(RobotStatus::Delivering),
            MissionStage::Completed => Some(RobotStatus::Completed),
            MissionStage::Cancelled => None,
        }
    }

    /// Whether the mission still counts as in flight for statistics.
    pub fn is_active(self) -> bool {
        !matches!(self, MissionStage::Completed | MissionStage::Cancelled)
    }

    /// Legal edges of the stage machine.
    pub fn can_transition_to(self, to: MissionStage) -> bool {
        match to {
            MissionStage::Cancelled => self != MissionStage::Cancelled,
            _ => self.next() == Some(to),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MissionStage::Preparation => "preparation",
            MissionStage::Travel => "travel",
            MissionStage::Delivery => "delivery",
            MissionStage::Completed => "completed",
            MissionStage::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A robot as exposed to pollers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Robot {
    pub id: RobotId,
    pub status: RobotStatus,
    pub current_mission_id: Option<MissionId>,
    pub last_updated: Timestamp,
}

impl Robot {
    /// Construct an idle robot with no mission.
    pub fn idle(id: RobotId, now: Timestamp) -> Self {
        Self {
            id,
            status: RobotStatus::Idle,
            current_mission_id: None,
            last_updated: now,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == RobotStatus::Idle
    }
}

/// Partial robot update; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RobotPatch {
    pub status: Option<RobotStatus>,
    pub current_mission_id: Option<Option<MissionId>>,
}

impl RobotPatch {
    /// Change only the status.
    pub fn status(status: RobotStatus) -> Self {
        Self {
            status: Some(status),
            current_mission_id: None,
        }
    }

    /// Bind the robot to a mission with the given status.
    pub fn bind(status: RobotStatus, mission: MissionId) -> Self {
        Self {
            status: Some(status),
            current_mission_id: Some(Some(mission)),
        }
    }

    /// Release the robot back to the idle pool.
    pub fn idle() -> Self {
        Self {
            status: Some(RobotStatus::Idle),
            current_mission_id: Some(None),
        }
    }
}

/// A delivery mission bound to exactly one robot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: MissionId,
    pub assigned_robot_id: RobotId,
    pub current_stage: MissionStage,
    pub created_at: Timestamp,
    pub stage_start_time: Timestamp,
}
