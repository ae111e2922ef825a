//! Domain errors for fleet operations.
//!
//! None of these are fatal; callers at the boundary collapse them into a
//! boolean result or an absent record.

use thiserror::Error;

use crate::types::{MissionId, MissionStage, RobotId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error("robot {0} not found")]
    RobotNotFound(RobotId),
    #[error("mission {0} not found")]
    MissionNotFound(MissionId),
    #[error("robot {0} has no active mission")]
    NoActiveMission(RobotId),
    #[error("mission {mission} cannot move from {from} to {to}")]
    InvalidTransition {
        mission: MissionId,
        from: MissionStage,
        to: MissionStage,
    },
}

impl FleetError {
    /// Unknown robot or mission id.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FleetError::RobotNotFound(_) | FleetError::MissionNotFound(_)
        )
    }
}
