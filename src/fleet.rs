//! Thread-safe facade over the registry, mission store, and tick functions.

use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::engine::{self, AdvanceReport, MissionStore, StageTable};
use crate::registry::FleetRegistry;
use crate::scheduler;
use crate::stats::FleetStats;
use crate::types::{Mission, MissionId, Robot, RobotId, RobotStatus, Timestamp};

/// Sizing and timing knobs for a fleet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FleetSettings {
    pub fleet_size: usize,
    pub batch_size: usize,
    pub stages: StageTable,
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            fleet_size: 100,
            batch_size: 2,
            stages: StageTable::default(),
        }
    }
}

/// A broken robot/mission binding found by [`Fleet::audit`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("robot {robot} is {status} without a mission")]
    BusyWithoutMission { robot: RobotId, status: RobotStatus },
    #[error("robot {robot} is idle but bound to mission {mission}")]
    IdleWithMission { robot: RobotId, mission: MissionId },
    #[error("robot {robot} is bound to missing mission {mission}")]
    DanglingMission { robot: RobotId, mission: MissionId },
    #[error("robot {robot} holds mission {mission} assigned to robot {owner}")]
    ForeignMission {
        robot: RobotId,
        mission: MissionId,
        owner: RobotId,
    },
    #[error("robot {robot} is {status} but mission {mission} expects {expected:?}")]
    StatusMismatch {
        robot: RobotId,
        mission: MissionId,
        status: RobotStatus,
        expected: Option<RobotStatus>,
    },
}

struct FleetState {
    registry: FleetRegistry,
    missions: MissionStore,
}

/// Shared fleet state.
///
/// Every operation holds the single state lock for its whole duration, so a
/// cancellation can never interleave with a half-finished advancement of the
/// same mission.
pub struct Fleet {
    state: Mutex<FleetState>,
    clock: Arc<dyn Clock>,
    settings: FleetSettings,
}

impl Fleet {
    /// Build the fleet once; robots are never added or removed afterwards.
    pub fn new(settings: FleetSettings, clock: Arc<dyn Clock>) -> Self {
        let registry = FleetRegistry::with_fleet(settings.fleet_size, clock.now());
        Self {
            state: Mutex::new(FleetState {
                registry,
                missions: MissionStore::new(),
            }),
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &FleetSettings {
        &self.settings
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Creation tick: bind up to one batch of idle robots to new missions.
    pub fn create_missions(&self) -> Vec<Mission> {
        let mut guard = self.state.lock().expect("fleet state mutex poisoned");
        let state = &mut *guard;
        scheduler::create_missions(
            &mut state.registry,
            &mut state.missions,
            self.settings.batch_size,
            self.clock.now(),
        )
    }

    /// Advancement tick: move every due mission one stage forward.
    pub fn advance(&self) -> AdvanceReport {
        let mut guard = self.state.lock().expect("fleet state mutex poisoned");
        let state = &mut *guard;
        engine::advance(
            &mut state.registry,
            &mut state.missions,
            &self.settings.stages,
            self.clock.now(),
        )
    }

    /// Cancel the robot's current mission. Returns `false` for unknown or idle
    /// robots.
    pub fn cancel(&self, robot: RobotId) -> bool {
        let mut guard = self.state.lock().expect("fleet state mutex poisoned");
        let state = &mut *guard;
        match engine::cancel(
            &mut state.registry,
            &mut state.missions,
            robot,
            self.clock.now(),
        ) {
            Ok(_) => true,
            Err(err) => {
                debug!(robot, reason = %err, "cancel refused");
                false
            }
        }
    }

    pub fn robots(&self) -> Vec<Robot> {
        let guard = self.state.lock().expect("fleet state mutex poisoned");
        guard.registry.list()
    }

    pub fn robot(&self, id: RobotId) -> Option<Robot> {
        let guard = self.state.lock().expect("fleet state mutex poisoned");
        guard.registry.get(id).cloned()
    }

    pub fn missions(&self) -> Vec<Mission> {
        let guard = self.state.lock().expect("fleet state mutex poisoned");
        guard.missions.list()
    }

    pub fn mission(&self, id: MissionId) -> Option<Mission> {
        let guard = self.state.lock().expect("fleet state mutex poisoned");
        guard.missions.get(id).cloned()
    }

    pub fn stats(&self) -> FleetStats {
        let guard = self.state.lock().expect("fleet state mutex poisoned");
        FleetStats::derive(guard.registry.iter(), guard.missions.iter())
    }

    /// Check every robot's binding against the mission it points at.
    pub fn audit(&self) -> Vec<Violation> {
        let guard = self.state.lock().expect("fleet state mutex poisoned");
        let mut violations = Vec::new();
        for robot in guard.registry.iter() {
            let mission_id = match (robot.status, robot.current_mission_id) {
                (RobotStatus::Idle, None) => continue,
                (RobotStatus::Idle, Some(mission)) => {
                    violations.push(Violation::IdleWithMission {
                        robot: robot.id,
                        mission,
                    });
                    continue;
                }
                (status, None) => {
                    violations.push(Violation::BusyWithoutMission {
                        robot: robot.id,
                        status,
                    });
                    continue;
                }
                (_, Some(mission)) => mission,
            };
            let Some(mission) = guard.missions.get(mission_id) else {
                violations.push(Violation::DanglingMission {
                    robot: robot.id,
                    mission: mission_id,
                });
                continue;
            };
            if mission.assigned_robot_id != robot.id {
                violations.push(Violation::ForeignMission {
                    robot: robot.id,
                    mission: mission_id,
                    owner: mission.assigned_robot_id,
                });
            }
            let expected = mission.current_stage.robot_status();
            if expected != Some(robot.status) {
                violations.push(Violation::StatusMismatch {
                    robot: robot.id,
                    mission: mission_id,
                    status: robot.status,
                    expected,
                });
            }
        }
        for violation in &violations {
            warn!(%violation, "fleet invariant violated");
        }
        violations
    }
}

impl fmt::Debug for Fleet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fleet")
            .field("settings", &self.settings)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
