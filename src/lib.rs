//! Delivery-robot fleet simulator.
//!
//! Robots live in a [`registry::FleetRegistry`], missions in an
//! [`engine::MissionStore`]. Two periodic ticks drive everything: the creation
//! tick ([`scheduler::create_missions`]) binds idle robots to new missions and
//! the advancement tick ([`engine::advance`]) walks each mission through
//! `preparation -> travel -> delivery -> completed`. [`fleet::Fleet`] wraps
//! both stores behind one lock and is what the HTTP layer in [`api`] and the
//! [`driver::TickDriver`] share.

pub mod api;
pub mod clock;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod fleet;
pub mod logging;
pub mod registry;
pub mod scheduler;
pub mod sim;
pub mod stats;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SimConfig;
pub use error::FleetError;
pub use fleet::{Fleet, FleetSettings};
pub use stats::FleetStats;
pub use types::{Mission, MissionId, MissionStage, Robot, RobotId, RobotStatus};
