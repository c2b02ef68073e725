//! Hospital Guard - a ward-monitoring mini-game
//!
//! Core modules:
//! - `sim`: Deterministic session (ward, timers, rescue rounds, boss)
//! - `settings`: Data-driven tuning, loadable from JSON
//! - `platform`: Browser bindings
//! - `error`: Session errors

pub mod error;
pub mod platform;
pub mod settings;
pub mod sim;

pub use error::GameError;
pub use settings::{DeviceClass, Settings};
pub use sim::{EventLog, GamePhase, GameSink, PlayerInput, SeededRandom, Session};

/// Game configuration constants
pub mod consts {
    /// Patients on the ward
    pub const DEFAULT_PATIENT_COUNT: u32 = 4;
    /// Critical patients allowed at once
    pub const DEFAULT_MAX_CRITICAL: usize = 3;
    /// Losses that end the shift
    pub const DEFAULT_LOSS_CAP: u32 = 100;
    /// Same mini-game kind allowed this many times in a row
    pub const DEFAULT_REPEAT_CAP: u32 = 2;

    pub const BOSS_MAX_HEALTH: u32 = 100;

    /// Score rules
    pub const RESCUE_POINTS: u32 = 100;
    pub const LOSS_PENALTY: u32 = 50;
    pub const BOSS_REWARD: u32 = 500;
}
