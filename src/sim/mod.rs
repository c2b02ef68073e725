//! Deterministic session module
//!
//! All gameplay logic lives here. This module must stay deterministic:
//! - Virtual clock only (the host drives it through `Session::advance`)
//! - Injected randomness only
//! - Stable iteration order (by patient id)
//! - No DOM or platform dependencies

pub mod boss;
pub mod events;
pub mod input;
pub mod minigame;
pub mod quiz;
pub mod registry;
pub mod rng;
pub mod state;
pub mod tick;
pub mod timer;

pub use boss::{BossEncounter, DEFAULT_TOOL_DAMAGE, ToolTable};
pub use events::{EventLog, FeedbackKind, GameEvent, GameSink, SoundEvent};
pub use input::PlayerInput;
pub use minigame::{
    ActionResult, KindSelector, MiniGameAction, MiniGameKind, Round, RoundOutcome, RoundSnapshot,
};
pub use quiz::{Question, default_questions};
pub use registry::{EntityRegistry, Patient, PatientStatus};
pub use rng::{RandomSource, ScriptedRandom, SeededRandom};
pub use state::{BossSlot, GameOutcome, GamePhase, Session, SessionSnapshot};
pub use tick::end_condition;
pub use timer::{TimerHandle, TimerService, TimerTask};
