//! Session state
//!
//! A [`Session`] owns everything about one play-through: the ward, the
//! timers, the active round, the boss and all counters. The sink and the
//! random source are injected so a session runs the same way in the browser
//! and in tests.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::boss::BossEncounter;
use super::events::{EventLog, FeedbackKind, GameSink, SoundEvent};
use super::minigame::{KindSelector, Round, RoundSnapshot};
use super::registry::{EntityRegistry, Patient, PatientStatus};
use super::rng::{RandomSource, SeededRandom};
use super::timer::{TimerHandle, TimerService};
use crate::error::GameError;
use crate::settings::Settings;

/// Top-level phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the player to start the shift
    #[default]
    Idle,
    /// Watching the ward
    Monitoring,
    /// A rescue mini-game is running
    RescuingBaby,
    /// Fighting the boss
    BossFight,
    /// Shift over
    Ended,
}

impl GamePhase {
    /// Phases in which the shift clock runs
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            GamePhase::Monitoring | GamePhase::RescuingBaby | GamePhase::BossFight
        )
    }
}

/// How a shift ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// Survived until the clock ran out
    Victory,
    /// Lost too many patients
    Defeat,
}

/// Boss lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BossSlot {
    #[default]
    Idle,
    /// Arrival timer running
    Scheduled(TimerHandle),
    /// Announced; the fight starts when this timer fires
    Warning(TimerHandle),
    /// Arrived during a rescue; announced again once the ward is back to
    /// monitoring
    Waiting,
    Active(BossEncounter),
}

/// Serializable summary for hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: GamePhase,
    pub outcome: Option<GameOutcome>,
    pub now_ms: u64,
    pub elapsed_seconds: u32,
    pub score: u32,
    pub saved_count: u32,
    pub lost_count: u32,
    pub boss_health: Option<u32>,
    pub boss_pending: bool,
    pub patients: Vec<Patient>,
    pub round: Option<RoundSnapshot>,
}

/// One play-through
pub struct Session<S = EventLog, R = SeededRandom> {
    pub(crate) settings: Settings,
    pub(crate) phase: GamePhase,
    pub(crate) outcome: Option<GameOutcome>,
    pub(crate) registry: EntityRegistry,
    pub(crate) timers: TimerService,
    pub(crate) selector: KindSelector,
    pub(crate) round: Option<Round>,
    pub(crate) boss: BossSlot,
    /// Critical patients, ordered by id
    pub(crate) active_critical: BTreeSet<u32>,
    /// Grace timers of critical patients not under rescue
    pub(crate) grace_timers: BTreeMap<u32, TimerHandle>,
    /// Deadline or reveal timer of the current round
    pub(crate) round_timer: Option<TimerHandle>,
    pub(crate) tick_timer: Option<TimerHandle>,
    pub(crate) last_critical_spawn_ms: Option<u64>,
    pub(crate) elapsed_ms: u64,
    pub(crate) score: u32,
    pub(crate) saved_count: u32,
    pub(crate) lost_count: u32,
    pub(crate) boss_appearances: u32,
    pub(crate) next_round_id: u64,
    pub(crate) sink: S,
    pub(crate) rng: R,
}

impl<S: GameSink, R: RandomSource> Session<S, R> {
    /// Validate settings and build an idle session
    pub fn new(settings: Settings, sink: S, rng: R) -> Result<Self, GameError> {
        settings.validate()?;
        let registry = EntityRegistry::create(settings.patient_count)?;
        log::info!(
            "New session: {} patients, {}s shift, device {}",
            settings.patient_count,
            settings.game_duration_secs,
            settings.device.as_str()
        );
        Ok(Self {
            selector: KindSelector::new(settings.repeat_cap),
            settings,
            phase: GamePhase::Idle,
            outcome: None,
            registry,
            timers: TimerService::new(),
            round: None,
            boss: BossSlot::Idle,
            active_critical: BTreeSet::new(),
            grace_timers: BTreeMap::new(),
            round_timer: None,
            tick_timer: None,
            last_critical_spawn_ms: None,
            elapsed_ms: 0,
            score: 0,
            saved_count: 0,
            lost_count: 0,
            boss_appearances: 0,
            next_round_id: 1,
            sink,
            rng,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    pub fn elapsed_seconds(&self) -> u32 {
        u32::try_from(self.elapsed_ms / 1_000).unwrap_or(u32::MAX)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn saved_count(&self) -> u32 {
        self.saved_count
    }

    pub fn lost_count(&self) -> u32 {
        self.lost_count
    }

    pub fn patients(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn active_critical_ids(&self) -> &BTreeSet<u32> {
        &self.active_critical
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn selector(&self) -> &KindSelector {
        &self.selector
    }

    pub fn boss(&self) -> BossSlot {
        self.boss
    }

    pub fn boss_active(&self) -> bool {
        matches!(self.boss, BossSlot::Active(_))
    }

    pub fn boss_health(&self) -> Option<u32> {
        match self.boss {
            BossSlot::Active(encounter) => Some(encounter.health),
            _ => None,
        }
    }

    /// How many boss fights have started this shift
    pub fn boss_appearances(&self) -> u32 {
        self.boss_appearances
    }

    /// Timers still scheduled (zero once the shift has ended)
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Grace time left for a critical patient (frozen value while paused)
    pub fn grace_remaining(&self, patient: u32) -> Option<u64> {
        self.grace_timers
            .get(&patient)
            .and_then(|h| self.timers.remaining(*h))
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            outcome: self.outcome,
            now_ms: self.now_ms(),
            elapsed_seconds: self.elapsed_seconds(),
            score: self.score,
            saved_count: self.saved_count,
            lost_count: self.lost_count,
            boss_health: self.boss_health(),
            boss_pending: matches!(
                self.boss,
                BossSlot::Scheduled(_) | BossSlot::Warning(_) | BossSlot::Waiting
            ),
            patients: self.registry.iter().cloned().collect(),
            round: self.round.as_ref().map(Round::snapshot),
        }
    }

    // === Internal helpers ===

    pub(crate) fn set_phase(&mut self, phase: GamePhase) {
        if self.phase != phase {
            log::info!("Phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
            self.sink.on_phase_changed(phase);
        }
    }

    pub(crate) fn expect_phase(&self, phase: GamePhase, input: &'static str) -> Result<(), GameError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(self.illegal(input))
        }
    }

    pub(crate) fn illegal(&self, input: &'static str) -> GameError {
        GameError::IllegalTransition {
            input,
            phase: self.phase,
        }
    }

    pub(crate) fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
        self.sink.on_score_changed(self.score);
    }

    /// Score never drops below zero
    pub(crate) fn deduct_score(&mut self, points: u32) {
        self.score = self.score.saturating_sub(points);
        self.sink.on_score_changed(self.score);
    }

    pub(crate) fn emit_counters(&mut self) {
        self.sink.on_counters_changed(self.saved_count, self.lost_count);
    }

    pub(crate) fn feedback(&mut self, message: &str, kind: FeedbackKind) {
        self.sink.on_feedback(message, kind);
    }

    pub(crate) fn sound(&mut self, event: SoundEvent) {
        self.sink.on_sound(event);
    }

    /// Zero counters and per-shift bookkeeping
    pub(crate) fn reset_counters(&mut self) {
        self.elapsed_ms = 0;
        self.score = 0;
        self.saved_count = 0;
        self.lost_count = 0;
        self.boss_appearances = 0;
        self.last_critical_spawn_ms = None;
        self.outcome = None;
        self.sink.on_score_changed(0);
        self.emit_counters();
        self.sink.on_timer_tick(0);
    }

    /// Put every patient back to Normal and tell the view
    pub(crate) fn reset_ward(&mut self) {
        self.registry.reset();
        self.active_critical.clear();
        self.grace_timers.clear();
        for id in 0..self.registry.len() as u32 {
            self.sink.on_patient_status_changed(id, PatientStatus::Normal);
        }
    }

    /// Stop the shift. Every timer is cancelled here.
    pub(crate) fn end_session(&mut self, outcome: GameOutcome) {
        self.timers.cancel_all();
        self.tick_timer = None;
        self.round_timer = None;
        self.grace_timers.clear();
        if self.round.take().is_some() {
            self.sink.on_round_changed(None);
        }
        self.boss = BossSlot::Idle;
        self.outcome = Some(outcome);
        self.set_phase(GamePhase::Ended);

        match outcome {
            GameOutcome::Victory => {
                log::info!("Shift survived: score {}, saved {}", self.score, self.saved_count);
                self.feedback("Congratulations! You made it through the shift!", FeedbackKind::Success);
                self.sound(SoundEvent::Victory);
            }
            GameOutcome::Defeat => {
                log::info!("Shift lost: {} patients lost", self.lost_count);
                let message = format!("Game over! {} patients lost.", self.lost_count);
                self.feedback(&message, FeedbackKind::Error);
                self.sound(SoundEvent::Defeat);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::ScriptedRandom;

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new(Settings::default(), EventLog::new(), ScriptedRandom::new()).unwrap();
        assert_eq!(session.phase(), GamePhase::Idle);
        assert_eq!(session.patients().len(), 4);
        assert_eq!(session.pending_timers(), 0);
        assert_eq!(session.score(), 0);
        assert!(!session.boss_active());
        assert!(session.sink().events().is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let mut settings = Settings::default();
        settings.patient_count = 0;
        let result = Session::new(settings, EventLog::new(), ScriptedRandom::new());
        assert!(matches!(result, Err(GameError::InvalidConfig { .. })));
    }

    #[test]
    fn test_deduct_score_clamps() {
        let mut session = Session::new(Settings::default(), (), ScriptedRandom::new()).unwrap();
        session.add_score(30);
        session.deduct_score(50);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let session = Session::new(Settings::default(), (), SeededRandom::new(1)).unwrap();
        let json = serde_json::to_string(&session.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"Idle\""));
        assert!(json.contains("\"patients\""));
    }
}
