//! Outward notifications
//!
//! The session reports every visible change through a [`GameSink`]. Calls
//! are fire-and-forget; nothing the sink does flows back into the session.

use serde::{Deserialize, Serialize};

use super::minigame::RoundSnapshot;
use super::registry::PatientStatus;
use super::state::GamePhase;

/// Tone of a feedback message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackKind {
    Success,
    Error,
    Info,
}

/// Cues for the (optional) audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundEvent {
    ShiftStart,
    CriticalAlarm,
    RescueStart,
    CompressionTap,
    InjectionHit,
    InjectionMiss,
    AnswerCorrect,
    AnswerWrong,
    PatientSaved,
    PatientLost,
    BossAppear,
    ToolHit,
    BossDefeated,
    Victory,
    Defeat,
}

/// View/audio boundary. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait GameSink {
    fn on_patient_status_changed(&mut self, id: u32, status: PatientStatus) {}
    fn on_score_changed(&mut self, score: u32) {}
    fn on_counters_changed(&mut self, saved: u32, lost: u32) {}
    fn on_timer_tick(&mut self, elapsed_seconds: u32) {}
    fn on_boss_health_changed(&mut self, health: u32) {}
    fn on_phase_changed(&mut self, phase: GamePhase) {}
    fn on_feedback(&mut self, message: &str, kind: FeedbackKind) {}
    fn on_sound(&mut self, event: SoundEvent) {}
    /// `None` once the round is gone
    fn on_round_changed(&mut self, round: Option<&RoundSnapshot>) {}
}

/// Sink that drops everything
impl GameSink for () {}

/// Recorded sink call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    PatientStatusChanged { id: u32, status: PatientStatus },
    ScoreChanged { score: u32 },
    CountersChanged { saved: u32, lost: u32 },
    TimerTick { elapsed_seconds: u32 },
    BossHealthChanged { health: u32 },
    PhaseChanged { phase: GamePhase },
    Feedback { message: String, kind: FeedbackKind },
    Sound { event: SoundEvent },
    RoundChanged { round: Option<RoundSnapshot> },
}

/// Sink that queues events for a host to drain (and tests to inspect)
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<GameEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Take everything recorded so far
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn sounds(&self) -> impl Iterator<Item = SoundEvent> + '_ {
        self.events.iter().filter_map(|e| match e {
            GameEvent::Sound { event } => Some(*event),
            _ => None,
        })
    }

    pub fn feedback(&self) -> impl Iterator<Item = &str> + '_ {
        self.events.iter().filter_map(|e| match e {
            GameEvent::Feedback { message, .. } => Some(message.as_str()),
            _ => None,
        })
    }
}

impl GameSink for EventLog {
    fn on_patient_status_changed(&mut self, id: u32, status: PatientStatus) {
        self.events.push(GameEvent::PatientStatusChanged { id, status });
    }

    fn on_score_changed(&mut self, score: u32) {
        self.events.push(GameEvent::ScoreChanged { score });
    }

    fn on_counters_changed(&mut self, saved: u32, lost: u32) {
        self.events.push(GameEvent::CountersChanged { saved, lost });
    }

    fn on_timer_tick(&mut self, elapsed_seconds: u32) {
        self.events.push(GameEvent::TimerTick { elapsed_seconds });
    }

    fn on_boss_health_changed(&mut self, health: u32) {
        self.events.push(GameEvent::BossHealthChanged { health });
    }

    fn on_phase_changed(&mut self, phase: GamePhase) {
        self.events.push(GameEvent::PhaseChanged { phase });
    }

    fn on_feedback(&mut self, message: &str, kind: FeedbackKind) {
        self.events.push(GameEvent::Feedback {
            message: message.to_string(),
            kind,
        });
    }

    fn on_sound(&mut self, event: SoundEvent) {
        self.events.push(GameEvent::Sound { event });
    }

    fn on_round_changed(&mut self, round: Option<&RoundSnapshot>) {
        self.events.push(GameEvent::RoundChanged {
            round: round.cloned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_records_and_drains() {
        let mut log = EventLog::new();
        log.on_score_changed(100);
        log.on_sound(SoundEvent::PatientSaved);
        log.on_feedback("Patient saved! +100 points", FeedbackKind::Success);

        assert_eq!(log.events().len(), 3);
        assert_eq!(log.sounds().collect::<Vec<_>>(), vec![SoundEvent::PatientSaved]);
        assert_eq!(log.feedback().next(), Some("Patient saved! +100 points"));

        let drained = log.drain();
        assert_eq!(drained[0], GameEvent::ScoreChanged { score: 100 });
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_events_serialize_tagged() {
        let json = serde_json::to_string(&GameEvent::CountersChanged { saved: 1, lost: 2 }).unwrap();
        assert_eq!(json, r#"{"type":"CountersChanged","saved":1,"lost":2}"#);
    }
}
