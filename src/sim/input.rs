//! Player input
//!
//! Every input checks the current phase (and round kind) first. Input that
//! does not fit is rejected with `IllegalTransition`, which
//! [`Session::handle_input`] logs and drops.

use serde::{Deserialize, Serialize};

use super::events::{FeedbackKind, GameSink, SoundEvent};
use super::minigame::{ActionResult, MiniGameAction, MiniGameKind, Round, RoundOutcome};
use super::registry::PatientStatus;
use super::rng::RandomSource;
use super::state::{BossSlot, GamePhase, Session};
use super::timer::TimerTask;
use crate::consts::{BOSS_REWARD, RESCUE_POINTS};
use crate::error::GameError;

/// Commands coming from the view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerInput {
    Start,
    Restart,
    SelectPatient(u32),
    MiniGame(MiniGameAction),
    /// Tool id from the boss toolbar
    Tool(String),
}

impl<S: GameSink, R: RandomSource> Session<S, R> {
    /// Route an input. Input that does not match the current state is
    /// ignored; only programming errors are returned.
    pub fn handle_input(&mut self, input: PlayerInput) -> Result<(), GameError> {
        let result = match input {
            PlayerInput::Start => self.start(),
            PlayerInput::Restart => self.restart(),
            PlayerInput::SelectPatient(id) => self.select_patient(id),
            PlayerInput::MiniGame(action) => self.mini_game_action(action),
            PlayerInput::Tool(tool) => self.use_tool(&tool),
        };
        match result {
            Err(GameError::IllegalTransition { input, phase }) => {
                log::debug!("Ignoring {input} during {phase:?}");
                Ok(())
            }
            other => other,
        }
    }

    /// Idle -> Monitoring
    pub fn start(&mut self) -> Result<(), GameError> {
        self.expect_phase(GamePhase::Idle, "start")?;
        self.reset_counters();
        self.tick_timer = Some(
            self.timers
                .schedule_repeating(self.settings.tick_interval_ms, TimerTask::SessionTick),
        );
        self.set_phase(GamePhase::Monitoring);
        self.sound(SoundEvent::ShiftStart);
        log::info!("Shift started");
        Ok(())
    }

    /// Ended -> Idle, with everything reset
    pub fn restart(&mut self) -> Result<(), GameError> {
        self.expect_phase(GamePhase::Ended, "restart")?;
        self.timers.cancel_all();
        self.tick_timer = None;
        self.round_timer = None;
        self.round = None;
        self.boss = BossSlot::Idle;
        self.selector.reset();
        self.next_round_id = 1;
        self.reset_ward();
        self.reset_counters();
        self.set_phase(GamePhase::Idle);
        log::info!("Session reset");
        Ok(())
    }

    /// Grab a critical patient and start a rescue round
    pub fn select_patient(&mut self, id: u32) -> Result<(), GameError> {
        self.expect_phase(GamePhase::Monitoring, "select_patient")?;
        let patient = self.registry.get(id).ok_or(GameError::UnknownEntity {
            id,
            count: self.registry.len() as u32,
        })?;
        if patient.status != PatientStatus::Critical {
            return Err(self.illegal("select_patient"));
        }

        // The round decides this patient's fate from here on
        if let Some(grace) = self.grace_timers.remove(&id) {
            if let Some(remaining) = self.timers.remaining(grace) {
                self.registry.freeze_grace(id, remaining)?;
            }
            self.timers.cancel(grace);
        }
        self.suspend_grace_timers()?;

        let now = self.timers.now_ms();
        let kind = self.selector.pick(&mut self.rng);
        let round = Round::start(self.next_round_id, id, kind, &self.settings, now, &mut self.rng);
        self.next_round_id += 1;
        self.round_timer = Some(self.timers.schedule(
            kind.time_budget_ms(&self.settings),
            TimerTask::RoundDeadline { round: round.id },
        ));

        log::info!("Rescue #{} on patient {id}: {}", round.id, kind.as_str());
        self.set_phase(GamePhase::RescuingBaby);
        self.sink.on_round_changed(Some(&round.snapshot()));
        self.round = Some(round);
        self.sound(SoundEvent::RescueStart);
        Ok(())
    }

    /// Tap / injection / answer inside the current round
    pub fn mini_game_action(&mut self, action: MiniGameAction) -> Result<(), GameError> {
        self.expect_phase(GamePhase::RescuingBaby, "mini_game_action")?;
        let Some(round) = self.round.as_mut() else {
            return Err(self.illegal("mini_game_action"));
        };
        let result = round.submit(&action, &mut self.rng);
        let kind = round.kind();
        let snapshot = round.snapshot();

        match result {
            ActionResult::Ignored => return Err(self.illegal("mini_game_action")),
            ActionResult::Progressed => {
                self.sink.on_round_changed(Some(&snapshot));
                if kind == MiniGameKind::Injection {
                    self.sound(SoundEvent::InjectionHit);
                    self.feedback("Good shot!", FeedbackKind::Success);
                } else {
                    self.sound(SoundEvent::CompressionTap);
                }
            }
            ActionResult::Missed => {
                self.sound(SoundEvent::InjectionMiss);
                self.feedback("Missed!", FeedbackKind::Error);
            }
            ActionResult::Resolved(outcome) => {
                self.sink.on_round_changed(Some(&snapshot));
                if kind == MiniGameKind::Quiz {
                    if outcome == RoundOutcome::Success {
                        self.sound(SoundEvent::AnswerCorrect);
                        self.feedback("Correct! Well done!", FeedbackKind::Success);
                    } else {
                        self.sound(SoundEvent::AnswerWrong);
                        self.feedback("Wrong! The correct answer is highlighted.", FeedbackKind::Error);
                    }
                }
                self.on_round_resolved(outcome)?;
            }
        }
        Ok(())
    }

    /// Outcome is known: apply now, or after the kind's reveal delay
    fn on_round_resolved(&mut self, outcome: RoundOutcome) -> Result<(), GameError> {
        let Some(round) = self.round.as_ref() else {
            return Ok(());
        };
        let (round_id, kind) = (round.id, round.kind());
        if let Some(deadline) = self.round_timer.take() {
            self.timers.cancel(deadline);
        }
        let delay = kind.resolve_delay_ms(&self.settings);
        if delay == 0 {
            return self.apply_round_outcome(outcome);
        }
        self.round_timer = Some(
            self.timers
                .schedule(delay, TimerTask::RoundResolve { round: round_id }),
        );
        Ok(())
    }

    pub(crate) fn on_round_deadline(&mut self, round_id: u64) -> Result<(), GameError> {
        let Some(round) = self.round.as_mut().filter(|r| r.id == round_id) else {
            return Ok(());
        };
        self.round_timer = None;
        let Some(outcome) = round.expire() else {
            return Ok(());
        };
        log::info!("Rescue #{round_id} timed out");
        self.feedback("Time's up!", FeedbackKind::Error);
        self.apply_round_outcome(outcome)
    }

    pub(crate) fn on_round_resolve(&mut self, round_id: u64) -> Result<(), GameError> {
        let Some(outcome) = self
            .round
            .as_ref()
            .filter(|r| r.id == round_id)
            .and_then(Round::resolution)
        else {
            return Ok(());
        };
        self.round_timer = None;
        self.apply_round_outcome(outcome)
    }

    /// Close the round and return to monitoring with its consequences
    fn apply_round_outcome(&mut self, outcome: RoundOutcome) -> Result<(), GameError> {
        let Some(round) = self.round.take() else {
            return Ok(());
        };
        if let Some(timer) = self.round_timer.take() {
            self.timers.cancel(timer);
        }
        self.sink.on_round_changed(None);
        self.set_phase(GamePhase::Monitoring);
        self.resume_grace_timers()?;

        let patient = round.patient;
        match outcome {
            RoundOutcome::Success => {
                self.active_critical.remove(&patient);
                let now = self.timers.now_ms();
                self.registry
                    .set_status(patient, PatientStatus::Saved, now, &mut self.sink)?;
                self.saved_count += 1;
                self.add_score(RESCUE_POINTS);
                self.emit_counters();
                self.feedback(
                    &format!("Patient saved! +{RESCUE_POINTS} points"),
                    FeedbackKind::Success,
                );
                self.sound(SoundEvent::PatientSaved);
                self.timers.schedule(
                    self.settings.saved_recovery_ms,
                    TimerTask::PatientRecovered { patient },
                );
                log::info!("Patient {patient} saved");
            }
            RoundOutcome::Failure => self.register_loss(patient)?,
        }

        self.release_waiting_boss()
    }

    /// Hit the boss with a tool
    pub fn use_tool(&mut self, tool: &str) -> Result<(), GameError> {
        self.expect_phase(GamePhase::BossFight, "use_tool")?;
        let BossSlot::Active(mut encounter) = self.boss else {
            return Err(self.illegal("use_tool"));
        };
        let health = encounter.strike(self.settings.tools.damage_for(tool));
        let defeated = encounter.is_defeated();
        self.boss = BossSlot::Active(encounter);

        self.sink.on_boss_health_changed(health);
        let message = self.settings.tools.strike_message(tool);
        self.feedback(&message, FeedbackKind::Success);
        self.sound(SoundEvent::ToolHit);

        if defeated {
            self.boss = BossSlot::Idle;
            self.add_score(BOSS_REWARD);
            self.feedback(&format!("Boss defeated! +{BOSS_REWARD} points"), FeedbackKind::Success);
            self.sound(SoundEvent::BossDefeated);
            log::info!("Boss defeated");
            self.set_phase(GamePhase::Monitoring);
            self.resume_grace_timers()?;
        }
        Ok(())
    }
}
