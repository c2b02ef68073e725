//! Clock-driven session logic
//!
//! `advance` moves the virtual clock and fires every timer that came due, in
//! the order the timer service defines. Each fired task is handled here:
//! the shift tick (elapsed time, end checks, critical spawns), grace
//! timeouts, round deadlines, saved-patient recovery and boss arrival.

use super::boss::BossEncounter;
use super::events::{FeedbackKind, GameSink, SoundEvent};
use super::registry::PatientStatus;
use super::rng::RandomSource;
use super::state::{BossSlot, GameOutcome, GamePhase, Session};
use super::timer::{TimerHandle, TimerTask};
use crate::consts::LOSS_PENALTY;
use crate::error::GameError;

/// End-of-shift check for one tick. Defeat wins when both hold.
pub fn end_condition(
    lost_count: u32,
    loss_cap: u32,
    elapsed_seconds: u32,
    duration_secs: u32,
) -> Option<GameOutcome> {
    if lost_count >= loss_cap {
        Some(GameOutcome::Defeat)
    } else if elapsed_seconds >= duration_secs {
        Some(GameOutcome::Victory)
    } else {
        None
    }
}

impl<S: GameSink, R: RandomSource> Session<S, R> {
    /// Advance the clock by `dt_ms`, firing every timer that comes due
    pub fn advance(&mut self, dt_ms: u64) -> Result<(), GameError> {
        let until = self.timers.now_ms().saturating_add(dt_ms);
        while let Some((handle, task)) = self.timers.pop_due(until) {
            log::debug!("t={}ms fire {:?}", self.timers.now_ms(), task);
            self.dispatch(handle, task)?;
        }
        self.timers.settle(until);
        Ok(())
    }

    fn dispatch(&mut self, handle: TimerHandle, task: TimerTask) -> Result<(), GameError> {
        match task {
            TimerTask::SessionTick => self.on_session_tick(),
            TimerTask::GraceExpired { patient } => self.on_grace_expired(handle, patient),
            TimerTask::RoundDeadline { round } => self.on_round_deadline(round),
            TimerTask::RoundResolve { round } => self.on_round_resolve(round),
            TimerTask::PatientRecovered { patient } => self.on_patient_recovered(patient),
            TimerTask::BossArrival => self.on_boss_arrival(handle),
            TimerTask::BossEnter => self.on_boss_enter(handle),
        }
    }

    fn on_session_tick(&mut self) -> Result<(), GameError> {
        self.elapsed_ms = self.elapsed_ms.saturating_add(self.settings.tick_interval_ms);
        let elapsed = self.elapsed_seconds();
        self.sink.on_timer_tick(elapsed);

        if let Some(outcome) = end_condition(
            self.lost_count,
            self.settings.loss_cap,
            elapsed,
            self.settings.game_duration_secs,
        ) {
            self.end_session(outcome);
            return Ok(());
        }

        if self.phase == GamePhase::Monitoring {
            self.try_spawn_critical()?;
        }
        Ok(())
    }

    /// One spawn roll, subject to the concurrency cap and cooldown
    fn try_spawn_critical(&mut self) -> Result<(), GameError> {
        if self.active_critical.len() >= self.settings.max_concurrent_critical {
            return Ok(());
        }
        let now = self.timers.now_ms();
        if let Some(last) = self.last_critical_spawn_ms {
            if now.saturating_sub(last) < self.settings.critical_cooldown_ms {
                return Ok(());
            }
        }
        let normal: Vec<u32> = self
            .registry
            .list_by_status(PatientStatus::Normal)
            .iter()
            .map(|p| p.id)
            .collect();
        if normal.is_empty() {
            return Ok(());
        }
        if self.rng.next_unit() >= self.settings.critical_chance {
            return Ok(());
        }
        let id = normal[self.rng.next_index(normal.len())];
        self.make_critical(id)
    }

    /// Force a specific Normal patient into a critical event. Follows the
    /// same cap and grace rules as a random spawn, without the roll.
    pub fn trigger_critical(&mut self, id: u32) -> Result<(), GameError> {
        self.expect_phase(GamePhase::Monitoring, "trigger_critical")?;
        let patient = self.registry.get(id).ok_or(GameError::UnknownEntity {
            id,
            count: self.registry.len() as u32,
        })?;
        if patient.status != PatientStatus::Normal
            || self.active_critical.len() >= self.settings.max_concurrent_critical
        {
            return Err(self.illegal("trigger_critical"));
        }
        self.make_critical(id)
    }

    fn make_critical(&mut self, id: u32) -> Result<(), GameError> {
        let now = self.timers.now_ms();
        self.registry
            .set_status(id, PatientStatus::Critical, now, &mut self.sink)?;
        self.active_critical.insert(id);
        self.last_critical_spawn_ms = Some(now);

        let grace = self.timers.schedule(
            self.settings.grace_period_ms,
            TimerTask::GraceExpired { patient: id },
        );
        self.grace_timers.insert(id, grace);

        log::info!("Patient {id} critical ({} active)", self.active_critical.len());
        self.sound(SoundEvent::CriticalAlarm);
        self.feedback(&format!("Patient {} is critical!", id + 1), FeedbackKind::Info);
        Ok(())
    }

    fn on_grace_expired(&mut self, handle: TimerHandle, patient: u32) -> Result<(), GameError> {
        if self.grace_timers.get(&patient) != Some(&handle) {
            log::warn!("Stale grace timer for patient {patient}");
            return Ok(());
        }
        self.grace_timers.remove(&patient);
        log::info!("Patient {patient} left unattended too long");
        self.register_loss(patient)
    }

    /// Consequences of losing a patient (grace timeout or failed round)
    pub(crate) fn register_loss(&mut self, patient: u32) -> Result<(), GameError> {
        self.active_critical.remove(&patient);
        if let Some(grace) = self.grace_timers.remove(&patient) {
            self.timers.cancel(grace);
        }
        let now = self.timers.now_ms();
        self.registry
            .set_status(patient, PatientStatus::Normal, now, &mut self.sink)?;

        self.lost_count += 1;
        self.emit_counters();
        self.sound(SoundEvent::PatientLost);
        let message = format!("Patient lost! ({}/{})", self.lost_count, self.settings.loss_cap);
        self.feedback(&message, FeedbackKind::Error);

        if self.lost_count >= self.settings.loss_cap {
            self.end_session(GameOutcome::Defeat);
            return Ok(());
        }

        self.deduct_score(LOSS_PENALTY);
        self.queue_boss();
        Ok(())
    }

    /// Schedule the boss unless one is already on its way or fighting.
    /// The fight starts `boss_delay_ms` after the loss; the warning comes
    /// `boss_warning_ms` before that.
    fn queue_boss(&mut self) {
        if self.boss != BossSlot::Idle {
            log::debug!("Boss already queued ({:?})", self.boss);
            return;
        }
        let lead = self
            .settings
            .boss_delay_ms
            .saturating_sub(self.settings.boss_warning_ms);
        let handle = self.timers.schedule(lead, TimerTask::BossArrival);
        self.boss = BossSlot::Scheduled(handle);
        log::info!("Boss arriving in {}ms", self.settings.boss_delay_ms);
    }

    fn on_boss_arrival(&mut self, handle: TimerHandle) -> Result<(), GameError> {
        if self.boss != BossSlot::Scheduled(handle) {
            return Ok(());
        }
        if self.phase == GamePhase::Monitoring {
            self.announce_boss()
        } else {
            log::info!("Boss waiting for the rescue to finish");
            self.boss = BossSlot::Waiting;
            Ok(())
        }
    }

    /// Warn the player, then start the fight after `boss_warning_ms`
    fn announce_boss(&mut self) -> Result<(), GameError> {
        self.feedback("The boss is here! Get ready!", FeedbackKind::Error);
        self.sound(SoundEvent::BossAppear);
        if self.settings.boss_warning_ms == 0 {
            return self.start_boss_fight();
        }
        let handle = self
            .timers
            .schedule(self.settings.boss_warning_ms, TimerTask::BossEnter);
        self.boss = BossSlot::Warning(handle);
        Ok(())
    }

    fn on_boss_enter(&mut self, handle: TimerHandle) -> Result<(), GameError> {
        if self.boss != BossSlot::Warning(handle) {
            return Ok(());
        }
        if self.phase == GamePhase::Monitoring {
            self.start_boss_fight()
        } else {
            log::info!("Boss waiting for the rescue to finish");
            self.boss = BossSlot::Waiting;
            Ok(())
        }
    }

    /// Announce a boss that arrived during a rescue
    pub(crate) fn release_waiting_boss(&mut self) -> Result<(), GameError> {
        if self.boss == BossSlot::Waiting && self.phase == GamePhase::Monitoring {
            self.announce_boss()?;
        }
        Ok(())
    }

    fn start_boss_fight(&mut self) -> Result<(), GameError> {
        self.suspend_grace_timers()?;
        let encounter = BossEncounter::new(self.settings.boss_max_health);
        self.boss = BossSlot::Active(encounter);
        self.boss_appearances += 1;
        log::info!("Boss fight #{}", self.boss_appearances);
        self.set_phase(GamePhase::BossFight);
        self.sink.on_boss_health_changed(encounter.health);
        Ok(())
    }

    fn on_patient_recovered(&mut self, patient: u32) -> Result<(), GameError> {
        let saved = self
            .registry
            .get(patient)
            .is_some_and(|p| p.status == PatientStatus::Saved);
        if saved {
            let now = self.timers.now_ms();
            self.registry
                .set_status(patient, PatientStatus::Normal, now, &mut self.sink)?;
        }
        Ok(())
    }

    /// Freeze every unattended grace timer
    pub(crate) fn suspend_grace_timers(&mut self) -> Result<(), GameError> {
        let timers: Vec<(u32, TimerHandle)> =
            self.grace_timers.iter().map(|(id, h)| (*id, *h)).collect();
        for (id, handle) in timers {
            if let Some(remaining) = self.timers.pause(handle) {
                self.registry.freeze_grace(id, remaining)?;
            }
        }
        Ok(())
    }

    pub(crate) fn resume_grace_timers(&mut self) -> Result<(), GameError> {
        let timers: Vec<(u32, TimerHandle)> =
            self.grace_timers.iter().map(|(id, h)| (*id, *h)).collect();
        for (id, handle) in timers {
            if self.timers.resume(handle) {
                self.registry.thaw_grace(id)?;
            }
        }
        Ok(())
    }
}
