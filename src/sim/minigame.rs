//! Rescue mini-games
//!
//! A round starts when the player grabs a critical patient and ends with a
//! single [`RoundOutcome`]. The three kinds share the [`MiniGame`] interface;
//! [`Round`] wraps one of them with the bookkeeping every round needs
//! (deadline, one-time resolution, kind checks on input).
//!
//! Rounds never touch session or patient state. The session reads the
//! outcome and applies the consequences.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::quiz::Question;
use super::rng::RandomSource;
use crate::settings::Settings;

/// Mini-game variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MiniGameKind {
    /// Chest compressions: tap fast enough
    Cpr,
    /// Land the syringe inside a moving zone
    Injection,
    /// Answer one question
    Quiz,
}

impl MiniGameKind {
    pub const ALL: [MiniGameKind; 3] = [MiniGameKind::Cpr, MiniGameKind::Injection, MiniGameKind::Quiz];

    pub fn as_str(&self) -> &'static str {
        match self {
            MiniGameKind::Cpr => "CPR",
            MiniGameKind::Injection => "Injection",
            MiniGameKind::Quiz => "Quiz",
        }
    }

    pub fn time_budget_ms(&self, settings: &Settings) -> u64 {
        match self {
            MiniGameKind::Cpr => settings.cpr.time_budget_ms,
            MiniGameKind::Injection => settings.injection.time_budget_ms,
            MiniGameKind::Quiz => settings.quiz.time_budget_ms,
        }
    }

    /// Delay between resolution and applying its consequences
    pub fn resolve_delay_ms(&self, settings: &Settings) -> u64 {
        match self {
            MiniGameKind::Cpr => settings.cpr.resolve_delay_ms,
            MiniGameKind::Injection => settings.injection.resolve_delay_ms,
            MiniGameKind::Quiz => settings.quiz.resolve_delay_ms,
        }
    }
}

/// Player input inside a round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MiniGameAction {
    Tap,
    /// Syringe dropped at `point` (area coordinates, origin top-left)
    Inject { point: Vec2 },
    Answer { option: usize },
}

impl MiniGameAction {
    pub fn kind(&self) -> MiniGameKind {
        match self {
            MiniGameAction::Tap => MiniGameKind::Cpr,
            MiniGameAction::Inject { .. } => MiniGameKind::Injection,
            MiniGameAction::Answer { .. } => MiniGameKind::Quiz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    Success,
    Failure,
}

/// What an action did to the round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    /// Wrong kind, or the round already resolved
    Ignored,
    Progressed,
    /// Injection outside the zone
    Missed,
    Resolved(RoundOutcome),
}

/// Shared interface of the mini-game variants
pub trait MiniGame {
    fn kind(&self) -> MiniGameKind;
    fn progress(&self) -> u32;
    fn target(&self) -> u32;
    /// Apply an action of this game's kind to an unresolved round
    fn apply(&mut self, action: &MiniGameAction, rng: &mut dyn RandomSource) -> ActionResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CprRound {
    pub taps: u32,
    pub target: u32,
}

impl MiniGame for CprRound {
    fn kind(&self) -> MiniGameKind {
        MiniGameKind::Cpr
    }

    fn progress(&self) -> u32 {
        self.taps
    }

    fn target(&self) -> u32 {
        self.target
    }

    fn apply(&mut self, action: &MiniGameAction, _rng: &mut dyn RandomSource) -> ActionResult {
        if !matches!(action, MiniGameAction::Tap) {
            return ActionResult::Ignored;
        }
        self.taps += 1;
        if self.taps >= self.target {
            ActionResult::Resolved(RoundOutcome::Success)
        } else {
            ActionResult::Progressed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionRound {
    pub hits: u32,
    pub target: u32,
    /// Current zone center
    pub zone: Vec2,
    /// Area size; the zone always fits inside it
    pub area: Vec2,
    pub zone_radius: f32,
    /// Extra hit radius for imprecise input
    pub tolerance: f32,
}

impl InjectionRound {
    pub fn is_hit(&self, point: Vec2) -> bool {
        point.distance(self.zone) <= self.zone_radius + self.tolerance
    }

    fn relocate(&mut self, rng: &mut dyn RandomSource) {
        let free = (self.area - Vec2::splat(2.0 * self.zone_radius)).max(Vec2::ZERO);
        self.zone = Vec2::new(
            self.zone_radius + rng.next_unit() * free.x,
            self.zone_radius + rng.next_unit() * free.y,
        );
    }
}

impl MiniGame for InjectionRound {
    fn kind(&self) -> MiniGameKind {
        MiniGameKind::Injection
    }

    fn progress(&self) -> u32 {
        self.hits
    }

    fn target(&self) -> u32 {
        self.target
    }

    fn apply(&mut self, action: &MiniGameAction, rng: &mut dyn RandomSource) -> ActionResult {
        let MiniGameAction::Inject { point } = action else {
            return ActionResult::Ignored;
        };
        if !self.is_hit(*point) {
            return ActionResult::Missed;
        }
        self.hits += 1;
        if self.hits >= self.target {
            return ActionResult::Resolved(RoundOutcome::Success);
        }
        self.relocate(rng);
        ActionResult::Progressed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizRound {
    pub question: Question,
    /// First (and only) accepted answer
    pub answer: Option<usize>,
}

impl MiniGame for QuizRound {
    fn kind(&self) -> MiniGameKind {
        MiniGameKind::Quiz
    }

    fn progress(&self) -> u32 {
        u32::from(self.answer.is_some())
    }

    fn target(&self) -> u32 {
        1
    }

    fn apply(&mut self, action: &MiniGameAction, _rng: &mut dyn RandomSource) -> ActionResult {
        let MiniGameAction::Answer { option } = action else {
            return ActionResult::Ignored;
        };
        if self.answer.is_some() {
            return ActionResult::Ignored;
        }
        self.answer = Some(*option);
        if self.question.is_correct(*option) {
            ActionResult::Resolved(RoundOutcome::Success)
        } else {
            ActionResult::Resolved(RoundOutcome::Failure)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoundVariant {
    Cpr(CprRound),
    Injection(InjectionRound),
    Quiz(QuizRound),
}

impl RoundVariant {
    fn game(&self) -> &dyn MiniGame {
        match self {
            RoundVariant::Cpr(round) => round,
            RoundVariant::Injection(round) => round,
            RoundVariant::Quiz(round) => round,
        }
    }

    fn game_mut(&mut self) -> &mut dyn MiniGame {
        match self {
            RoundVariant::Cpr(round) => round,
            RoundVariant::Injection(round) => round,
            RoundVariant::Quiz(round) => round,
        }
    }
}

/// Question as shown to the player (without the answer key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizPrompt {
    pub prompt: String,
    pub options: Vec<String>,
}

/// View-facing summary of a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub id: u64,
    pub patient: u32,
    pub kind: MiniGameKind,
    pub progress: u32,
    pub target: u32,
    pub deadline_ms: u64,
    pub zone_center: Option<Vec2>,
    pub quiz: Option<QuizPrompt>,
    pub resolution: Option<RoundOutcome>,
}

/// One rescue attempt on one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: u64,
    pub patient: u32,
    pub started_ms: u64,
    pub deadline_ms: u64,
    resolution: Option<RoundOutcome>,
    variant: RoundVariant,
}

impl Round {
    /// Build a fresh round of `kind` for `patient`
    pub fn start(
        id: u64,
        patient: u32,
        kind: MiniGameKind,
        settings: &Settings,
        now_ms: u64,
        rng: &mut dyn RandomSource,
    ) -> Self {
        let variant = match kind {
            MiniGameKind::Cpr => RoundVariant::Cpr(CprRound {
                taps: 0,
                target: settings.cpr_target(),
            }),
            MiniGameKind::Injection => {
                let area = &settings.injection_area;
                let size = Vec2::new(area.width, area.height);
                RoundVariant::Injection(InjectionRound {
                    hits: 0,
                    target: settings.injection_target(),
                    zone: size / 2.0,
                    area: size,
                    zone_radius: area.zone_radius,
                    tolerance: settings.hit_tolerance(),
                })
            }
            MiniGameKind::Quiz => {
                let bank = &settings.quiz.questions;
                let question = bank[rng.next_index(bank.len())].clone();
                RoundVariant::Quiz(QuizRound {
                    question,
                    answer: None,
                })
            }
        };
        Self {
            id,
            patient,
            started_ms: now_ms,
            deadline_ms: now_ms.saturating_add(kind.time_budget_ms(settings)),
            resolution: None,
            variant,
        }
    }

    pub fn kind(&self) -> MiniGameKind {
        self.variant.game().kind()
    }

    pub fn progress(&self) -> u32 {
        self.variant.game().progress()
    }

    pub fn target(&self) -> u32 {
        self.variant.game().target()
    }

    pub fn variant(&self) -> &RoundVariant {
        &self.variant
    }

    pub fn resolution(&self) -> Option<RoundOutcome> {
        self.resolution
    }

    pub fn is_active(&self) -> bool {
        self.resolution.is_none()
    }

    /// Current injection zone center
    pub fn zone_center(&self) -> Option<Vec2> {
        match &self.variant {
            RoundVariant::Injection(round) => Some(round.zone),
            _ => None,
        }
    }

    pub fn question(&self) -> Option<&Question> {
        match &self.variant {
            RoundVariant::Quiz(round) => Some(&round.question),
            _ => None,
        }
    }

    /// Feed an action to the round. Resolves at most once; anything after
    /// that (or of the wrong kind) is ignored.
    pub fn submit(&mut self, action: &MiniGameAction, rng: &mut dyn RandomSource) -> ActionResult {
        if self.resolution.is_some() || action.kind() != self.kind() {
            return ActionResult::Ignored;
        }
        let result = self.variant.game_mut().apply(action, rng);
        if let ActionResult::Resolved(outcome) = result {
            self.resolution = Some(outcome);
        }
        result
    }

    /// Time budget ran out. Fails an unresolved round; `None` if the round
    /// had already resolved.
    pub fn expire(&mut self) -> Option<RoundOutcome> {
        if self.resolution.is_some() {
            return None;
        }
        self.resolution = Some(RoundOutcome::Failure);
        self.resolution
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            id: self.id,
            patient: self.patient,
            kind: self.kind(),
            progress: self.progress(),
            target: self.target(),
            deadline_ms: self.deadline_ms,
            zone_center: self.zone_center(),
            quiz: self.question().map(|q| QuizPrompt {
                prompt: q.prompt.clone(),
                options: q.options.clone(),
            }),
            resolution: self.resolution,
        }
    }
}

/// Picks the kind of the next round.
///
/// Uniform over all kinds, except that a kind already chosen `repeat_cap`
/// times in a row is left out of the next draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSelector {
    repeat_cap: u32,
    last: Option<MiniGameKind>,
    streak: u32,
}

impl KindSelector {
    pub fn new(repeat_cap: u32) -> Self {
        Self {
            repeat_cap,
            last: None,
            streak: 0,
        }
    }

    pub fn last_kind(&self) -> Option<MiniGameKind> {
        self.last
    }

    /// How many times in a row `last_kind` has been chosen
    pub fn repeat_count(&self) -> u32 {
        self.streak
    }

    pub fn pick(&mut self, rng: &mut dyn RandomSource) -> MiniGameKind {
        let excluded = self.last.filter(|_| self.streak >= self.repeat_cap);
        let candidates: Vec<MiniGameKind> = MiniGameKind::ALL
            .into_iter()
            .filter(|kind| Some(*kind) != excluded)
            .collect();
        let kind = candidates[rng.next_index(candidates.len())];

        if self.last == Some(kind) {
            self.streak += 1;
        } else {
            self.last = Some(kind);
            self.streak = 1;
        }
        kind
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::{ScriptedRandom, SeededRandom};

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.cpr.target = 5;
        settings
    }

    #[test]
    fn test_cpr_succeeds_at_target() {
        let mut rng = ScriptedRandom::new();
        let mut round = Round::start(1, 2, MiniGameKind::Cpr, &settings(), 0, &mut rng);
        assert_eq!(round.deadline_ms, 15_000);

        for _ in 0..4 {
            assert_eq!(round.submit(&MiniGameAction::Tap, &mut rng), ActionResult::Progressed);
        }
        assert_eq!(
            round.submit(&MiniGameAction::Tap, &mut rng),
            ActionResult::Resolved(RoundOutcome::Success)
        );
        assert_eq!(round.submit(&MiniGameAction::Tap, &mut rng), ActionResult::Ignored);
        assert_eq!(round.progress(), 5);
        assert_eq!(round.expire(), None);
    }

    #[test]
    fn test_wrong_kind_is_ignored() {
        let mut rng = ScriptedRandom::new();
        let mut round = Round::start(1, 0, MiniGameKind::Cpr, &settings(), 0, &mut rng);
        assert_eq!(
            round.submit(&MiniGameAction::Answer { option: 1 }, &mut rng),
            ActionResult::Ignored
        );
        assert_eq!(round.progress(), 0);
        assert!(round.is_active());
    }

    #[test]
    fn test_injection_hit_relocates_zone() {
        let mut rng = ScriptedRandom::new().with_units([0.0, 1.0]);
        let mut round = Round::start(1, 0, MiniGameKind::Injection, &settings(), 0, &mut rng);
        assert_eq!(round.zone_center(), Some(Vec2::new(125.0, 125.0)));

        // Just inside radius + pointer tolerance
        let result = round.submit(
            &MiniGameAction::Inject { point: Vec2::new(125.0 + 59.0, 125.0) },
            &mut rng,
        );
        assert_eq!(result, ActionResult::Progressed);
        assert_eq!(round.progress(), 1);
        assert_eq!(round.zone_center(), Some(Vec2::new(50.0, 200.0)));
    }

    #[test]
    fn test_injection_miss_keeps_zone() {
        let mut rng = ScriptedRandom::new();
        let mut round = Round::start(1, 0, MiniGameKind::Injection, &settings(), 0, &mut rng);
        let result = round.submit(
            &MiniGameAction::Inject { point: Vec2::new(125.0 + 61.0, 125.0) },
            &mut rng,
        );
        assert_eq!(result, ActionResult::Missed);
        assert_eq!(round.progress(), 0);
        assert_eq!(round.zone_center(), Some(Vec2::new(125.0, 125.0)));
    }

    #[test]
    fn test_touch_widens_tolerance() {
        let mut settings = Settings::for_device(crate::settings::DeviceClass::Touch);
        settings.cpr.target = 5;
        let mut rng = ScriptedRandom::new();
        let mut round = Round::start(1, 0, MiniGameKind::Injection, &settings, 0, &mut rng);
        let result = round.submit(
            &MiniGameAction::Inject { point: Vec2::new(125.0 + 69.0, 125.0) },
            &mut rng,
        );
        assert_eq!(result, ActionResult::Progressed);
    }

    #[test]
    fn test_injection_success_after_target_hits() {
        let mut rng = SeededRandom::new(3);
        let mut round = Round::start(1, 0, MiniGameKind::Injection, &settings(), 0, &mut rng);
        let mut last = ActionResult::Ignored;
        for _ in 0..3 {
            let zone = round.zone_center().unwrap();
            assert!(zone.x >= 50.0 && zone.x <= 200.0 && zone.y >= 50.0 && zone.y <= 200.0);
            last = round.submit(&MiniGameAction::Inject { point: zone }, &mut rng);
        }
        assert_eq!(last, ActionResult::Resolved(RoundOutcome::Success));
    }

    #[test]
    fn test_quiz_locks_on_first_answer() {
        let mut rng = ScriptedRandom::new().with_indices([2]);
        let mut round = Round::start(1, 0, MiniGameKind::Quiz, &settings(), 100, &mut rng);
        assert_eq!(round.deadline_ms, 30_100);
        let correct = round.question().unwrap().correct;

        assert_eq!(
            round.submit(&MiniGameAction::Answer { option: correct }, &mut rng),
            ActionResult::Resolved(RoundOutcome::Success)
        );
        assert_eq!(
            round.submit(&MiniGameAction::Answer { option: 0 }, &mut rng),
            ActionResult::Ignored
        );
        assert_eq!(round.resolution(), Some(RoundOutcome::Success));
    }

    #[test]
    fn test_quiz_wrong_answer_fails() {
        let mut rng = ScriptedRandom::new();
        let mut round = Round::start(1, 0, MiniGameKind::Quiz, &settings(), 0, &mut rng);
        assert_eq!(
            round.submit(&MiniGameAction::Answer { option: 0 }, &mut rng),
            ActionResult::Resolved(RoundOutcome::Failure)
        );
    }

    #[test]
    fn test_expire_fails_once() {
        let mut rng = ScriptedRandom::new();
        let mut round = Round::start(1, 0, MiniGameKind::Quiz, &settings(), 0, &mut rng);
        assert_eq!(round.expire(), Some(RoundOutcome::Failure));
        assert_eq!(round.expire(), None);
        assert_eq!(
            round.submit(&MiniGameAction::Answer { option: 1 }, &mut rng),
            ActionResult::Ignored
        );
    }

    #[test]
    fn test_snapshot_hides_answer_key() {
        let mut rng = ScriptedRandom::new();
        let round = Round::start(9, 3, MiniGameKind::Quiz, &settings(), 0, &mut rng);
        let snapshot = round.snapshot();
        assert_eq!(snapshot.id, 9);
        assert_eq!(snapshot.patient, 3);
        assert_eq!(snapshot.quiz.unwrap().options.len(), 3);
        assert_eq!(snapshot.zone_center, None);
    }

    #[test]
    fn test_selector_excludes_after_cap() {
        // Index 0 every time: Cpr, Cpr, then Cpr is excluded -> Injection
        let mut rng = ScriptedRandom::new().with_indices([0, 0, 0, 0]);
        let mut selector = KindSelector::new(2);
        assert_eq!(selector.pick(&mut rng), MiniGameKind::Cpr);
        assert_eq!(selector.pick(&mut rng), MiniGameKind::Cpr);
        assert_eq!(selector.repeat_count(), 2);
        assert_eq!(selector.pick(&mut rng), MiniGameKind::Injection);
        assert_eq!(selector.repeat_count(), 1);
        assert_eq!(selector.pick(&mut rng), MiniGameKind::Cpr);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn kind_never_repeats_past_cap(seed in any::<u64>(), cap in 1u32..4) {
                let mut rng = SeededRandom::new(seed);
                let mut selector = KindSelector::new(cap);
                let mut previous = None;
                let mut run = 0u32;
                for _ in 0..300 {
                    let kind = selector.pick(&mut rng);
                    run = if Some(kind) == previous { run + 1 } else { 1 };
                    previous = Some(kind);
                    prop_assert!(run <= cap);
                }
            }

            #[test]
            fn scripted_draws_respect_cap(indices in prop::collection::vec(0usize..3, 1..100)) {
                let mut rng = ScriptedRandom::new().with_indices(indices.clone());
                let mut selector = KindSelector::new(2);
                let mut previous = None;
                let mut run = 0u32;
                for _ in 0..indices.len() {
                    let kind = selector.pick(&mut rng);
                    run = if Some(kind) == previous { run + 1 } else { 1 };
                    previous = Some(kind);
                    prop_assert!(run <= 2);
                }
            }
        }
    }
}
