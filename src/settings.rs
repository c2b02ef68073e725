//! Session configuration
//!
//! Supplied by the host when a session is created. Any JSON subset is
//! accepted; missing fields take the defaults below.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::GameError;
use crate::sim::ToolTable;
use crate::sim::quiz::{Question, default_questions};

/// Input device class, used to scale targets and hit tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeviceClass {
    /// Mouse or trackpad
    #[default]
    Pointer,
    /// Touch screen (easier targets, wider hit tolerance)
    Touch,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Pointer => "Pointer",
            DeviceClass::Touch => "Touch",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pointer" | "mouse" | "desktop" => Some(DeviceClass::Pointer),
            "touch" | "mobile" => Some(DeviceClass::Touch),
            _ => None,
        }
    }

    /// Classify a browser user agent string
    pub fn from_user_agent(user_agent: &str) -> Self {
        const MOBILE_MARKERS: [&str; 8] = [
            "android",
            "webos",
            "iphone",
            "ipad",
            "ipod",
            "blackberry",
            "iemobile",
            "opera mini",
        ];
        let ua = user_agent.to_lowercase();
        if MOBILE_MARKERS.iter().any(|m| ua.contains(m)) {
            DeviceClass::Touch
        } else {
            DeviceClass::Pointer
        }
    }
}

/// Target and timing for one mini-game kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundTuning {
    /// Progress needed on pointer devices
    pub target: u32,
    /// Progress needed on touch devices
    pub touch_target: u32,
    /// Time before an unfinished round fails
    pub time_budget_ms: u64,
    /// Pause between resolution and its consequences
    pub resolve_delay_ms: u64,
}

impl RoundTuning {
    pub fn target_for(&self, device: DeviceClass) -> u32 {
        match device {
            DeviceClass::Pointer => self.target,
            DeviceClass::Touch => self.touch_target,
        }
    }

    pub fn cpr() -> Self {
        Self {
            target: 50,
            touch_target: 30,
            time_budget_ms: 15_000,
            resolve_delay_ms: 0,
        }
    }

    pub fn injection() -> Self {
        Self {
            target: 3,
            touch_target: 2,
            time_budget_ms: 15_000,
            resolve_delay_ms: 500,
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), GameError> {
        if self.target == 0 || self.touch_target == 0 {
            return Err(GameError::config(field, "targets must be at least 1"));
        }
        if self.time_budget_ms == 0 {
            return Err(GameError::config(field, "time budget must be positive"));
        }
        Ok(())
    }
}

impl Default for RoundTuning {
    fn default() -> Self {
        Self::cpr()
    }
}

/// Geometry of the injection mini-game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionArea {
    pub width: f32,
    pub height: f32,
    pub zone_radius: f32,
    pub pointer_tolerance: f32,
    pub touch_tolerance: f32,
}

impl InjectionArea {
    pub fn tolerance_for(&self, device: DeviceClass) -> f32 {
        match device {
            DeviceClass::Pointer => self.pointer_tolerance,
            DeviceClass::Touch => self.touch_tolerance,
        }
    }

    fn validate(&self) -> Result<(), GameError> {
        if self.zone_radius.is_nan() || self.zone_radius <= 0.0 {
            return Err(GameError::config("injection_area.zone_radius", "must be positive"));
        }
        let diameter = 2.0 * self.zone_radius;
        if self.width.is_nan()
            || self.height.is_nan()
            || self.width < diameter
            || self.height < diameter
        {
            return Err(GameError::config(
                "injection_area",
                "area must fit the zone diameter",
            ));
        }
        let tolerances = [self.pointer_tolerance, self.touch_tolerance];
        if tolerances.iter().any(|t| t.is_nan() || *t < 0.0) {
            return Err(GameError::config("injection_area", "tolerances must be non-negative"));
        }
        Ok(())
    }
}

impl Default for InjectionArea {
    fn default() -> Self {
        Self {
            width: 250.0,
            height: 250.0,
            zone_radius: 50.0,
            pointer_tolerance: 10.0,
            touch_tolerance: 20.0,
        }
    }
}

/// Quiz timing and question bank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizTuning {
    pub time_budget_ms: u64,
    pub resolve_delay_ms: u64,
    pub questions: Vec<Question>,
}

impl Default for QuizTuning {
    fn default() -> Self {
        Self {
            time_budget_ms: 30_000,
            resolve_delay_ms: 3_000,
            questions: default_questions(),
        }
    }
}

/// Everything tunable about a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: DeviceClass,

    // === Ward ===
    pub patient_count: u32,
    pub max_concurrent_critical: usize,
    /// Per-tick probability of a new critical patient (0 disables)
    pub critical_chance: f32,
    /// Minimum time between two spawns
    pub critical_cooldown_ms: u64,
    /// Time a critical patient may stay unattended
    pub grace_period_ms: u64,
    /// Saved patients rejoin the normal pool after this delay
    pub saved_recovery_ms: u64,

    // === Clock ===
    pub tick_interval_ms: u64,
    pub game_duration_secs: u32,
    pub loss_cap: u32,

    // === Mini-games ===
    pub repeat_cap: u32,
    pub cpr: RoundTuning,
    pub injection: RoundTuning,
    pub injection_area: InjectionArea,
    pub quiz: QuizTuning,

    // === Boss ===
    /// Time from a loss to the start of the boss fight
    pub boss_delay_ms: u64,
    /// How long before the fight the boss is announced
    pub boss_warning_ms: u64,
    pub boss_max_health: u32,
    pub tools: ToolTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: DeviceClass::Pointer,

            patient_count: DEFAULT_PATIENT_COUNT,
            max_concurrent_critical: DEFAULT_MAX_CRITICAL,
            critical_chance: 0.2,
            critical_cooldown_ms: 12_000,
            grace_period_ms: 8_000,
            saved_recovery_ms: 3_000,

            tick_interval_ms: 1_000,
            game_duration_secs: 300,
            loss_cap: DEFAULT_LOSS_CAP,

            repeat_cap: DEFAULT_REPEAT_CAP,
            cpr: RoundTuning::cpr(),
            injection: RoundTuning::injection(),
            injection_area: InjectionArea::default(),
            quiz: QuizTuning::default(),

            boss_delay_ms: 2_000,
            boss_warning_ms: 1_000,
            boss_max_health: BOSS_MAX_HEALTH,
            tools: ToolTable::default(),
        }
    }
}

impl Settings {
    /// Defaults for a device class
    pub fn for_device(device: DeviceClass) -> Self {
        Self {
            device,
            ..Self::default()
        }
    }

    /// Parse a (possibly partial) JSON document and validate it
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|e| GameError::config("json", e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, GameError> {
        serde_json::to_string(self).map_err(|e| GameError::config("json", e.to_string()))
    }

    /// CPR taps needed for the configured device
    pub fn cpr_target(&self) -> u32 {
        self.cpr.target_for(self.device)
    }

    /// Injection hits needed for the configured device
    pub fn injection_target(&self) -> u32 {
        self.injection.target_for(self.device)
    }

    /// Extra hit radius for the configured device
    pub fn hit_tolerance(&self) -> f32 {
        self.injection_area.tolerance_for(self.device)
    }

    /// Reject settings the session cannot run with
    pub fn validate(&self) -> Result<(), GameError> {
        if self.patient_count == 0 {
            return Err(GameError::config("patient_count", "must be at least 1"));
        }
        if self.max_concurrent_critical == 0 {
            return Err(GameError::config("max_concurrent_critical", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.critical_chance) {
            return Err(GameError::config(
                "critical_chance",
                format!("{} is not a probability", self.critical_chance),
            ));
        }
        if self.grace_period_ms == 0 {
            return Err(GameError::config("grace_period_ms", "must be positive"));
        }
        if self.tick_interval_ms == 0 {
            return Err(GameError::config("tick_interval_ms", "must be positive"));
        }
        if self.game_duration_secs == 0 {
            return Err(GameError::config("game_duration_secs", "must be positive"));
        }
        if self.loss_cap == 0 {
            return Err(GameError::config("loss_cap", "must be at least 1"));
        }
        if self.repeat_cap == 0 {
            return Err(GameError::config("repeat_cap", "must be at least 1"));
        }
        if self.boss_warning_ms > self.boss_delay_ms {
            return Err(GameError::config(
                "boss_warning_ms",
                "warning cannot start before the loss",
            ));
        }
        if self.boss_max_health == 0 {
            return Err(GameError::config("boss_max_health", "must be positive"));
        }
        self.cpr.validate("cpr")?;
        self.injection.validate("injection")?;
        self.injection_area.validate()?;
        if self.quiz.time_budget_ms == 0 {
            return Err(GameError::config("quiz.time_budget_ms", "must be positive"));
        }
        if self.quiz.questions.is_empty() {
            return Err(GameError::config("quiz.questions", "bank is empty"));
        }
        for question in &self.quiz.questions {
            question.validate()?;
        }
        Ok(())
    }
}
