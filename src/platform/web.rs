//! Browser bindings
//!
//! The page owns the real clock: it calls `advance` from its frame loop and
//! drains the queued events into the DOM after every call.

use glam::Vec2;
use wasm_bindgen::prelude::*;

use crate::sim::{EventLog, MiniGameAction, PlayerInput, SeededRandom, Session};

/// Install the panic hook and console logger. Safe to call more than once.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("Logger already installed");
    }
}

/// Session handle exported to JavaScript
#[wasm_bindgen]
pub struct WebSession {
    session: Session<EventLog, SeededRandom>,
}

#[wasm_bindgen]
impl WebSession {
    /// `config` is an optional (partial) settings JSON document
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<WebSession, JsError> {
        let user_agent = web_sys::window()
            .and_then(|w| w.navigator().user_agent().ok())
            .unwrap_or_default();
        let settings = super::settings_for_host(config.as_deref(), &user_agent)?;
        let seed = js_sys::Date::now() as u64;
        log::info!("Seed: {seed}");
        let session = Session::new(settings, EventLog::new(), SeededRandom::new(seed))?;
        Ok(Self { session })
    }

    /// Move the session clock forward by `dt_ms` milliseconds
    pub fn advance(&mut self, dt_ms: f64) -> Result<(), JsError> {
        self.session.advance(super::frame_delta_ms(dt_ms))?;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), JsError> {
        self.input(PlayerInput::Start)
    }

    pub fn restart(&mut self) -> Result<(), JsError> {
        self.input(PlayerInput::Restart)
    }

    #[wasm_bindgen(js_name = selectPatient)]
    pub fn select_patient(&mut self, id: u32) -> Result<(), JsError> {
        self.input(PlayerInput::SelectPatient(id))
    }

    /// One CPR compression
    pub fn tap(&mut self) -> Result<(), JsError> {
        self.input(PlayerInput::MiniGame(MiniGameAction::Tap))
    }

    /// Injection at area-local coordinates
    pub fn inject(&mut self, x: f32, y: f32) -> Result<(), JsError> {
        let point = Vec2::new(x, y);
        self.input(PlayerInput::MiniGame(MiniGameAction::Inject { point }))
    }

    pub fn answer(&mut self, option: usize) -> Result<(), JsError> {
        self.input(PlayerInput::MiniGame(MiniGameAction::Answer { option }))
    }

    #[wasm_bindgen(js_name = useTool)]
    pub fn use_tool(&mut self, tool: String) -> Result<(), JsError> {
        self.input(PlayerInput::Tool(tool))
    }

    /// Events since the last drain, as a JSON array
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        let events = self.session.sink_mut().drain();
        serde_json::to_string(&events).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Full session state as JSON
    pub fn snapshot(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.session.snapshot()).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl WebSession {
    fn input(&mut self, input: PlayerInput) -> Result<(), JsError> {
        self.session.handle_input(input)?;
        Ok(())
    }
}
