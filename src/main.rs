//! Hospital Guard entry point
//!
//! In the browser the page drives `WebSession` directly. Natively this runs
//! a headless shift with a bot player, which is handy for checking tuning.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u64>().ok())
        .unwrap_or(42);
    log::info!("Hospital Guard (native) starting, seed {seed}");

    match autoplay::run(seed) {
        Ok(summary) => println!("{summary}"),
        Err(e) => {
            eprintln!("Session error: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The page constructs `WebSession` itself; nothing to do here
}

#[cfg(not(target_arch = "wasm32"))]
mod autoplay {
    use hospital_guard::GameError;
    use hospital_guard::settings::Settings;
    use hospital_guard::sim::{
        EventLog, GameEvent, GamePhase, MiniGameAction, MiniGameKind, PlayerInput, SeededRandom,
        Session,
    };

    /// Frame length of the simulated host loop
    const STEP_MS: u64 = 100;

    /// Play one shift to the end and describe it
    pub fn run(seed: u64) -> Result<String, GameError> {
        let mut session = Session::new(Settings::default(), EventLog::new(), SeededRandom::new(seed))?;
        session.handle_input(PlayerInput::Start)?;

        let mut rescues = 0u32;
        let mut bosses = 0u32;
        while session.phase() != GamePhase::Ended {
            if let Some(input) = next_move(&session) {
                if matches!(input, PlayerInput::SelectPatient(_)) {
                    rescues += 1;
                }
                session.handle_input(input)?;
            }
            session.advance(STEP_MS)?;

            for event in session.sink_mut().drain() {
                match event {
                    GameEvent::Feedback { message, .. } => log::info!("{message}"),
                    GameEvent::PhaseChanged { phase: GamePhase::BossFight } => bosses += 1,
                    _ => {}
                }
            }
        }

        Ok(format!(
            "Shift over ({:?}) after {}s: score {}, saved {}, lost {}, {} rescues, {} boss fights",
            session.outcome(),
            session.elapsed_seconds(),
            session.score(),
            session.saved_count(),
            session.lost_count(),
            rescues,
            bosses
        ))
    }

    /// What a competent player does this frame
    fn next_move(session: &Session<EventLog, SeededRandom>) -> Option<PlayerInput> {
        match session.phase() {
            GamePhase::Monitoring => session
                .active_critical_ids()
                .iter()
                .next()
                .map(|id| PlayerInput::SelectPatient(*id)),
            GamePhase::RescuingBaby => {
                let round = session.round().filter(|r| r.is_active())?;
                let action = match round.kind() {
                    MiniGameKind::Cpr => MiniGameAction::Tap,
                    MiniGameKind::Injection => MiniGameAction::Inject {
                        point: round.zone_center()?,
                    },
                    MiniGameKind::Quiz => MiniGameAction::Answer {
                        option: round.question()?.correct,
                    },
                };
                Some(PlayerInput::MiniGame(action))
            }
            GamePhase::BossFight => Some(PlayerInput::Tool("scalpel".to_string())),
            GamePhase::Idle | GamePhase::Ended => None,
        }
    }
}
