//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Device detection (user agent)
//! - Host configuration
//! - Browser bindings (`web`, wasm32 only)

#[cfg(target_arch = "wasm32")]
pub mod web;

use crate::error::GameError;
use crate::settings::{DeviceClass, Settings};

/// Longest frame the host may report; larger gaps (a backgrounded tab,
/// bogus timestamps) are cut to this
pub const MAX_FRAME_MS: f64 = 60_000.0;

/// Host frame time in whole milliseconds. Negative, NaN and oversized
/// values are clamped into `0..=MAX_FRAME_MS`.
pub fn frame_delta_ms(dt_ms: f64) -> u64 {
    if dt_ms.is_nan() {
        return 0;
    }
    dt_ms.clamp(0.0, MAX_FRAME_MS) as u64
}

/// Build settings from optional host JSON. The device class comes from the
/// user agent unless the JSON names one.
pub fn settings_for_host(config: Option<&str>, user_agent: &str) -> Result<Settings, GameError> {
    let detected = DeviceClass::from_user_agent(user_agent);
    let Some(json) = config else {
        return Ok(Settings::for_device(detected));
    };
    let mut settings = Settings::from_json(json)?;
    let names_device = serde_json::from_str::<serde_json::Value>(json)
        .ok()
        .is_some_and(|v| v.get("device").is_some());
    if !names_device {
        settings.device = detected;
    }
    log::info!("Device class: {}", settings.device.as_str());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
    const DESKTOP: &str = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0";

    #[test]
    fn test_device_from_user_agent() {
        let settings = settings_for_host(None, IPHONE).unwrap();
        assert_eq!(settings.device, DeviceClass::Touch);
        assert_eq!(settings.cpr_target(), 30);

        let settings = settings_for_host(None, DESKTOP).unwrap();
        assert_eq!(settings.device, DeviceClass::Pointer);
        assert_eq!(settings.cpr_target(), 50);
    }

    #[test]
    fn test_config_overrides() {
        let settings = settings_for_host(Some(r#"{"patient_count": 6}"#), IPHONE).unwrap();
        assert_eq!(settings.patient_count, 6);
        assert_eq!(settings.device, DeviceClass::Touch);

        let settings = settings_for_host(Some(r#"{"device": "Pointer"}"#), IPHONE).unwrap();
        assert_eq!(settings.device, DeviceClass::Pointer);
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        assert_eq!(frame_delta_ms(16.7), 16);
        assert_eq!(frame_delta_ms(-5.0), 0);
        assert_eq!(frame_delta_ms(f64::NAN), 0);
        assert_eq!(frame_delta_ms(f64::INFINITY), 60_000);
        assert_eq!(frame_delta_ms(1e300), 60_000);
    }

    #[test]
    fn test_bad_config_is_rejected() {
        assert!(settings_for_host(Some("{"), DESKTOP).is_err());
        assert!(matches!(
            settings_for_host(Some(r#"{"critical_chance": 2.0}"#), DESKTOP),
            Err(GameError::InvalidConfig { field: "critical_chance", .. })
        ));
    }
}
