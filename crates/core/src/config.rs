//! Device configuration: hardware workarounds and capability limits.
//!
//! A [`DeviceConfig`] can be deserialized directly, or built from a loose
//! `serde_json::Value` with [`DeviceConfig::from_json`], where missing keys
//! fall back to defaults through the `param_*` helpers below.

use crate::backend::Capabilities;
use crate::error::DeviceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hardware-limitation workarounds. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workarounds {
    /// Skip per-stage scalar/vector uploads whose register already holds the
    /// value.
    pub cache_stage_constants: bool,
    /// Attach a texture-free depth buffer when a texture-backed depth
    /// surface is paired with multisampled color.
    pub msaa_depth_texture_fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub workarounds: Workarounds,
    /// Caps the number of texture units the device will use.
    pub max_texture_units: Option<usize>,
    /// Caps the number of fixed-function lights the device will use.
    pub max_lights: Option<usize>,
    /// Backend errors drained in debug builds fire a debug assertion.
    pub assert_on_backend_error: bool,
}

impl DeviceConfig {
    /// Builds a config from a loose JSON object.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::InvalidConfig` if a present key has an
    /// unusable value.
    pub fn from_json(params: &Value) -> Result<Self, DeviceError> {
        let workarounds = params.get("workarounds").unwrap_or(&Value::Null);
        let config = Self {
            workarounds: Workarounds {
                cache_stage_constants: param_bool(workarounds, "cache_stage_constants", false),
                msaa_depth_texture_fallback: param_bool(
                    workarounds,
                    "msaa_depth_texture_fallback",
                    false,
                ),
            },
            max_texture_units: param_limit(params, "max_texture_units")?,
            max_lights: param_limit(params, "max_lights")?,
            assert_on_backend_error: param_bool(params, "assert_on_backend_error", false),
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `DeviceError::InvalidConfig` for a zero texture-unit limit.
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.max_texture_units == Some(0) {
            return Err(DeviceError::InvalidConfig {
                name: "max_texture_units".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// `caps` narrowed by the configured limits.
    pub fn apply(&self, caps: &Capabilities) -> Capabilities {
        let mut caps = caps.clone();
        if let Some(units) = self.max_texture_units {
            caps.max_texture_units = caps.max_texture_units.min(units);
            caps.max_vertex_texture_units = caps
                .max_vertex_texture_units
                .min(caps.max_texture_units / 2);
        }
        if let Some(lights) = self.max_lights {
            caps.max_lights = caps.max_lights.min(lights);
        }
        caps
    }
}

/// Extracts a `bool` from `params[name]`, returning `default` if missing or wrong type.
pub fn param_bool(params: &Value, name: &str, default: bool) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(default)
}

/// Optional non-negative integer limit. `null` and a missing key mean no limit.
fn param_limit(params: &Value, name: &str) -> Result<Option<usize>, DeviceError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|v| Some(v as usize))
            .ok_or_else(|| DeviceError::InvalidConfig {
                name: name.to_string(),
                reason: format!("expected a non-negative integer, got {value}"),
            }),
    }
}
