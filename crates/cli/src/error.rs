//! Failures of a `statecache` invocation and the exit status each maps to.
//!
//! | status | cause |
//! |---|---|
//! | 2  | argument parsing (reported by clap) |
//! | 10 | the device refused a command or the config |
//! | 11 | a script or config file could not be read |
//! | 12 | the script is malformed or names something it never defined |
//! | 13 | the report could not be encoded as JSON |

use statecache_core::DeviceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Device(DeviceError),
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Input(String),
    #[error("{0}")]
    Serialization(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Device(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

/// Script problems surface from the replayer as `InvalidScript`; they are
/// the user's input, not a device refusal.
impl From<DeviceError> for CliError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::InvalidScript(msg) => CliError::Input(msg),
            other => CliError::Device(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_its_own_status() {
        let errors = [
            CliError::Device(DeviceError::UnknownShader(3)),
            CliError::Io("read failed".into()),
            CliError::Input("undefined surface".into()),
            CliError::Serialization("encode failed".into()),
        ];
        let codes: Vec<i32> = errors.iter().map(CliError::exit_code).collect();
        assert_eq!(codes, [10, 11, 12, 13]);
    }

    #[test]
    fn script_errors_count_as_input() {
        let err = CliError::from(DeviceError::InvalidScript("command 4: undefined".into()));
        assert!(matches!(err, CliError::Input(_)));
        assert!(err.to_string().contains("command 4"));
    }

    #[test]
    fn device_refusals_keep_the_device_message() {
        let err = CliError::from(DeviceError::UnknownSurface(9));
        assert_eq!(err.exit_code(), 10);
        assert_eq!(err.to_string(), DeviceError::UnknownSurface(9).to_string());
    }

    #[test]
    fn json_failures_are_serialization_errors() {
        let parse = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        assert_eq!(CliError::from(parse).exit_code(), 13);
    }
}
