#![deny(unsafe_code)]
//! CLI binary for the render-state cache.
//!
//! Subcommands:
//! - `replay <script>`: run a JSON scene script against the recording
//!   backend and report what reached it
//! - `caps`: print a capability profile

mod error;
mod script;

use clap::{Parser, Subcommand, ValueEnum};
use error::CliError;
use statecache_core::{Capabilities, DeviceConfig};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "statecache", about = "Render-state cache replay tool")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Full,
    FixedFunction,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scene script and report emitted backend calls.
    Replay {
        /// Path to the JSON script.
        script: PathBuf,

        /// Device config JSON, replacing the script's own.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Capability profile, unless the script supplies capabilities.
        #[arg(long, value_enum, default_value = "full")]
        profile: Profile,
    },
    /// Print a capability profile.
    Caps {
        #[arg(long, value_enum, default_value = "full")]
        profile: Profile,
    },
}

fn profile_caps(profile: Profile) -> Capabilities {
    match profile {
        Profile::Full => Capabilities::full(),
        Profile::FixedFunction => Capabilities::fixed_function_only(),
    }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("cannot read {}: {e}", path.display())))
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Caps { profile } => {
            let caps = profile_caps(profile);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&caps)?);
            } else {
                println!("Texture units:     {} ({} vertex)", caps.max_texture_units, caps.max_vertex_texture_units);
                println!("Lights:            {}", caps.max_lights);
                println!("Color attachments: {}", caps.max_color_attachments);
                println!("Max samples:       {}", caps.max_samples);
                println!("Fixed function:    {}", caps.fixed_function);
                println!("Per-stage programs: {}", caps.per_stage_programs);
                println!("Linked programs:   {}", caps.linked_programs);
            }
        }
        Command::Replay {
            script: path,
            config,
            profile,
        } => {
            let mut script = script::parse(&read_file(&path)?)?;
            if let Some(config) = config {
                let value: serde_json::Value = serde_json::from_str(&read_file(&config)?)
                    .map_err(|e| CliError::Input(format!("invalid config JSON: {e}")))?;
                script.config = DeviceConfig::from_json(&value)?;
            }
            if script.capabilities.is_none() {
                script.capabilities = Some(profile_caps(profile));
            }
            log::info!("replaying {} commands from {}", script.commands.len(), path.display());

            let report = script::replay(&script)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{} commands, {} backend calls", report.commands, report.total_calls);
                for (i, frame) in report.frames.iter().enumerate() {
                    println!(
                        "frame {i}: {} draws, {} state changes, {} redundant, {} program binds, {} target switches",
                        frame.draw_calls,
                        frame.state_changes,
                        frame.redundant_requests,
                        frame.program_binds,
                        frame.target_switches
                    );
                }
                println!("Calls:");
                for (kind, count) in &report.calls {
                    println!("  {kind:<24} {count}");
                }
            }
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_script(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    fn replay_cli(script: &Path, config: Option<PathBuf>) -> Result<(), CliError> {
        run(Cli {
            json: true,
            command: Command::Replay {
                script: script.to_path_buf(),
                config,
                profile: Profile::Full,
            },
        })
    }

    #[test]
    fn replay_reads_script_from_disk() {
        let file = write_script(r#"{"commands": [{"op": "invalidate"}]}"#);
        assert!(replay_cli(file.path(), None).is_ok());
    }

    #[test]
    fn sample_scene_replays_cleanly() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenes/two_pass.json");
        let script = script::parse(&read_file(&path).unwrap()).unwrap();
        let report = script::replay(&script).unwrap();
        assert_eq!(report.frames.len(), 2);
        assert_eq!(report.frames[0].draw_calls, 3);
        assert_eq!(
            report.frames[1].redundant_requests, 1,
            "second blend request after invalidate should be redundant"
        );
    }

    #[test]
    fn missing_script_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = replay_cli(&dir.path().join("absent.json"), None).unwrap_err();
        assert_eq!(err.exit_code(), 11);
    }

    #[test]
    fn malformed_script_is_an_input_error() {
        let file = write_script("{not json");
        let err = replay_cli(file.path(), None).unwrap_err();
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn bad_config_file_is_rejected() {
        let script = write_script("{}");
        let config = write_script(r#"{"max_texture_units": 0}"#);
        let err = replay_cli(script.path(), Some(config.path().to_path_buf())).unwrap_err();
        assert_eq!(err.exit_code(), 10, "zero texture units is an invalid config");
    }

    #[test]
    fn fixed_function_profile_has_no_programs() {
        let caps = profile_caps(Profile::FixedFunction);
        assert!(!caps.linked_programs);
    }
}
