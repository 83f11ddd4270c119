// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;

pub mod audio;
pub mod dispatch;
pub mod error;
pub mod kit;
pub mod serial;

pub use audio::Audio;
pub use dispatch::Dispatch;
pub use error::ConfigError;
pub use kit::{Kit, Slot};
pub use serial::Serial;

/// The top level configuration for the trigger player.
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    /// The serial endpoint to listen on.
    serial: Serial,
    /// The audio output.
    #[serde(default)]
    audio: Audio,
    /// Dispatch loop settings.
    #[serde(default)]
    dispatch: Dispatch,
    /// The drum kit.
    #[serde(default)]
    kit: Kit,
    /// The directory the configuration was loaded from.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Config {
    /// Creates a configuration from its parts. Relative paths resolve against the working directory.
    pub fn new(serial: Serial, audio: Audio, dispatch: Dispatch, kit: Kit) -> Config {
        Config {
            serial,
            audio,
            dispatch,
            kit,
            base_dir: PathBuf::new(),
        }
    }

    /// Loads and validates the configuration file at the given path.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let mut config: Config = ::config::Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML configuration. Relative paths resolve against base_dir.
    pub fn from_yaml(yaml: &str, base_dir: &Path) -> Result<Config, ConfigError> {
        let mut config: Config = ::config::Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        config.base_dir = base_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn serial(&self) -> &Serial {
        &self.serial
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn kit(&self) -> &Kit {
        &self.kit
    }

    /// Returns the directory that slot files are resolved against.
    pub fn samples_dir(&self) -> PathBuf {
        let path = Path::new(self.kit.path());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.serial.validate()?;
        self.audio.validate()?;
        self.dispatch.validate()?;
        self.kit.validate(self.dispatch.base_code())
    }
}

/// Parses an optional human readable duration ("1ms", "2s"), falling back to the default.
pub(crate) fn parse_duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => DurationString::from_string(value.clone())
            .map(Duration::from)
            .map_err(|e| ConfigError::InvalidDuration {
                field,
                value: value.clone(),
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let yaml = r#"
            serial:
              port: /dev/ttyACM0
        "#;

        let config = Config::from_yaml(yaml, Path::new("/kits")).unwrap();

        assert_eq!(config.serial().port(), "/dev/ttyACM0");
        assert_eq!(config.serial().baud_rate(), 230_400);
        assert_eq!(config.serial().settle_delay().unwrap(), Duration::from_secs(1));
        assert_eq!(config.audio().device(), "default");
        assert_eq!(config.audio().sample_rate(), 44100);
        assert_eq!(config.audio().buffer_size(), 256);
        assert_eq!(config.audio().max_voices(), 16);
        assert_eq!(config.dispatch().base_code(), b'0');
        assert!(config.dispatch().status_lines());
        assert_eq!(config.dispatch().idle_delay().unwrap(), Duration::from_millis(1));
        assert_eq!(
            config.dispatch().error_cooldown().unwrap(),
            Duration::from_millis(100)
        );

        let names: Vec<&str> = config.kit().slots().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Snare", "Hi-Hat", "Tom", "Crash", "Ride", "Kick"]);
        assert_eq!(config.samples_dir(), Path::new("/kits/SAMPLES"));
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
            serial:
              port: COM8
              baud_rate: 115200
              settle_delay: 250ms
            audio:
              device: mock-device
              sample_rate: 48000
              buffer_size: 512
              max_voices: 8
            dispatch:
              base_code: 97
              status_lines: false
              idle_delay: 2ms
              error_cooldown: 1s
            kit:
              path: /opt/kit
              slots:
                - name: Kick
                  file: kick.wav
                - name: Snare
                  file: snare.flac
                  volume: 0.5
        "#;

        let config = Config::from_yaml(yaml, Path::new("/ignored")).unwrap();

        assert_eq!(config.serial().port(), "COM8");
        assert_eq!(config.serial().baud_rate(), 115200);
        assert_eq!(
            config.serial().settle_delay().unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(config.audio().device(), "mock-device");
        assert_eq!(config.audio().sample_rate(), 48000);
        assert_eq!(config.audio().buffer_size(), 512);
        assert_eq!(config.audio().max_voices(), 8);
        assert_eq!(config.dispatch().base_code(), b'a');
        assert!(!config.dispatch().status_lines());
        assert_eq!(config.dispatch().idle_delay().unwrap(), Duration::from_millis(2));
        assert_eq!(config.dispatch().error_cooldown().unwrap(), Duration::from_secs(1));
        assert_eq!(
            config.kit().slots(),
            &[
                Slot::new("Kick", "kick.wav"),
                Slot::new("Snare", "snare.flac").with_volume(0.5),
            ]
        );
        assert_eq!(config.samples_dir(), Path::new("/opt/kit"));
    }

    #[test]
    fn test_missing_port_is_rejected() {
        let yaml = r#"
            audio:
              device: mock-device
        "#;

        assert!(matches!(
            Config::from_yaml(yaml, Path::new(".")),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let yaml = r#"
            serial:
              port: mock-serial
            dispatch:
              idle_delay: soon
        "#;

        match Config::from_yaml(yaml, Path::new(".")) {
            Err(ConfigError::InvalidDuration { field, value, .. }) => {
                assert_eq!(field, "dispatch.idle_delay");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_kit_is_rejected() {
        let kit = Kit::new("samples", Vec::new());

        assert!(matches!(kit.validate(b'0'), Err(ConfigError::EmptyKit)));
    }

    #[test]
    fn test_negative_volume_is_rejected() {
        let yaml = r#"
            serial:
              port: mock-serial
            kit:
              slots:
                - name: Kick
                  file: kick.wav
                  volume: -1.0
        "#;

        assert!(matches!(
            Config::from_yaml(yaml, Path::new(".")),
            Err(ConfigError::InvalidVolume { .. })
        ));
    }

    #[test]
    fn test_slots_must_be_addressable() {
        let yaml = r#"
            serial:
              port: mock-serial
            dispatch:
              base_code: 255
            kit:
              slots:
                - name: Kick
                  file: kick.wav
                - name: Snare
                  file: snare.wav
        "#;

        match Config::from_yaml(yaml, Path::new(".")) {
            Err(ConfigError::TooManySlots {
                count, addressable, ..
            }) => {
                assert_eq!(count, 2);
                assert_eq!(addressable, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_zero_voices_is_rejected() {
        let yaml = r#"
            serial:
              port: mock-serial
            audio:
              max_voices: 0
        "#;

        assert!(matches!(
            Config::from_yaml(yaml, Path::new(".")),
            Err(ConfigError::Zero {
                field: "audio.max_voices"
            })
        ));
    }

    #[test]
    fn test_load_resolves_kit_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drumtrig.yaml");
        std::fs::write(
            &path,
            "serial:\n  port: mock-serial\nkit:\n  path: samples\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.samples_dir(), dir.path().join("samples"));
    }
}
