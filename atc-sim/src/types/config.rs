use std::fs::File;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::fault::DEFAULT_FAULT_PROBABILITY;
use super::sim_error::SimError;

/// Tunables of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Wall-clock length of the run; the supervisor shuts down after it.
    pub duration_secs: u64,
    pub actor_poll_ms: u64,
    pub scheduler_poll_ms: u64,
    pub generator_poll_ms: u64,
    pub supervisor_poll_ms: u64,
    pub snapshot_interval_secs: u64,
    pub fault_probability: f64,
    /// Multiplies every phase dwell.
    pub dwell_scale: f64,
    /// Multiplies every schedule interval.
    pub arrival_interval_scale: f64,
    /// Fixes every random stream of the run when set.
    pub seed: Option<u64>,
    pub log_dir: PathBuf,
    pub log_to_console: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            duration_secs: 300,
            actor_poll_ms: 100,
            scheduler_poll_ms: 500,
            generator_poll_ms: 100,
            supervisor_poll_ms: 100,
            snapshot_interval_secs: 30,
            fault_probability: DEFAULT_FAULT_PROBABILITY,
            dwell_scale: 1.0,
            arrival_interval_scale: 1.0,
            seed: None,
            log_dir: PathBuf::from("."),
            log_to_console: true,
        }
    }
}

impl SimConfig {
    /// Reads a configuration file made of `key = value` lines.
    ///
    /// Blank lines and lines starting with `#` are ignored. Keys not present in
    /// the file keep their default value.
    ///
    /// # Errors
    /// - `SimError::IoError` if the file cannot be opened or read.
    /// - `SimError::InvalidConfig` on a malformed line, an unknown key, a value
    ///   that does not parse, or a configuration rejected by [`SimConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let file = File::open(path)?;
        let reader = io::BufReader::new(file);

        let mut config = SimConfig::default();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                SimError::InvalidConfig(format!("line {}: expected `key = value`", number + 1))
            })?;
            config.set(key.trim(), value.trim())?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets one option from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SimError> {
        match key {
            "duration_secs" => self.duration_secs = parse(key, value)?,
            "actor_poll_ms" => self.actor_poll_ms = parse(key, value)?,
            "scheduler_poll_ms" => self.scheduler_poll_ms = parse(key, value)?,
            "generator_poll_ms" => self.generator_poll_ms = parse(key, value)?,
            "supervisor_poll_ms" => self.supervisor_poll_ms = parse(key, value)?,
            "snapshot_interval_secs" => self.snapshot_interval_secs = parse(key, value)?,
            "fault_probability" => self.fault_probability = parse(key, value)?,
            "dwell_scale" => self.dwell_scale = parse(key, value)?,
            "arrival_interval_scale" => self.arrival_interval_scale = parse(key, value)?,
            "seed" => self.seed = Some(parse(key, value)?),
            "log_dir" => self.log_dir = PathBuf::from(value),
            "log_to_console" => self.log_to_console = parse(key, value)?,
            _ => return Err(SimError::InvalidConfig(format!("unknown key `{}`", key))),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let intervals = [
            ("duration_secs", self.duration_secs),
            ("actor_poll_ms", self.actor_poll_ms),
            ("scheduler_poll_ms", self.scheduler_poll_ms),
            ("generator_poll_ms", self.generator_poll_ms),
            ("supervisor_poll_ms", self.supervisor_poll_ms),
            ("snapshot_interval_secs", self.snapshot_interval_secs),
        ];
        if let Some((key, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(SimError::InvalidConfig(format!("`{}` must be positive", key)));
        }
        if !(0.0..=1.0).contains(&self.fault_probability) {
            return Err(SimError::InvalidConfig(
                "`fault_probability` must be within [0, 1]".to_string(),
            ));
        }
        for (key, scale) in [
            ("dwell_scale", self.dwell_scale),
            ("arrival_interval_scale", self.arrival_interval_scale),
        ] {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(SimError::InvalidConfig(format!("`{}` must be positive", key)));
            }
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn actor_poll(&self) -> Duration {
        Duration::from_millis(self.actor_poll_ms)
    }

    pub fn scheduler_poll(&self) -> Duration {
        Duration::from_millis(self.scheduler_poll_ms)
    }

    pub fn generator_poll(&self) -> Duration {
        Duration::from_millis(self.generator_poll_ms)
    }

    pub fn supervisor_poll(&self) -> Duration {
        Duration::from_millis(self.supervisor_poll_ms)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, SimError> {
    value
        .parse()
        .map_err(|_| SimError::InvalidConfig(format!("invalid value for `{}`: {}", key, value)))
}
