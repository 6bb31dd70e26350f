//! Tunable parameters of a simulation run.

use std::time::Duration;

use gridlock_core::{AttackerProfile, Damage};
use gridlock_system_spawning as spawning;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a simulation configuration may be rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The board is smaller than 3x3.
    #[error("board must be at least 3x3, got {columns}x{rows}")]
    InvalidBoard {
        /// Configured number of columns.
        columns: u32,
        /// Configured number of rows.
        rows: u32,
    },
    /// The tick period is zero.
    #[error("tick period must be positive")]
    ZeroTickPeriod,
    /// The default attacker profile has a negative range or a zero interval.
    #[error("tower profile needs a non-negative range and a positive interval")]
    InvalidTower,
    /// The spawn ranges are unusable.
    #[error(transparent)]
    Spawn(#[from] spawning::ConfigError),
    /// The TOML document could not be decoded.
    #[error("failed to parse simulation config")]
    Parse(#[from] toml::de::Error),
}

/// Inclusive range of values read from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bounds<T> {
    /// Smallest allowed value.
    pub min: T,
    /// Largest allowed value.
    pub max: T,
}

impl<T: Copy> Bounds<T> {
    /// Creates a new inclusive range.
    #[must_use]
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    fn range(self) -> std::ops::RangeInclusive<T> {
        self.min..=self.max
    }
}

/// Board dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Number of columns including the border walls.
    pub columns: u32,
    /// Number of rows including the border walls.
    pub rows: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            columns: 25,
            rows: 25,
        }
    }
}

/// Parameters of the automatic spawn trigger.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawnConfig {
    /// Whether movers spawn automatically.
    pub enabled: bool,
    /// Ticks between two automatic spawns.
    pub interval_ticks: Bounds<u32>,
    /// Speed of spawned movers.
    pub speed: Bounds<f32>,
    /// Health of spawned movers.
    pub health: Bounds<u32>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ticks: Bounds::new(5, 30),
            speed: Bounds::new(0.2, 0.9),
            health: Bounds::new(50, 100),
        }
    }
}

/// Profile assigned to attackers placed through the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TowerConfig {
    /// Damage per hit.
    pub damage: u32,
    /// Euclidean reach in cells.
    pub range: f32,
    /// Ticks between attack evaluations.
    pub interval_ticks: u32,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            damage: 10,
            range: 3.0,
            interval_ticks: 5,
        }
    }
}

/// Complete configuration of a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seed of the spawn generator.
    pub seed: u64,
    /// Wall-clock duration of one tick when a run is paced.
    pub tick_period_ms: u64,
    /// Board dimensions.
    pub board: BoardConfig,
    /// Automatic spawn trigger.
    pub spawn: SpawnConfig,
    /// Default attacker profile.
    pub tower: TowerConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            tick_period_ms: 100,
            board: BoardConfig::default(),
            spawn: SpawnConfig::default(),
            tower: TowerConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Decodes and validates a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board.columns < 3 || self.board.rows < 3 {
            return Err(ConfigError::InvalidBoard {
                columns: self.board.columns,
                rows: self.board.rows,
            });
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if !self.tower_profile().is_valid() {
            return Err(ConfigError::InvalidTower);
        }
        let _ = self.spawn_config()?;
        Ok(())
    }

    /// Wall-clock duration of one tick.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Profile given to attackers placed through the simulation.
    #[must_use]
    pub fn tower_profile(&self) -> AttackerProfile {
        AttackerProfile::new(
            Damage::new(self.tower.damage),
            self.tower.range,
            self.tower.interval_ticks,
        )
    }

    pub(crate) fn spawn_config(&self) -> Result<spawning::Config, ConfigError> {
        Ok(spawning::Config::new(
            self.spawn.interval_ticks.range(),
            self.spawn.speed.range(),
            self.spawn.health.range(),
            self.seed,
        )?)
    }
}
