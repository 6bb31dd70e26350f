#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting mover spawn commands.

use std::ops::RangeInclusive;

use gridlock_core::{Command, Event, Health, Speed};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Reasons a spawning configuration may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The interval range is empty or allows zero-tick delays.
    #[error("spawn interval must be a non-empty range of positive ticks")]
    InvalidInterval,
    /// The speed range is empty or leaves `(0, 1]`.
    #[error("spawn speed must be a non-empty range inside (0, 1]")]
    InvalidSpeed,
    /// The health range is empty or allows zero health.
    #[error("spawn health must be a non-empty range of positive values")]
    InvalidHealth,
}

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    interval_ticks: RangeInclusive<u32>,
    speed: RangeInclusive<f32>,
    health: RangeInclusive<u32>,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration from the ranges new movers are drawn from.
    pub fn new(
        interval_ticks: RangeInclusive<u32>,
        speed: RangeInclusive<f32>,
        health: RangeInclusive<u32>,
        rng_seed: u64,
    ) -> Result<Self, ConfigError> {
        if interval_ticks.is_empty() || *interval_ticks.start() == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if speed.is_empty()
            || Speed::new(*speed.start()).is_none()
            || Speed::new(*speed.end()).is_none()
        {
            return Err(ConfigError::InvalidSpeed);
        }
        if health.is_empty() || *health.start() == 0 {
            return Err(ConfigError::InvalidHealth);
        }
        Ok(Self {
            interval_ticks,
            speed,
            health,
            rng_seed,
        })
    }
}

/// Pure system that deterministically emits spawn commands as time advances.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    rng: ChaCha8Rng,
    countdown: u32,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let countdown = rng.gen_range(config.interval_ticks.clone());
        Self {
            config,
            rng,
            countdown,
        }
    }

    /// Ticks left before the next spawn request.
    #[must_use]
    pub const fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Consumes events and emits one spawn command whenever the countdown
    /// elapses, then draws the next delay.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        let ticks = events
            .iter()
            .filter(|event| matches!(event, Event::TimeAdvanced { .. }))
            .count();

        for _ in 0..ticks {
            self.countdown = self.countdown.saturating_sub(1);
            if self.countdown > 0 {
                continue;
            }
            self.countdown = self.rng.gen_range(self.config.interval_ticks.clone());

            let speed = self.rng.gen_range(self.config.speed.clone());
            let health = Health::new(self.rng.gen_range(self.config.health.clone()));
            if let Some(speed) = Speed::new(speed) {
                out.push(Command::SpawnMover { speed, health });
            }
        }
    }
}
