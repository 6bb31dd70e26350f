#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-order tick scheduler that drives the Gridlock world and its systems.
//!
//! A [`Simulation`] owns the world together with every system. Each call to
//! [`Simulation::tick`] advances the clock, resolves attacks against the
//! positions movers held at the end of the previous tick, moves the surviving
//! movers, removes finished ones and finally lets the spawn trigger run.

mod config;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use gridlock_core::{
    AttackerId, AttackerProfile, AttackerView, CellCoord, CellPoint, Command, Event, GridSnapshot,
    Health, MoverId, MoverOutcome, MoverView, PlacementError, Route, SpawnError, Speed,
};
use gridlock_system_movement::{Movement, MovementError};
use gridlock_system_spawning::Spawning;
use gridlock_system_tower_targeting::TowerTargeting;
use gridlock_world::{self as world, query, GridError, World, WorldError};
use thiserror::Error;
use tracing::{error, info, trace};

pub use config::{BoardConfig, Bounds, ConfigError, SimulationConfig, SpawnConfig, TowerConfig};

/// Errors that abort a simulation step.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The board could not be generated.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// A command contradicted the world state.
    #[error(transparent)]
    World(#[from] WorldError),
    /// The movement planner received contradictory inputs.
    #[error(transparent)]
    Movement(#[from] MovementError),
}

/// Outcome of a rejected [`Simulation::request_obstruction`] or
/// [`Simulation::request_spawn`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RequestError<E> {
    /// The world refused the request for a gameplay reason.
    #[error(transparent)]
    Rejected(E),
    /// The request contradicted the world state.
    #[error(transparent)]
    World(#[from] WorldError),
    /// The world accepted the command without reporting an outcome.
    #[error("the world reported no outcome for the request")]
    MissingOutcome,
}

/// Cloneable flag that asks a running simulation to stop between ticks.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Creates a handle that has not been raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag; every clone observes it.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Reports whether the flag was raised.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Totals gathered by [`Simulation::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks executed.
    pub ticks: u64,
    /// Movers created.
    pub spawned: u64,
    /// Movers killed by attackers.
    pub killed: u64,
    /// Movers that reached the end cell.
    pub arrived: u64,
}

impl RunSummary {
    /// Accounts for one executed tick and the events it produced.
    pub fn record(&mut self, events: &[Event]) {
        self.ticks += 1;
        for event in events {
            match event {
                Event::MoverSpawned { .. } => self.spawned += 1,
                Event::MoverRemoved {
                    outcome: MoverOutcome::Killed,
                    ..
                } => self.killed += 1,
                Event::MoverRemoved {
                    outcome: MoverOutcome::Arrived,
                    ..
                } => self.arrived += 1,
                _ => {}
            }
        }
    }
}

/// Authoritative world plus the systems that drive it.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    movement: Movement,
    targeting: TowerTargeting,
    spawning: Option<Spawning>,
    tower_profile: AttackerProfile,
    tick_period: Duration,
    commands: Vec<Command>,
    pending: Vec<Event>,
    events: Vec<Event>,
}

impl Simulation {
    /// Builds a simulation from a validated configuration.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let world = World::new(config.board.columns, config.board.rows)?;
        let spawning = if config.spawn.enabled {
            Some(Spawning::new(config.spawn_config()?))
        } else {
            None
        };
        info!(
            columns = config.board.columns,
            rows = config.board.rows,
            seed = config.seed,
            spawning = config.spawn.enabled,
            "simulation ready"
        );

        Ok(Self {
            world,
            movement: Movement::default(),
            targeting: TowerTargeting::new(),
            spawning,
            tower_profile: config.tower_profile(),
            tick_period: config.tick_period(),
            commands: Vec::new(),
            pending: Vec::new(),
            events: Vec::new(),
        })
    }

    /// Executes one tick and returns the events it produced.
    ///
    /// Events caused by requests made since the previous tick lead the batch.
    pub fn tick(&mut self) -> Result<&[Event], SimulationError> {
        self.events.clear();
        self.events.append(&mut self.pending);

        if let Err(failure) = self.advance() {
            error!(tick = query::tick_index(&self.world), error = %failure, "tick aborted");
            return Err(failure);
        }

        trace!(
            tick = query::tick_index(&self.world),
            events = self.events.len(),
            movers = query::mover_view(&self.world).len(),
            "tick complete"
        );
        Ok(&self.events)
    }

    /// Runs ticks until `max_ticks` were executed or `stop` is raised.
    pub fn run(&mut self, max_ticks: u64, stop: &StopHandle) -> Result<RunSummary, SimulationError> {
        let mut summary = RunSummary::default();
        while summary.ticks < max_ticks && !stop.is_stopped() {
            let events = self.tick()?;
            summary.record(events);
        }
        info!(
            ticks = summary.ticks,
            spawned = summary.spawned,
            killed = summary.killed,
            arrived = summary.arrived,
            "run finished"
        );
        Ok(summary)
    }

    fn advance(&mut self) -> Result<(), SimulationError> {
        world::apply(&mut self.world, Command::Tick, &mut self.events)?;

        let attackers = query::attacker_view(&self.world);
        let movers = query::mover_view(&self.world);
        self.targeting.handle(&attackers, &movers, &mut self.commands);
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events)?;
        }

        let movers = query::mover_view(&self.world);
        if let Some(route) = query::route(&self.world) {
            let grid = query::grid(&self.world);
            self.movement.handle(
                &self.events,
                &movers,
                route,
                (grid.columns(), grid.rows()),
                |cell| !grid.is_passable(cell),
                &mut self.commands,
            )?;
        }
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events)?;
        }

        world::apply(&mut self.world, Command::RemoveFinishedMovers, &mut self.events)?;

        if let Some(spawning) = self.spawning.as_mut() {
            spawning.handle(&self.events, &mut self.commands);
        }
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events)?;
        }
        Ok(())
    }

    /// Places an attacker with the configured profile on the given cell.
    ///
    /// Negative and out-of-range coordinates are rejected as invalid.
    pub fn request_obstruction(
        &mut self,
        x: i64,
        y: i64,
    ) -> Result<AttackerId, RequestError<PlacementError>> {
        let (Ok(column), Ok(row)) = (u32::try_from(x), u32::try_from(y)) else {
            return Err(RequestError::Rejected(PlacementError::InvalidCoordinate));
        };
        let command = Command::PlaceAttacker {
            cell: CellCoord::new(column, row),
            profile: self.tower_profile,
        };
        self.request(command, |event| match event {
            Event::AttackerPlaced { attacker, .. } => Some(Ok(*attacker)),
            Event::PlacementRejected { reason, .. } => Some(Err(*reason)),
            _ => None,
        })
    }

    /// Creates a mover on the start cell.
    pub fn request_spawn(&mut self, speed: f32, health: u32) -> Result<MoverId, RequestError<SpawnError>> {
        let speed = Speed::new(speed).ok_or(RequestError::Rejected(SpawnError::InvalidSpeed))?;
        let command = Command::SpawnMover {
            speed,
            health: Health::new(health),
        };
        self.request(command, |event| match event {
            Event::MoverSpawned { mover, .. } => Some(Ok(*mover)),
            Event::SpawnRejected { reason } => Some(Err(*reason)),
            _ => None,
        })
    }

    fn request<T, E, F>(&mut self, command: Command, outcome: F) -> Result<T, RequestError<E>>
    where
        F: Fn(&Event) -> Option<Result<T, E>>,
    {
        let mut events = Vec::new();
        if let Err(failure) = world::apply(&mut self.world, command, &mut events) {
            error!(error = %failure, "request contradicted the world state");
            return Err(failure.into());
        }
        let result = events.iter().find_map(outcome);
        self.pending.extend(events);
        match result {
            Some(result) => result.map_err(RequestError::Rejected),
            None => {
                error!("request produced no outcome event");
                Err(RequestError::MissingOutcome)
            }
        }
    }

    /// Classification of every cell in row-major order.
    #[must_use]
    pub fn snapshot(&self) -> GridSnapshot {
        query::grid_snapshot(&self.world)
    }

    /// Continuous position of a live mover.
    #[must_use]
    pub fn position(&self, mover: MoverId) -> Option<CellPoint> {
        query::mover_position(&self.world, mover)
    }

    /// Read-only view of every mover.
    #[must_use]
    pub fn movers(&self) -> MoverView {
        query::mover_view(&self.world)
    }

    /// Read-only view of every attacker.
    #[must_use]
    pub fn attackers(&self) -> AttackerView {
        query::attacker_view(&self.world)
    }

    /// Route movers currently follow.
    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        query::route(&self.world)
    }

    /// Number of ticks executed so far.
    #[must_use]
    pub fn tick_index(&self) -> u64 {
        query::tick_index(&self.world)
    }

    /// Wall-clock duration of one tick for paced runs.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Provides read-only access to the underlying world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }
}
