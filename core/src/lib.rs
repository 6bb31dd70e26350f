#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gridlock simulation engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and the scheduler submit
//! [`Command`] values describing desired mutations, the world executes them
//! through its `apply` entry point, and then broadcasts [`Event`] values.
//! Systems read immutable snapshots such as [`MoverView`], [`AttackerView`]
//! and [`Route`], and respond exclusively with new command batches.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Distance below which a mover snaps onto the waypoint it approaches.
pub const ARRIVAL_EPSILON: f32 = 0.01;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by one discrete tick.
    Tick,
    /// Requests placement of an attacker whose footprint obstructs the cell.
    PlaceAttacker {
        /// Cell the attacker should occupy.
        cell: CellCoord,
        /// Combat parameters assigned to the attacker.
        profile: AttackerProfile,
    },
    /// Requests that a new mover be created on the start cell.
    SpawnMover {
        /// Interpolation factor applied per tick.
        speed: Speed,
        /// Health the mover starts with.
        health: Health,
    },
    /// Commits a movement step computed by the movement system.
    AdvanceMover {
        /// Mover the step belongs to.
        mover: MoverId,
        /// State of the mover after the step.
        step: MoverStep,
    },
    /// Resolves one attack evaluation of a ready attacker.
    FireAttacker {
        /// Attacker whose cooldown elapsed.
        attacker: AttackerId,
        /// Mover selected as target, if any was in range.
        target: Option<MoverId>,
    },
    /// Removes every dead or arrived mover from the active set.
    RemoveFinishedMovers,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Index of the tick that just started.
        tick: u64,
    },
    /// Announces that the grid replaced its route.
    RouteChanged {
        /// Version assigned to the new route.
        version: RouteVersion,
        /// Number of coordinates in the new route.
        length: usize,
    },
    /// Confirms that an attacker was placed on the grid.
    AttackerPlaced {
        /// Identifier allocated to the attacker.
        attacker: AttackerId,
        /// Cell the attacker obstructs.
        cell: CellCoord,
    },
    /// Reports that an attacker placement request was rejected.
    PlacementRejected {
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a mover was created on the start cell.
    MoverSpawned {
        /// Identifier allocated to the mover.
        mover: MoverId,
        /// Cell the mover occupies after spawning.
        cell: CellCoord,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that a mover committed a transition between two cells.
    MoverAdvanced {
        /// Mover that advanced.
        mover: MoverId,
        /// Cell the mover occupied before the transition.
        from: CellCoord,
        /// Cell the mover occupies after the transition.
        to: CellCoord,
    },
    /// Announces that a mover left the route and follows a local detour.
    DetourStarted {
        /// Mover that started detouring.
        mover: MoverId,
        /// Route coordinate the detour rejoins.
        rejoin: CellCoord,
        /// Number of waypoints in the detour.
        waypoints: usize,
    },
    /// Confirms that an attacker hit a mover.
    MoverDamaged {
        /// Attacker that dealt the hit.
        attacker: AttackerId,
        /// Mover that received the hit.
        mover: MoverId,
        /// Health remaining after the hit.
        remaining: Health,
    },
    /// Announces that a mover's health was depleted.
    MoverDied {
        /// Mover that died.
        mover: MoverId,
        /// Cell released by the mover.
        cell: CellCoord,
    },
    /// Announces that a mover reached the end cell.
    MoverArrived {
        /// Mover that arrived.
        mover: MoverId,
    },
    /// Confirms that a finished mover left the active set.
    MoverRemoved {
        /// Mover that was removed.
        mover: MoverId,
        /// How the mover finished.
        outcome: MoverOutcome,
    },
}

/// Cardinal movement directions, listed in neighbour expansion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
    /// Movement toward increasing column indices.
    East,
}

impl Direction {
    /// Every direction in the order searches expand neighbours.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];
}

/// Unique identifier assigned to a mover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoverId(u32);

impl MoverId {
    /// Creates a new mover identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an attacker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttackerId(u32);

impl AttackerId {
    /// Creates a new attacker identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the neighbouring cell in the provided direction.
    ///
    /// Stepping north of row zero or west of column zero yields `None`; the
    /// caller is responsible for the upper bounds.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        match direction {
            Direction::North => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Direction::South => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
            Direction::West => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
            Direction::East => self
                .column
                .checked_add(1)
                .map(|column| Self::new(column, self.row)),
        }
    }

    /// Iterates over the in-range orthogonal neighbours in [`Direction::ALL`] order.
    pub fn neighbors(self) -> impl Iterator<Item = CellCoord> {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.step(direction))
    }
}

/// Continuous position measured in cell units.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct CellPoint {
    column: f32,
    row: f32,
}

impl CellPoint {
    /// Creates a new point from fractional column and row coordinates.
    #[must_use]
    pub const fn new(column: f32, row: f32) -> Self {
        Self { column, row }
    }

    /// Places a point exactly on the provided cell.
    #[must_use]
    pub fn from_cell(cell: CellCoord) -> Self {
        Self::new(cell.column() as f32, cell.row() as f32)
    }

    /// Fractional column coordinate.
    #[must_use]
    pub const fn column(&self) -> f32 {
        self.column
    }

    /// Fractional row coordinate.
    #[must_use]
    pub const fn row(&self) -> f32 {
        self.row
    }

    /// Cell obtained by truncating both coordinates.
    #[must_use]
    pub fn floor_cell(&self) -> CellCoord {
        CellCoord::new(self.column.max(0.0) as u32, self.row.max(0.0) as u32)
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(&self, other: CellPoint) -> f32 {
        (self.column - other.column).hypot(self.row - other.row)
    }

    /// Moves `factor` of the remaining vector toward `target`.
    #[must_use]
    pub fn approach(&self, target: CellPoint, factor: f32) -> CellPoint {
        CellPoint::new(
            self.column + (target.column - self.column) * factor,
            self.row + (target.row - self.row) * factor,
        )
    }
}

/// Classification of a grid cell as exposed to systems and renderers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Impassable border or interior wall.
    Wall,
    /// Cell movers spawn on.
    Start,
    /// Cell movers try to reach.
    End,
    /// Open cell that is not part of the route.
    Empty,
    /// Open cell on the current route with nobody standing on it.
    Path,
    /// Cell blocked by an attacker.
    Obstruction,
    /// Open cell with at least one mover standing on it.
    Occupied(u32),
}

impl CellKind {
    /// Reports whether movers and searches may traverse the cell.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        !matches!(self, Self::Wall | Self::Obstruction)
    }
}

/// Monotonically increasing version tag attached to every route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteVersion(u64);

impl RouteVersion {
    /// Creates a version tag from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the version.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Version that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Shortest coordinate sequence from the start cell to the end cell.
///
/// Consecutive coordinates are orthogonally adjacent and no coordinate
/// repeats. Routes are produced by the grid and read by movers; movers keep
/// only the [`RouteVersion`] they last synchronised against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    version: RouteVersion,
    cells: Vec<CellCoord>,
}

impl Route {
    /// Creates a route tagged with the provided version.
    #[must_use]
    pub fn new(version: RouteVersion, cells: Vec<CellCoord>) -> Self {
        Self { version, cells }
    }

    /// Version tag assigned when the route was committed.
    #[must_use]
    pub const fn version(&self) -> RouteVersion {
        self.version
    }

    /// Returns a copy of the route carrying a different version tag.
    #[must_use]
    pub fn with_version(mut self, version: RouteVersion) -> Self {
        self.version = version;
        self
    }

    /// Ordered coordinates composing the route.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Number of coordinates in the route.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the route holds no coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Coordinate stored at the provided index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<CellCoord> {
        self.cells.get(index).copied()
    }

    /// First coordinate of the route (the start cell).
    #[must_use]
    pub fn first(&self) -> Option<CellCoord> {
        self.cells.first().copied()
    }

    /// Last coordinate of the route (the end cell).
    #[must_use]
    pub fn last(&self) -> Option<CellCoord> {
        self.cells.last().copied()
    }

    /// Index at which `cell` appears on the route.
    #[must_use]
    pub fn position(&self, cell: CellCoord) -> Option<usize> {
        self.cells.iter().position(|candidate| *candidate == cell)
    }

    /// Reports whether the route passes through `cell`.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains(&cell)
    }

    /// Finds the route coordinate nearest to `cell` by Manhattan distance.
    ///
    /// Returns the index and the distance; ties resolve to the first
    /// occurrence along the route.
    #[must_use]
    pub fn nearest(&self, cell: CellCoord) -> Option<(usize, u32)> {
        let mut best: Option<(usize, u32)> = None;
        for (index, candidate) in self.cells.iter().enumerate() {
            let distance = candidate.manhattan_distance(cell);
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((index, distance)),
            }
            if distance == 0 {
                break;
            }
        }
        best
    }
}

/// Health carried by a mover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a new health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the health.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether no health remains.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }

    /// Health remaining after absorbing `damage`, never below zero.
    #[must_use]
    pub const fn saturating_sub(self, damage: Damage) -> Self {
        Self(self.0.saturating_sub(damage.get()))
    }
}

/// Damage dealt by a single attacker hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Damage(u32);

impl Damage {
    /// Creates a new damage value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the damage.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Fraction of the remaining distance a mover covers each tick.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Speed(f32);

impl Speed {
    /// Creates a speed when `value` lies in the half-open interval `(0, 1]`.
    #[must_use]
    pub fn new(value: f32) -> Option<Self> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Retrieves the interpolation factor.
    #[must_use]
    pub const fn get(&self) -> f32 {
        self.0
    }
}

/// Combat parameters of an attacker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackerProfile {
    /// Damage applied per hit.
    pub damage: Damage,
    /// Euclidean reach measured in cells.
    pub range: f32,
    /// Ticks between successive attack evaluations.
    pub interval_ticks: u32,
}

impl AttackerProfile {
    /// Creates a new attacker profile.
    #[must_use]
    pub const fn new(damage: Damage, range: f32, interval_ticks: u32) -> Self {
        Self {
            damage,
            range,
            interval_ticks,
        }
    }

    /// Reports whether the profile can drive an attacker.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.range.is_finite() && self.range >= 0.0 && self.interval_ticks > 0
    }
}

/// Short sequence of waypoints a mover follows to rejoin the route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detour {
    waypoints: Vec<CellCoord>,
    next: usize,
}

impl Detour {
    /// Creates a detour that starts at its first waypoint.
    #[must_use]
    pub fn new(waypoints: Vec<CellCoord>) -> Self {
        Self { waypoints, next: 0 }
    }

    /// All waypoints of the detour; the last one lies on the route.
    #[must_use]
    pub fn waypoints(&self) -> &[CellCoord] {
        &self.waypoints
    }

    /// Index of the waypoint the mover approaches.
    #[must_use]
    pub const fn next_index(&self) -> usize {
        self.next
    }

    /// Waypoint the mover approaches, if the detour is unfinished.
    #[must_use]
    pub fn next_waypoint(&self) -> Option<CellCoord> {
        self.waypoints.get(self.next).copied()
    }

    /// Waypoint that rejoins the route.
    #[must_use]
    pub fn final_waypoint(&self) -> Option<CellCoord> {
        self.waypoints.last().copied()
    }

    /// Reports whether every waypoint was reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.next >= self.waypoints.len()
    }

    /// Returns the detour advanced past its current waypoint.
    #[must_use]
    pub fn advanced(mut self) -> Self {
        self.next = self.next.saturating_add(1).min(self.waypoints.len());
        self
    }
}

/// Lifecycle phase of a mover.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoverPhase {
    /// Interpolating along the grid's route.
    FollowingRoute,
    /// Walking a local detour back onto the route.
    Detouring(Detour),
    /// Reached the end cell; no further movement.
    Arrived,
    /// Health depleted; excluded from targeting and movement.
    Dead,
}

impl MoverPhase {
    /// Reports whether the mover still moves and can be targeted.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::FollowingRoute | Self::Detouring(_))
    }
}

/// How a mover left the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoverOutcome {
    /// Health was depleted by attackers.
    Killed,
    /// The end cell was reached.
    Arrived,
}

/// Occupancy transition committed when a mover snaps onto a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellTransition {
    /// Cell the mover leaves.
    pub from: CellCoord,
    /// Cell the mover enters.
    pub to: CellCoord,
    /// Marks the source as a detour cell outside the canonical route.
    pub transient: bool,
}

/// Mover state computed by the movement system for a single tick.
#[derive(Clone, Debug, PartialEq)]
pub struct MoverStep {
    /// Position after the step.
    pub position: CellPoint,
    /// Phase after the step.
    pub phase: MoverPhase,
    /// Route index after the step.
    pub route_index: usize,
    /// Occupancy transition to commit, if a waypoint was reached.
    pub transition: Option<CellTransition>,
}

/// Immutable representation of a single mover's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct MoverSnapshot {
    /// Unique identifier assigned to the mover.
    pub id: MoverId,
    /// Continuous position in cell space.
    pub position: CellPoint,
    /// Cell last committed to grid occupancy.
    pub cell: CellCoord,
    /// Current lifecycle phase.
    pub phase: MoverPhase,
    /// Index into the route of the last reached route coordinate.
    pub route_index: usize,
    /// Route version the mover last synchronised against.
    pub route_version: RouteVersion,
    /// Interpolation factor applied per tick.
    pub speed: Speed,
    /// Health remaining.
    pub health: Health,
}

/// Read-only snapshot describing all movers in registration order.
#[derive(Clone, Debug, Default)]
pub struct MoverView {
    snapshots: Vec<MoverSnapshot>,
}

impl MoverView {
    /// Creates a new mover view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<MoverSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured mover snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &MoverSnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over movers that still move and can be targeted.
    pub fn active(&self) -> impl Iterator<Item = &MoverSnapshot> {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.phase.is_active())
    }

    /// Looks up the snapshot of a single mover.
    #[must_use]
    pub fn get(&self, mover: MoverId) -> Option<&MoverSnapshot> {
        self.snapshots
            .binary_search_by_key(&mover, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<MoverSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single attacker's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackerSnapshot {
    /// Identifier allocated to the attacker by the world.
    pub id: AttackerId,
    /// Cell obstructed by the attacker.
    pub cell: CellCoord,
    /// Combat parameters of the attacker.
    pub profile: AttackerProfile,
    /// Ticks remaining before the next attack evaluation.
    pub ready_in: u32,
}

impl AttackerSnapshot {
    /// Reports whether the attacker evaluates an attack this tick.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready_in == 0
    }
}

/// Read-only snapshot describing all attackers in registration order.
#[derive(Clone, Debug, Default)]
pub struct AttackerView {
    snapshots: Vec<AttackerSnapshot>,
}

impl AttackerView {
    /// Creates a new attacker view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AttackerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured attacker snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AttackerSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AttackerSnapshot> {
        self.snapshots
    }
}

/// Classification of a single cell inside a [`GridSnapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Location of the cell.
    pub cell: CellCoord,
    /// Classification of the cell.
    pub kind: CellKind,
}

/// Complete classification of the board, consumed by renderers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Number of columns in the grid.
    pub columns: u32,
    /// Number of rows in the grid.
    pub rows: u32,
    /// Cells in row-major order.
    pub cells: Vec<CellSnapshot>,
}

impl GridSnapshot {
    /// Classification of the provided cell; out-of-bounds cells report walls.
    #[must_use]
    pub fn kind(&self, cell: CellCoord) -> CellKind {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return CellKind::Wall;
        }
        let index = cell.row() as usize * self.columns as usize + cell.column() as usize;
        self.cells
            .get(index)
            .map_or(CellKind::Wall, |snapshot| snapshot.kind)
    }
}

/// Signals that no route connects the start and end cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[error("no route connects the start and end cells")]
pub struct RouteUnavailable;

/// Reasons an obstruction placement request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell lies outside the grid.
    #[error("coordinate lies outside the grid")]
    InvalidCoordinate,
    /// The requested cell cannot hold an obstruction.
    #[error("cell classified as {0:?} cannot hold an obstruction")]
    Ineligible(CellKind),
    /// The obstruction would leave no route between start and end.
    #[error("obstruction would sever the only route")]
    SeversRoute,
    /// The attacker profile has a negative range or a zero interval.
    #[error("attacker profile is invalid")]
    InvalidProfile,
}

/// Reasons a spawn request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum SpawnError {
    /// The grid holds no route for a mover to follow.
    #[error("a mover cannot exist without a route to follow")]
    NoRoute,
    /// The requested speed lies outside `(0, 1]`.
    #[error("speed must lie in (0, 1]")]
    InvalidSpeed,
    /// The requested health is zero.
    #[error("health must be positive")]
    InvalidHealth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn neighbors_follow_expansion_order_and_skip_negative_cells() {
        let neighbors: Vec<_> = CellCoord::new(0, 3).neighbors().collect();
        assert_eq!(
            neighbors,
            vec![
                CellCoord::new(0, 2),
                CellCoord::new(0, 4),
                CellCoord::new(1, 3),
            ]
        );
    }

    #[test]
    fn nearest_prefers_first_occurrence_on_ties() {
        let route = Route::new(
            RouteVersion::new(1),
            vec![
                CellCoord::new(0, 1),
                CellCoord::new(1, 1),
                CellCoord::new(2, 1),
                CellCoord::new(3, 1),
            ],
        );

        assert_eq!(route.nearest(CellCoord::new(2, 3)), Some((2, 2)));
        assert_eq!(route.nearest(CellCoord::new(1, 1)), Some((1, 0)));
        assert_eq!(route.nearest(CellCoord::new(0, 2)), Some((0, 1)));
    }

    #[test]
    fn health_saturates_at_zero() {
        let health = Health::new(5).saturating_sub(Damage::new(7));
        assert!(health.is_depleted());
        assert!(!Health::new(5).saturating_sub(Damage::new(4)).is_depleted());
    }

    #[test]
    fn speed_rejects_values_outside_unit_interval() {
        assert!(Speed::new(0.0).is_none());
        assert!(Speed::new(1.5).is_none());
        assert!(Speed::new(f32::NAN).is_none());
        assert_eq!(Speed::new(1.0).map(|speed| speed.get()), Some(1.0));
    }

    #[test]
    fn approach_with_full_speed_lands_on_target() {
        let origin = CellPoint::new(1.0, 1.0);
        let target = CellPoint::new(2.0, 1.0);
        assert_eq!(origin.approach(target, 1.0), target);
        assert_eq!(origin.approach(target, 0.5), CellPoint::new(1.5, 1.0));
    }

    #[test]
    fn floor_cell_truncates_fractional_positions() {
        assert_eq!(CellPoint::new(2.7, 1.2).floor_cell(), CellCoord::new(2, 1));
    }

    #[test]
    fn detour_advances_until_finished() {
        let detour = Detour::new(vec![CellCoord::new(2, 1), CellCoord::new(1, 1)]);
        assert_eq!(detour.next_waypoint(), Some(CellCoord::new(2, 1)));
        let detour = detour.advanced().advanced();
        assert!(detour.is_finished());
        assert_eq!(detour.final_waypoint(), Some(CellCoord::new(1, 1)));
        assert_eq!(detour.clone().advanced(), detour);
    }

    #[test]
    fn grid_snapshot_serializes_cell_kinds() {
        let snapshot = GridSnapshot {
            columns: 1,
            rows: 1,
            cells: vec![CellSnapshot {
                cell: CellCoord::new(0, 0),
                kind: CellKind::Occupied(2),
            }],
        };
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let restored: GridSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, snapshot);
        assert_eq!(restored.kind(CellCoord::new(3, 0)), CellKind::Wall);
    }
}
