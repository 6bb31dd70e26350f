//! Authoritative cell state, occupancy counters and route ownership.

use gridlock_core::{
    CellCoord, CellKind, CellSnapshot, GridSnapshot, PlacementError, Route, RouteUnavailable,
    RouteVersion,
};
use thiserror::Error;

use crate::navigation;

const MIN_DIMENSION: u32 = 3;

/// Errors raised while generating a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// The board is too small to hold a border, a start, an end and an interior.
    #[error("grid dimensions {columns}x{rows} are below the 3x3 minimum")]
    InvalidDimensions {
        /// Requested number of columns.
        columns: u32,
        /// Requested number of rows.
        rows: u32,
    },
    /// The start and end cells are not connected.
    #[error(transparent)]
    NoRoute(#[from] RouteUnavailable),
}

/// Stored state of a single cell.
///
/// Walls and obstructions carry no occupancy counter, so a blocked cell can
/// never report movers standing on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellState {
    Wall,
    Obstruction,
    Start { occupants: u32 },
    End { occupants: u32 },
    Open { on_route: bool, occupants: u32 },
}

impl CellState {
    const EMPTY: Self = Self::Open {
        on_route: false,
        occupants: 0,
    };

    fn kind(self) -> CellKind {
        match self {
            Self::Wall => CellKind::Wall,
            Self::Obstruction => CellKind::Obstruction,
            Self::Start { .. } => CellKind::Start,
            Self::End { .. } => CellKind::End,
            Self::Open { occupants, .. } if occupants > 0 => CellKind::Occupied(occupants),
            Self::Open { on_route: true, .. } => CellKind::Path,
            Self::Open { .. } => CellKind::Empty,
        }
    }

    fn occupants(self) -> u32 {
        match self {
            Self::Start { occupants } | Self::End { occupants } | Self::Open { occupants, .. } => {
                occupants
            }
            Self::Wall | Self::Obstruction => 0,
        }
    }

    fn occupants_mut(&mut self) -> Option<&mut u32> {
        match self {
            Self::Start { occupants } | Self::End { occupants } | Self::Open { occupants, .. } => {
                Some(occupants)
            }
            Self::Wall | Self::Obstruction => None,
        }
    }

    fn accepts_obstruction(self) -> bool {
        match self {
            Self::Open { occupants: 0, .. } => true,
            Self::Open { on_route, .. } => on_route,
            Self::Wall | Self::Obstruction | Self::Start { .. } | Self::End { .. } => false,
        }
    }
}

/// Rectangular board owning cell state and the current route.
#[derive(Clone, Debug)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<CellState>,
    start: CellCoord,
    end: CellCoord,
    route: Option<Route>,
    version: RouteVersion,
}

impl Grid {
    /// Builds a bordered board and computes its initial route.
    ///
    /// The start cell sits in the left wall on row one and the end cell in
    /// the right wall on the second-to-last row; every interior cell starts
    /// empty.
    pub fn generate(columns: u32, rows: u32) -> Result<Self, GridError> {
        if columns < MIN_DIMENSION || rows < MIN_DIMENSION {
            return Err(GridError::InvalidDimensions { columns, rows });
        }

        let mut cells = Vec::with_capacity(columns as usize * rows as usize);
        for row in 0..rows {
            for column in 0..columns {
                let border = row == 0 || column == 0 || row == rows - 1 || column == columns - 1;
                cells.push(if border {
                    CellState::Wall
                } else {
                    CellState::EMPTY
                });
            }
        }

        let mut grid = Self {
            columns,
            rows,
            cells,
            start: CellCoord::new(0, 1),
            end: CellCoord::new(columns - 1, rows - 2),
            route: None,
            version: RouteVersion::new(0),
        };
        grid.set_state(grid.start, CellState::Start { occupants: 0 });
        grid.set_state(grid.end, CellState::End { occupants: 0 });

        let route = grid.find_route(grid.start, grid.end)?;
        grid.commit_route(route);
        Ok(grid)
    }

    /// Number of columns in the board.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the board.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Cell movers spawn on.
    #[must_use]
    pub const fn start(&self) -> CellCoord {
        self.start
    }

    /// Cell movers try to reach.
    #[must_use]
    pub const fn end(&self) -> CellCoord {
        self.end
    }

    /// Route currently followed by movers.
    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Version of the most recently committed route.
    #[must_use]
    pub const fn route_version(&self) -> RouteVersion {
        self.version
    }

    /// Reports whether the coordinate lies on the board.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Classification of the cell; coordinates off the board report walls.
    #[must_use]
    pub fn cell_kind(&self, cell: CellCoord) -> CellKind {
        self.state(cell).map_or(CellKind::Wall, CellState::kind)
    }

    /// Reports whether searches and movers may traverse the cell.
    #[must_use]
    pub fn is_passable(&self, cell: CellCoord) -> bool {
        self.cell_kind(cell).is_passable()
    }

    /// Number of movers recorded on the cell.
    #[must_use]
    pub fn occupants(&self, cell: CellCoord) -> u32 {
        self.state(cell).map_or(0, CellState::occupants)
    }

    /// Runs A* between two cells over the current board.
    ///
    /// The returned route carries the version it would receive if committed.
    pub fn find_route(&self, start: CellCoord, end: CellCoord) -> Result<Route, RouteUnavailable> {
        navigation::find_route(self.columns, self.rows, start, end, |cell| {
            !self.is_passable(cell)
        })
        .map(|cells| Route::new(self.version.next(), cells))
        .ok_or(RouteUnavailable)
    }

    /// Places an obstruction when the board keeps a route from start to end.
    ///
    /// On success the route is replaced and its new version returned. On
    /// failure the board is left exactly as it was.
    pub fn try_place_obstruction(&mut self, cell: CellCoord) -> Result<RouteVersion, PlacementError> {
        let index = self.index(cell).ok_or(PlacementError::InvalidCoordinate)?;
        let prior = self.cells[index];
        if !prior.accepts_obstruction() {
            return Err(PlacementError::Ineligible(prior.kind()));
        }

        self.cells[index] = CellState::Obstruction;
        match self.find_route(self.start, self.end) {
            Ok(route) => {
                self.commit_route(route);
                Ok(self.version)
            }
            Err(RouteUnavailable) => {
                self.cells[index] = prior;
                Err(PlacementError::SeversRoute)
            }
        }
    }

    /// Moves one occupant from `from` to `to`; `transient` marks detour steps.
    pub fn record_occupancy(&mut self, to: CellCoord, from: CellCoord, transient: bool) {
        self.occupy(to);
        self.release(from, transient);
    }

    /// Adds one occupant to the cell. Blocked cells ignore the request.
    pub fn occupy(&mut self, cell: CellCoord) {
        if let Some(occupants) = self.state_mut(cell).and_then(CellState::occupants_mut) {
            *occupants = occupants.saturating_add(1);
        }
    }

    /// Removes one occupant from the cell, never dropping below zero.
    ///
    /// Route tags are owned by route commits, so an emptied cell reads `Path`
    /// exactly when it lies on the current route.
    pub fn release(&mut self, cell: CellCoord, transient: bool) {
        if let Some(occupants) = self.state_mut(cell).and_then(CellState::occupants_mut) {
            *occupants = occupants.saturating_sub(1);
        }
        tracing::trace!(?cell, transient, kind = ?self.cell_kind(cell), "released cell");
    }

    /// Classification of every cell in row-major order.
    #[must_use]
    pub fn snapshot(&self) -> GridSnapshot {
        let cells = self
            .cells
            .iter()
            .enumerate()
            .map(|(index, state)| CellSnapshot {
                cell: self.coord(index),
                kind: state.kind(),
            })
            .collect();
        GridSnapshot {
            columns: self.columns,
            rows: self.rows,
            cells,
        }
    }

    fn commit_route(&mut self, route: Route) {
        self.version = self.version.next();
        let route = route.with_version(self.version);

        for state in &mut self.cells {
            if let CellState::Open { on_route, .. } = state {
                *on_route = false;
            }
        }
        for &cell in route.cells() {
            if let Some(CellState::Open { on_route, .. }) = self.state_mut(cell) {
                *on_route = true;
            }
        }

        self.route = Some(route);
    }

    fn set_state(&mut self, cell: CellCoord, state: CellState) {
        if let Some(slot) = self.state_mut(cell) {
            *slot = state;
        }
    }

    fn state(&self, cell: CellCoord) -> Option<CellState> {
        self.index(cell).map(|index| self.cells[index])
    }

    fn state_mut(&mut self, cell: CellCoord) -> Option<&mut CellState> {
        let index = self.index(cell)?;
        self.cells.get_mut(index)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    fn coord(&self, index: usize) -> CellCoord {
        let width = self.columns as usize;
        CellCoord::new((index % width) as u32, (index / width) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> Grid {
        Grid::generate(5, 3).expect("corridor grid generates")
    }

    #[test]
    fn generate_places_start_and_end_on_opposite_walls() {
        let grid = Grid::generate(6, 5).expect("grid generates");

        assert_eq!(grid.start(), CellCoord::new(0, 1));
        assert_eq!(grid.end(), CellCoord::new(5, 3));
        assert_eq!(grid.cell_kind(grid.start()), CellKind::Start);
        assert_eq!(grid.cell_kind(grid.end()), CellKind::End);
        assert_eq!(grid.cell_kind(CellCoord::new(0, 0)), CellKind::Wall);
        assert_eq!(grid.cell_kind(CellCoord::new(5, 4)), CellKind::Wall);
        assert_eq!(grid.route_version(), RouteVersion::new(1));
    }

    #[test]
    fn generate_rejects_tiny_boards() {
        assert_eq!(
            Grid::generate(2, 9).unwrap_err(),
            GridError::InvalidDimensions {
                columns: 2,
                rows: 9
            }
        );
    }

    #[test]
    fn out_of_bounds_cells_report_walls() {
        let grid = corridor();
        assert_eq!(grid.cell_kind(CellCoord::new(99, 1)), CellKind::Wall);
        assert!(!grid.is_passable(CellCoord::new(1, 42)));
    }

    #[test]
    fn route_cells_are_tagged_as_path() {
        let grid = corridor();
        let route = grid.route().expect("route exists");

        assert_eq!(
            route.cells(),
            &[
                CellCoord::new(0, 1),
                CellCoord::new(1, 1),
                CellCoord::new(2, 1),
                CellCoord::new(3, 1),
                CellCoord::new(4, 1),
            ]
        );
        assert_eq!(grid.cell_kind(CellCoord::new(2, 1)), CellKind::Path);
    }

    #[test]
    fn cutting_the_corridor_is_rejected_without_side_effects() {
        let mut grid = corridor();
        let before = grid.snapshot();
        let route_before = grid.route().cloned();

        let result = grid.try_place_obstruction(CellCoord::new(2, 1));

        assert_eq!(result, Err(PlacementError::SeversRoute));
        assert_eq!(grid.snapshot(), before);
        assert_eq!(grid.route().cloned(), route_before);
        assert_eq!(grid.route_version(), RouteVersion::new(1));
    }

    #[test]
    fn walls_and_terminals_are_ineligible() {
        let mut grid = corridor();
        assert_eq!(
            grid.try_place_obstruction(CellCoord::new(0, 0)),
            Err(PlacementError::Ineligible(CellKind::Wall))
        );
        assert_eq!(
            grid.try_place_obstruction(grid.start()),
            Err(PlacementError::Ineligible(CellKind::Start))
        );
        assert_eq!(
            grid.try_place_obstruction(CellCoord::new(7, 1)),
            Err(PlacementError::InvalidCoordinate)
        );
    }

    #[test]
    fn accepted_placement_reroutes_and_bumps_version() {
        let mut grid = Grid::generate(5, 5).expect("grid generates");
        let cell = grid.route().and_then(|route| route.get(2)).expect("route cell");

        let version = grid.try_place_obstruction(cell).expect("placement accepted");

        assert_eq!(version, RouteVersion::new(2));
        assert_eq!(grid.cell_kind(cell), CellKind::Obstruction);
        let route = grid.route().expect("route exists");
        assert!(!route.contains(cell));
        assert_eq!(route.version(), version);
        for window in route.cells().windows(2) {
            assert_eq!(window[0].manhattan_distance(window[1]), 1);
        }
    }

    #[test]
    fn occupancy_counters_merge_with_route_tags() {
        let mut grid = corridor();
        let first = CellCoord::new(1, 1);
        let second = CellCoord::new(2, 1);

        grid.occupy(first);
        grid.occupy(first);
        assert_eq!(grid.cell_kind(first), CellKind::Occupied(2));

        grid.record_occupancy(second, first, false);
        assert_eq!(grid.cell_kind(first), CellKind::Occupied(1));
        assert_eq!(grid.cell_kind(second), CellKind::Occupied(1));

        grid.record_occupancy(second, first, false);
        assert_eq!(grid.cell_kind(first), CellKind::Path);
        assert_eq!(grid.cell_kind(second), CellKind::Occupied(2));
    }

    #[test]
    fn releasing_an_empty_cell_never_underflows() {
        let mut grid = corridor();
        let cell = CellCoord::new(3, 1);

        grid.release(cell, false);
        grid.release(cell, true);

        assert_eq!(grid.occupants(cell), 0);
        assert_eq!(grid.cell_kind(cell), CellKind::Path);
    }

    #[test]
    fn transient_cells_off_the_route_return_to_empty() {
        let mut grid = Grid::generate(5, 5).expect("grid generates");
        let off_route = (1..4)
            .flat_map(|row| (1..4).map(move |column| CellCoord::new(column, row)))
            .find(|cell| grid.cell_kind(*cell) == CellKind::Empty)
            .expect("an interior cell lies off the route");

        grid.occupy(off_route);
        assert_eq!(grid.cell_kind(off_route), CellKind::Occupied(1));
        grid.release(off_route, true);

        assert_eq!(grid.cell_kind(off_route), CellKind::Empty);
    }

    #[test]
    fn occupied_route_cells_accept_obstructions() {
        let mut grid = Grid::generate(5, 5).expect("grid generates");
        let cell = grid.route().and_then(|route| route.get(2)).expect("route cell");
        grid.occupy(cell);

        assert!(grid.try_place_obstruction(cell).is_ok());
        assert_eq!(grid.cell_kind(cell), CellKind::Obstruction);
        assert_eq!(grid.occupants(cell), 0);
    }
}
