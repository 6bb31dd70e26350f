//! Breadth-first detour search that walks a stranded mover back onto the route.

use std::collections::VecDeque;

use gridlock_core::CellCoord;

/// Reusable breadth-first search buffers sized to the board.
#[derive(Debug, Default)]
pub(crate) struct DetourPlanner {
    visited: Vec<bool>,
    parents: Vec<Option<usize>>,
    queue: VecDeque<usize>,
    columns: u32,
    rows: u32,
}

impl DetourPlanner {
    /// Finds the shortest passable walk from `origin` to the first cell
    /// accepted by `is_goal`.
    ///
    /// The returned waypoints exclude `origin` and end on the goal cell; an
    /// origin that already satisfies the goal yields an empty walk. The origin
    /// itself is never tested against `is_blocked` so a mover standing on a
    /// freshly obstructed cell can still step off it.
    pub(crate) fn plan<G, B>(
        &mut self,
        (columns, rows): (u32, u32),
        origin: CellCoord,
        is_goal: G,
        is_blocked: B,
    ) -> Option<Vec<CellCoord>>
    where
        G: Fn(CellCoord) -> bool,
        B: Fn(CellCoord) -> bool,
    {
        self.prepare(columns, rows);
        let origin_index = self.index(origin)?;
        if is_goal(origin) {
            return Some(Vec::new());
        }

        self.visited[origin_index] = true;
        self.queue.push_back(origin_index);

        while let Some(index) = self.queue.pop_front() {
            let cell = self.coord(index);
            for neighbor in cell.neighbors() {
                let Some(neighbor_index) = self.index(neighbor) else {
                    continue;
                };
                if self.visited[neighbor_index] || is_blocked(neighbor) {
                    continue;
                }
                self.visited[neighbor_index] = true;
                self.parents[neighbor_index] = Some(index);
                if is_goal(neighbor) {
                    return Some(self.walk_back(origin_index, neighbor_index));
                }
                self.queue.push_back(neighbor_index);
            }
        }

        None
    }

    fn prepare(&mut self, columns: u32, rows: u32) {
        let cell_count = columns as usize * rows as usize;
        self.columns = columns;
        self.rows = rows;
        self.visited.clear();
        self.visited.resize(cell_count, false);
        self.parents.clear();
        self.parents.resize(cell_count, None);
        self.queue.clear();
    }

    fn walk_back(&self, origin_index: usize, goal_index: usize) -> Vec<CellCoord> {
        let mut waypoints = Vec::new();
        let mut cursor = goal_index;
        while cursor != origin_index {
            waypoints.push(self.coord(cursor));
            match self.parents[cursor] {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        waypoints.reverse();
        waypoints
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        Some(cell.row() as usize * self.columns as usize + cell.column() as usize)
    }

    fn coord(&self, index: usize) -> CellCoord {
        let width = self.columns as usize;
        CellCoord::new((index % width) as u32, (index / width) as u32)
    }
}
