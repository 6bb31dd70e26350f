//! A* route search used by the world crate.

use std::{cmp::Reverse, collections::BinaryHeap};

use gridlock_core::CellCoord;

/// Finds a shortest orthogonal path from `start` to `end`.
///
/// Every step costs one and the heuristic is the Manhattan distance to `end`.
/// Open nodes are ordered by estimated cost first and by the moment they
/// entered the open set second, so equal-cost candidates expand in insertion
/// order. Neighbours are expanded north, south, west, east.
pub(crate) fn find_route<F>(
    width: u32,
    height: u32,
    start: CellCoord,
    end: CellCoord,
    mut is_blocked: F,
) -> Option<Vec<CellCoord>>
where
    F: FnMut(CellCoord) -> bool,
{
    let width_usize = usize::try_from(width).ok()?;
    let height_usize = usize::try_from(height).ok()?;
    let cell_count = width_usize.checked_mul(height_usize)?;
    let index_of = |cell: CellCoord| -> Option<usize> {
        if cell.column() >= width || cell.row() >= height {
            return None;
        }
        Some(cell.row() as usize * width_usize + cell.column() as usize)
    };

    let start_index = index_of(start)?;
    let end_index = index_of(end)?;
    if is_blocked(start) || is_blocked(end) {
        return None;
    }

    let mut cost = vec![u32::MAX; cell_count];
    let mut came_from: Vec<Option<usize>> = vec![None; cell_count];
    let mut closed = vec![false; cell_count];
    let mut entered: Vec<Option<u64>> = vec![None; cell_count];
    let mut open = BinaryHeap::new();
    let mut next_entry = 0_u64;

    cost[start_index] = 0;
    entered[start_index] = Some(next_entry);
    open.push(Reverse((start.manhattan_distance(end), next_entry, start_index)));
    next_entry += 1;

    while let Some(Reverse((_, _, index))) = open.pop() {
        if closed[index] {
            continue;
        }
        if index == end_index {
            return Some(reconstruct(&came_from, end_index, width_usize));
        }
        closed[index] = true;

        let cell = coord(index, width_usize);
        let tentative = cost[index].saturating_add(1);
        for neighbor in cell.neighbors() {
            let Some(neighbor_index) = index_of(neighbor) else {
                continue;
            };
            if closed[neighbor_index] || is_blocked(neighbor) {
                continue;
            }
            if tentative >= cost[neighbor_index] {
                continue;
            }

            cost[neighbor_index] = tentative;
            came_from[neighbor_index] = Some(index);
            let entry = *entered[neighbor_index].get_or_insert_with(|| {
                let entry = next_entry;
                next_entry += 1;
                entry
            });
            let estimate = tentative.saturating_add(neighbor.manhattan_distance(end));
            open.push(Reverse((estimate, entry, neighbor_index)));
        }
    }

    None
}

fn reconstruct(came_from: &[Option<usize>], end_index: usize, width: usize) -> Vec<CellCoord> {
    let mut cells = vec![coord(end_index, width)];
    let mut cursor = end_index;
    while let Some(previous) = came_from[cursor] {
        cells.push(coord(previous, width));
        cursor = previous;
    }
    cells.reverse();
    cells
}

fn coord(index: usize, width: usize) -> CellCoord {
    CellCoord::new((index % width) as u32, (index / width) as u32)
}
