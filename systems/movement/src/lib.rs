#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that advances movers along the route.
//!
//! Each tick every active mover either interpolates toward the next route
//! coordinate, walks one leg of a local detour, or plans a detour when a route
//! change left it stranded. The system never mutates the world; it emits one
//! [`Command::AdvanceMover`] per mover that changes state.

mod detour;

use gridlock_core::{
    CellCoord, CellPoint, CellTransition, Command, Detour, Event, MoverId, MoverPhase,
    MoverSnapshot, MoverStep, MoverView, Route, ARRIVAL_EPSILON,
};
use thiserror::Error;
use tracing::{trace, warn};

use detour::DetourPlanner;

/// Errors raised when the movement inputs contradict each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MovementError {
    /// A mover carries a route index beyond the route it is synchronised to.
    #[error("route index {index} exceeds route length {len} for mover {mover:?}")]
    RouteIndexOutOfBounds {
        /// Mover that carried the index.
        mover: MoverId,
        /// Offending index.
        index: usize,
        /// Length of the route.
        len: usize,
    },
    /// The route holds no coordinates.
    #[error("movers cannot follow an empty route")]
    EmptyRoute,
}

/// Pure system that reacts to world events and emits movement commands.
#[derive(Debug, Default)]
pub struct Movement {
    detours: DetourPlanner,
}

impl Movement {
    /// Consumes world events and immutable views to emit movement commands.
    ///
    /// Movers are planned in ascending id order. Nothing is emitted unless the
    /// batch contains [`Event::TimeAdvanced`].
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        mover_view: &MoverView,
        route: &Route,
        dimensions: (u32, u32),
        is_cell_blocked: F,
        out: &mut Vec<Command>,
    ) -> Result<(), MovementError>
    where
        F: Fn(CellCoord) -> bool,
    {
        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return Ok(());
        }
        if route.is_empty() {
            return Err(MovementError::EmptyRoute);
        }

        for mover in mover_view.active() {
            if let Some(step) = self.plan_step(mover, route, dimensions, &is_cell_blocked)? {
                out.push(Command::AdvanceMover {
                    mover: mover.id,
                    step,
                });
            }
        }
        Ok(())
    }

    fn plan_step<F>(
        &mut self,
        mover: &MoverSnapshot,
        route: &Route,
        dimensions: (u32, u32),
        is_cell_blocked: &F,
    ) -> Result<Option<MoverStep>, MovementError>
    where
        F: Fn(CellCoord) -> bool,
    {
        let (nearest_index, distance) = route.nearest(mover.cell).ok_or(MovementError::EmptyRoute)?;
        let resync = mover.route_version != route.version();

        if let MoverPhase::Detouring(detour) = &mover.phase {
            if !resync {
                if let Some(waypoint) = detour.next_waypoint() {
                    if !is_cell_blocked(waypoint) {
                        return Ok(Some(walk_detour(mover, detour, waypoint, route)));
                    }
                }
            }
        }

        if distance > 0 {
            return Ok(self.start_detour(mover, nearest_index, route, dimensions, is_cell_blocked, resync));
        }

        let index = if resync {
            nearest_index
        } else {
            mover.route_index
        };
        follow_route(mover, index, route).map(Some)
    }

    fn start_detour<F>(
        &mut self,
        mover: &MoverSnapshot,
        nearest_index: usize,
        route: &Route,
        dimensions: (u32, u32),
        is_cell_blocked: &F,
        resync: bool,
    ) -> Option<MoverStep>
    where
        F: Fn(CellCoord) -> bool,
    {
        let origin = mover.cell;
        let target = route.get(nearest_index)?;

        let walk = self
            .detours
            .plan(dimensions, origin, |cell| cell == target, is_cell_blocked)
            .or_else(|| {
                self.detours
                    .plan(dimensions, origin, |cell| route.contains(cell), is_cell_blocked)
            });
        let Some(waypoints) = walk else {
            if resync {
                warn!(mover = ?mover.id, ?origin, "mover cannot reach the route; holding position");
            } else {
                trace!(mover = ?mover.id, ?origin, "mover still cut off from the route");
            }
            return Some(MoverStep {
                position: mover.position,
                phase: MoverPhase::FollowingRoute,
                route_index: nearest_index,
                transition: None,
            });
        };
        trace!(mover = ?mover.id, ?origin, waypoints = waypoints.len(), "planned detour");

        Some(MoverStep {
            position: mover.position,
            phase: MoverPhase::Detouring(Detour::new(waypoints)),
            route_index: nearest_index,
            transition: None,
        })
    }
}

fn walk_detour(
    mover: &MoverSnapshot,
    detour: &Detour,
    waypoint: CellCoord,
    route: &Route,
) -> MoverStep {
    if let Some(step) = settle(mover, waypoint, mover.phase.clone(), mover.route_index) {
        return step;
    }

    let target = CellPoint::from_cell(waypoint);
    let position = mover.position.approach(target, mover.speed.get());
    if position.distance(target) >= ARRIVAL_EPSILON {
        return MoverStep {
            position,
            phase: mover.phase.clone(),
            route_index: mover.route_index,
            transition: None,
        };
    }

    let transition = Some(CellTransition {
        from: mover.cell,
        to: waypoint,
        transient: true,
    });
    let detour = detour.clone().advanced();
    if !detour.is_finished() {
        return MoverStep {
            position: target,
            phase: MoverPhase::Detouring(detour),
            route_index: mover.route_index,
            transition,
        };
    }

    let route_index = route
        .position(waypoint)
        .or_else(|| route.nearest(waypoint).map(|(index, _)| index))
        .unwrap_or(mover.route_index);
    MoverStep {
        position: target,
        phase: phase_at(route_index, route),
        route_index,
        transition,
    }
}

/// Walks a mover back onto its committed cell when it sits between that cell
/// and a neighbour other than `target`.
///
/// Movers only ever travel along the segment joining their committed cell
/// and one neighbour, so a route change mid-cell never produces a diagonal
/// leg or a transition between non-adjacent cells.
fn settle(mover: &MoverSnapshot, target: CellCoord, phase: MoverPhase, route_index: usize) -> Option<MoverStep> {
    let committed = CellPoint::from_cell(mover.cell);
    let offset = (
        mover.position.column() - committed.column(),
        mover.position.row() - committed.row(),
    );
    if offset.0.hypot(offset.1) < ARRIVAL_EPSILON {
        return None;
    }
    let heading = CellPoint::from_cell(target);
    let axis = (
        heading.column() - committed.column(),
        heading.row() - committed.row(),
    );
    let across = offset.0 * axis.1 - offset.1 * axis.0;
    let along = offset.0 * axis.0 + offset.1 * axis.1;
    if across.abs() < ARRIVAL_EPSILON && along > 0.0 {
        return None;
    }

    let mut position = mover.position.approach(committed, mover.speed.get());
    if position.distance(committed) < ARRIVAL_EPSILON {
        position = committed;
    }
    Some(MoverStep {
        position,
        phase,
        route_index,
        transition: None,
    })
}

fn follow_route(mover: &MoverSnapshot, index: usize, route: &Route) -> Result<MoverStep, MovementError> {
    let out_of_bounds = MovementError::RouteIndexOutOfBounds {
        mover: mover.id,
        index,
        len: route.len(),
    };
    if index >= route.len() {
        return Err(out_of_bounds);
    }
    if index + 1 == route.len() {
        return Ok(MoverStep {
            position: mover.position,
            phase: MoverPhase::Arrived,
            route_index: index,
            transition: None,
        });
    }
    let next = route.get(index + 1).ok_or(out_of_bounds)?;
    if let Some(step) = settle(mover, next, MoverPhase::FollowingRoute, index) {
        return Ok(step);
    }

    let target = CellPoint::from_cell(next);
    let position = mover.position.approach(target, mover.speed.get());
    if position.distance(target) >= ARRIVAL_EPSILON {
        return Ok(MoverStep {
            position,
            phase: MoverPhase::FollowingRoute,
            route_index: index,
            transition: None,
        });
    }

    Ok(MoverStep {
        position: target,
        phase: phase_at(index + 1, route),
        route_index: index + 1,
        transition: Some(CellTransition {
            from: mover.cell,
            to: next,
            transient: false,
        }),
    })
}

fn phase_at(route_index: usize, route: &Route) -> MoverPhase {
    if route_index + 1 >= route.len() {
        MoverPhase::Arrived
    } else {
        MoverPhase::FollowingRoute
    }
}
