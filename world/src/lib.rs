#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Gridlock.
//!
//! The world owns the grid, its route, every mover and every attacker. It is
//! mutated exclusively through [`apply`], which executes a single [`Command`]
//! and appends the resulting [`Event`] values. Systems observe the world
//! through the read-only functions in [`query`].

mod grid;
mod movers;
mod navigation;
mod towers;

use gridlock_core::{
    AttackerId, CellCoord, Command, Event, MoverId, MoverPhase, MoverStep, PlacementError,
    SpawnError,
};
use thiserror::Error;
use tracing::{debug, trace};

pub use grid::{Grid, GridError};

use movers::MoverRegistry;
use towers::AttackerRegistry;

/// Errors raised when a command contradicts the world state.
///
/// Well-formed systems never trigger these; they surface programming errors in
/// the command pipeline rather than gameplay outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The command referenced a mover the world does not know.
    #[error("mover {0:?} does not exist")]
    UnknownMover(MoverId),
    /// The command referenced an attacker the world does not know.
    #[error("attacker {0:?} does not exist")]
    UnknownAttacker(AttackerId),
    /// The command tried to move a dead or arrived mover.
    #[error("mover {0:?} is no longer active")]
    InactiveMover(MoverId),
    /// The attacker fired before its cooldown elapsed.
    #[error("attacker {0:?} is still cooling down")]
    AttackerCoolingDown(AttackerId),
    /// The step targets a wall or obstruction.
    #[error("mover {mover:?} cannot enter blocked cell {cell:?}")]
    BlockedTransition {
        /// Mover that attempted the transition.
        mover: MoverId,
        /// Cell the mover tried to enter.
        cell: CellCoord,
    },
    /// The step does not start from the cell the mover last committed or
    /// skips past a neighbouring cell.
    #[error("mover {mover:?} cannot move from {from:?} to {to:?}")]
    DesynchronizedTransition {
        /// Mover that attempted the transition.
        mover: MoverId,
        /// Source cell named by the step.
        from: CellCoord,
        /// Destination cell named by the step.
        to: CellCoord,
    },
    /// The step names a route index beyond the current route.
    #[error("route index {index} exceeds route length {len} for mover {mover:?}")]
    RouteIndexOutOfBounds {
        /// Mover that carried the index.
        mover: MoverId,
        /// Offending index.
        index: usize,
        /// Length of the current route.
        len: usize,
    },
    /// The grid holds no route.
    #[error("the grid holds no route")]
    MissingRoute,
}

/// Represents the authoritative Gridlock world state.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    movers: MoverRegistry,
    attackers: AttackerRegistry,
    tick_index: u64,
}

impl World {
    /// Creates a world on a freshly generated board.
    pub fn new(columns: u32, rows: u32) -> Result<Self, GridError> {
        let grid = Grid::generate(columns, rows)?;
        debug!(
            columns,
            rows,
            route_length = grid.route().map_or(0, |route| route.len()),
            "generated grid"
        );
        Ok(Self {
            grid,
            movers: MoverRegistry::new(),
            attackers: AttackerRegistry::new(),
            tick_index: 0,
        })
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Gameplay rejections such as an invalid placement are reported as events.
/// An `Err` means the command contradicted the world state and nothing was
/// changed.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
    match command {
        Command::Tick => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.attackers.tick_cooldowns();
            out_events.push(Event::TimeAdvanced {
                tick: world.tick_index,
            });
        }
        Command::PlaceAttacker { cell, profile } => {
            if !profile.is_valid() {
                out_events.push(Event::PlacementRejected {
                    cell,
                    reason: PlacementError::InvalidProfile,
                });
                return Ok(());
            }
            match world.grid.try_place_obstruction(cell) {
                Ok(version) => {
                    let attacker = world.attackers.place(cell, profile);
                    let length = world.grid.route().map_or(0, |route| route.len());
                    debug!(?attacker, ?cell, version = version.get(), length, "placed attacker");
                    out_events.push(Event::AttackerPlaced { attacker, cell });
                    out_events.push(Event::RouteChanged { version, length });
                }
                Err(reason) => {
                    debug!(?cell, %reason, "rejected placement");
                    out_events.push(Event::PlacementRejected { cell, reason });
                }
            }
        }
        Command::SpawnMover { speed, health } => {
            if health.is_depleted() {
                out_events.push(Event::SpawnRejected {
                    reason: SpawnError::InvalidHealth,
                });
                return Ok(());
            }
            let Some((start, version)) = world
                .grid
                .route()
                .and_then(|route| route.first().map(|cell| (cell, route.version())))
            else {
                out_events.push(Event::SpawnRejected {
                    reason: SpawnError::NoRoute,
                });
                return Ok(());
            };
            let mover = world.movers.spawn(start, version, speed, health);
            world.grid.occupy(start);
            debug!(?mover, speed = speed.get(), health = health.get(), "spawned mover");
            out_events.push(Event::MoverSpawned { mover, cell: start });
        }
        Command::AdvanceMover { mover, step } => advance_mover(world, mover, step, out_events)?,
        Command::FireAttacker { attacker, target } => {
            let entry = world
                .attackers
                .get_mut(attacker)
                .ok_or(WorldError::UnknownAttacker(attacker))?;
            if !entry.is_ready() {
                return Err(WorldError::AttackerCoolingDown(attacker));
            }
            let damage = entry.profile.damage;

            if let Some(target) = target {
                let victim = world
                    .movers
                    .get_mut(target)
                    .ok_or(WorldError::UnknownMover(target))?;
                if !victim.phase.is_active() {
                    return Err(WorldError::InactiveMover(target));
                }
                victim.health = victim.health.saturating_sub(damage);
                out_events.push(Event::MoverDamaged {
                    attacker,
                    mover: target,
                    remaining: victim.health,
                });
                if victim.health.is_depleted() {
                    victim.phase = MoverPhase::Dead;
                    let cell = victim.cell;
                    world.grid.release(cell, false);
                    debug!(mover = ?target, ?attacker, ?cell, "mover died");
                    out_events.push(Event::MoverDied {
                        mover: target,
                        cell,
                    });
                }
            }

            if let Some(entry) = world.attackers.get_mut(attacker) {
                entry.rearm();
            }
        }
        Command::RemoveFinishedMovers => {
            for (mover, outcome) in world.movers.remove_finished() {
                trace!(?mover, ?outcome, "removed mover");
                out_events.push(Event::MoverRemoved { mover, outcome });
            }
        }
    }
    Ok(())
}

fn advance_mover(
    world: &mut World,
    mover: MoverId,
    step: MoverStep,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    let (route_len, route_version) = world
        .grid
        .route()
        .map(|route| (route.len(), route.version()))
        .ok_or(WorldError::MissingRoute)?;

    let entry = world
        .movers
        .get_mut(mover)
        .ok_or(WorldError::UnknownMover(mover))?;
    if !entry.phase.is_active() {
        return Err(WorldError::InactiveMover(mover));
    }
    if step.route_index >= route_len {
        return Err(WorldError::RouteIndexOutOfBounds {
            mover,
            index: step.route_index,
            len: route_len,
        });
    }

    if let Some(transition) = step.transition {
        if transition.from != entry.cell || transition.from.manhattan_distance(transition.to) != 1 {
            return Err(WorldError::DesynchronizedTransition {
                mover,
                from: transition.from,
                to: transition.to,
            });
        }
        if !world.grid.is_passable(transition.to) {
            return Err(WorldError::BlockedTransition {
                mover,
                cell: transition.to,
            });
        }
        world
            .grid
            .record_occupancy(transition.to, transition.from, transition.transient);
        entry.cell = transition.to;
        out_events.push(Event::MoverAdvanced {
            mover,
            from: transition.from,
            to: transition.to,
        });
    }

    if let MoverPhase::Detouring(detour) = &step.phase {
        let fresh = !matches!(&entry.phase, MoverPhase::Detouring(current) if current == detour)
            && detour.next_index() == 0;
        if fresh {
            if let Some(rejoin) = detour.final_waypoint() {
                debug!(?mover, ?rejoin, waypoints = detour.waypoints().len(), "detour started");
                out_events.push(Event::DetourStarted {
                    mover,
                    rejoin,
                    waypoints: detour.waypoints().len(),
                });
            }
        }
    }

    entry.position = step.position;
    entry.route_index = step.route_index;
    entry.route_version = route_version;
    entry.phase = step.phase;

    if entry.phase == MoverPhase::Arrived {
        let cell = entry.cell;
        world.grid.release(cell, false);
        debug!(?mover, ?cell, "mover arrived");
        out_events.push(Event::MoverArrived { mover });
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use gridlock_core::{
        AttackerView, CellCoord, CellKind, CellPoint, GridSnapshot, MoverId, MoverView, Route,
    };

    use super::{Grid, World};

    /// Provides read-only access to the grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Route movers currently follow.
    #[must_use]
    pub fn route(world: &World) -> Option<&Route> {
        world.grid.route()
    }

    /// Classification of a single cell; off-board coordinates report walls.
    #[must_use]
    pub fn cell_kind(world: &World, cell: CellCoord) -> CellKind {
        world.grid.cell_kind(cell)
    }

    /// Reports whether movers may enter the cell.
    #[must_use]
    pub fn is_passable(world: &World, cell: CellCoord) -> bool {
        world.grid.is_passable(cell)
    }

    /// Classification of every cell in row-major order.
    #[must_use]
    pub fn grid_snapshot(world: &World) -> GridSnapshot {
        world.grid.snapshot()
    }

    /// Captures a read-only view of every mover, including finished ones not
    /// yet removed.
    #[must_use]
    pub fn mover_view(world: &World) -> MoverView {
        MoverView::from_snapshots(world.movers.iter().map(|mover| mover.snapshot()).collect())
    }

    /// Captures a read-only view of every attacker.
    #[must_use]
    pub fn attacker_view(world: &World) -> AttackerView {
        AttackerView::from_snapshots(
            world
                .attackers
                .iter()
                .map(|attacker| attacker.snapshot())
                .collect(),
        )
    }

    /// Continuous position of a live mover.
    #[must_use]
    pub fn mover_position(world: &World, mover: MoverId) -> Option<CellPoint> {
        world
            .movers
            .get(mover)
            .filter(|entry| entry.phase.is_active())
            .map(|entry| entry.position)
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_core::{
        AttackerProfile, CellKind, CellPoint, CellTransition, Damage, Detour, Health, MoverOutcome,
        RouteVersion, Speed,
    };

    fn corridor() -> World {
        World::new(6, 3).expect("corridor world")
    }

    fn spawn(world: &mut World, health: u32) -> MoverId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnMover {
                speed: Speed::new(1.0).expect("speed"),
                health: Health::new(health),
            },
            &mut events,
        )
        .expect("spawn applies");
        match events.as_slice() {
            [Event::MoverSpawned { mover, .. }] => *mover,
            other => panic!("unexpected events {other:?}"),
        }
    }

    fn step_to(world: &mut World, mover: MoverId, to: CellCoord, index: usize) -> Vec<Event> {
        let from = query::mover_view(world).get(mover).expect("mover").cell;
        let mut events = Vec::new();
        apply(
            world,
            Command::AdvanceMover {
                mover,
                step: MoverStep {
                    position: CellPoint::from_cell(to),
                    phase: MoverPhase::FollowingRoute,
                    route_index: index,
                    transition: Some(CellTransition {
                        from,
                        to,
                        transient: false,
                    }),
                },
            },
            &mut events,
        )
        .expect("step applies");
        events
    }

    #[test]
    fn tick_advances_clock_and_reports_index() {
        let mut world = corridor();
        let mut events = Vec::new();

        apply(&mut world, Command::Tick, &mut events).expect("tick applies");
        apply(&mut world, Command::Tick, &mut events).expect("tick applies");

        assert_eq!(
            events,
            vec![Event::TimeAdvanced { tick: 1 }, Event::TimeAdvanced { tick: 2 }]
        );
        assert_eq!(query::tick_index(&world), 2);
    }

    #[test]
    fn spawned_movers_occupy_the_start_cell() {
        let mut world = corridor();
        let mover = spawn(&mut world, 10);

        let start = query::grid(&world).start();
        assert_eq!(query::cell_kind(&world, start), CellKind::Start);
        assert_eq!(query::grid(&world).occupants(start), 1);
        assert_eq!(query::mover_position(&world, mover), Some(CellPoint::from_cell(start)));
    }

    #[test]
    fn zero_health_spawns_are_rejected() {
        let mut world = corridor();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnMover {
                speed: Speed::new(0.5).expect("speed"),
                health: Health::new(0),
            },
            &mut events,
        )
        .expect("spawn applies");

        assert_eq!(
            events,
            vec![Event::SpawnRejected {
                reason: SpawnError::InvalidHealth
            }]
        );
        assert!(query::mover_view(&world).is_empty());
    }

    #[test]
    fn advancing_moves_occupancy_between_cells() {
        let mut world = corridor();
        let mover = spawn(&mut world, 10);
        let next = CellCoord::new(1, 1);

        let events = step_to(&mut world, mover, next, 1);

        assert_eq!(
            events,
            vec![Event::MoverAdvanced {
                mover,
                from: CellCoord::new(0, 1),
                to: next
            }]
        );
        assert_eq!(query::cell_kind(&world, next), CellKind::Occupied(1));
        assert_eq!(query::grid(&world).occupants(CellCoord::new(0, 1)), 0);
    }

    #[test]
    fn reaching_the_last_route_index_marks_arrival() {
        let mut world = corridor();
        let mover = spawn(&mut world, 10);
        let cells: Vec<_> = query::route(&world).expect("route").cells().to_vec();

        for (index, cell) in cells.iter().enumerate().skip(1) {
            let _ = step_to(&mut world, mover, *cell, index);
        }
        let last = cells.len() - 1;
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AdvanceMover {
                mover,
                step: MoverStep {
                    position: CellPoint::from_cell(cells[last]),
                    phase: MoverPhase::Arrived,
                    route_index: last,
                    transition: None,
                },
            },
            &mut events,
        )
        .expect("arrival applies");

        assert_eq!(events, vec![Event::MoverArrived { mover }]);
        assert_eq!(query::mover_position(&world, mover), None);
        assert_eq!(query::grid(&world).occupants(cells[last]), 0);

        events.clear();
        apply(&mut world, Command::RemoveFinishedMovers, &mut events).expect("removal applies");
        assert_eq!(
            events,
            vec![Event::MoverRemoved {
                mover,
                outcome: MoverOutcome::Arrived
            }]
        );
        assert!(query::mover_view(&world).is_empty());
    }

    #[test]
    fn transitions_must_start_from_the_committed_cell() {
        let mut world = corridor();
        let mover = spawn(&mut world, 10);
        let mut events = Vec::new();

        let result = apply(
            &mut world,
            Command::AdvanceMover {
                mover,
                step: MoverStep {
                    position: CellPoint::new(2.0, 1.0),
                    phase: MoverPhase::FollowingRoute,
                    route_index: 2,
                    transition: Some(CellTransition {
                        from: CellCoord::new(1, 1),
                        to: CellCoord::new(2, 1),
                        transient: false,
                    }),
                },
            },
            &mut events,
        );

        assert_eq!(
            result,
            Err(WorldError::DesynchronizedTransition {
                mover,
                from: CellCoord::new(1, 1),
                to: CellCoord::new(2, 1),
            })
        );
        assert!(events.is_empty());
        assert_eq!(query::grid(&world).occupants(CellCoord::new(0, 1)), 1);
    }

    #[test]
    fn transitions_must_join_neighbouring_cells() {
        let mut world = corridor();
        let mover = spawn(&mut world, 10);
        let mut events = Vec::new();

        let result = apply(
            &mut world,
            Command::AdvanceMover {
                mover,
                step: MoverStep {
                    position: CellPoint::new(2.0, 1.0),
                    phase: MoverPhase::FollowingRoute,
                    route_index: 2,
                    transition: Some(CellTransition {
                        from: CellCoord::new(0, 1),
                        to: CellCoord::new(2, 1),
                        transient: false,
                    }),
                },
            },
            &mut events,
        );

        assert_eq!(
            result,
            Err(WorldError::DesynchronizedTransition {
                mover,
                from: CellCoord::new(0, 1),
                to: CellCoord::new(2, 1),
            })
        );
        assert!(events.is_empty());
        assert_eq!(query::grid(&world).occupants(CellCoord::new(0, 1)), 1);
        assert_eq!(query::grid(&world).occupants(CellCoord::new(2, 1)), 0);
    }

    #[test]
    fn entering_walls_is_rejected() {
        let mut world = corridor();
        let mover = spawn(&mut world, 10);
        let mut events = Vec::new();

        let result = apply(
            &mut world,
            Command::AdvanceMover {
                mover,
                step: MoverStep {
                    position: CellPoint::new(0.0, 0.0),
                    phase: MoverPhase::FollowingRoute,
                    route_index: 0,
                    transition: Some(CellTransition {
                        from: CellCoord::new(0, 1),
                        to: CellCoord::new(0, 0),
                        transient: true,
                    }),
                },
            },
            &mut events,
        );

        assert_eq!(
            result,
            Err(WorldError::BlockedTransition {
                mover,
                cell: CellCoord::new(0, 0)
            })
        );
    }

    #[test]
    fn entering_a_detour_announces_it_once() {
        let mut world = World::new(5, 5).expect("world");
        let mover = spawn(&mut world, 10);
        let detour = Detour::new(vec![CellCoord::new(1, 1)]);
        let mut events = Vec::new();
        let step = MoverStep {
            position: CellPoint::new(0.0, 1.0),
            phase: MoverPhase::Detouring(detour.clone()),
            route_index: 0,
            transition: None,
        };

        apply(
            &mut world,
            Command::AdvanceMover {
                mover,
                step: step.clone(),
            },
            &mut events,
        )
        .expect("detour applies");
        apply(&mut world, Command::AdvanceMover { mover, step }, &mut events)
            .expect("detour applies");

        assert_eq!(
            events,
            vec![Event::DetourStarted {
                mover,
                rejoin: CellCoord::new(1, 1),
                waypoints: 1
            }]
        );
    }

    #[test]
    fn lethal_hits_kill_and_release_the_cell() {
        let mut world = World::new(6, 5).expect("world");
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceAttacker {
                cell: CellCoord::new(3, 3),
                profile: AttackerProfile::new(Damage::new(10), 3.0, 1),
            },
            &mut events,
        )
        .expect("placement applies");
        let attacker = match events.first() {
            Some(Event::AttackerPlaced { attacker, .. }) => *attacker,
            other => panic!("unexpected event {other:?}"),
        };
        let mover = spawn(&mut world, 10);
        apply(&mut world, Command::Tick, &mut events).expect("tick applies");
        events.clear();

        apply(
            &mut world,
            Command::FireAttacker {
                attacker,
                target: Some(mover),
            },
            &mut events,
        )
        .expect("fire applies");

        let start = query::grid(&world).start();
        assert_eq!(
            events,
            vec![
                Event::MoverDamaged {
                    attacker,
                    mover,
                    remaining: Health::new(0)
                },
                Event::MoverDied { mover, cell: start },
            ]
        );
        assert_eq!(query::grid(&world).occupants(start), 0);
        assert_eq!(query::mover_position(&world, mover), None);
        assert_eq!(query::attacker_view(&world).iter().next().map(|a| a.ready_in), Some(1));
    }

    #[test]
    fn firing_before_cooldown_is_rejected() {
        let mut world = World::new(6, 5).expect("world");
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceAttacker {
                cell: CellCoord::new(3, 3),
                profile: AttackerProfile::new(Damage::new(10), 3.0, 2),
            },
            &mut events,
        )
        .expect("placement applies");

        let result = apply(
            &mut world,
            Command::FireAttacker {
                attacker: AttackerId::new(0),
                target: None,
            },
            &mut events,
        );

        assert_eq!(result, Err(WorldError::AttackerCoolingDown(AttackerId::new(0))));
    }

    #[test]
    fn placement_reports_route_change() {
        let mut world = World::new(5, 5).expect("world");
        let cell = query::route(&world).and_then(|route| route.get(2)).expect("route cell");
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::PlaceAttacker {
                cell,
                profile: AttackerProfile::new(Damage::new(10), 3.0, 5),
            },
            &mut events,
        )
        .expect("placement applies");

        let length = query::route(&world).map(|route| route.len()).expect("route");
        assert_eq!(
            events,
            vec![
                Event::AttackerPlaced {
                    attacker: AttackerId::new(0),
                    cell
                },
                Event::RouteChanged {
                    version: RouteVersion::new(2),
                    length
                },
            ]
        );
    }

    #[test]
    fn invalid_profiles_are_rejected_before_touching_the_grid() {
        let mut world = World::new(5, 5).expect("world");
        let before = query::grid_snapshot(&world);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::PlaceAttacker {
                cell: CellCoord::new(2, 2),
                profile: AttackerProfile::new(Damage::new(10), -1.0, 5),
            },
            &mut events,
        )
        .expect("placement applies");

        assert_eq!(
            events,
            vec![Event::PlacementRejected {
                cell: CellCoord::new(2, 2),
                reason: PlacementError::InvalidProfile
            }]
        );
        assert_eq!(query::grid_snapshot(&world), before);
    }
}
