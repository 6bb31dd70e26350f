//! Authoritative mover state management utilities.

use std::collections::BTreeMap;

use gridlock_core::{
    CellCoord, CellPoint, Health, MoverId, MoverOutcome, MoverPhase, MoverSnapshot, RouteVersion,
    Speed,
};

/// Mover stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Mover {
    pub(crate) id: MoverId,
    pub(crate) position: CellPoint,
    /// Cell last committed to grid occupancy.
    pub(crate) cell: CellCoord,
    pub(crate) phase: MoverPhase,
    pub(crate) route_index: usize,
    pub(crate) route_version: RouteVersion,
    pub(crate) speed: Speed,
    pub(crate) health: Health,
}

impl Mover {
    /// Creates a mover standing on the first route coordinate.
    pub(crate) fn spawn(
        id: MoverId,
        start: CellCoord,
        route_version: RouteVersion,
        speed: Speed,
        health: Health,
    ) -> Self {
        Self {
            id,
            position: CellPoint::from_cell(start),
            cell: start,
            phase: MoverPhase::FollowingRoute,
            route_index: 0,
            route_version,
            speed,
            health,
        }
    }

    pub(crate) fn snapshot(&self) -> MoverSnapshot {
        MoverSnapshot {
            id: self.id,
            position: self.position,
            cell: self.cell,
            phase: self.phase.clone(),
            route_index: self.route_index,
            route_version: self.route_version,
            speed: self.speed,
            health: self.health,
        }
    }

    fn outcome(&self) -> Option<MoverOutcome> {
        match self.phase {
            MoverPhase::Dead => Some(MoverOutcome::Killed),
            MoverPhase::Arrived => Some(MoverOutcome::Arrived),
            MoverPhase::FollowingRoute | MoverPhase::Detouring(_) => None,
        }
    }
}

/// Registry that stores movers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct MoverRegistry {
    entries: BTreeMap<MoverId, Mover>,
    next_mover_id: MoverId,
}

impl MoverRegistry {
    /// Creates an empty mover registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_mover_id: MoverId::new(0),
        }
    }

    /// Allocates the next identifier and stores the mover built from it.
    pub(crate) fn spawn(
        &mut self,
        start: CellCoord,
        route_version: RouteVersion,
        speed: Speed,
        health: Health,
    ) -> MoverId {
        let id = self.next_mover_id;
        self.next_mover_id = MoverId::new(id.get().saturating_add(1));
        let _ = self
            .entries
            .insert(id, Mover::spawn(id, start, route_version, speed, health));
        id
    }

    pub(crate) fn get(&self, id: MoverId) -> Option<&Mover> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: MoverId) -> Option<&mut Mover> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Mover> {
        self.entries.values()
    }

    /// Drops every dead or arrived mover, reporting each in ascending id order.
    pub(crate) fn remove_finished(&mut self) -> Vec<(MoverId, MoverOutcome)> {
        let finished: Vec<(MoverId, MoverOutcome)> = self
            .entries
            .values()
            .filter_map(|mover| mover.outcome().map(|outcome| (mover.id, outcome)))
            .collect();
        for (id, _) in &finished {
            let _ = self.entries.remove(id);
        }
        finished
    }
}
