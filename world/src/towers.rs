//! Authoritative attacker state management utilities.

use std::collections::BTreeMap;

use gridlock_core::{AttackerId, AttackerProfile, AttackerSnapshot, CellCoord};

/// Attacker stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Attacker {
    pub(crate) id: AttackerId,
    pub(crate) cell: CellCoord,
    pub(crate) profile: AttackerProfile,
    /// Ticks remaining before the next attack evaluation.
    pub(crate) ready_in: u32,
}

impl Attacker {
    pub(crate) fn snapshot(&self) -> AttackerSnapshot {
        AttackerSnapshot {
            id: self.id,
            cell: self.cell,
            profile: self.profile,
            ready_in: self.ready_in,
        }
    }

    pub(crate) const fn is_ready(&self) -> bool {
        self.ready_in == 0
    }

    /// Restarts the cooldown after an attack evaluation.
    pub(crate) fn rearm(&mut self) {
        self.ready_in = self.profile.interval_ticks;
    }
}

/// Registry that stores attackers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct AttackerRegistry {
    entries: BTreeMap<AttackerId, Attacker>,
    next_attacker_id: AttackerId,
}

impl AttackerRegistry {
    /// Creates an empty attacker registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_attacker_id: AttackerId::new(0),
        }
    }

    /// Stores a new attacker whose first evaluation happens one full interval
    /// after placement.
    pub(crate) fn place(&mut self, cell: CellCoord, profile: AttackerProfile) -> AttackerId {
        let id = self.next_attacker_id;
        self.next_attacker_id = AttackerId::new(id.get().saturating_add(1));
        let _ = self.entries.insert(
            id,
            Attacker {
                id,
                cell,
                profile,
                ready_in: profile.interval_ticks,
            },
        );
        id
    }

    /// Counts every cooldown down by one tick.
    pub(crate) fn tick_cooldowns(&mut self) {
        for attacker in self.entries.values_mut() {
            attacker.ready_in = attacker.ready_in.saturating_sub(1);
        }
    }

    pub(crate) fn get_mut(&mut self, id: AttackerId) -> Option<&mut Attacker> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Attacker> {
        self.entries.values()
    }
}
