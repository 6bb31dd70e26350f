#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that resolves attack evaluations for ready attackers.

use gridlock_core::{AttackerSnapshot, AttackerView, CellPoint, Command, MoverId, MoverView};

/// Attacker targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    mover_workspace: Vec<MoverCandidate>,
}

impl TowerTargeting {
    /// Creates a new targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits one `Command::FireAttacker` for every ready attacker.
    ///
    /// Attackers are evaluated in ascending id order. Each picks the nearest
    /// active mover whose distance does not exceed its range, with the lower
    /// mover id winning ties. Damage is booked as attackers are evaluated so a
    /// mover killed by an earlier attacker is invisible to later ones. Ready
    /// attackers with nothing in range still fire without a target, which
    /// restarts their cooldown.
    pub fn handle(&mut self, attackers: &AttackerView, movers: &MoverView, out: &mut Vec<Command>) {
        let mut ready = attackers.iter().filter(|attacker| attacker.is_ready()).peekable();
        if ready.peek().is_none() {
            return;
        }
        self.prepare_mover_workspace(movers);

        for attacker in ready {
            let target = self.select(attacker);
            out.push(Command::FireAttacker {
                attacker: attacker.id,
                target,
            });
        }
    }

    fn select(&mut self, attacker: &AttackerSnapshot) -> Option<MoverId> {
        let origin = CellPoint::from_cell(attacker.cell);
        let range = attacker.profile.range;

        let mut best: Option<(usize, f32)> = None;
        for (index, candidate) in self.mover_workspace.iter().enumerate() {
            if candidate.remaining == 0 {
                continue;
            }
            let distance = origin.distance(candidate.position);
            if distance > range {
                continue;
            }
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((index, distance)),
            }
        }

        let (index, _) = best?;
        let candidate = &mut self.mover_workspace[index];
        candidate.remaining = candidate
            .remaining
            .saturating_sub(attacker.profile.damage.get());
        Some(candidate.id)
    }

    fn prepare_mover_workspace(&mut self, movers: &MoverView) {
        self.mover_workspace.clear();
        self.mover_workspace.extend(movers.active().map(|snapshot| MoverCandidate {
            id: snapshot.id,
            position: snapshot.position,
            remaining: snapshot.health.get(),
        }));
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct MoverCandidate {
    id: MoverId,
    position: CellPoint,
    remaining: u32,
}
