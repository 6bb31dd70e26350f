use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use gridlock_core::{
    AttackerProfile, CellCoord, Command, Damage, Event, Health, MoverId, MoverSnapshot, Speed,
};
use gridlock_system_movement::Movement;
use gridlock_world::{self as world, query, World};

#[test]
fn deterministic_replay_produces_identical_fingerprints() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first
        .events
        .iter()
        .any(|event| matches!(event, Event::RouteChanged { .. })));
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let mut world = World::new(9, 7).expect("world");
    let mut movement = Movement::default();
    let mut log = Vec::new();

    for command in commands {
        let mut events = Vec::new();
        world::apply(&mut world, command, &mut events).expect("scripted command applies");
        log.extend(events.iter().cloned());
        process_movement(&mut world, &mut movement, &events, &mut log);
    }

    let movers = query::mover_view(&world)
        .into_vec()
        .into_iter()
        .map(MoverState::from)
        .collect();

    ReplayOutcome { movers, events: log }
}

fn process_movement(world: &mut World, movement: &mut Movement, events: &[Event], log: &mut Vec<Event>) {
    let observed: &World = world;
    let Some(route) = query::route(observed) else {
        return;
    };
    let grid = query::grid(observed);
    let mut commands = Vec::new();
    movement
        .handle(
            events,
            &query::mover_view(observed),
            route,
            (grid.columns(), grid.rows()),
            |cell| !query::is_passable(observed, cell),
            &mut commands,
        )
        .expect("movement plans");

    for command in commands {
        world::apply(world, command, log).expect("movement step applies");
    }
}

fn scripted_commands() -> Vec<Command> {
    let spawn = |speed: f32| Command::SpawnMover {
        speed: Speed::new(speed).expect("valid speed"),
        health: Health::new(50),
    };
    let place = |column: u32, row: u32| Command::PlaceAttacker {
        cell: CellCoord::new(column, row),
        profile: AttackerProfile::new(Damage::new(5), 2.0, 3),
    };

    let mut commands = vec![spawn(0.6), spawn(0.3)];
    commands.extend(std::iter::repeat(Command::Tick).take(6));
    commands.extend([place(2, 1), place(3, 2), place(5, 3), place(2, 4)]);
    commands.push(spawn(0.9));
    commands.extend(std::iter::repeat(Command::Tick).take(40));
    commands
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    movers: Vec<MoverState>,
    events: Vec<Event>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MoverState {
    id: MoverId,
    cell: CellCoord,
    column_bits: u32,
    row_bits: u32,
    route_index: usize,
    health: u32,
}

impl From<MoverSnapshot> for MoverState {
    fn from(snapshot: MoverSnapshot) -> Self {
        Self {
            id: snapshot.id,
            cell: snapshot.cell,
            column_bits: snapshot.position.column().to_bits(),
            row_bits: snapshot.position.row().to_bits(),
            route_index: snapshot.route_index,
            health: snapshot.health.get(),
        }
    }
}
