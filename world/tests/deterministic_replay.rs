use manet_core::{CommRange, Command, Event, NodeId, NodeSnapshot, NodeSpec, Position};
use manet_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const REPLAY_SEED: u64 = 0x42f0_e1eb_d4a5_3c21;

#[test]
fn replay_with_same_seed_is_identical() {
    let first = replay(REPLAY_SEED, scripted_commands());
    let second = replay(REPLAY_SEED, scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    let ticks = first
        .events
        .iter()
        .filter(|event| matches!(event, Event::TickCompleted { .. }))
        .count();
    assert_eq!(ticks, 12);
}

#[test]
fn replay_reports_rejections_inline() {
    let outcome = replay(REPLAY_SEED, scripted_commands());

    assert!(outcome
        .events
        .iter()
        .any(|event| matches!(event, Event::WallIgnored { .. })));
    assert!(outcome
        .events
        .iter()
        .any(|event| matches!(event, Event::PlacementRejected { .. })));
    assert_eq!(outcome.nodes.len(), 4);
}

#[test]
fn split_planning_matches_single_step() {
    let mut planned = build_world();
    let mut stepped = build_world();
    let mut planning_rng = ChaCha8Rng::seed_from_u64(REPLAY_SEED);
    let mut stepping_rng = ChaCha8Rng::seed_from_u64(REPLAY_SEED);

    for _ in 0..10 {
        let plan = planned.plan_step(&mut planning_rng);
        let committed = planned.commit(plan).expect("fresh plan");
        let moves = stepped.step(&mut stepping_rng);
        assert_eq!(committed, moves);
    }

    assert_eq!(
        query::node_view(&planned).into_vec(),
        query::node_view(&stepped).into_vec()
    );
}

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    nodes: Vec<NodeSnapshot>,
    events: Vec<Event>,
}

fn replay(seed: u64, commands: Vec<Command>) -> ReplayOutcome {
    let mut world = World::new(8, 6).expect("world");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut events = Vec::new();

    for command in commands {
        world::apply(&mut world, command, &mut rng, &mut events);
    }

    ReplayOutcome {
        nodes: query::node_view(&world).into_vec(),
        events,
    }
}

fn scripted_commands() -> Vec<Command> {
    let mut commands = vec![
        Command::AddWall {
            cell: Position::new(3, 3),
        },
        Command::AddWall {
            cell: Position::new(-1, 4),
        },
    ];
    for (id, x, y) in [(1, 0, 0), (2, 2, 1), (3, 7, 5), (4, 4, 4), (5, 3, 3)] {
        commands.push(Command::AddNode {
            spec: spec(id, x, y, 3.0),
        });
    }
    commands.push(Command::UpdateNeighbors);

    for tick in 0..12 {
        commands.push(Command::Step);
        commands.push(Command::SendMessage {
            sender: NodeId::new(1),
            target: NodeId::new(2),
            text: format!("tick {tick}"),
        });
        if tick == 5 {
            commands.push(Command::SetAdhoc {
                node: NodeId::new(2),
                enabled: false,
            });
        }
    }
    commands
}

fn build_world() -> World {
    let mut world = World::new(8, 6).expect("world");
    for (id, x, y) in [(1, 0, 0), (2, 2, 1), (3, 7, 5), (4, 4, 4)] {
        let _ = world
            .add_node(spec(id, x, y, 3.0).into())
            .expect("free cell");
    }
    world
}

fn spec(id: u32, x: i32, y: i32, range: f64) -> NodeSpec {
    NodeSpec::new(NodeId::new(id), format!("n{id}"), Position::new(x, y))
        .with_range(CommRange::new(range).expect("range"))
}
