//! Drives a world through the scripted ticks of a scenario.

use manet_core::{Command, Event, MoveRecord};
use manet_world::{self as world, query, World};
use rand::Rng;

use crate::{
    report::{display_name, Delivery, Frame, RunReport, TopologyEntry},
    scenario::ScheduledMessage,
};

/// Runs `ticks` ticks, sending each scheduled message once its tick count has
/// completed, and captures a frame after setup and after every tick.
pub(crate) fn simulate<R>(
    world: &mut World,
    messages: &[ScheduledMessage],
    ticks: u64,
    seed: u64,
    rng: &mut R,
) -> RunReport
where
    R: Rng + ?Sized,
{
    let mut frames = Vec::new();
    frames.push(capture(world, Vec::new(), messages, rng));

    for _ in 0..ticks {
        let mut events = Vec::new();
        world::apply(world, Command::Step, rng, &mut events);
        let moves = events
            .into_iter()
            .filter_map(|event| match event {
                Event::NodeMoved { node, from, to } => Some(MoveRecord { node, from, to }),
                _ => None,
            })
            .collect();
        frames.push(capture(world, moves, messages, rng));
    }

    RunReport {
        seed,
        frames,
        nodes: query::node_view(world).into_vec(),
        walls: query::walls(world).collect(),
    }
}

fn capture<R>(
    world: &mut World,
    moves: Vec<MoveRecord>,
    messages: &[ScheduledMessage],
    rng: &mut R,
) -> Frame
where
    R: Rng + ?Sized,
{
    let tick = query::tick(world);
    let deliveries = messages
        .iter()
        .filter(|message| message.tick == tick)
        .map(|message| send(world, message, rng))
        .collect();
    Frame {
        tick,
        moves,
        deliveries,
        topology: TopologyEntry::capture(world),
    }
}

fn send<R>(world: &mut World, message: &ScheduledMessage, rng: &mut R) -> Delivery
where
    R: Rng + ?Sized,
{
    let mut events = Vec::new();
    world::apply(
        world,
        Command::SendMessage {
            sender: message.sender,
            target: message.target,
            text: message.text.clone(),
        },
        rng,
        &mut events,
    );
    let failure = events.into_iter().find_map(|event| match event {
        Event::DeliveryFailed { reason, .. } => Some(reason),
        _ => None,
    });

    Delivery {
        sender: display_name(world, message.sender),
        target: display_name(world, message.target),
        text: message.text.clone(),
        failure,
    }
}
