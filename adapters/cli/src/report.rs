//! Per-tick reports captured while the simulation runs, rendered either as
//! plain text or as JSON.

use std::fmt;

use manet_core::{DeliveryError, Message, MoveRecord, NodeId, NodeSnapshot, Position};
use manet_world::{query, World};
use serde::Serialize;

/// Everything observed during a run.
#[derive(Debug, Serialize)]
pub(crate) struct RunReport {
    /// Seed the movement generator started from.
    pub(crate) seed: u64,
    /// Frame zero holds the initial state; frame `n` follows tick `n`.
    pub(crate) frames: Vec<Frame>,
    /// Final per-node state in roster order.
    pub(crate) nodes: Vec<NodeSnapshot>,
    /// Final wall layout.
    pub(crate) walls: Vec<Position>,
}

/// State observed after a number of completed ticks.
#[derive(Debug, Serialize)]
pub(crate) struct Frame {
    /// Completed ticks at capture time.
    pub(crate) tick: u64,
    /// Nodes that changed cell during this tick.
    pub(crate) moves: Vec<MoveRecord>,
    /// Messages attempted after the tick completed.
    pub(crate) deliveries: Vec<Delivery>,
    /// Position and neighbor names of every node.
    pub(crate) topology: Vec<TopologyEntry>,
}

/// Outcome of a scripted message.
#[derive(Debug, Serialize)]
pub(crate) struct Delivery {
    pub(crate) sender: String,
    pub(crate) target: String,
    pub(crate) text: String,
    pub(crate) failure: Option<DeliveryError>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TopologyEntry {
    pub(crate) name: String,
    pub(crate) position: Position,
    pub(crate) neighbors: Vec<String>,
}

impl TopologyEntry {
    /// Captures the current topology of the world.
    pub(crate) fn capture(world: &World) -> Vec<Self> {
        query::nodes(world)
            .iter()
            .map(|node| Self {
                name: node.name().to_owned(),
                position: node.position(),
                neighbors: query::neighbor_names(world, node.id())
                    .unwrap_or_default()
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            })
            .collect()
    }
}

/// Display name of a node, falling back to its identifier when unknown.
pub(crate) fn display_name(world: &World, id: NodeId) -> String {
    query::node(world, id).map_or_else(|| id.to_string(), |node| node.name().to_owned())
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tick == 0 {
            writeln!(f, "==== Initial ====")?;
        } else {
            writeln!(f, "==== Step {} ====", self.tick)?;
        }
        for entry in &self.topology {
            writeln!(
                f,
                "{} at {} neighbors: {:?}",
                entry.name, entry.position, entry.neighbors
            )?;
        }
        for delivery in &self.deliveries {
            match delivery.failure {
                None => writeln!(
                    f,
                    "SUCCESS: {} sends message to {}: {:?}",
                    delivery.sender, delivery.target, delivery.text
                )?,
                Some(DeliveryError::NotNeighbor) => writeln!(
                    f,
                    "FAIL: {} is not a neighbor of {}! Message not delivered.",
                    delivery.target, delivery.sender
                )?,
                Some(reason) => writeln!(
                    f,
                    "FAIL: {} -> {}: {reason}",
                    delivery.sender, delivery.target
                )?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.frames {
            writeln!(f, "{frame}")?;
        }
        writeln!(f, "==== Inboxes ====")?;
        for node in &self.nodes {
            let messages: Vec<String> = node.inbox.iter().map(|m| render(self, m)).collect();
            writeln!(f, "{} messages: [{}]", node.name, messages.join(", "))?;
        }
        Ok(())
    }
}

fn render(report: &RunReport, message: &Message) -> String {
    let sender = report
        .nodes
        .iter()
        .find(|node| node.id == message.sender())
        .map_or_else(|| message.sender().to_string(), |node| node.name.clone());
    format!("({sender}, {:?})", message.text())
}
