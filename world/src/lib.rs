#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the MANET simulation engine.
//!
//! A [`World`] owns the grid bounds, the wall cells and the [`Network`] of
//! nodes. Every tick it plans a collision-free move for each node, applies the
//! plan and recomputes the neighbor topology before returning.

use std::collections::BTreeSet;

use manet_core::{
    Command, DeliveryError, Event, GridError, GridSize, MembershipError, MoveError, MoveRecord,
    NodeId, PlacementError, Position, RangePolicy, StepError,
};
use rand::Rng;

mod network;
mod node;
mod planner;

pub use network::Network;
pub use node::Node;

/// Destinations chosen for every node during one tick, not yet applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovePlan {
    moves: Vec<MoveRecord>,
}

impl MovePlan {
    /// Planned transitions in roster order.
    #[must_use]
    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    /// Consumes the plan, yielding the planned transitions.
    #[must_use]
    pub fn into_moves(self) -> Vec<MoveRecord> {
        self.moves
    }
}

/// Represents the authoritative simulation world.
#[derive(Clone, Debug)]
pub struct World {
    grid: GridSize,
    walls: BTreeSet<Position>,
    network: Network,
    tick: u64,
}

impl World {
    /// Creates an empty world using asymmetric range semantics.
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        Self::with_range_policy(width, height, RangePolicy::default())
    }

    /// Creates an empty world whose network uses the provided range semantics.
    pub fn with_range_policy(
        width: u32,
        height: u32,
        range_policy: RangePolicy,
    ) -> Result<Self, GridError> {
        Ok(Self {
            grid: GridSize::new(width, height)?,
            walls: BTreeSet::new(),
            network: Network::with_range_policy(range_policy),
            tick: 0,
        })
    }

    /// Read-only access to the managed network.
    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Reports whether the position lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, position: Position) -> bool {
        self.grid.contains(position)
    }

    /// Reports whether a node or a wall sits on the position.
    #[must_use]
    pub fn is_occupied(&self, position: Position) -> bool {
        self.network.node_at(position).is_some() || self.walls.contains(&position)
    }

    /// Marks a cell as impassable.
    ///
    /// Cells outside the grid are silently ignored and `false` is returned.
    /// Node occupancy is not consulted.
    pub fn add_wall(&mut self, cell: Position) -> bool {
        if !self.in_bounds(cell) {
            log::debug!("Ignoring wall outside the grid at {cell}");
            return false;
        }
        let _ = self.walls.insert(cell);
        true
    }

    /// Places a node, rejecting cells outside the grid or already occupied.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, PlacementError> {
        let position = node.position();
        let rejection = if !self.in_bounds(position) {
            Some(PlacementError::OutOfBounds)
        } else if self.is_occupied(position) {
            Some(PlacementError::Occupied)
        } else {
            None
        };

        if let Some(reason) = rejection {
            log::warn!("Failed to add node {} at {position}: {reason}", node.name());
            return Err(reason);
        }

        self.network
            .add_node(node)
            .map_err(|_| PlacementError::DuplicateId)
    }

    /// Removes a node from the network roster.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, MembershipError> {
        self.network.remove_node(id)
    }

    /// Moves a single node to a legal cell and recomputes the topology.
    ///
    /// Moving a node onto the cell it already occupies is accepted.
    pub fn move_node(&mut self, id: NodeId, to: Position) -> Result<(), MoveError> {
        let from = self
            .network
            .node(id)
            .map(Node::position)
            .ok_or(MoveError::NotFound)?;
        if !self.in_bounds(to) {
            return Err(MoveError::OutOfBounds);
        }
        if to != from && self.is_occupied(to) {
            return Err(MoveError::Blocked);
        }

        self.network
            .move_node(id, to)
            .map_err(|_| MoveError::NotFound)
    }

    /// Moves a single node to a random free cell `max_step` cells away along
    /// one of the eight directions, recomputing the topology when it moves.
    ///
    /// Returns the new position, or `None` when every candidate was blocked.
    pub fn move_node_random<R>(
        &mut self,
        id: NodeId,
        max_step: u32,
        rng: &mut R,
    ) -> Result<Option<Position>, MembershipError>
    where
        R: Rng + ?Sized,
    {
        let from = self
            .network
            .node(id)
            .map(Node::position)
            .ok_or(MembershipError::NotFound)?;
        let step = i32::try_from(max_step).unwrap_or(i32::MAX);

        let destination = planner::first_open_cell(from, step, rng, |cell| {
            self.in_bounds(cell) && !self.is_occupied(cell)
        });
        if let Some(cell) = destination {
            self.network.move_node(id, cell)?;
        }
        Ok(destination)
    }

    /// Flips a node's participation flag, effective on the next recompute.
    pub fn set_adhoc_enabled(&mut self, id: NodeId, enabled: bool) -> Result<(), MembershipError> {
        self.network.set_adhoc_enabled(id, enabled)
    }

    /// Recomputes every neighbor list without moving nodes.
    pub fn update_neighbors(&mut self) {
        self.network.update_neighbors();
    }

    /// Delivers a message if `target` is currently a neighbor of `sender`.
    pub fn send_message(
        &mut self,
        sender: NodeId,
        target: NodeId,
        text: impl Into<String>,
    ) -> Result<(), DeliveryError> {
        self.network.send_message(sender, target, text)
    }

    /// Plans one destination per node without applying anything.
    ///
    /// Candidate order is shuffled per node with the supplied generator, so a
    /// seeded generator reproduces the same plan.
    pub fn plan_step<R>(&self, rng: &mut R) -> MovePlan
    where
        R: Rng + ?Sized,
    {
        MovePlan {
            moves: planner::plan_moves(self.grid, &self.walls, self.network.nodes(), rng),
        }
    }

    /// Applies a plan produced by [`World::plan_step`] and recomputes the
    /// topology.
    ///
    /// The plan is refused without any change when the roster, a node position
    /// or a destination cell changed since planning, or when a destination lies
    /// outside this world's grid.
    pub fn commit(&mut self, plan: MovePlan) -> Result<Vec<MoveRecord>, StepError> {
        if !self.plan_matches(&plan) {
            log::warn!("Refusing stale move plan at tick {}", self.tick);
            return Err(StepError::StalePlan);
        }
        self.apply_moves(&plan.moves);
        Ok(plan.moves)
    }

    /// Advances the simulation by one tick and reports every transition in
    /// roster order.
    pub fn step<R>(&mut self, rng: &mut R) -> Vec<MoveRecord>
    where
        R: Rng + ?Sized,
    {
        let plan = self.plan_step(rng);
        self.apply_moves(&plan.moves);
        plan.moves
    }

    fn plan_matches(&self, plan: &MovePlan) -> bool {
        plan.moves.len() == self.network.len()
            && plan
                .moves
                .iter()
                .zip(self.network.nodes())
                .all(|(record, node)| {
                    record.node == node.id()
                        && record.from == node.position()
                        && (!record.moved() || self.is_legal_destination(record.to))
                })
    }

    fn is_legal_destination(&self, cell: Position) -> bool {
        self.in_bounds(cell) && !self.walls.contains(&cell)
    }

    fn apply_moves(&mut self, moves: &[MoveRecord]) {
        for (node, record) in self.network.nodes_mut().iter_mut().zip(moves) {
            if record.moved() {
                node.move_to(record.to);
            }
        }
        self.network.update_neighbors();
        self.tick = self.tick.saturating_add(1);
        log::debug!("Tick {} committed", self.tick);
    }
}

/// Applies the provided command to the world and reports the outcome as
/// events.
pub fn apply<R>(world: &mut World, command: Command, rng: &mut R, out_events: &mut Vec<Event>)
where
    R: Rng + ?Sized,
{
    match command {
        Command::AddNode { spec } => {
            let node = Node::from(spec);
            let (id, position) = (node.id(), node.position());
            match world.add_node(node) {
                Ok(node) => out_events.push(Event::NodeAdded { node, position }),
                Err(reason) => out_events.push(Event::PlacementRejected {
                    node: id,
                    position,
                    reason,
                }),
            }
        }
        Command::RemoveNode { node } => match world.remove_node(node) {
            Ok(_) => out_events.push(Event::NodeRemoved { node }),
            Err(reason) => out_events.push(Event::MembershipRejected { node, reason }),
        },
        Command::AddWall { cell } => {
            if world.add_wall(cell) {
                out_events.push(Event::WallAdded { cell });
            } else {
                out_events.push(Event::WallIgnored { cell });
            }
        }
        Command::MoveNode { node, to } => {
            let from = world.network.node(node).map(Node::position);
            match (world.move_node(node, to), from) {
                (Ok(()), Some(from)) => {
                    if from != to {
                        out_events.push(Event::NodeMoved { node, from, to });
                    }
                    out_events.push(Event::NeighborsUpdated);
                }
                (Ok(()), None) => out_events.push(Event::NeighborsUpdated),
                (Err(reason), _) => out_events.push(Event::MoveRejected { node, to, reason }),
            }
        }
        Command::Step => {
            let moves = world.step(rng);
            out_events.extend(
                moves
                    .into_iter()
                    .filter(MoveRecord::moved)
                    .map(|record| Event::NodeMoved {
                        node: record.node,
                        from: record.from,
                        to: record.to,
                    }),
            );
            out_events.push(Event::TickCompleted { tick: world.tick });
        }
        Command::UpdateNeighbors => {
            world.update_neighbors();
            out_events.push(Event::NeighborsUpdated);
        }
        Command::SendMessage {
            sender,
            target,
            text,
        } => match world.send_message(sender, target, text) {
            Ok(()) => out_events.push(Event::MessageDelivered { sender, target }),
            Err(reason) => out_events.push(Event::DeliveryFailed {
                sender,
                target,
                reason,
            }),
        },
        Command::SetAdhoc { node, enabled } => match world.set_adhoc_enabled(node, enabled) {
            Ok(()) => out_events.push(Event::AdhocChanged { node, enabled }),
            Err(reason) => out_events.push(Event::MembershipRejected { node, reason }),
        },
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::fmt;

    use manet_core::{GridSize, Message, NodeId, NodeSnapshot, NodeView, Position, RangePolicy};

    use super::{Node, World};

    /// Provides the grid dimensions.
    #[must_use]
    pub fn bounds(world: &World) -> GridSize {
        world.grid
    }

    /// Number of ticks completed so far.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick
    }

    /// Range semantics used by the world's network.
    #[must_use]
    pub fn range_policy(world: &World) -> RangePolicy {
        world.network.range_policy()
    }

    /// Nodes in roster order.
    #[must_use]
    pub fn nodes(world: &World) -> &[Node] {
        world.network.nodes()
    }

    /// Looks up a node by identifier.
    #[must_use]
    pub fn node(world: &World, id: NodeId) -> Option<&Node> {
        world.network.node(id)
    }

    /// Neighbor list of a node as of the last recomputation.
    #[must_use]
    pub fn neighbors(world: &World, id: NodeId) -> Option<&[NodeId]> {
        world.network.node(id).map(Node::neighbors)
    }

    /// Inbox of a node, oldest message first.
    #[must_use]
    pub fn inbox(world: &World, id: NodeId) -> Option<&[Message]> {
        world.network.node(id).map(Node::inbox)
    }

    /// Names of a node's neighbors, skipping identifiers that left the roster
    /// since the last recomputation.
    #[must_use]
    pub fn neighbor_names(world: &World, id: NodeId) -> Option<Vec<&str>> {
        let node = world.network.node(id)?;
        Some(
            node.neighbors()
                .iter()
                .filter_map(|neighbor| world.network.node(*neighbor))
                .map(Node::name)
                .collect(),
        )
    }

    /// Wall cells in ascending order.
    pub fn walls(world: &World) -> impl Iterator<Item = Position> + '_ {
        world.walls.iter().copied()
    }

    /// Captures snapshots of every node in roster order.
    #[must_use]
    pub fn node_view(world: &World) -> NodeView {
        NodeView::from_snapshots(
            world
                .network
                .nodes()
                .iter()
                .map(|node| NodeSnapshot {
                    id: node.id(),
                    name: node.name().to_owned(),
                    position: node.position(),
                    range: node.range(),
                    adhoc_enabled: node.adhoc_enabled(),
                    neighbors: node.neighbors().to_vec(),
                    inbox: node.inbox().to_vec(),
                })
                .collect(),
        )
    }

    /// Human readable summary of bounds, node positions and walls.
    #[must_use]
    pub fn summary(world: &World) -> WorldSummary<'_> {
        WorldSummary { world }
    }

    /// Text rendering of the world produced by [`summary`].
    #[derive(Clone, Copy, Debug)]
    pub struct WorldSummary<'a> {
        world: &'a World,
    }

    impl fmt::Display for WorldSummary<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let grid = self.world.grid;
            write!(f, "World {}x{}", grid.width(), grid.height())?;
            for node in self.world.network.nodes() {
                write!(f, "\n- {} at {}", node.name(), node.position())?;
            }
            if !self.world.walls.is_empty() {
                let cells: Vec<String> = self.world.walls.iter().map(ToString::to_string).collect();
                write!(f, "\nWalls at: [{}]", cells.join(", "))?;
            }
            Ok(())
        }
    }
}
