//! Roster of nodes, neighbor topology and point-to-point delivery.

use manet_core::{DeliveryError, MembershipError, NodeId, Position, RangePolicy};

use crate::Node;

/// Flat, order-preserving collection of the nodes taking part in the
/// simulation.
///
/// Membership lives here; spatial legality is the world's concern, so a bare
/// network accepts any position.
#[derive(Clone, Debug, Default)]
pub struct Network {
    nodes: Vec<Node>,
    range_policy: RangePolicy,
}

impl Network {
    /// Creates an empty network that uses asymmetric range semantics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty network that uses the provided range semantics.
    #[must_use]
    pub fn with_range_policy(range_policy: RangePolicy) -> Self {
        Self {
            nodes: Vec::new(),
            range_policy,
        }
    }

    /// Rule used when recomputing neighbor lists.
    #[must_use]
    pub const fn range_policy(&self) -> RangePolicy {
        self.range_policy
    }

    /// Nodes in roster order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes in the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Reports whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reports whether a node with the identifier is in the roster.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.index_of(id).is_some()
    }

    /// Looks up a node by identifier.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    /// Returns the node standing on the provided cell, if any.
    #[must_use]
    pub fn node_at(&self, position: Position) -> Option<&Node> {
        self.nodes.iter().find(|node| node.position() == position)
    }

    /// Appends a node to the roster.
    ///
    /// Identifiers are unique: re-adding an identifier that is already present
    /// is rejected and leaves the roster unchanged.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, MembershipError> {
        let id = node.id();
        if self.contains(id) {
            log::warn!(
                "Refused to add {} ({}): id already in network",
                node.name(),
                id
            );
            return Err(MembershipError::Duplicate);
        }

        log::info!(
            "Node added to network: {} at position {}",
            node.name(),
            node.position()
        );
        self.nodes.push(node);
        Ok(id)
    }

    /// Removes a node from the roster and hands it back to the caller.
    ///
    /// Other nodes keep the removed identifier in their neighbor lists until
    /// the next [`Network::update_neighbors`].
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, MembershipError> {
        let Some(index) = self.index_of(id) else {
            log::warn!("Tried to remove node not in network: {id}");
            return Err(MembershipError::NotFound);
        };

        let node = self.nodes.remove(index);
        log::info!("Node removed from network: {}", node.name());
        Ok(node)
    }

    /// Flips a node's participation flag; takes effect on the next
    /// recomputation.
    pub fn set_adhoc_enabled(&mut self, id: NodeId, enabled: bool) -> Result<(), MembershipError> {
        let node = self.node_mut(id).ok_or(MembershipError::NotFound)?;
        node.set_adhoc_enabled(enabled);
        log::info!(
            "{} ad hoc participation {}",
            node.name(),
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Recomputes every node's neighbor list from scratch.
    ///
    /// A node lists every other participating node the range policy admits,
    /// in roster order. Nodes with ad hoc participation disabled neither list
    /// nor appear in any list.
    pub fn update_neighbors(&mut self) {
        let lists: Vec<Vec<NodeId>> = self
            .nodes
            .iter()
            .map(|node| self.neighbors_of(node))
            .collect();

        for (node, neighbors) in self.nodes.iter_mut().zip(lists) {
            node.replace_neighbors(neighbors);
        }
        log::debug!("Neighbor lists updated for {} nodes", self.nodes.len());
    }

    /// Reports whether `b` lies within `a`'s communication range.
    ///
    /// Only `a`'s range is consulted, so the relation is asymmetric whenever
    /// the two ranges differ.
    #[must_use]
    pub fn in_range(a: &Node, b: &Node) -> bool {
        a.range().covers(a.position().distance(b.position()))
    }

    /// Moves a node without legality checks, then recomputes the topology.
    pub fn move_node(&mut self, id: NodeId, position: Position) -> Result<(), MembershipError> {
        let node = self.node_mut(id).ok_or(MembershipError::NotFound)?;
        node.move_to(position);
        self.update_neighbors();
        Ok(())
    }

    /// Delivers a message from `sender` to `target`.
    ///
    /// Both must be in the roster and `target` must appear in `sender`'s
    /// neighbor list as last computed. Otherwise the message is dropped.
    pub fn send_message(
        &mut self,
        sender: NodeId,
        target: NodeId,
        text: impl Into<String>,
    ) -> Result<(), DeliveryError> {
        let text = text.into();
        let Some(sender_node) = self.node(sender) else {
            log::warn!("Message from {sender} to {target} dropped: sender not in network");
            return Err(DeliveryError::SenderNotFound);
        };
        let sender_name = sender_node.name().to_owned();
        let is_neighbor = sender_node.neighbors().contains(&target);

        let Some(target_node) = self.node_mut(target) else {
            log::warn!("Message from {sender_name} to {target} dropped: target not in network");
            return Err(DeliveryError::TargetNotFound);
        };

        if !is_neighbor {
            log::warn!(
                "{} is not a neighbor of {sender_name}; message not delivered",
                target_node.name()
            );
            return Err(DeliveryError::NotNeighbor);
        }

        log::info!(
            "{sender_name} sends message to {}: {text:?}",
            target_node.name()
        );
        target_node.receive_message(sender, text);
        Ok(())
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id() == id)
    }

    fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id() == id)
    }

    fn neighbors_of(&self, node: &Node) -> Vec<NodeId> {
        if !node.adhoc_enabled() {
            return Vec::new();
        }

        self.nodes
            .iter()
            .filter(|other| other.id() != node.id() && other.adhoc_enabled())
            .filter(|other| admits(self.range_policy, node, other))
            .map(Node::id)
            .collect()
    }
}

fn admits(policy: RangePolicy, evaluator: &Node, candidate: &Node) -> bool {
    match policy {
        RangePolicy::Asymmetric => Network::in_range(evaluator, candidate),
        RangePolicy::Symmetric => {
            Network::in_range(evaluator, candidate) && Network::in_range(candidate, evaluator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manet_core::{CommRange, Message};

    fn node(id: u32, x: i32, y: i32, range: f64) -> Node {
        Node::new(NodeId::new(id), format!("node-{id}"), Position::new(x, y))
            .with_range(CommRange::new(range).expect("range"))
    }

    fn network_with(nodes: Vec<Node>) -> Network {
        let mut network = Network::new();
        for node in nodes {
            let _ = network.add_node(node).expect("add node");
        }
        network
    }

    #[test]
    fn in_range_uses_only_the_evaluating_range() {
        let a = node(1, 0, 0, 5.0);
        let b = node(2, 3, 0, 1.0);
        assert!(Network::in_range(&a, &b));
        assert!(!Network::in_range(&b, &a));
    }

    #[test]
    fn asymmetric_ranges_produce_one_sided_neighbors() {
        let mut network = network_with(vec![node(1, 0, 0, 5.0), node(2, 3, 0, 1.0)]);
        network.update_neighbors();

        assert_eq!(network.node(NodeId::new(1)).expect("a").neighbors(), &[NodeId::new(2)]);
        assert!(network.node(NodeId::new(2)).expect("b").neighbors().is_empty());
    }

    #[test]
    fn symmetric_policy_requires_mutual_range() {
        let mut network = Network::with_range_policy(RangePolicy::Symmetric);
        let _ = network.add_node(node(1, 0, 0, 5.0)).expect("add");
        let _ = network.add_node(node(2, 3, 0, 1.0)).expect("add");
        let _ = network.add_node(node(3, 0, 2, 2.0)).expect("add");
        network.update_neighbors();

        assert_eq!(network.node(NodeId::new(1)).expect("a").neighbors(), &[NodeId::new(3)]);
        assert!(network.node(NodeId::new(2)).expect("b").neighbors().is_empty());
        assert_eq!(network.node(NodeId::new(3)).expect("c").neighbors(), &[NodeId::new(1)]);
    }

    #[test]
    fn neighbors_follow_roster_order() {
        let mut network = network_with(vec![
            node(5, 0, 0, 10.0),
            node(9, 1, 0, 10.0),
            node(2, 2, 0, 10.0),
        ]);
        network.update_neighbors();

        assert_eq!(
            network.node(NodeId::new(9)).expect("node").neighbors(),
            &[NodeId::new(5), NodeId::new(2)]
        );
    }

    #[test]
    fn duplicate_id_is_rejected_without_mutation() {
        let mut network = network_with(vec![node(1, 0, 0, 1.0)]);
        let result = network.add_node(node(1, 4, 4, 1.0));

        assert_eq!(result, Err(MembershipError::Duplicate));
        assert_eq!(network.len(), 1);
        assert_eq!(network.nodes()[0].position(), Position::new(0, 0));
    }

    #[test]
    fn removing_twice_reports_not_found() {
        let mut network = network_with(vec![node(1, 0, 0, 1.0), node(2, 1, 0, 1.0)]);

        let removed = network.remove_node(NodeId::new(1)).expect("first removal");
        assert_eq!(removed.id(), NodeId::new(1));
        assert_eq!(
            network.remove_node(NodeId::new(1)).map(|node| node.id()),
            Err(MembershipError::NotFound)
        );
        assert_eq!(network.len(), 1);
    }

    #[test]
    fn removed_node_lingers_in_neighbor_lists_until_recompute() {
        let mut network = network_with(vec![node(1, 0, 0, 3.0), node(2, 1, 0, 3.0)]);
        network.update_neighbors();
        let _ = network.remove_node(NodeId::new(2)).expect("remove");

        assert_eq!(network.node(NodeId::new(1)).expect("node").neighbors(), &[NodeId::new(2)]);
        network.update_neighbors();
        assert!(network.node(NodeId::new(1)).expect("node").neighbors().is_empty());
    }

    #[test]
    fn adhoc_toggle_takes_effect_on_next_recompute() {
        let mut network = network_with(vec![node(1, 0, 0, 3.0), node(2, 1, 0, 3.0)]);
        network.update_neighbors();

        network.set_adhoc_enabled(NodeId::new(2), false).expect("toggle");
        assert_eq!(network.node(NodeId::new(1)).expect("node").neighbors(), &[NodeId::new(2)]);

        network.update_neighbors();
        assert!(network.node(NodeId::new(1)).expect("node").neighbors().is_empty());
        assert!(network.node(NodeId::new(2)).expect("node").neighbors().is_empty());
        assert_eq!(
            network.send_message(NodeId::new(1), NodeId::new(2), "hello"),
            Err(DeliveryError::NotNeighbor)
        );
    }

    #[test]
    fn toggling_an_unknown_node_reports_not_found() {
        let mut network = Network::new();
        assert_eq!(
            network.set_adhoc_enabled(NodeId::new(1), false),
            Err(MembershipError::NotFound)
        );
    }

    #[test]
    fn move_node_recomputes_topology() {
        let mut network = network_with(vec![node(1, 0, 0, 2.0), node(2, 8, 8, 2.0)]);
        network.update_neighbors();
        assert!(network.node(NodeId::new(1)).expect("node").neighbors().is_empty());

        network.move_node(NodeId::new(2), Position::new(1, 1)).expect("move");
        assert_eq!(network.node(NodeId::new(1)).expect("node").neighbors(), &[NodeId::new(2)]);
        assert_eq!(
            network.move_node(NodeId::new(7), Position::new(0, 1)),
            Err(MembershipError::NotFound)
        );
    }

    #[test]
    fn delivery_errors_name_the_failing_precondition() {
        let mut network = network_with(vec![node(1, 0, 0, 1.0), node(2, 5, 5, 1.0)]);
        network.update_neighbors();

        assert_eq!(
            network.send_message(NodeId::new(9), NodeId::new(2), "x"),
            Err(DeliveryError::SenderNotFound)
        );
        assert_eq!(
            network.send_message(NodeId::new(1), NodeId::new(9), "x"),
            Err(DeliveryError::TargetNotFound)
        );
        assert_eq!(
            network.send_message(NodeId::new(1), NodeId::new(2), "x"),
            Err(DeliveryError::NotNeighbor)
        );
        assert_eq!(
            network.send_message(NodeId::new(1), NodeId::new(1), "x"),
            Err(DeliveryError::NotNeighbor)
        );
        assert!(network.node(NodeId::new(2)).expect("node").inbox().is_empty());
    }

    #[test]
    fn delivery_uses_the_sender_perspective() {
        let mut network = network_with(vec![node(1, 0, 0, 5.0), node(2, 3, 0, 1.0)]);
        network.update_neighbors();

        network
            .send_message(NodeId::new(1), NodeId::new(2), "ping")
            .expect("in range from sender");
        assert_eq!(
            network.send_message(NodeId::new(2), NodeId::new(1), "pong"),
            Err(DeliveryError::NotNeighbor)
        );
        assert_eq!(
            network.node(NodeId::new(2)).expect("node").inbox(),
            &[Message::new(NodeId::new(1), "ping")]
        );
        assert!(network.node(NodeId::new(1)).expect("node").inbox().is_empty());
    }
}
