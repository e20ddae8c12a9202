//! Device entity tracked by the network roster.

use std::fmt;

use manet_core::{CommRange, Message, NodeColor, NodeId, NodeSpec, Position};

/// Simulated device with a position, a communication range and an inbox.
///
/// Neighbor entries are identifiers into the owning network's roster rather
/// than references, so removing a node never invalidates another node's list;
/// a stale identifier simply lingers until the next recomputation.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    id: NodeId,
    name: String,
    position: Position,
    range: CommRange,
    neighbors: Vec<NodeId>,
    inbox: Vec<Message>,
    adhoc_enabled: bool,
    base_color: NodeColor,
    display_color: NodeColor,
}

impl Node {
    /// Creates a node that uses the default communication range and color.
    #[must_use]
    pub fn new(id: NodeId, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            range: CommRange::default(),
            neighbors: Vec::new(),
            inbox: Vec::new(),
            adhoc_enabled: true,
            base_color: NodeColor::default(),
            display_color: NodeColor::default(),
        }
    }

    /// Overrides the communication range.
    #[must_use]
    pub fn with_range(mut self, range: CommRange) -> Self {
        self.range = range;
        self
    }

    /// Overrides both the base and the display color.
    #[must_use]
    pub fn with_color(mut self, color: NodeColor) -> Self {
        self.base_color = color;
        self.display_color = color;
        self
    }

    /// Identifier of the node.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Display name of the node.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid cell currently occupied by the node.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Communication range of the node.
    #[must_use]
    pub const fn range(&self) -> CommRange {
        self.range
    }

    /// Neighbors as of the last topology recomputation, in roster order.
    #[must_use]
    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    /// Messages received so far, oldest first.
    #[must_use]
    pub fn inbox(&self) -> &[Message] {
        &self.inbox
    }

    /// Whether the node currently takes part in the ad hoc network.
    #[must_use]
    pub const fn adhoc_enabled(&self) -> bool {
        self.adhoc_enabled
    }

    /// Flips ad hoc participation. Neighbor lists only reflect the change
    /// after the next recomputation.
    pub fn set_adhoc_enabled(&mut self, enabled: bool) {
        self.adhoc_enabled = enabled;
    }

    /// Color assigned at construction.
    #[must_use]
    pub const fn base_color(&self) -> NodeColor {
        self.base_color
    }

    /// Color a view layer should currently draw.
    #[must_use]
    pub const fn display_color(&self) -> NodeColor {
        self.display_color
    }

    /// Temporarily recolors the node, e.g. to highlight it.
    pub fn set_display_color(&mut self, color: NodeColor) {
        self.display_color = color;
    }

    /// Restores the display color to the base color.
    pub fn reset_display_color(&mut self) {
        self.display_color = self.base_color;
    }

    /// Overwrites the node's position. Callers enforce legality.
    pub fn move_to(&mut self, position: Position) {
        log::debug!("{} moved from {} to {}", self.name, self.position, position);
        self.position = position;
    }

    /// Appends a message to the inbox.
    pub fn receive_message(&mut self, sender: NodeId, text: impl Into<String>) {
        self.inbox.push(Message::new(sender, text));
    }

    pub(crate) fn replace_neighbors(&mut self, neighbors: Vec<NodeId>) {
        self.neighbors = neighbors;
    }
}

impl From<NodeSpec> for Node {
    fn from(spec: NodeSpec) -> Self {
        let node = Node::new(spec.id, spec.name, spec.position)
            .with_range(spec.range.unwrap_or_default());
        match spec.color {
            Some(color) => node.with_color(color),
            None => node,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node: {} at position: {}", self.id, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manet_core::{DEFAULT_COMM_RANGE, DEFAULT_NODE_COLOR};

    #[test]
    fn new_node_uses_defaults() {
        let node = Node::new(NodeId::new(1), "Dennis' iPhone", Position::new(1, 2));
        assert_eq!(node.range(), DEFAULT_COMM_RANGE);
        assert_eq!(node.base_color(), DEFAULT_NODE_COLOR);
        assert!(node.adhoc_enabled());
        assert!(node.neighbors().is_empty());
        assert!(node.inbox().is_empty());
    }

    #[test]
    fn receive_message_appends_in_order() {
        let mut node = Node::new(NodeId::new(1), "Laptop", Position::new(0, 0));
        node.receive_message(NodeId::new(2), "first");
        node.receive_message(NodeId::new(3), "second");

        let inbox = node.inbox();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0], Message::new(NodeId::new(2), "first"));
        assert_eq!(inbox[1], Message::new(NodeId::new(3), "second"));
    }

    #[test]
    fn move_to_overwrites_position_unconditionally() {
        let mut node = Node::new(NodeId::new(1), "Tablet", Position::new(0, 0));
        node.move_to(Position::new(-5, 40));
        assert_eq!(node.position(), Position::new(-5, 40));
    }

    #[test]
    fn display_color_resets_to_base() {
        let mut node = Node::new(NodeId::new(1), "Tablet", Position::new(0, 0))
            .with_color(NodeColor::from_rgb(0, 0, 0xff));
        node.set_display_color(NodeColor::from_rgb(0xff, 0xff, 0));
        assert_eq!(node.display_color(), NodeColor::from_rgb(0xff, 0xff, 0));
        node.reset_display_color();
        assert_eq!(node.display_color(), NodeColor::from_rgb(0, 0, 0xff));
    }

    #[test]
    fn display_matches_summary_format() {
        let node = Node::new(NodeId::new(7), "Laptop", Position::new(3, 4));
        assert_eq!(node.to_string(), "Node: 7 at position: (3, 4)");
    }

    #[test]
    fn spec_conversion_keeps_range_and_color() {
        let spec = NodeSpec {
            id: NodeId::new(4),
            name: "Phone".to_owned(),
            position: Position::new(2, 2),
            range: Some(CommRange::new(3.0).expect("range")),
            color: Some(NodeColor::from_rgb(1, 2, 3)),
        };
        let node = Node::from(spec);
        assert_eq!(node.range().get(), 3.0);
        assert_eq!(node.display_color(), NodeColor::from_rgb(1, 2, 3));
    }
}
