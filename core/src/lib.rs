#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the MANET simulation engine.
//!
//! This crate defines the value types and the message surface that connect
//! adapters with the authoritative world. Adapters either call the world's
//! methods directly or submit [`Command`] values describing desired mutations;
//! the world executes them via its `apply` entry point and broadcasts
//! [`Event`] values that describe what happened, rejections included.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Communication range assigned to nodes constructed without an explicit one.
///
/// Deliberately generous so that a node with the default range sees every
/// other node on any grid of practical size.
pub const DEFAULT_COMM_RANGE: CommRange = CommRange(100.0);

/// Color assigned to nodes constructed without an explicit one.
pub const DEFAULT_NODE_COLOR: NodeColor = NodeColor::from_rgb(0xff, 0x00, 0x00);

/// Unique identifier assigned to a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a new node identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a single grid cell.
///
/// Coordinates are signed so that callers can describe cells outside the
/// grid (for example `(-1, -1)`); the world decides whether a position is
/// legal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: i32,
    y: i32,
}

impl Position {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the position shifted by the provided deltas, or `None` when the
    /// result does not fit the coordinate type.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }

    /// Euclidean distance between two positions.
    #[must_use]
    pub fn distance(self, other: Position) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }

    /// Largest per-axis difference between two positions.
    ///
    /// A single tick moves a node by a Chebyshev distance of at most one.
    #[must_use]
    pub fn chebyshev_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dimensions of the bounded world grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    width: u32,
    height: u32,
}

impl GridSize {
    /// Creates a grid description, rejecting zero-sized dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::ZeroDimension { width, height });
        }
        Ok(Self { width, height })
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the position lies within `[0, width) x [0, height)`.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        let x = i64::from(position.x());
        let y = i64::from(position.y());
        (0..i64::from(self.width)).contains(&x) && (0..i64::from(self.height)).contains(&y)
    }
}

/// Euclidean radius within which a node can see and reach other nodes.
///
/// Always finite and non-negative.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct CommRange(f64);

impl CommRange {
    /// Validates and wraps a communication radius.
    pub fn new(radius: f64) -> Result<Self, InvalidRange> {
        if radius.is_finite() && radius >= 0.0 {
            Ok(Self(radius))
        } else {
            Err(InvalidRange(radius))
        }
    }

    /// Radius expressed in grid cells.
    #[must_use]
    pub const fn get(&self) -> f64 {
        self.0
    }

    /// Reports whether a target at `distance` lies within the radius.
    #[must_use]
    pub fn covers(&self, distance: f64) -> bool {
        distance <= self.0
    }
}

impl Default for CommRange {
    fn default() -> Self {
        DEFAULT_COMM_RANGE
    }
}

impl TryFrom<f64> for CommRange {
    type Error = InvalidRange;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommRange> for f64 {
    fn from(range: CommRange) -> Self {
        range.0
    }
}

/// Visual metadata attached to a node. The engine never reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl NodeColor {
    /// Creates a new node color from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the color.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the color.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the color.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

impl Default for NodeColor {
    fn default() -> Self {
        DEFAULT_NODE_COLOR
    }
}

impl fmt::Display for NodeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl FromStr for NodeColor {
    type Err = InvalidColor;

    /// Parses `#rrggbb` hex notation.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidColor(value.to_owned());
        let digits = value.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };
        Ok(Self::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for NodeColor {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeColor> for String {
    fn from(color: NodeColor) -> Self {
        color.to_string()
    }
}

/// Message stored in a node's inbox.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    sender: NodeId,
    text: String,
}

impl Message {
    /// Creates a message attributed to the provided sender.
    #[must_use]
    pub fn new(sender: NodeId, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }

    /// Identifier of the node that sent the message.
    #[must_use]
    pub const fn sender(&self) -> NodeId {
        self.sender
    }

    /// Message payload, delivered untouched.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Rule deciding whether a node lists another node as its neighbor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    /// Only the evaluating node's range counts, so A may list B while B does
    /// not list A.
    #[default]
    Asymmetric,
    /// Both nodes must be within each other's range.
    Symmetric,
}

/// Construction record for a node, shared by commands and scenario files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Identifier that must be unique within the network.
    pub id: NodeId,
    /// Human readable display name.
    pub name: String,
    /// Initial grid position.
    pub position: Position,
    /// Communication range; [`DEFAULT_COMM_RANGE`] when omitted.
    #[serde(default)]
    pub range: Option<CommRange>,
    /// Display color; [`DEFAULT_NODE_COLOR`] when omitted.
    #[serde(default)]
    pub color: Option<NodeColor>,
}

impl NodeSpec {
    /// Creates a construction record that uses the default range and color.
    #[must_use]
    pub fn new(id: NodeId, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            range: None,
            color: None,
        }
    }

    /// Overrides the communication range.
    #[must_use]
    pub fn with_range(mut self, range: CommRange) -> Self {
        self.range = Some(range);
        self
    }
}

/// Transition of a single node within one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Node that was planned to move.
    pub node: NodeId,
    /// Cell the node occupied before the tick.
    pub from: Position,
    /// Cell the node occupies once the tick is committed.
    pub to: Position,
}

impl MoveRecord {
    /// Reports whether the node changes cells.
    #[must_use]
    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Places a new node into the world.
    AddNode {
        /// Construction record for the node.
        spec: NodeSpec,
    },
    /// Removes a node from the network roster.
    RemoveNode {
        /// Identifier of the node to remove.
        node: NodeId,
    },
    /// Marks a cell as impassable.
    AddWall {
        /// Cell to mark.
        cell: Position,
    },
    /// Moves a single node to a specific legal cell.
    MoveNode {
        /// Identifier of the node to move.
        node: NodeId,
        /// Destination cell.
        to: Position,
    },
    /// Advances the simulation by one tick.
    Step,
    /// Recomputes every neighbor list without moving nodes.
    UpdateNeighbors,
    /// Sends a point-to-point message.
    SendMessage {
        /// Node sending the message.
        sender: NodeId,
        /// Node expected to receive the message.
        target: NodeId,
        /// Payload delivered untouched.
        text: String,
    },
    /// Flips a node's ad hoc participation flag.
    SetAdhoc {
        /// Identifier of the node to update.
        node: NodeId,
        /// Whether the node should take part in the ad hoc network.
        enabled: bool,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Confirms that a node joined the world.
    NodeAdded {
        /// Identifier of the new node.
        node: NodeId,
        /// Cell the node occupies.
        position: Position,
    },
    /// Reports that a node placement request was rejected.
    PlacementRejected {
        /// Identifier carried by the rejected node.
        node: NodeId,
        /// Requested cell.
        position: Position,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a node left the roster.
    NodeRemoved {
        /// Identifier of the removed node.
        node: NodeId,
    },
    /// Reports that a command referenced a node outside the roster.
    MembershipRejected {
        /// Identifier that could not be resolved.
        node: NodeId,
        /// Specific reason the request failed.
        reason: MembershipError,
    },
    /// Confirms that a wall was added.
    WallAdded {
        /// Cell that became impassable.
        cell: Position,
    },
    /// Reports that an out-of-bounds wall was ignored.
    WallIgnored {
        /// Cell that was requested.
        cell: Position,
    },
    /// Confirms that a node changed cells.
    NodeMoved {
        /// Identifier of the node that moved.
        node: NodeId,
        /// Cell occupied before moving.
        from: Position,
        /// Cell occupied after moving.
        to: Position,
    },
    /// Reports that a single-node move request was rejected.
    MoveRejected {
        /// Identifier of the node that was asked to move.
        node: NodeId,
        /// Requested destination.
        to: Position,
        /// Specific reason the move failed.
        reason: MoveError,
    },
    /// Announces that a tick was planned, applied and its topology recomputed.
    TickCompleted {
        /// Number of ticks completed so far.
        tick: u64,
    },
    /// Announces that every neighbor list was recomputed.
    NeighborsUpdated,
    /// Confirms that a message reached its target's inbox.
    MessageDelivered {
        /// Node that sent the message.
        sender: NodeId,
        /// Node that received the message.
        target: NodeId,
    },
    /// Reports that a message was dropped.
    DeliveryFailed {
        /// Node that attempted to send.
        sender: NodeId,
        /// Intended recipient.
        target: NodeId,
        /// Specific reason delivery failed.
        reason: DeliveryError,
    },
    /// Confirms that a node's participation flag changed.
    AdhocChanged {
        /// Identifier of the updated node.
        node: NodeId,
        /// New participation state.
        enabled: bool,
    },
}

/// Immutable representation of a single node's state used for queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Unique identifier assigned to the node.
    pub id: NodeId,
    /// Display name of the node.
    pub name: String,
    /// Grid cell currently occupied by the node.
    pub position: Position,
    /// Communication range of the node.
    pub range: CommRange,
    /// Whether the node participates in the ad hoc network.
    pub adhoc_enabled: bool,
    /// Neighbors as of the last topology recomputation, in roster order.
    pub neighbors: Vec<NodeId>,
    /// Messages received so far, oldest first.
    pub inbox: Vec<Message>,
}

/// Read-only snapshot describing every node in roster order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    snapshots: Vec<NodeSnapshot>,
}

impl NodeView {
    /// Creates a new node view from snapshots already in roster order.
    #[must_use]
    pub fn from_snapshots(snapshots: Vec<NodeSnapshot>) -> Self {
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a specific node.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == id)
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<NodeSnapshot> {
        self.snapshots
    }
}

/// Reasons a node placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The requested cell lies outside the grid.
    #[error("position lies outside the grid")]
    OutOfBounds,
    /// The requested cell holds a wall or another node.
    #[error("position is occupied by a wall or another node")]
    Occupied,
    /// A node with the same identifier is already in the network.
    #[error("a node with this id is already in the network")]
    DuplicateId,
}

/// Reasons a roster lookup may fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum MembershipError {
    /// No node with the provided identifier is in the roster.
    #[error("node is not in the network")]
    NotFound,
    /// A node with the provided identifier is already in the roster.
    #[error("node is already in the network")]
    Duplicate,
}

/// Reasons a message may be dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum DeliveryError {
    /// The sender is not in the roster.
    #[error("sender is not in the network")]
    SenderNotFound,
    /// The target is not in the roster.
    #[error("target is not in the network")]
    TargetNotFound,
    /// The target is not currently a neighbor of the sender.
    #[error("target is not a neighbor of the sender")]
    NotNeighbor,
}

/// Reasons a single-node move may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum MoveError {
    /// No node with the provided identifier is in the roster.
    #[error("node is not in the network")]
    NotFound,
    /// The destination lies outside the grid.
    #[error("destination lies outside the grid")]
    OutOfBounds,
    /// The destination holds a wall or another node.
    #[error("destination is occupied by a wall or another node")]
    Blocked,
}

/// Reasons a move plan may be refused at commit time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum StepError {
    /// The world changed between planning and committing.
    #[error("move plan no longer matches the world state")]
    StalePlan,
}

/// Reasons a grid description may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum GridError {
    /// Width or height was zero.
    #[error("grid dimensions must be positive, got {width}x{height}")]
    ZeroDimension {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}

/// Communication radius that is negative, infinite or NaN.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
#[error("communication range must be finite and non-negative, got {0}")]
pub struct InvalidRange(pub f64);

/// Color string that is not `#rrggbb` hex notation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("expected a #rrggbb color, got `{0}`")]
pub struct InvalidColor(pub String);
