//! TOML scenario files describing the grid, walls, nodes and scripted
//! messages.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use manet_core::{CommRange, Command, Event, NodeColor, NodeId, NodeSpec, Position, RangePolicy};
use manet_world::{self as world, World};
use rand::Rng;
use serde::Deserialize;

const DEFAULT_TICKS: u64 = 10;

/// Complete description of a simulation run.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Number of grid columns.
    pub(crate) width: u32,
    /// Number of grid rows.
    pub(crate) height: u32,
    /// Seed for the movement generator.
    #[serde(default)]
    pub(crate) seed: u64,
    /// Number of ticks to simulate.
    #[serde(default = "default_ticks")]
    pub(crate) ticks: u64,
    /// Neighbor rule applied by the network.
    #[serde(default)]
    pub(crate) range_policy: RangePolicy,
    /// Impassable cells; out-of-bounds entries are ignored.
    #[serde(default)]
    pub(crate) walls: Vec<Position>,
    /// Nodes placed in order; rejected placements are logged and skipped.
    #[serde(default)]
    pub(crate) nodes: Vec<NodeSpec>,
    /// Messages sent once the given number of ticks completed.
    #[serde(default)]
    pub(crate) messages: Vec<ScheduledMessage>,
}

/// Message sent by the driver after `tick` ticks have completed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScheduledMessage {
    /// Number of completed ticks before the message is sent.
    pub(crate) tick: u64,
    /// Sending node.
    pub(crate) sender: NodeId,
    /// Receiving node.
    pub(crate) target: NodeId,
    /// Payload.
    pub(crate) text: String,
}

fn default_ticks() -> u64 {
    DEFAULT_TICKS
}

impl Scenario {
    /// Reads and validates a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario in {}", path.display()))
    }

    /// Parses and validates scenario contents.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Scenario =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Two nodes next to a wall, exchanging a greeting, plus a long-range
    /// node that sees everyone.
    pub(crate) fn demo() -> Self {
        let short = CommRange::new(2.0).unwrap_or_default();
        let mut tablet = NodeSpec::new(NodeId::new(3), "Tablet", Position::new(8, 7));
        tablet.color = Some(NodeColor::from_rgb(0x00, 0x80, 0x00));

        Self {
            width: 10,
            height: 10,
            seed: 7,
            ticks: DEFAULT_TICKS,
            range_policy: RangePolicy::Asymmetric,
            walls: vec![Position::new(3, 3), Position::new(4, 3), Position::new(5, 3)],
            nodes: vec![
                NodeSpec::new(NodeId::new(1), "Dennis' iPhone", Position::new(1, 1))
                    .with_range(short),
                NodeSpec::new(NodeId::new(2), "Laptop", Position::new(2, 2)).with_range(short),
                tablet,
            ],
            messages: vec![
                ScheduledMessage {
                    tick: 0,
                    sender: NodeId::new(1),
                    target: NodeId::new(2),
                    text: "hi".to_owned(),
                },
                ScheduledMessage {
                    tick: 5,
                    sender: NodeId::new(2),
                    target: NodeId::new(3),
                    text: "anyone there?".to_owned(),
                },
                ScheduledMessage {
                    tick: 5,
                    sender: NodeId::new(3),
                    target: NodeId::new(1),
                    text: "loud and clear".to_owned(),
                },
            ],
        }
    }

    /// Builds the world, placing walls before nodes, and computes the initial
    /// topology.
    pub(crate) fn build_world<R>(&self, rng: &mut R) -> Result<World>
    where
        R: Rng + ?Sized,
    {
        let mut world = World::with_range_policy(self.width, self.height, self.range_policy)
            .context("scenario grid is invalid")?;

        let mut commands: Vec<Command> = self
            .walls
            .iter()
            .map(|cell| Command::AddWall { cell: *cell })
            .collect();
        commands.extend(
            self.nodes
                .iter()
                .cloned()
                .map(|spec| Command::AddNode { spec }),
        );
        commands.push(Command::UpdateNeighbors);

        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut world, command, rng, &mut events);
        }
        for event in &events {
            match event {
                Event::WallIgnored { cell } => {
                    log::warn!("Scenario wall at {cell} lies outside the grid; ignored");
                }
                Event::PlacementRejected {
                    node,
                    position,
                    reason,
                } => {
                    log::warn!("Scenario node {node} at {position} skipped: {reason}");
                }
                _ => {}
            }
        }

        Ok(world)
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!(
                "grid dimensions must be positive, got {}x{}",
                self.width,
                self.height
            );
        }
        Ok(())
    }

    /// Messages scheduled after the last tick of the run.
    pub(crate) fn unreachable_messages(&self) -> impl Iterator<Item = &ScheduledMessage> {
        self.messages.iter().filter(move |message| message.tick > self.ticks)
    }

    /// Logs every message that the configured run length never reaches.
    pub(crate) fn warn_unreachable_messages(&self) {
        for message in self.unreachable_messages() {
            log::warn!(
                "Message from {} to {} scheduled after tick {} will never be sent",
                message.sender,
                message.target,
                self.ticks
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manet_world::query;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const CORRIDOR: &str = include_str!("../../../scenarios/corridor.toml");

    #[test]
    fn parses_minimal_scenario_with_defaults() {
        let scenario = Scenario::parse("width = 4\nheight = 3\n").expect("valid scenario");
        assert_eq!(scenario.width, 4);
        assert_eq!(scenario.height, 3);
        assert_eq!(scenario.seed, 0);
        assert_eq!(scenario.ticks, DEFAULT_TICKS);
        assert_eq!(scenario.range_policy, RangePolicy::Asymmetric);
        assert!(scenario.nodes.is_empty());
    }

    #[test]
    fn parses_nodes_walls_and_messages() {
        let scenario = Scenario::parse(
            r##"
            width = 10
            height = 10
            seed = 3
            ticks = 4
            range_policy = "symmetric"
            walls = [{ x = 3, y = 3 }]

            [[nodes]]
            id = 1
            name = "P"
            position = { x = 1, y = 1 }
            range = 2.0
            color = "#0000ff"

            [[nodes]]
            id = 2
            name = "Q"
            position = { x = 2, y = 2 }

            [[messages]]
            tick = 0
            sender = 1
            target = 2
            text = "hi"
            "##,
        )
        .expect("valid scenario");

        assert_eq!(scenario.range_policy, RangePolicy::Symmetric);
        assert_eq!(scenario.walls, vec![Position::new(3, 3)]);
        assert_eq!(scenario.nodes[0].range, Some(CommRange::new(2.0).expect("range")));
        assert_eq!(scenario.nodes[0].color, Some(NodeColor::from_rgb(0, 0, 0xff)));
        assert_eq!(scenario.nodes[1].range, None);
        assert_eq!(scenario.messages[0].text, "hi");
    }

    #[test]
    fn rejects_negative_range() {
        let result = Scenario::parse(
            r#"
            width = 5
            height = 5

            [[nodes]]
            id = 1
            name = "P"
            position = { x = 1, y = 1 }
            range = -1.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_sized_grid_and_unknown_fields() {
        assert!(Scenario::parse("width = 0\nheight = 3\n").is_err());
        assert!(Scenario::parse("width = 2\nheight = 3\ndepth = 1\n").is_err());
    }

    #[test]
    fn unreachable_messages_follow_the_run_length() {
        let mut scenario = Scenario::demo();
        assert_eq!(scenario.unreachable_messages().count(), 0);

        scenario.ticks = 3;
        let late: Vec<&str> = scenario
            .unreachable_messages()
            .map(|message| message.text.as_str())
            .collect();
        assert_eq!(late, vec!["anyone there?", "loud and clear"]);

        scenario.ticks = 5;
        assert_eq!(scenario.unreachable_messages().count(), 0);
    }

    #[test]
    fn build_world_skips_illegal_placements() {
        let scenario = Scenario::parse(
            r#"
            width = 5
            height = 5
            walls = [{ x = 2, y = 2 }, { x = -1, y = 0 }]

            [[nodes]]
            id = 1
            name = "on-wall"
            position = { x = 2, y = 2 }

            [[nodes]]
            id = 2
            name = "fine"
            position = { x = 0, y = 0 }
            "#,
        )
        .expect("valid scenario");

        let mut rng = ChaCha8Rng::seed_from_u64(scenario.seed);
        let world = scenario.build_world(&mut rng).expect("world");
        assert_eq!(query::walls(&world).collect::<Vec<_>>(), vec![Position::new(2, 2)]);
        assert_eq!(query::nodes(&world).len(), 1);
        assert_eq!(query::nodes(&world)[0].name(), "fine");
    }

    #[test]
    fn demo_places_every_node_and_links_the_close_pair() {
        let scenario = Scenario::demo();
        let mut rng = ChaCha8Rng::seed_from_u64(scenario.seed);
        let world = scenario.build_world(&mut rng).expect("world");

        assert_eq!(query::nodes(&world).len(), 3);
        assert_eq!(
            query::neighbor_names(&world, NodeId::new(1)),
            Some(vec!["Laptop"])
        );
    }

    #[test]
    fn shipped_corridor_scenario_is_valid() {
        let scenario = Scenario::parse(CORRIDOR).expect("corridor scenario parses");
        let mut rng = ChaCha8Rng::seed_from_u64(scenario.seed);
        let world = scenario.build_world(&mut rng).expect("world");
        assert_eq!(query::nodes(&world).len(), scenario.nodes.len());
    }
}
