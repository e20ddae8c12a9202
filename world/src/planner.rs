//! Greedy single-pass planner for simultaneous, collision-free moves.

use std::collections::{BTreeSet, HashSet};

use manet_core::{GridSize, MoveRecord, Position};
use rand::{seq::SliceRandom, Rng};

use crate::Node;

/// The eight grid-adjacent offsets: orthogonal neighbors and diagonals.
const ADJACENT_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Plans one destination per node, in roster order.
///
/// The reservation set starts with every node's current cell, so a node that
/// has not been processed yet keeps its cell protected, and vacated cells are
/// never reused within the same tick. Each chosen destination is reserved
/// before the next node is processed.
pub(crate) fn plan_moves<R>(
    grid: GridSize,
    walls: &BTreeSet<Position>,
    nodes: &[Node],
    rng: &mut R,
) -> Vec<MoveRecord>
where
    R: Rng + ?Sized,
{
    let mut reservations = ReservationSet::seeded(nodes.iter().map(Node::position));
    let mut moves = Vec::with_capacity(nodes.len());

    for node in nodes {
        let from = node.position();
        let destination = first_open_cell(from, 1, rng, |cell| {
            grid.contains(cell) && !walls.contains(&cell) && !reservations.is_reserved(cell)
        });

        let to = match destination {
            Some(cell) => {
                reservations.reserve(cell);
                cell
            }
            None => from,
        };
        moves.push(MoveRecord {
            node: node.id(),
            from,
            to,
        });
    }

    moves
}

/// Shuffles the adjacent offsets scaled by `step` and returns the first cell
/// accepted by `is_open`.
pub(crate) fn first_open_cell<R, F>(
    from: Position,
    step: i32,
    rng: &mut R,
    is_open: F,
) -> Option<Position>
where
    R: Rng + ?Sized,
    F: Fn(Position) -> bool,
{
    let mut offsets = ADJACENT_OFFSETS;
    offsets.shuffle(rng);

    offsets
        .into_iter()
        .filter_map(|(dx, dy)| from.offset(dx.checked_mul(step)?, dy.checked_mul(step)?))
        .find(|cell| is_open(*cell))
}

#[derive(Debug, Default)]
struct ReservationSet {
    cells: HashSet<Position>,
}

impl ReservationSet {
    fn seeded(cells: impl Iterator<Item = Position>) -> Self {
        Self {
            cells: cells.collect(),
        }
    }

    fn is_reserved(&self, cell: Position) -> bool {
        self.cells.contains(&cell)
    }

    fn reserve(&mut self, cell: Position) {
        let _ = self.cells.insert(cell);
    }
}
