//! Neighbor table for the 19-position board.
//!
//! Positions are numbered center first, then the inner ring clockwise (1-6),
//! then the outer ring clockwise (7-18). The outer ring alternates between
//! edge hexes touching two inner-ring hexes (4 neighbors) and corner hexes
//! touching one (3 neighbors).
//!
//! The table is written out rather than computed from coordinates: the light
//! wiring follows this numbering, and an off-by-one in a derived table would
//! go unnoticed.

/// Number of positions on the board
pub const POSITION_COUNT: usize = 19;

/// The center position, always the desert
pub const CENTER: usize = 0;

const NEIGHBORS: [&[usize]; POSITION_COUNT] = [
    &[1, 2, 3, 4, 5, 6],
    // Inner ring
    &[0, 2, 6, 7, 8, 9],
    &[0, 1, 3, 9, 10, 11],
    &[0, 2, 4, 11, 12, 13],
    &[0, 3, 5, 13, 14, 15],
    &[0, 4, 6, 15, 16, 17],
    &[0, 1, 5, 17, 18, 7],
    // Outer ring
    &[1, 6, 8, 18],
    &[1, 7, 9],
    &[1, 2, 8, 10],
    &[2, 9, 11],
    &[2, 3, 10, 12],
    &[3, 11, 13],
    &[3, 4, 12, 14],
    &[4, 13, 15],
    &[4, 5, 14, 16],
    &[5, 15, 17],
    &[5, 6, 16, 18],
    &[6, 7, 17],
];

/// Static adjacency between board positions
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacencyGraph;

impl AdjacencyGraph {
    /// The graph for the standard 19-hex board
    pub const fn standard() -> Self {
        AdjacencyGraph
    }

    /// Neighbors of a position. Positions off the board have none.
    pub fn neighbors_of(&self, position: usize) -> &'static [usize] {
        NEIGHBORS.get(position).copied().unwrap_or(&[])
    }

    /// Whether two positions share an edge
    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        self.neighbors_of(a).contains(&b)
    }

    /// True iff some position whose value is in `high_values` has a neighbor
    /// whose value is also in `high_values`.
    ///
    /// `values[i]` is the number token at position `i`; `None` never matches.
    pub fn is_constraint_violated(&self, values: &[Option<u8>], high_values: &[u8]) -> bool {
        let is_high = |position: usize| {
            values
                .get(position)
                .copied()
                .flatten()
                .is_some_and(|v| high_values.contains(&v))
        };

        (0..values.len())
            .filter(|&p| is_high(p))
            .any(|p| self.neighbors_of(p).iter().any(|&n| is_high(n)))
    }
}
