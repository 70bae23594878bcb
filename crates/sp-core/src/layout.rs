//! Named column segments of the full concentration matrix.
//!
//! The solver emits one row per scan point with the columns laid out as
//! `[free components | auxiliary | species]`. Consumers address the segments
//! by name so a change in the auxiliary width cannot shift the others.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Free (uncomplexed) component concentrations.
    Free,
    /// Solver-internal columns, e.g. precipitated solid amounts.
    Auxiliary,
    /// Formed species concentrations.
    Species,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub nc: usize,
    pub nf: usize,
    pub ns: usize,
}

impl ColumnLayout {
    pub fn new(nc: usize, nf: usize, ns: usize) -> Self {
        Self { nc, nf, ns }
    }

    /// Column count of the full matrix.
    pub fn width(&self) -> usize {
        self.nc + self.nf + self.ns
    }

    /// Column count once the auxiliary segment is dropped.
    pub fn projected_width(&self) -> usize {
        self.nc + self.ns
    }

    pub fn range(&self, segment: Segment) -> Range<usize> {
        match segment {
            Segment::Free => 0..self.nc,
            Segment::Auxiliary => self.nc..self.nc + self.nf,
            Segment::Species => self.nc + self.nf..self.width(),
        }
    }

    /// Full-matrix column indices kept for display: free, then species.
    pub fn projected_columns(&self) -> impl Iterator<Item = usize> {
        self.range(Segment::Free).chain(self.range(Segment::Species))
    }
}
