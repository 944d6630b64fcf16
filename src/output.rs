//! Visualization output flags and element classes.
use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/// The class of element output a row of visualization data belongs to.
///
/// Models only write output for their own class.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Solid,
    HeatConduction,
    ReactionDiffusion,
}

/// Selects the groups of fields written to an output row.
///
/// Groups are always written in the order nodes, displacements, strains, stresses, extras, so
/// that the width of a row only depends on the element type and the flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputFlags(u32);

impl OutputFlags {
    pub const NONE: Self = Self(0);
    /// Physical position of the point.
    pub const NODES: Self = Self(1);
    /// Values of the state variables.
    pub const DISPLACEMENTS: Self = Self(1 << 1);
    /// Strains or field gradients.
    pub const STRAINS: Self = Self(1 << 2);
    /// Stresses or fluxes.
    pub const STRESSES: Self = Self(1 << 3);
    /// Family-specific derived quantities.
    pub const EXTRAS: Self = Self(1 << 4);
    pub const ALL: Self = Self(0b11111);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for OutputFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OutputFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Number of entries of each output group for one element type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    pub nodes: usize,
    pub displacements: usize,
    pub strains: usize,
    pub stresses: usize,
    pub extras: usize,
}

impl OutputLayout {
    /// Width of a row written with `flags`.
    pub fn row_len(&self, flags: OutputFlags) -> usize {
        [
            (OutputFlags::NODES, self.nodes),
            (OutputFlags::DISPLACEMENTS, self.displacements),
            (OutputFlags::STRAINS, self.strains),
            (OutputFlags::STRESSES, self.stresses),
            (OutputFlags::EXTRAS, self.extras),
        ]
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, len)| len)
        .sum()
    }
}

/// Sequential writer for an output row.
///
/// Each group is only written if selected by the flags; callers push all groups unconditionally.
pub struct OutputRow<'a, T> {
    data: &'a mut [T],
    flags: OutputFlags,
    len: usize,
}

impl<'a, T: Copy> OutputRow<'a, T> {
    pub fn new(data: &'a mut [T], flags: OutputFlags) -> Self {
        Self { data, flags, len: 0 }
    }

    /// Writes `values` if `group` is selected. The row must have been sized with
    /// [`OutputLayout::row_len`].
    pub fn push(&mut self, group: OutputFlags, values: impl IntoIterator<Item = T>) {
        if self.flags.contains(group) {
            for value in values {
                self.data[self.len] = value;
                self.len += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
