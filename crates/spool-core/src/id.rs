//! Strongly-typed identifiers.
//!
//! [`BufId`] and [`LinkId`] are arena slot handles. Like generational
//! handles elsewhere, they carry the arena generation they were issued in,
//! so a handle that survives an arena reset is detected in O(1) instead of
//! silently aliasing a recycled slot.

use std::fmt;

/// Identifies the owner allowed to reclaim a drained buffer into its free list.
///
/// Compared by value. A buffer without a tag is never reclaimed into any
/// owner's free list; its link goes back to the arena link pool instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerTag(pub u32);

impl fmt::Display for OwnerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for OwnerTag {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Opaque reference to an open file, compared by value.
///
/// Two file-backed buffers only coalesce when they carry the same `FileId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FileId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Index of a backing byte segment inside the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u16);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a [`Buf`](crate::Buf) descriptor stored in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct BufId {
    index: u32,
    generation: u32,
}

impl BufId {
    /// Create a handle. Only the arena should mint these.
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index within the arena's buffer table.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Arena generation this handle was issued in.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BufId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf#{}@{}", self.index, self.generation)
    }
}

/// Handle to a [`Link`](crate::Link) node stored in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct LinkId {
    index: u32,
    generation: u32,
}

impl LinkId {
    /// Create a handle. Only the arena should mint these.
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index within the arena's link table.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Arena generation this handle was issued in.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}@{}", self.index, self.generation)
    }
}
