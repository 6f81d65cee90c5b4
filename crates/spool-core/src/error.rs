//! Error types for the Spool output-chain subsystem.
//!
//! Two families: [`ArenaError`] for allocation exhaustion and handle
//! resolution inside the arena, and [`ChainError`] for chain operations,
//! which either propagate an arena failure or report a violated
//! precondition (empty chain, malformed cursors, and so on).

use std::error::Error;
use std::fmt;

use crate::id::{BufId, LinkId, SegmentId};

/// Which descriptor table hit its slot limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorKind {
    /// The buffer descriptor table.
    Buf,
    /// The chain link table.
    Link,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buf => write!(f, "buffer"),
            Self::Link => write!(f, "link"),
        }
    }
}

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// No segment can satisfy the request and no more segments may be added.
    CapacityExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Total capacity available across all segments.
        capacity: usize,
    },
    /// A descriptor table is full.
    DescriptorLimit {
        /// The table that is full.
        kind: DescriptorKind,
        /// Configured slot limit.
        limit: u32,
    },
    /// Arena configuration failed validation.
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
    /// A handle issued before the last arena reset.
    StaleHandle {
        /// The generation encoded in the handle.
        handle_generation: u32,
        /// The arena's current generation.
        current_generation: u32,
    },
    /// A buffer handle whose slot does not exist.
    UnknownBuf {
        /// The unrecognised handle.
        buf: BufId,
    },
    /// A link handle whose slot does not exist.
    UnknownLink {
        /// The unrecognised handle.
        link: LinkId,
    },
    /// A link handle that currently sits in the arena link pool.
    PooledLink {
        /// The pooled link.
        link: LinkId,
    },
    /// Attempted to write into a buffer whose memory must not change
    /// (read-only or memory-mapped content).
    NotWritable {
        /// The buffer that was not writable.
        buf: BufId,
    },
    /// The buffer has no memory region attached.
    NoMemory {
        /// The buffer without memory.
        buf: BufId,
    },
    /// A memory region that is malformed or lies outside the bytes the
    /// arena has handed out.
    InvalidRegion {
        /// Segment the region names.
        segment: SegmentId,
        /// What was wrong.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "arena capacity exceeded: requested {requested} bytes, capacity {capacity} bytes"
                )
            }
            Self::DescriptorLimit { kind, limit } => {
                write!(f, "{kind} descriptor limit of {limit} reached")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::StaleHandle {
                handle_generation,
                current_generation,
            } => {
                write!(
                    f,
                    "stale handle: generation {handle_generation}, arena at {current_generation}"
                )
            }
            Self::UnknownBuf { buf } => write!(f, "unknown buffer {buf}"),
            Self::UnknownLink { link } => write!(f, "unknown link {link}"),
            Self::PooledLink { link } => write!(f, "link {link} is in the arena link pool"),
            Self::NotWritable { buf } => write!(f, "buffer {buf} is not writable"),
            Self::NoMemory { buf } => write!(f, "buffer {buf} has no memory region"),
            Self::InvalidRegion { segment, reason } => {
                write!(f, "invalid region in segment {segment}: {reason}")
            }
        }
    }
}

impl Error for ArenaError {}

/// Errors from chain construction and bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainError {
    /// The arena could not satisfy an allocation or resolve a handle.
    Alloc(ArenaError),
    /// An operation that requires at least one link got an empty chain.
    EmptyChain,
    /// The file coalescer was handed a head buffer with no file range.
    NotFileBacked {
        /// The offending head buffer.
        buf: BufId,
    },
    /// A cursor update would break `start <= pos <= last <= end` or
    /// `file_pos <= file_last`.
    CursorInvariant {
        /// Which bound was violated.
        reason: String,
    },
    /// The file coalescer was given a zero byte limit.
    ZeroLimit,
    /// A buffer-set description with a zero count or size.
    InvalidBufs {
        /// Requested buffer count.
        num: usize,
        /// Requested per-buffer size.
        size: usize,
    },
    /// The transport reported more bytes sent than the chain holds.
    SentExceedsChain {
        /// Bytes left over after every buffer was drained.
        excess: u64,
    },
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(e) => write!(f, "allocation failed: {e}"),
            Self::EmptyChain => write!(f, "chain is empty"),
            Self::NotFileBacked { buf } => write!(f, "buffer {buf} is not file-backed"),
            Self::CursorInvariant { reason } => write!(f, "cursor invariant violated: {reason}"),
            Self::ZeroLimit => write!(f, "coalesce limit must be non-zero"),
            Self::InvalidBufs { num, size } => {
                write!(f, "invalid buffer set: {num} buffers of {size} bytes")
            }
            Self::SentExceedsChain { excess } => {
                write!(f, "sent count exceeds chain size by {excess} bytes")
            }
        }
    }
}

impl Error for ChainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Alloc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for ChainError {
    fn from(e: ArenaError) -> Self {
        Self::Alloc(e)
    }
}
