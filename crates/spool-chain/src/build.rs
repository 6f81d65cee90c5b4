//! Chain construction: bulk buffer sets, append-by-copy, free-list pops.

use spool_arena::Arena;
use spool_core::{Buf, Chain, ChainError, LinkId, MemRegion, MemoryKind};

/// "`num` buffers of `size` bytes each".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bufs {
    /// Buffer count.
    pub num: usize,
    /// Bytes per buffer.
    pub size: usize,
}

impl Bufs {
    /// Describe `num` buffers of `size` bytes.
    pub fn new(num: usize, size: usize) -> Self {
        Self { num, size }
    }

    /// Reject zero counts and sizes, and totals that overflow.
    pub fn validate(&self) -> Result<(), ChainError> {
        self.total().map(|_| ())
    }

    /// `num * size`, checked.
    pub fn total(&self) -> Result<usize, ChainError> {
        let invalid = ChainError::InvalidBufs {
            num: self.num,
            size: self.size,
        };
        if self.num == 0 || self.size == 0 {
            return Err(invalid);
        }
        self.num.checked_mul(self.size).ok_or(invalid)
    }
}

/// Build a chain of `bufs.num` empty temporary buffers over one allocation.
///
/// Buffer `i` covers `[begin + i * size, begin + (i + 1) * size)`, so
/// consecutive buffers are adjacent in memory. Links follow allocation
/// order. On failure, whatever was built stays in the arena until it is
/// reset.
pub fn chain_of_bufs(arena: &mut Arena, bufs: Bufs) -> Result<LinkId, ChainError> {
    let total = bufs.total()?;
    let (segment, begin) = arena.alloc(total)?;

    let mut head: Chain = None;
    let mut tail: Option<LinkId> = None;
    for i in 0..bufs.num {
        let region = MemRegion::with_len(
            MemoryKind::Temporary,
            segment,
            begin + i * bufs.size,
            bufs.size,
        )?;
        let buf = arena.insert_buf(Buf::with_memory(region))?;
        let cl = arena.acquire_link(buf)?;
        match tail {
            Some(t) => arena.set_next(t, Some(cl))?,
            None => head = Some(cl),
        }
        tail = Some(cl);
    }

    head.ok_or(ChainError::EmptyChain)
}

/// Append new links referencing the buffers of `src` to the tail of `chain`.
///
/// Buffers are shared, not duplicated. If a link cannot be acquired the
/// links appended so far stay attached. Appending a chain to itself copies
/// its original links once.
pub fn add_copy(arena: &mut Arena, chain: &mut Chain, src: Chain) -> Result<(), ChainError> {
    let mut tail = arena.tail(*chain)?;
    let mut first_copy: Option<LinkId> = None;
    let mut cursor = src;

    while let Some(in_cl) = cursor {
        if first_copy == Some(in_cl) {
            break;
        }
        let link = *arena.link(in_cl)?;
        let cl = arena.acquire_link(link.buf)?;
        match tail {
            Some(t) => arena.set_next(t, Some(cl))?,
            None => *chain = Some(cl),
        }
        tail = Some(cl);
        first_copy.get_or_insert(cl);
        cursor = link.next;
    }

    Ok(())
}

/// Pop the head of `free`, or allocate a zeroed buffer and a link for it.
///
/// A popped link is detached and its buffer is in whatever state the
/// reconciler left it (normally reset and empty). A fresh buffer has no
/// memory and no file; the caller attaches one before use.
pub fn get_free_buf(arena: &mut Arena, free: &mut Chain) -> Result<LinkId, ChainError> {
    if let Some(cl) = *free {
        *free = arena.next(cl)?;
        arena.set_next(cl, None)?;
        return Ok(cl);
    }

    let buf = arena.calloc_buf()?;
    Ok(arena.acquire_link(buf)?)
}
