//! Per-owner output context.
//!
//! An [`OutputCtx`] holds what one output stage needs between send
//! attempts: its free and busy lists, the tag that marks buffers as its
//! own, and a budget of how many buffers it may allocate. The arena is
//! passed into each call rather than stored, so several contexts can
//! share one arena.

use spool_arena::Arena;
use spool_core::{Chain, ChainError, LinkId, OwnerTag};
use tracing::trace;

use crate::build::{get_free_buf, Bufs};
use crate::update::update_chains;

/// Free/busy bookkeeping and buffer budget of one output owner.
#[derive(Debug)]
pub struct OutputCtx {
    tag: OwnerTag,
    bufs: Bufs,
    allocated: usize,
    free: Chain,
    busy: Chain,
}

impl OutputCtx {
    /// A context that may allocate up to `bufs.num` buffers of `bufs.size` bytes.
    pub fn new(tag: OwnerTag, bufs: Bufs) -> Result<Self, ChainError> {
        bufs.validate()?;
        Ok(Self {
            tag,
            bufs,
            allocated: 0,
            free: None,
            busy: None,
        })
    }

    /// The ownership tag stamped on buffers this context allocates.
    pub fn tag(&self) -> OwnerTag {
        self.tag
    }

    /// The allocation budget.
    pub fn bufs(&self) -> Bufs {
        self.bufs
    }

    /// Buffers allocated so far.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Head of the free list.
    pub fn free(&self) -> Chain {
        self.free
    }

    /// Head of the busy list.
    pub fn busy(&self) -> Chain {
        self.busy
    }

    /// Nothing is waiting on the transport.
    pub fn is_idle(&self) -> bool {
        self.busy.is_none()
    }

    /// A buffer to write new output into.
    ///
    /// Reuses the most recently drained buffer if there is one; otherwise
    /// allocates a tagged, recycled temporary buffer of `bufs.size` bytes
    /// while the budget allows. Returns `Ok(None)` once the budget is spent
    /// and nothing has drained yet: the caller has to wait for the
    /// transport before producing more.
    pub fn get_buf(&mut self, arena: &mut Arena) -> Result<Option<LinkId>, ChainError> {
        if self.free.is_some() {
            return get_free_buf(arena, &mut self.free).map(Some);
        }

        if self.allocated >= self.bufs.num {
            trace!(tag = %self.tag, allocated = self.allocated, "output buffers exhausted");
            return Ok(None);
        }

        let buf = arena.create_temp_buf(self.bufs.size)?;
        let b = arena.buf_mut(buf)?;
        b.set_tag(Some(self.tag));
        b.control.recycled = true;
        let cl = arena.acquire_link(buf)?;
        self.allocated += 1;
        Ok(Some(cl))
    }

    /// Fold `out` into this context's busy list and reclaim drained buffers.
    pub fn update(&mut self, arena: &mut Arena, out: &mut Chain) -> Result<(), ChainError> {
        update_chains(arena, &mut self.free, &mut self.busy, out, self.tag)
    }
}
