//! The arena: payload bytes, buffer descriptors and chain links.
//!
//! Everything a unit of work allocates for its output lives here and is
//! released together by [`Arena::reset`] (or by dropping the arena).
//! Descriptors are never freed one at a time: buffers stay in their slot
//! table for the arena's lifetime, and links are recycled through the
//! arena-global link pool ([`Arena::acquire_link`] / [`Arena::release_link`]).
//!
//! Handles are generation-scoped. A reset bumps the generation, so any
//! [`BufId`] or [`LinkId`] kept across it resolves to
//! [`ArenaError::StaleHandle`] instead of a recycled slot.

use spool_core::{
    ArenaError, Buf, BufId, Chain, DescriptorKind, Link, LinkId, MemRegion, MemoryKind, SegmentId,
};
use tracing::{debug, warn};

use crate::config::ArenaConfig;
use crate::segment::SegmentList;

/// Point-in-time arena occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Backing segments allocated.
    pub segments: usize,
    /// Payload bytes handed out.
    pub bytes_used: usize,
    /// Buffer descriptors allocated.
    pub bufs: usize,
    /// Link slots allocated, pooled ones included.
    pub links: usize,
    /// Links currently sitting in the link pool.
    pub pooled_links: usize,
    /// Current handle generation.
    pub generation: u32,
}

/// Region-scoped allocator for one unit of output work.
pub struct Arena {
    config: ArenaConfig,
    segments: SegmentList,
    bufs: Vec<Buf>,
    links: Vec<Link>,
    /// Parallel to `links`: true while the slot sits in the pool.
    pooled: Vec<bool>,
    /// Head of the link pool, threaded through `Link::next`.
    link_pool: Option<LinkId>,
    pooled_links: usize,
    generation: u32,
}

impl Arena {
    /// Create an arena after validating `config`.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self {
            segments: SegmentList::new(config.segment_size, config.max_segments),
            bufs: Vec::new(),
            links: Vec::new(),
            pooled: Vec::new(),
            link_pool: None,
            pooled_links: 0,
            generation: 0,
            config,
        })
    }

    /// The configuration this arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Page size used for file-range alignment.
    pub fn page_size(&self) -> u64 {
        self.config.page_size
    }

    /// Current handle generation.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            segments: self.segments.segment_count(),
            bytes_used: self.segments.total_used(),
            bufs: self.bufs.len(),
            links: self.links.len(),
            pooled_links: self.pooled_links,
            generation: self.generation,
        }
    }

    // ── Payload memory ──────────────────────────────────────────

    /// Bump-allocate `size` contiguous, zeroed bytes.
    pub fn alloc(&mut self, size: usize) -> Result<(SegmentId, usize), ArenaError> {
        self.segments.alloc(size).inspect_err(|e| {
            warn!(requested = size, error = %e, "arena allocation failed");
        })
    }

    /// Allocate `size` bytes and describe them as a region of `kind`.
    pub fn alloc_region(&mut self, kind: MemoryKind, size: usize) -> Result<MemRegion, ArenaError> {
        let (segment, start) = self.alloc(size)?;
        MemRegion::with_len(kind, segment, start, size)
    }

    // ── Buffer descriptors ──────────────────────────────────────

    /// Allocate a zeroed descriptor with no memory and no file.
    pub fn calloc_buf(&mut self) -> Result<BufId, ArenaError> {
        self.insert_buf(Buf::default())
    }

    /// Store a caller-built descriptor.
    ///
    /// A memory region must lie inside bytes this arena has handed out.
    pub fn insert_buf(&mut self, buf: Buf) -> Result<BufId, ArenaError> {
        if let Some(region) = buf.region() {
            self.segments.check_region(&region)?;
        }
        if self.bufs.len() >= self.config.max_bufs as usize {
            warn!(limit = self.config.max_bufs, "buffer descriptor table full");
            return Err(ArenaError::DescriptorLimit {
                kind: DescriptorKind::Buf,
                limit: self.config.max_bufs,
            });
        }
        let id = BufId::new(self.bufs.len() as u32, self.generation);
        self.bufs.push(buf);
        Ok(id)
    }

    /// Allocate `size` bytes and a temporary buffer over them.
    ///
    /// The buffer starts empty (`pos == last == start`, `end == start + size`)
    /// with no tag, no file and no control flags.
    pub fn create_temp_buf(&mut self, size: usize) -> Result<BufId, ArenaError> {
        let region = self.alloc_region(MemoryKind::Temporary, size)?;
        self.insert_buf(Buf::with_memory(region))
    }

    /// Resolve a buffer handle.
    pub fn buf(&self, id: BufId) -> Result<&Buf, ArenaError> {
        let i = self.buf_index(id)?;
        Ok(&self.bufs[i])
    }

    /// Resolve a buffer handle mutably.
    pub fn buf_mut(&mut self, id: BufId) -> Result<&mut Buf, ArenaError> {
        let i = self.buf_index(id)?;
        Ok(&mut self.bufs[i])
    }

    /// Create a second view over the storage of `id`.
    ///
    /// The view copies every field, including cursors, which then move
    /// independently. Both descriptors point at each other through
    /// `shadow`, and only the new view carries `last_shadow`. Neither view
    /// owns the storage; it goes away with the arena.
    pub fn shadow(&mut self, id: BufId) -> Result<BufId, ArenaError> {
        let i = self.buf_index(id)?;
        let mut view = self.bufs[i].clone();
        view.set_shadow(Some(id));
        view.control.last_shadow = true;
        let view_id = self.insert_buf(view)?;

        let orig = &mut self.bufs[i];
        orig.set_shadow(Some(view_id));
        orig.control.last_shadow = false;
        Ok(view_id)
    }

    /// The unconsumed bytes `[pos, last)` of a memory buffer.
    pub fn bytes(&self, id: BufId) -> Result<&[u8], ArenaError> {
        let buf = self.buf(id)?;
        let region = buf.region().ok_or(ArenaError::NoMemory { buf: id })?;
        self.segments.slice(region.segment(), buf.pos(), buf.last())
    }

    /// The unfilled tail `[last, end)` of a temporary buffer.
    pub fn spare_mut(&mut self, id: BufId) -> Result<&mut [u8], ArenaError> {
        let i = self.buf_index(id)?;
        let buf = &self.bufs[i];
        let region = writable_region(buf, id)?;
        self.segments
            .slice_mut(region.segment(), buf.last(), region.end())
    }

    /// Append as much of `data` as fits at `last`; returns the count copied.
    pub fn fill(&mut self, id: BufId, data: &[u8]) -> Result<usize, ArenaError> {
        let i = self.buf_index(id)?;
        let buf = &self.bufs[i];
        let region = writable_region(buf, id)?;
        let n = data.len().min(buf.free_space());
        let last = buf.last();
        self.segments
            .slice_mut(region.segment(), last, last + n)?
            .copy_from_slice(&data[..n]);
        Ok(self.bufs[i].produce(n))
    }

    fn buf_index(&self, id: BufId) -> Result<usize, ArenaError> {
        self.check_generation(id.generation())?;
        let i = id.index() as usize;
        if i >= self.bufs.len() {
            return Err(ArenaError::UnknownBuf { buf: id });
        }
        Ok(i)
    }

    // ── Chain links ─────────────────────────────────────────────

    /// Take a link from the pool, or allocate one, pointing at `buf`.
    ///
    /// The returned link is detached (`next == None`).
    pub fn acquire_link(&mut self, buf: BufId) -> Result<LinkId, ArenaError> {
        if let Some(id) = self.link_pool {
            let i = id.index() as usize;
            self.link_pool = self.links[i].next;
            self.pooled[i] = false;
            self.pooled_links -= 1;
            self.links[i] = Link::new(buf);
            return Ok(id);
        }
        if self.links.len() >= self.config.max_links as usize {
            warn!(limit = self.config.max_links, "link table full");
            return Err(ArenaError::DescriptorLimit {
                kind: DescriptorKind::Link,
                limit: self.config.max_links,
            });
        }
        let id = LinkId::new(self.links.len() as u32, self.generation);
        self.links.push(Link::new(buf));
        self.pooled.push(false);
        Ok(id)
    }

    /// Return a link to the arena-global pool for reuse by any owner.
    ///
    /// Whatever chain the link was part of must already have been cut
    /// around it; its `next` is overwritten.
    pub fn release_link(&mut self, id: LinkId) -> Result<(), ArenaError> {
        let i = self.link_index(id)?;
        self.links[i].next = self.link_pool;
        self.pooled[i] = true;
        self.link_pool = Some(id);
        self.pooled_links += 1;
        Ok(())
    }

    /// Resolve a link handle.
    pub fn link(&self, id: LinkId) -> Result<&Link, ArenaError> {
        let i = self.link_index(id)?;
        Ok(&self.links[i])
    }

    /// The link after `id`.
    pub fn next(&self, id: LinkId) -> Result<Option<LinkId>, ArenaError> {
        Ok(self.link(id)?.next)
    }

    /// Relink `id` to `next`.
    pub fn set_next(&mut self, id: LinkId, next: Option<LinkId>) -> Result<(), ArenaError> {
        let i = self.link_index(id)?;
        self.links[i].next = next;
        Ok(())
    }

    /// The buffer handle behind a link.
    pub fn buf_of(&self, id: LinkId) -> Result<BufId, ArenaError> {
        Ok(self.link(id)?.buf)
    }

    /// The buffer behind a link.
    pub fn link_buf(&self, id: LinkId) -> Result<&Buf, ArenaError> {
        let buf = self.buf_of(id)?;
        self.buf(buf)
    }

    /// The buffer behind a link, mutably.
    pub fn link_buf_mut(&mut self, id: LinkId) -> Result<&mut Buf, ArenaError> {
        let buf = self.buf_of(id)?;
        self.buf_mut(buf)
    }

    fn link_index(&self, id: LinkId) -> Result<usize, ArenaError> {
        self.check_generation(id.generation())?;
        let i = id.index() as usize;
        if i >= self.links.len() {
            return Err(ArenaError::UnknownLink { link: id });
        }
        if self.pooled[i] {
            return Err(ArenaError::PooledLink { link: id });
        }
        Ok(i)
    }

    // ── Chain inspection ────────────────────────────────────────

    /// Walk `chain` from its head.
    pub fn iter(&self, chain: Chain) -> ChainIter<'_> {
        ChainIter {
            arena: self,
            cursor: chain,
        }
    }

    /// Link handles of `chain`, in order.
    pub fn links(&self, chain: Chain) -> Result<Vec<LinkId>, ArenaError> {
        self.iter(chain).map(|r| r.map(|(id, _)| id)).collect()
    }

    /// Number of links in `chain`.
    pub fn chain_len(&self, chain: Chain) -> Result<usize, ArenaError> {
        self.iter(chain).try_fold(0, |n, r| r.map(|_| n + 1))
    }

    /// Sum of unconsumed sizes over `chain`.
    pub fn chain_size(&self, chain: Chain) -> Result<u64, ArenaError> {
        self.iter(chain)
            .try_fold(0u64, |total, r| r.map(|(_, buf)| total + buf.size()))
    }

    /// The last link of `chain`, found by scanning.
    pub fn tail(&self, chain: Chain) -> Result<Option<LinkId>, ArenaError> {
        let Some(mut cl) = chain else {
            return Ok(None);
        };
        while let Some(next) = self.next(cl)? {
            cl = next;
        }
        Ok(Some(cl))
    }

    // ── Bulk release ────────────────────────────────────────────

    /// Release everything at once.
    ///
    /// Segments are rewound (their memory is kept for reuse), every buffer
    /// and link slot is dropped, and the generation advances so that
    /// outstanding handles become stale.
    pub fn reset(&mut self) {
        debug!(
            generation = self.generation,
            bufs = self.bufs.len(),
            links = self.links.len(),
            bytes = self.segments.total_used(),
            "arena reset"
        );
        self.segments.reset();
        self.bufs.clear();
        self.links.clear();
        self.pooled.clear();
        self.link_pool = None;
        self.pooled_links = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    fn check_generation(&self, handle_generation: u32) -> Result<(), ArenaError> {
        if handle_generation != self.generation {
            return Err(ArenaError::StaleHandle {
                handle_generation,
                current_generation: self.generation,
            });
        }
        Ok(())
    }
}

fn writable_region(buf: &Buf, id: BufId) -> Result<MemRegion, ArenaError> {
    let region = buf.region().ok_or(ArenaError::NoMemory { buf: id })?;
    if region.kind() != MemoryKind::Temporary {
        return Err(ArenaError::NotWritable { buf: id });
    }
    Ok(region)
}

/// Iterator over `(LinkId, &Buf)` pairs of a chain.
///
/// Yields an error and stops if a handle fails to resolve.
pub struct ChainIter<'a> {
    arena: &'a Arena,
    cursor: Chain,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = Result<(LinkId, &'a Buf), ArenaError>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let arena = self.arena;
        let resolved = arena
            .link(id)
            .and_then(|link| Ok((link.next, arena.buf(link.buf)?)));
        match resolved {
            Ok((next, buf)) => {
                self.cursor = next;
                Some(Ok((id, buf)))
            }
            Err(e) => {
                self.cursor = None;
                Some(Err(e))
            }
        }
    }
}
