//! Payload memory: fixed-size byte slabs handed out by bumping.
//!
//! Payload ranges are addressed as `(SegmentId, offset)`, never by pointer,
//! so a reset can rewind every slab without leaving anything dangling.
//! A single allocation never spans two slabs.

use std::ops::Range;

use spool_core::{ArenaError, MemRegion, SegmentId};
use tracing::debug;

/// One fixed-size byte slab.
pub struct Segment {
    bytes: Box<[u8]>,
    /// Offset of the first byte not yet handed out.
    filled: usize,
}

impl Segment {
    /// A zero-filled slab of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            filled: 0,
        }
    }

    /// Hand out the next `len` bytes, zeroed, if they fit.
    pub fn bump(&mut self, len: usize) -> Option<Range<usize>> {
        let range = self.filled..self.filled.checked_add(len)?;
        let fresh = self.bytes.get_mut(range.clone())?;
        // Bytes from before a reset may still hold old payload.
        fresh.fill(0);
        self.filled = range.end;
        Some(range)
    }

    /// Bytes `[start, end)`, or `None` outside the handed-out prefix.
    pub fn slice(&self, start: usize, end: usize) -> Option<&[u8]> {
        self.bytes[..self.filled].get(start..end)
    }

    /// Bytes `[start, end)`, mutably, or `None` outside the handed-out prefix.
    pub fn slice_mut(&mut self, start: usize, end: usize) -> Option<&mut [u8]> {
        self.bytes[..self.filled].get_mut(start..end)
    }

    /// Forget every handout; the memory is kept.
    pub fn rewind(&mut self) {
        self.filled = 0;
    }

    /// Bytes handed out since the last rewind.
    pub fn used(&self) -> usize {
        self.filled
    }

    /// Slab size.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes left for handing out.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.filled
    }
}

/// Slabs of `slab_len` bytes, up to `limit` of them, created on demand.
pub struct SegmentList {
    slabs: Vec<Segment>,
    slab_len: usize,
    limit: u16,
    /// Slab that served the latest allocation; earlier ones are not revisited.
    active: usize,
}

impl SegmentList {
    /// A list with its first slab already allocated.
    pub fn new(segment_size: usize, max_segments: u16) -> Self {
        Self {
            slabs: vec![Segment::new(segment_size)],
            slab_len: segment_size,
            limit: max_segments,
            active: 0,
        }
    }

    /// `len` contiguous zeroed bytes.
    ///
    /// Tries the active slab and then any slabs kept from before the last
    /// reset, and creates a new slab only once those are exhausted.
    pub fn alloc(&mut self, len: usize) -> Result<(SegmentId, usize), ArenaError> {
        if len > self.slab_len {
            return Err(ArenaError::CapacityExceeded {
                requested: len,
                capacity: self.slab_len,
            });
        }

        for idx in self.active..self.slabs.len() {
            if let Some(range) = self.slabs[idx].bump(len) {
                self.active = idx;
                return Ok((SegmentId(idx as u16), range.start));
            }
        }

        if self.slabs.len() >= usize::from(self.limit) {
            return Err(ArenaError::CapacityExceeded {
                requested: len,
                capacity: self.slabs.len() * self.slab_len,
            });
        }

        let mut slab = Segment::new(self.slab_len);
        let start = slab.bump(len).map_or(0, |r| r.start);
        self.slabs.push(slab);
        self.active = self.slabs.len() - 1;
        debug!(
            segment = self.active,
            segment_size = self.slab_len,
            "arena grew a new segment"
        );
        Ok((SegmentId(self.active as u16), start))
    }

    /// Check that `region` lies inside bytes already handed out.
    pub fn check_region(&self, region: &MemRegion) -> Result<(), ArenaError> {
        self.slice(region.segment(), region.start(), region.end())
            .map(|_| ())
    }

    /// Bytes `[start, end)` of `segment`.
    pub fn slice(&self, segment: SegmentId, start: usize, end: usize) -> Result<&[u8], ArenaError> {
        self.slab(segment)?
            .slice(start, end)
            .ok_or_else(|| out_of_bounds(segment, start, end))
    }

    /// Bytes `[start, end)` of `segment`, mutably.
    pub fn slice_mut(
        &mut self,
        segment: SegmentId,
        start: usize,
        end: usize,
    ) -> Result<&mut [u8], ArenaError> {
        self.slabs
            .get_mut(usize::from(segment.0))
            .ok_or_else(|| not_allocated(segment))?
            .slice_mut(start, end)
            .ok_or_else(|| out_of_bounds(segment, start, end))
    }

    fn slab(&self, segment: SegmentId) -> Result<&Segment, ArenaError> {
        self.slabs
            .get(usize::from(segment.0))
            .ok_or_else(|| not_allocated(segment))
    }

    /// Rewind every slab and restart from the first.
    pub fn reset(&mut self) {
        self.slabs.iter_mut().for_each(Segment::rewind);
        self.active = 0;
    }

    /// Slabs allocated so far, kept across resets.
    pub fn segment_count(&self) -> usize {
        self.slabs.len()
    }

    /// Bytes handed out across every slab.
    pub fn total_used(&self) -> usize {
        self.slabs.iter().map(Segment::used).sum()
    }
}

fn not_allocated(segment: SegmentId) -> ArenaError {
    ArenaError::InvalidRegion {
        segment,
        reason: "segment not allocated".to_string(),
    }
}

fn out_of_bounds(segment: SegmentId, start: usize, end: usize) -> ArenaError {
    ArenaError::InvalidRegion {
        segment,
        reason: format!("[{start}, {end}) lies outside the allocated bytes"),
    }
}
