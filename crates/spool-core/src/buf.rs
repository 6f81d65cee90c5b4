//! The buffer descriptor.
//!
//! A [`Buf`] describes a memory range inside an arena segment, a byte range
//! of a file, or both, together with "unconsumed" cursors that move as the
//! payload is produced and transmitted. The descriptor never owns storage:
//! memory lives in arena segments and files are referenced by [`FileId`].
//!
//! Content kind is explicit: `Option<MemRegion>` (tagged with a
//! [`MemoryKind`]) and `Option<FileSpan>`. "File-backed without a file" and
//! "in memory without an extent" cannot be expressed. Control signalling
//! lives in the orthogonal [`Control`] booleans.
//!
//! Cursor setters validate `start <= pos <= last <= end` and
//! `file_pos <= file_last`, so every `Buf` observable between calls
//! satisfies both.

use crate::error::{ArenaError, ChainError};
use crate::id::{BufId, FileId, OwnerTag, SegmentId};

/// How the memory of a buffer may be treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Scratch memory that filters may rewrite in place.
    Temporary,
    /// Cached or otherwise shared memory that must not change.
    ReadOnly,
    /// Memory-mapped file content that must not change.
    Mmap,
}

/// The immutable memory extent of a buffer: `[start, end)` in one segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemRegion {
    kind: MemoryKind,
    segment: SegmentId,
    start: usize,
    end: usize,
}

impl MemRegion {
    /// Describe `[start, end)` within `segment`.
    pub fn new(
        kind: MemoryKind,
        segment: SegmentId,
        start: usize,
        end: usize,
    ) -> Result<Self, ArenaError> {
        if start > end {
            return Err(ArenaError::InvalidRegion {
                segment,
                reason: format!("start {start} > end {end}"),
            });
        }
        Ok(Self {
            kind,
            segment,
            start,
            end,
        })
    }

    /// Describe `len` bytes from `start` within `segment`.
    pub fn with_len(
        kind: MemoryKind,
        segment: SegmentId,
        start: usize,
        len: usize,
    ) -> Result<Self, ArenaError> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| ArenaError::InvalidRegion {
                segment,
                reason: format!("start {start} + len {len} overflows"),
            })?;
        Ok(Self {
            kind,
            segment,
            start,
            end,
        })
    }

    /// Memory kind.
    pub fn kind(&self) -> MemoryKind {
        self.kind
    }

    /// Segment holding the bytes.
    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    /// First byte offset of the extent.
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last byte offset of the extent.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Extent length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the extent is zero-length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A file byte range with its unconsumed cursors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileSpan {
    file: FileId,
    pos: u64,
    last: u64,
}

impl FileSpan {
    /// Describe bytes `[pos, last)` of `file`.
    pub fn new(file: FileId, pos: u64, last: u64) -> Result<Self, ChainError> {
        if pos > last {
            return Err(ChainError::CursorInvariant {
                reason: format!("file_pos {pos} > file_last {last}"),
            });
        }
        Ok(Self { file, pos, last })
    }

    /// The referenced file.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// First unconsumed file offset.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// End of the unconsumed file range.
    pub fn last(&self) -> u64 {
        self.last
    }

    /// Unconsumed length.
    pub fn len(&self) -> u64 {
        self.last - self.pos
    }

    /// Whether the unconsumed range is empty.
    pub fn is_empty(&self) -> bool {
        self.pos == self.last
    }
}

/// Control signalling carried alongside (or instead of) payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Control {
    /// Downstream should flush everything buffered so far.
    pub flush: bool,
    /// Safe to block on this buffer; used by sync-only markers.
    pub sync: bool,
    /// End of the whole stream.
    pub last_buf: bool,
    /// Last buffer of the current chain hand-off.
    pub last_in_chain: bool,
    /// Newest of a set of shadow views over the same storage.
    pub last_shadow: bool,
    /// Backed by a temporary file rather than the original resource.
    pub temp_file: bool,
    /// The producer wants this buffer recycled as soon as it drains.
    pub recycled: bool,
}

/// Descriptor over a memory range and/or a file byte range.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Buf {
    mem: Option<MemRegion>,
    pos: usize,
    last: usize,
    file: Option<FileSpan>,
    shadow: Option<BufId>,
    tag: Option<OwnerTag>,
    /// Control flags.
    pub control: Control,
}

impl Buf {
    /// A buffer over `region`, empty (`pos == last == start`).
    pub fn with_memory(region: MemRegion) -> Self {
        Self {
            mem: Some(region),
            pos: region.start,
            last: region.start,
            ..Self::default()
        }
    }

    /// A buffer over a file range only.
    pub fn with_file(span: FileSpan) -> Self {
        Self {
            file: Some(span),
            ..Self::default()
        }
    }

    /// A payload-free buffer carrying only control signalling.
    pub fn marker(control: Control) -> Self {
        Self {
            control,
            ..Self::default()
        }
    }

    /// Attach a memory extent, leaving the buffer empty at `start`.
    pub fn attach_memory(&mut self, region: MemRegion) {
        self.mem = Some(region);
        self.pos = region.start;
        self.last = region.start;
    }

    /// Drop the memory extent; the bytes stay in the arena.
    pub fn detach_memory(&mut self) {
        self.mem = None;
        self.pos = 0;
        self.last = 0;
    }

    /// Attach a file range.
    pub fn attach_file(&mut self, span: FileSpan) {
        self.file = Some(span);
    }

    /// Drop the file range.
    pub fn detach_file(&mut self) {
        self.file = None;
    }

    /// Memory extent, if any.
    pub fn region(&self) -> Option<MemRegion> {
        self.mem
    }

    /// File range, if any.
    pub fn file_span(&self) -> Option<FileSpan> {
        self.file
    }

    /// Memory kind, if the buffer has memory.
    pub fn memory_kind(&self) -> Option<MemoryKind> {
        self.mem.map(|m| m.kind)
    }

    /// First unconsumed memory offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// End of the unconsumed memory range.
    pub fn last(&self) -> usize {
        self.last
    }

    /// Start of the memory extent (0 without memory).
    pub fn start(&self) -> usize {
        self.mem.map_or(0, |m| m.start)
    }

    /// End of the memory extent (0 without memory).
    pub fn end(&self) -> usize {
        self.mem.map_or(0, |m| m.end)
    }

    /// The referenced file, if file-backed.
    pub fn file(&self) -> Option<FileId> {
        self.file.map(|f| f.file)
    }

    /// First unconsumed file offset (0 if not file-backed).
    pub fn file_pos(&self) -> u64 {
        self.file.map_or(0, |f| f.pos)
    }

    /// End of the unconsumed file range (0 if not file-backed).
    pub fn file_last(&self) -> u64 {
        self.file.map_or(0, |f| f.last)
    }

    /// Ownership tag.
    pub fn tag(&self) -> Option<OwnerTag> {
        self.tag
    }

    /// Set or clear the ownership tag.
    pub fn set_tag(&mut self, tag: Option<OwnerTag>) {
        self.tag = tag;
    }

    /// The other view over the same storage, if any.
    pub fn shadow(&self) -> Option<BufId> {
        self.shadow
    }

    /// Set or clear the shadow back-reference.
    pub fn set_shadow(&mut self, shadow: Option<BufId>) {
        self.shadow = shadow;
    }

    /// Content lives in memory (any [`MemoryKind`]).
    pub fn in_memory(&self) -> bool {
        self.mem.is_some()
    }

    /// Content lives in memory and has no file range.
    pub fn in_memory_only(&self) -> bool {
        self.mem.is_some() && self.file.is_none()
    }

    /// Content is a file range.
    pub fn in_file(&self) -> bool {
        self.file.is_some()
    }

    /// No payload, only flush / end-of-stream / sync signalling.
    pub fn is_special(&self) -> bool {
        (self.control.flush || self.control.last_buf || self.control.sync)
            && !self.in_memory()
            && !self.in_file()
    }

    /// A special buffer whose only signal is `sync`.
    pub fn is_sync_only(&self) -> bool {
        self.control.sync
            && !self.in_memory()
            && !self.in_file()
            && !self.control.flush
            && !self.control.last_buf
    }

    /// Unconsumed size: memory range if in memory, else file range.
    pub fn size(&self) -> u64 {
        if self.in_memory() {
            (self.last - self.pos) as u64
        } else {
            self.file.map_or(0, |f| f.len())
        }
    }

    /// Bytes of extent not yet filled (`end - last`).
    pub fn free_space(&self) -> usize {
        self.end() - self.last
    }

    /// Set both memory cursors.
    pub fn set_cursors(&mut self, pos: usize, last: usize) -> Result<(), ChainError> {
        let Some(m) = self.mem else {
            if pos == 0 && last == 0 {
                return Ok(());
            }
            return Err(ChainError::CursorInvariant {
                reason: "memory cursors set on a buffer without memory".into(),
            });
        };
        if !(m.start <= pos && pos <= last && last <= m.end) {
            return Err(ChainError::CursorInvariant {
                reason: format!(
                    "need {} <= pos {pos} <= last {last} <= {}",
                    m.start, m.end
                ),
            });
        }
        self.pos = pos;
        self.last = last;
        Ok(())
    }

    /// Move `pos`, keeping `last`.
    pub fn set_pos(&mut self, pos: usize) -> Result<(), ChainError> {
        self.set_cursors(pos, self.last)
    }

    /// Move `last`, keeping `pos`.
    pub fn set_last(&mut self, last: usize) -> Result<(), ChainError> {
        self.set_cursors(self.pos, last)
    }

    /// Mark up to `n` more bytes as produced, clamped to the free space.
    ///
    /// Returns how many bytes `last` actually moved.
    pub fn produce(&mut self, n: usize) -> usize {
        let n = n.min(self.free_space());
        self.last += n;
        n
    }

    /// Consume `n` bytes of memory from the front.
    pub fn advance_pos(&mut self, n: usize) -> Result<(), ChainError> {
        let pos = self.pos.checked_add(n).ok_or_else(|| overflow("pos"))?;
        self.set_pos(pos)
    }

    /// Mark `n` more bytes as produced.
    pub fn advance_last(&mut self, n: usize) -> Result<(), ChainError> {
        let last = self.last.checked_add(n).ok_or_else(|| overflow("last"))?;
        self.set_last(last)
    }

    /// Set both file cursors.
    pub fn set_file_cursors(&mut self, pos: u64, last: u64) -> Result<(), ChainError> {
        let Some(f) = self.file.as_mut() else {
            return Err(ChainError::CursorInvariant {
                reason: "file cursors set on a buffer without a file".into(),
            });
        };
        *f = FileSpan::new(f.file, pos, last)?;
        Ok(())
    }

    /// Consume `n` bytes of the file range from the front.
    pub fn advance_file_pos(&mut self, n: u64) -> Result<(), ChainError> {
        let last = self.file_last();
        let pos = self
            .file_pos()
            .checked_add(n)
            .ok_or_else(|| overflow("file_pos"))?;
        self.set_file_cursors(pos, last)
    }

    /// Mark every unconsumed byte as consumed, in memory and in file.
    pub fn drain(&mut self) {
        self.pos = self.last;
        if let Some(f) = self.file.as_mut() {
            f.pos = f.last;
        }
    }

    /// Empty the memory range: `pos = last = start`.
    ///
    /// File cursors are left alone; whoever refills the buffer sets them.
    pub fn reset(&mut self) {
        let start = self.start();
        self.pos = start;
        self.last = start;
    }

    /// Re-verify both cursor invariants.
    pub fn check(&self) -> Result<(), ChainError> {
        match self.mem {
            Some(m) if !(m.start <= self.pos && self.pos <= self.last && self.last <= m.end) => {
                Err(ChainError::CursorInvariant {
                    reason: format!(
                        "need {} <= pos {} <= last {} <= {}",
                        m.start, self.pos, self.last, m.end
                    ),
                })
            }
            None if self.pos != 0 || self.last != 0 => Err(ChainError::CursorInvariant {
                reason: "memory cursors without memory".into(),
            }),
            _ => match self.file {
                Some(f) if f.pos > f.last => Err(ChainError::CursorInvariant {
                    reason: format!("file_pos {} > file_last {}", f.pos, f.last),
                }),
                _ => Ok(()),
            },
        }
    }
}

fn overflow(cursor: &str) -> ChainError {
    ChainError::CursorInvariant {
        reason: format!("{cursor} overflow"),
    }
}
