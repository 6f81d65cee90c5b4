//! File-range coalescing for bulk file-to-socket transfer.
//!
//! Adjacent file-backed buffers that continue the same file at the exact
//! offset where the previous one ended are merged into one transfer unit,
//! up to a byte limit. When the limit cuts a buffer, the cut point is
//! moved onto a page boundary if that keeps it inside both the limit and
//! the buffer's own range.

use spool_arena::Arena;
use spool_core::{Chain, ChainError, FileId, FileSpan, LinkId};
use tracing::trace;

/// Sum the contiguous file range at the head of `chain`, up to `limit` bytes.
///
/// On return `chain` points at the first link not fully covered by the
/// returned total: the link that was cut by the limit, the first link that
/// is not a contiguous continuation of the same file, or `None` when
/// everything was covered.
///
/// # Errors
///
/// [`ChainError::EmptyChain`] for an empty chain,
/// [`ChainError::NotFileBacked`] if the head has no file range, and
/// [`ChainError::ZeroLimit`] for `limit == 0`.
pub fn coalesce_file(arena: &Arena, chain: &mut Chain, limit: u64) -> Result<u64, ChainError> {
    if limit == 0 {
        return Err(ChainError::ZeroLimit);
    }
    let head = chain.ok_or(ChainError::EmptyChain)?;
    let head_buf = arena.buf_of(head)?;
    let fd = arena
        .buf(head_buf)?
        .file()
        .ok_or(ChainError::NotFileBacked { buf: head_buf })?;
    let page = arena.page_size();

    let mut total = 0u64;
    let mut cl = head;
    let mut span = file_span(arena, cl)?;

    loop {
        let size = span.len();
        let remaining = limit - total;

        if size > remaining {
            total += clip(span, remaining, total > 0, page);
            *chain = Some(cl);
            break;
        }

        total += size;
        let fprev = span.pos() + size;
        let next = arena.next(cl)?;

        let continues = match next {
            Some(n) if total < limit => contiguous(arena, n, fd, fprev)?,
            _ => None,
        };
        match (next, continues) {
            (Some(n), Some(next_span)) => {
                cl = n;
                span = next_span;
            }
            _ => {
                *chain = next;
                break;
            }
        }
    }

    trace!(total, limit, %fd, "coalesced file range");
    Ok(total)
}

fn file_span(arena: &Arena, cl: LinkId) -> Result<FileSpan, ChainError> {
    let buf = arena.buf_of(cl)?;
    arena
        .buf(buf)?
        .file_span()
        .ok_or(ChainError::NotFileBacked { buf })
}

/// The file range of `cl` if it continues `fd` exactly at `fprev`.
fn contiguous(
    arena: &Arena,
    cl: LinkId,
    fd: FileId,
    fprev: u64,
) -> Result<Option<FileSpan>, ChainError> {
    Ok(arena
        .link_buf(cl)?
        .file_span()
        .filter(|s| s.file() == fd && s.pos() == fprev))
}

/// How many bytes of `span` to take when only `remaining` fit.
///
/// Prefers the page-aligned end at or above the cut if it fits both the
/// limit and the span; otherwise the page-aligned end below the cut, as
/// long as that takes something or earlier links already contributed;
/// otherwise the raw cut.
fn clip(span: FileSpan, remaining: u64, accumulated: bool, page: u64) -> u64 {
    let end = span.pos() + remaining;
    let mask = !(page - 1);

    if let Some(up) = end.checked_add(page - 1).map(|e| e & mask) {
        if up <= span.last() && up - span.pos() <= remaining {
            return up - span.pos();
        }
    }

    let down = end & mask;
    if down > span.pos() || accumulated {
        return down.saturating_sub(span.pos());
    }
    remaining
}
