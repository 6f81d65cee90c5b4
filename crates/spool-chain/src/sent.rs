//! Accounting for partially completed writes.

use spool_arena::Arena;
use spool_core::{Chain, ChainError};
use tracing::trace;

/// Advance buffer cursors over `sent` bytes already transmitted from `chain`.
///
/// Walks from the head, draining buffers that were sent in full and moving
/// the cursors of the one that was sent in part. Special marker buffers
/// carry nothing to send and are stepped over untouched. Returns the link
/// the next write should start from, `None` once everything is consumed.
///
/// `sent == 0` is a no-op that returns `chain` unchanged, so the function
/// can be called after every non-blocking write attempt, each time from
/// the position the previous call returned. Leading markers are not
/// stepped over in that case: the head comes back as given, even when it
/// is a marker. A nonzero `sent` steps over them.
///
/// # Errors
///
/// [`ChainError::SentExceedsChain`] if `sent` is larger than the chain;
/// every buffer is drained before it is reported.
pub fn update_sent(arena: &mut Arena, chain: Chain, sent: u64) -> Result<Chain, ChainError> {
    if sent == 0 {
        return Ok(chain);
    }

    let mut sent = sent;
    let mut cursor = chain;

    while let Some(cl) = cursor {
        let link = *arena.link(cl)?;
        let buf = arena.buf_mut(link.buf)?;

        if buf.is_special() {
            cursor = link.next;
            continue;
        }

        if sent == 0 {
            break;
        }

        buf.check()?;
        let size = buf.size();

        if sent >= size {
            sent -= size;
            buf.drain();
            cursor = link.next;
            continue;
        }

        if buf.in_memory() {
            buf.advance_pos(sent as usize)?;
        }
        if buf.in_file() {
            buf.advance_file_pos(sent)?;
        }
        sent = 0;
        break;
    }

    if sent > 0 {
        return Err(ChainError::SentExceedsChain { excess: sent });
    }

    trace!(resume = ?cursor, "sent bytes accounted");
    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spool_arena::ArenaConfig;
    use spool_core::{Buf, BufId, Control, FileId, FileSpan, LinkId};

    fn arena() -> Arena {
        Arena::new(ArenaConfig::default()).unwrap()
    }

    fn link_all(arena: &mut Arena, bufs: &[BufId]) -> Vec<LinkId> {
        let links: Vec<LinkId> = bufs
            .iter()
            .map(|&b| arena.acquire_link(b).unwrap())
            .collect();
        for pair in links.windows(2) {
            arena.set_next(pair[0], Some(pair[1])).unwrap();
        }
        links
    }

    fn mem(arena: &mut Arena, len: usize) -> BufId {
        let b = arena.create_temp_buf(len.max(1)).unwrap();
        arena.buf_mut(b).unwrap().advance_last(len).unwrap();
        b
    }

    fn eos(arena: &mut Arena) -> BufId {
        arena
            .insert_buf(Buf::marker(Control {
                last_buf: true,
                ..Control::default()
            }))
            .unwrap()
    }

    #[test]
    fn partial_send_splits_across_buffers() {
        let mut arena = arena();
        let b1 = mem(&mut arena, 10);
        let b2 = mem(&mut arena, 20);
        let links = link_all(&mut arena, &[b1, b2]);
        let pos2 = arena.buf(b2).unwrap().pos();

        let resume = update_sent(&mut arena, Some(links[0]), 15).unwrap();

        assert_eq!(resume, Some(links[1]));
        let buf1 = arena.buf(b1).unwrap();
        assert_eq!(buf1.pos(), buf1.last());
        assert_eq!(arena.buf(b2).unwrap().pos(), pos2 + 5);
        assert_eq!(arena.buf(b2).unwrap().size(), 15);
    }

    #[test]
    fn zero_sent_is_a_no_op() {
        let mut arena = arena();
        let b1 = mem(&mut arena, 10);
        let links = link_all(&mut arena, &[b1]);
        let before = arena.buf(b1).unwrap().clone();

        assert_eq!(update_sent(&mut arena, Some(links[0]), 0).unwrap(), Some(links[0]));
        assert_eq!(arena.buf(b1).unwrap(), &before);
        assert_eq!(update_sent(&mut arena, None, 0).unwrap(), None);
    }

    #[test]
    fn zero_sent_keeps_a_leading_marker() {
        let mut arena = arena();
        let flag = eos(&mut arena);
        let b1 = mem(&mut arena, 10);
        let links = link_all(&mut arena, &[flag, b1]);

        assert_eq!(update_sent(&mut arena, Some(links[0]), 0).unwrap(), Some(links[0]));
        assert_eq!(update_sent(&mut arena, Some(links[0]), 3).unwrap(), Some(links[1]));
        assert_eq!(arena.buf(b1).unwrap().size(), 7);
    }

    #[test]
    fn full_send_returns_none() {
        let mut arena = arena();
        let b1 = mem(&mut arena, 10);
        let b2 = mem(&mut arena, 20);
        let links = link_all(&mut arena, &[b1, b2]);
        assert_eq!(update_sent(&mut arena, Some(links[0]), 30).unwrap(), None);
        assert_eq!(arena.chain_size(Some(links[0])).unwrap(), 0);
    }

    #[test]
    fn exact_boundary_resumes_at_next_buffer() {
        let mut arena = arena();
        let b1 = mem(&mut arena, 10);
        let b2 = mem(&mut arena, 20);
        let links = link_all(&mut arena, &[b1, b2]);
        assert_eq!(
            update_sent(&mut arena, Some(links[0]), 10).unwrap(),
            Some(links[1])
        );
        assert_eq!(arena.buf(b2).unwrap().size(), 20);
    }

    #[test]
    fn markers_are_skipped_and_untouched() {
        let mut arena = arena();
        let m = eos(&mut arena);
        let b1 = mem(&mut arena, 10);
        let links = link_all(&mut arena, &[m, b1]);
        let marker_before = arena.buf(m).unwrap().clone();

        let resume = update_sent(&mut arena, Some(links[0]), 4).unwrap();

        assert_eq!(resume, Some(links[1]));
        assert_eq!(arena.buf(m).unwrap(), &marker_before);
        assert_eq!(arena.buf(b1).unwrap().size(), 6);
    }

    #[test]
    fn trailing_marker_is_stepped_over_after_full_send() {
        let mut arena = arena();
        let b1 = mem(&mut arena, 10);
        let m = eos(&mut arena);
        let links = link_all(&mut arena, &[b1, m]);
        assert_eq!(update_sent(&mut arena, Some(links[0]), 10).unwrap(), None);
    }

    #[test]
    fn file_buffer_advances_file_cursor() {
        let mut arena = arena();
        let f = arena
            .insert_buf(Buf::with_file(FileSpan::new(FileId(1), 100, 1100).unwrap()))
            .unwrap();
        let links = link_all(&mut arena, &[f]);
        let resume = update_sent(&mut arena, Some(links[0]), 300).unwrap();
        assert_eq!(resume, Some(links[0]));
        assert_eq!(arena.buf(f).unwrap().file_pos(), 400);
        assert_eq!(arena.buf(f).unwrap().file_last(), 1100);
    }

    #[test]
    fn memory_mirror_of_file_moves_both_cursors() {
        let mut arena = arena();
        let b = mem(&mut arena, 50);
        arena
            .buf_mut(b)
            .unwrap()
            .attach_file(FileSpan::new(FileId(2), 0, 50).unwrap());
        let links = link_all(&mut arena, &[b]);
        let start = arena.buf(b).unwrap().pos();

        update_sent(&mut arena, Some(links[0]), 20).unwrap();
        let buf = arena.buf(b).unwrap();
        assert_eq!(buf.pos(), start + 20);
        assert_eq!(buf.file_pos(), 20);

        update_sent(&mut arena, Some(links[0]), 30).unwrap();
        let buf = arena.buf(b).unwrap();
        assert_eq!(buf.pos(), buf.last());
        assert_eq!(buf.file_pos(), buf.file_last());
    }

    #[test]
    fn oversend_is_reported() {
        let mut arena = arena();
        let b1 = mem(&mut arena, 10);
        let links = link_all(&mut arena, &[b1]);
        assert_eq!(
            update_sent(&mut arena, Some(links[0]), 25),
            Err(ChainError::SentExceedsChain { excess: 15 })
        );
    }

    #[test]
    fn repeated_calls_resume_from_returned_position() {
        let mut arena = arena();
        let bufs: Vec<_> = (0..4).map(|_| mem(&mut arena, 100)).collect();
        let links = link_all(&mut arena, &bufs);

        let mut chain = Some(links[0]);
        for sent in [30u64, 0, 120, 50, 0, 200] {
            chain = update_sent(&mut arena, chain, sent).unwrap();
        }
        assert_eq!(chain, None);
        assert_eq!(arena.chain_size(Some(links[0])).unwrap(), 0);
    }
}
