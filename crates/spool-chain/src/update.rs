//! Busy/free reconciliation.
//!
//! Every output stage calls [`update_chains`] after each send attempt. It
//! moves the freshly produced `out` chain behind whatever is still pending
//! in `busy`, then peels fully drained buffers off the front of `busy`:
//! buffers owned by the caller go to the front of `free`, buffers owned by
//! someone else only give their link back to the arena pool.

use spool_arena::Arena;
use spool_core::{Chain, ChainError, OwnerTag};
use tracing::trace;

/// Fold `out` into `busy` and reclaim drained buffers from the head of `busy`.
///
/// Consumption is assumed to proceed from head to tail, so the first buffer
/// with unconsumed bytes stops reclamation even if later buffers are
/// already drained.
///
/// Afterwards `out` is empty, `busy` starts at the first pending buffer
/// (order preserved), and `free` has gained zero or more reset buffers at
/// its head, most recently drained first.
pub fn update_chains(
    arena: &mut Arena,
    free: &mut Chain,
    busy: &mut Chain,
    out: &mut Chain,
    tag: OwnerTag,
) -> Result<(), ChainError> {
    if out.is_some() {
        match arena.tail(*busy)? {
            None => *busy = out.take(),
            Some(t) => arena.set_next(t, out.take())?,
        }
    }

    let mut reclaimed = 0usize;
    let mut released = 0usize;

    while let Some(cl) = *busy {
        let link = *arena.link(cl)?;
        let buf = arena.buf_mut(link.buf)?;
        buf.check()?;

        if buf.size() != 0 {
            break;
        }

        if buf.tag() != Some(tag) {
            *busy = link.next;
            arena.release_link(cl)?;
            released += 1;
            continue;
        }

        buf.reset();
        *busy = link.next;
        arena.set_next(cl, *free)?;
        *free = Some(cl);
        reclaimed += 1;
    }

    trace!(
        %tag,
        reclaimed,
        released,
        pending = busy.is_some(),
        "chains updated"
    );
    Ok(())
}
