//! Test fixtures for Spool development.
//!
//! Helpers for building buffers and chains in an [`Arena`] without
//! repeating the descriptor plumbing in every test, plus a
//! [`MockTransport`] that stands in for a socket with a bounded send
//! window.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use spool_arena::{Arena, ArenaConfig};
use spool_core::{Buf, BufId, Chain, Control, FileId, FileSpan, LinkId, OwnerTag};

/// An arena with the default configuration.
pub fn test_arena() -> Arena {
    Arena::new(ArenaConfig::default()).expect("default config is valid")
}

/// A temporary buffer holding `data` unconsumed.
///
/// The buffer is sized to `data` exactly (at least one byte) so a full
/// send leaves it drained with no spare room.
pub fn mem_buf(arena: &mut Arena, data: &[u8], tag: Option<OwnerTag>) -> BufId {
    let b = arena
        .create_temp_buf(data.len().max(1))
        .expect("temp buffer allocation");
    arena.fill(b, data).expect("fill temp buffer");
    arena.buf_mut(b).expect("fresh handle").set_tag(tag);
    b
}

/// A temporary buffer of `len` filler bytes.
pub fn pending_buf(arena: &mut Arena, len: usize, tag: Option<OwnerTag>) -> BufId {
    mem_buf(arena, &vec![b'x'; len], tag)
}

/// A file-only buffer over `[pos, last)` of `file`.
pub fn file_buf(arena: &mut Arena, file: FileId, pos: u64, last: u64) -> BufId {
    let span = FileSpan::new(file, pos, last).expect("pos <= last");
    arena
        .insert_buf(Buf::with_file(span))
        .expect("buffer descriptor")
}

/// A zero-size marker carrying `control`.
pub fn marker(arena: &mut Arena, control: Control) -> BufId {
    arena
        .insert_buf(Buf::marker(control))
        .expect("buffer descriptor")
}

/// An end-of-stream marker.
pub fn eos(arena: &mut Arena) -> BufId {
    marker(
        arena,
        Control {
            last_buf: true,
            ..Control::default()
        },
    )
}

/// Link `bufs` into a new chain in order and return its head with the links.
pub fn link_chain(arena: &mut Arena, bufs: &[BufId]) -> (Chain, Vec<LinkId>) {
    let links: Vec<LinkId> = bufs
        .iter()
        .map(|&b| arena.acquire_link(b).expect("link allocation"))
        .collect();
    for pair in links.windows(2) {
        arena
            .set_next(pair[0], Some(pair[1]))
            .expect("fresh link handle");
    }
    (links.first().copied(), links)
}

/// Concatenated unconsumed memory bytes of `chain`, markers skipped.
pub fn pending_bytes(arena: &Arena, chain: Chain) -> Vec<u8> {
    let mut out = Vec::new();
    for item in arena.iter(chain) {
        let (cl, buf) = item.expect("chain resolves");
        if buf.in_memory() {
            let id = arena.buf_of(cl).expect("link resolves");
            out.extend_from_slice(arena.bytes(id).expect("memory buffer"));
        }
    }
    out
}

/// Stand-in for a non-blocking socket.
///
/// Each call to [`send`](MockTransport::send) accepts at most `window`
/// bytes of whatever is pending in the chain and records the count.
pub struct MockTransport {
    window: u64,
    sent: Vec<u64>,
}

impl MockTransport {
    pub fn new(window: u64) -> Self {
        Self {
            window,
            sent: Vec::new(),
        }
    }

    /// Change the window for subsequent sends.
    pub fn set_window(&mut self, window: u64) {
        self.window = window;
    }

    /// Accept up to `window` bytes of `chain`; returns the count accepted.
    pub fn send(&mut self, arena: &Arena, chain: Chain) -> u64 {
        let pending = arena.chain_size(chain).expect("chain resolves");
        let n = pending.min(self.window);
        self.sent.push(n);
        n
    }

    /// Byte counts of every send so far.
    pub fn history(&self) -> &[u64] {
        &self.sent
    }

    /// Total bytes accepted.
    pub fn total(&self) -> u64 {
        self.sent.iter().sum()
    }
}
