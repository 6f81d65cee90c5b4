//! Chain links.
//!
//! A [`Link`] references exactly one buffer and optionally the next link.
//! Several links, possibly in different chains, may reference the same
//! buffer. A chain is nothing more than its head link; the free, busy and
//! out lists of an owner are three independently named [`Chain`]s.

use crate::id::{BufId, LinkId};

/// Head of a singly linked chain; `None` is the empty chain.
pub type Chain = Option<LinkId>;

/// A node in a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    /// The referenced buffer.
    pub buf: BufId,
    /// The following link, `None` at the tail.
    pub next: Option<LinkId>,
}

impl Link {
    /// A detached link to `buf`.
    pub fn new(buf: BufId) -> Self {
        Self { buf, next: None }
    }
}
