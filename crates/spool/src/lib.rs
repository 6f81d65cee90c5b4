//! Spool: arena-backed buffer chains for non-blocking server output.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Spool sub-crates. Adding `spool` as a single dependency is enough
//! for most users.
//!
//! # Quick start
//!
//! ```rust
//! use spool::prelude::*;
//!
//! let mut arena = Arena::new(ArenaConfig::default()).unwrap();
//! let mut ctx = OutputCtx::new(OwnerTag(1), Bufs::new(2, 64)).unwrap();
//!
//! // Produce: fill a buffer from the context's budget.
//! let cl = ctx.get_buf(&mut arena).unwrap().unwrap();
//! let buf = arena.buf_of(cl).unwrap();
//! arena.fill(buf, b"hello, world").unwrap();
//! let mut out = Some(cl);
//! ctx.update(&mut arena, &mut out).unwrap();
//!
//! // The transport managed 5 bytes this round.
//! let resume = update_sent(&mut arena, ctx.busy(), 5).unwrap();
//! assert_eq!(resume, Some(cl));
//! assert_eq!(arena.bytes(buf).unwrap(), b", world");
//!
//! // Next round it finishes; the buffer goes back to the free list.
//! update_sent(&mut arena, ctx.busy(), 7).unwrap();
//! ctx.update(&mut arena, &mut out).unwrap();
//! assert!(ctx.is_idle());
//! assert_eq!(ctx.free(), Some(cl));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `spool-core` | Handles, `Buf`, `Link`, error types |
//! | [`arena`] | `spool-arena` | `Arena`, `ArenaConfig`, link pool |
//! | [`chain`] | `spool-chain` | Chain building, reconciliation, coalescing, sent accounting |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Handles, buffer descriptors and errors (`spool-core`).
pub use spool_core as types;

/// Region-scoped storage for buffers and links (`spool-arena`).
///
/// [`arena::Arena`] owns every payload byte, descriptor and link of one
/// unit of output work and releases them together.
pub use spool_arena as arena;

/// Chain operations (`spool-chain`).
///
/// The free functions operate on caller-held chains;
/// [`chain::OutputCtx`] bundles them for one owner.
pub use spool_chain as chain;

/// Common imports for typical Spool usage.
///
/// ```rust
/// use spool::prelude::*;
/// ```
pub mod prelude {
    // Arena
    pub use spool_arena::{Arena, ArenaConfig, ArenaStats};

    // Core types
    pub use spool_core::{
        Buf, BufId, Chain, Control, FileId, FileSpan, Link, LinkId, MemRegion, MemoryKind,
        OwnerTag,
    };

    // Errors
    pub use spool_core::{ArenaError, ChainError};

    // Chain operations
    pub use spool_chain::{
        add_copy, chain_of_bufs, coalesce_file, get_free_buf, update_chains, update_sent, Bufs,
        OutputCtx,
    };
}
