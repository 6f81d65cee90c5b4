//! Region-scoped arena for Spool output chains.
//!
//! One [`Arena`] backs one unit of output work (typically one response).
//! It owns three kinds of storage, all released together:
//!
//! ```text
//! Arena
//! ├── SegmentList → Segment[] (bump-allocated Vec<u8> payload memory)
//! ├── Buf table   (descriptors; never freed individually)
//! └── Link table  (chain nodes; recycled through the link pool)
//! ```
//!
//! Buffers and links are addressed by generation-scoped handles
//! ([`BufId`](spool_core::BufId), [`LinkId`](spool_core::LinkId)), so
//! "next" pointers are indices and a reset cannot leave dangling
//! references behind.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod config;
pub mod segment;

pub use arena::{Arena, ArenaStats, ChainIter};
pub use config::ArenaConfig;
