//! Core types for the Spool output-chain subsystem.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the typed identifiers handed out by the arena, the [`Buf`] descriptor
//! with its content and control model, the [`Link`] node, and the error
//! types shared by `spool-arena` and `spool-chain`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buf;
pub mod error;
pub mod id;
pub mod link;

pub use buf::{Buf, Control, FileSpan, MemRegion, MemoryKind};
pub use error::{ArenaError, ChainError, DescriptorKind};
pub use id::{BufId, FileId, LinkId, OwnerTag, SegmentId};
pub use link::{Chain, Link};
