//! Buffer chains for a server's output pipeline.
//!
//! Producers build or reuse buffers and append them to an "out" chain;
//! the transport sends what it can, reports the byte count to
//! [`update_sent`], and folds the chain into its busy/free bookkeeping
//! with [`update_chains`]. Nothing here performs I/O or decides which
//! bytes to send.
//!
//! ```text
//! producer ──get_free_buf / chain_of_bufs / add_copy──▶ out
//!                                                       │
//! transport ◀── coalesce_file (file ranges) ────────────┤
//!     │                                                 │
//!     └── update_sent(sent) ──▶ update_chains ──▶ busy ─┴─▶ free
//! ```
//!
//! [`OutputCtx`] bundles the free/busy lists, ownership tag and buffer
//! budget of one owner.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod build;
pub mod coalesce;
pub mod output;
pub mod sent;
pub mod update;

pub use build::{add_copy, chain_of_bufs, get_free_buf, Bufs};
pub use coalesce::coalesce_file;
pub use output::OutputCtx;
pub use sent::update_sent;
pub use update::update_chains;
