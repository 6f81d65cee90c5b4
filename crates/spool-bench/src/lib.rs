//! Benchmark profiles for Spool buffer chains.
//!
//! Pre-built chain shapes shared by the criterion benches:
//!
//! - [`filled_chain`]: `num` tagged memory buffers, each full
//! - [`file_chain`]: `num` contiguous ranges of one file
//! - [`bench_config`]: an arena large enough for every profile

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use spool_arena::{Arena, ArenaConfig};
use spool_core::{Buf, Chain, ChainError, FileId, FileSpan, LinkId, OwnerTag};

/// Arena configuration for benchmarks: 4 MiB segments.
pub fn bench_config() -> ArenaConfig {
    ArenaConfig {
        segment_size: 4 << 20,
        ..ArenaConfig::new()
    }
}

/// `num` temporary buffers of `size` bytes, each filled, tagged `tag`.
pub fn filled_chain(
    arena: &mut Arena,
    num: usize,
    size: usize,
    tag: OwnerTag,
) -> Result<Chain, ChainError> {
    let payload = vec![0xa5u8; size];
    let mut links = Vec::with_capacity(num);
    for _ in 0..num {
        let b = arena.create_temp_buf(size)?;
        arena.fill(b, &payload)?;
        arena.buf_mut(b)?.set_tag(Some(tag));
        links.push(arena.acquire_link(b)?);
    }
    link_all(arena, &links)
}

/// `num` file buffers covering `[i * part, (i + 1) * part)` of `file`.
pub fn file_chain(
    arena: &mut Arena,
    file: FileId,
    num: u64,
    part: u64,
) -> Result<Chain, ChainError> {
    let mut links = Vec::new();
    for i in 0..num {
        let span = FileSpan::new(file, i * part, (i + 1) * part)?;
        let b = arena.insert_buf(Buf::with_file(span))?;
        links.push(arena.acquire_link(b)?);
    }
    link_all(arena, &links)
}

fn link_all(arena: &mut Arena, links: &[LinkId]) -> Result<Chain, ChainError> {
    for pair in links.windows(2) {
        arena.set_next(pair[0], Some(pair[1]))?;
    }
    Ok(links.first().copied())
}
