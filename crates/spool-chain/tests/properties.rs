//! Integration test: chain operations under randomized send sizes.
//!
//! A seeded ChaCha8 stream drives the transport so failures reproduce
//! from the seed alone; proptest covers the reconciler and the coalescer
//! over arbitrary chain shapes.

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spool_arena::Arena;
use spool_chain::{chain_of_bufs, coalesce_file, update_chains, update_sent, Bufs};
use spool_core::{Chain, FileId, OwnerTag};
use spool_test_utils::{eos, file_buf, link_chain, pending_buf, pending_bytes, test_arena};

const TAG: OwnerTag = OwnerTag(1);

/// Every buffer reachable from `chain` satisfies the cursor invariants.
fn assert_cursors(arena: &Arena, chain: Chain) {
    for item in arena.iter(chain) {
        let (_, buf) = item.unwrap();
        buf.check().unwrap();
    }
}

#[test]
fn seeded_sends_consume_chain_in_order() {
    for seed in 0..32u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut arena = test_arena();

        let mut bufs = Vec::new();
        for i in 0..(1 + rng.next_u32() % 12) {
            let len = 1 + (rng.next_u32() % 400) as usize;
            bufs.push(pending_buf(&mut arena, len, Some(TAG)));
            if i % 4 == 3 {
                bufs.push(eos(&mut arena));
            }
        }
        let (head, _) = link_chain(&mut arena, &bufs);
        let total = arena.chain_size(head).unwrap();
        let expected = pending_bytes(&arena, head);

        let mut cursor = head;
        let mut consumed = 0u64;
        while consumed < total {
            let remaining = total - consumed;
            let sent = rng.next_u64() % (remaining + 1);
            let before = pending_bytes(&arena, cursor);
            cursor = update_sent(&mut arena, cursor, sent).unwrap();
            consumed += sent;

            assert_cursors(&arena, head);
            assert_eq!(arena.chain_size(head).unwrap(), total - consumed, "seed {seed}");
            assert_eq!(pending_bytes(&arena, cursor), before[sent as usize..]);
        }
        assert_eq!(cursor, None, "seed {seed}");
        assert_eq!(expected.len() as u64, total);
    }
}

#[test]
fn built_chain_is_contiguous_and_empty() {
    let mut arena = test_arena();
    let head = chain_of_bufs(&mut arena, Bufs::new(3, 4096)).unwrap();
    let bufs: Vec<_> = arena
        .iter(Some(head))
        .map(|r| r.unwrap().1.clone())
        .collect();

    assert_eq!(bufs.len(), 3);
    for b in &bufs {
        assert_eq!(b.end() - b.start(), 4096);
        assert_eq!(b.size(), 0);
    }
    assert_eq!(bufs[0].end(), bufs[1].start());
    assert_eq!(bufs[1].end(), bufs[2].start());
}

#[test]
fn zero_send_mutates_nothing() {
    let mut arena = test_arena();
    let a = pending_buf(&mut arena, 10, None);
    let m = eos(&mut arena);
    let (head, _) = link_chain(&mut arena, &[m, a]);
    let snapshot: Vec<_> = arena.iter(head).map(|r| r.unwrap().1.clone()).collect();

    assert_eq!(update_sent(&mut arena, head, 0).unwrap(), head);
    let after: Vec<_> = arena.iter(head).map(|r| r.unwrap().1.clone()).collect();
    assert_eq!(snapshot, after);
}

#[test]
fn reconciler_cycle_with_own_and_foreign_tags() {
    for (tag, reclaimed) in [(TAG, true), (OwnerTag(2), false)] {
        let mut arena = test_arena();
        let b = pending_buf(&mut arena, 10, Some(tag));
        let (mut out, _) = link_chain(&mut arena, &[b]);
        let cl = out;
        let (mut free, mut busy): (Chain, Chain) = (None, None);

        update_chains(&mut arena, &mut free, &mut busy, &mut out, TAG).unwrap();
        assert_eq!((free, busy, out), (None, cl, None));

        arena.buf_mut(b).unwrap().drain();
        update_chains(&mut arena, &mut free, &mut busy, &mut out, TAG).unwrap();

        assert_eq!(busy, None);
        if reclaimed {
            assert_eq!(free, cl);
            let buf = arena.buf(b).unwrap();
            assert_eq!((buf.pos(), buf.last()), (buf.start(), buf.start()));
        } else {
            assert_eq!(free, None);
            assert_eq!(arena.stats().pooled_links, 1);
        }
    }
}

#[test]
fn coalescer_example_rounds_to_two_pages() {
    let mut arena = test_arena();
    let fd = FileId(1);
    let bufs: Vec<_> = (0..3u64)
        .map(|i| file_buf(&mut arena, fd, i * 4096, (i + 1) * 4096))
        .collect();
    let (head, links) = link_chain(&mut arena, &bufs);

    let mut chain = head;
    let total = coalesce_file(&arena, &mut chain, 10_000).unwrap();
    assert_eq!(total, 8192);
    assert_eq!(total % arena.page_size(), 0);
    assert_eq!(chain, Some(links[2]));
}

#[cfg(not(miri))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn reconcile_conserves_links(
            shape in prop::collection::vec((1usize..64, any::<bool>(), any::<bool>()), 1..16),
        ) {
            let mut arena = test_arena();
            let bufs: Vec<_> = shape
                .iter()
                .map(|&(len, own, _)| {
                    let tag = if own { Some(TAG) } else { None };
                    pending_buf(&mut arena, len, tag)
                })
                .collect();
            for (&b, &(_, _, drained)) in bufs.iter().zip(&shape) {
                if drained {
                    arena.buf_mut(b).unwrap().drain();
                }
            }
            let (mut out, _) = link_chain(&mut arena, &bufs);
            let (mut free, mut busy): (Chain, Chain) = (None, None);

            update_chains(&mut arena, &mut free, &mut busy, &mut out, TAG).unwrap();

            // Reclamation stops at the first pending buffer.
            let prefix = shape.iter().take_while(|s| s.2).count();
            let own_prefix = shape[..prefix].iter().filter(|s| s.1).count();
            prop_assert_eq!(out, None);
            prop_assert_eq!(arena.chain_len(busy).unwrap(), shape.len() - prefix);
            prop_assert_eq!(arena.chain_len(free).unwrap(), own_prefix);
            prop_assert_eq!(arena.stats().pooled_links, prefix - own_prefix);
            if let Some(head) = busy {
                prop_assert!(arena.link_buf(head).unwrap().size() > 0);
            }
            for item in arena.iter(free) {
                let (_, buf) = item.unwrap();
                prop_assert_eq!(buf.tag(), Some(TAG));
                prop_assert_eq!(buf.size(), 0);
            }
        }

        #[test]
        fn coalesce_respects_limit_and_ranges(
            lens in prop::collection::vec(1u64..20_000, 1..8),
            start in 0u64..10_000,
            limit in 1u64..50_000,
        ) {
            let mut arena = test_arena();
            let fd = FileId(4);
            let mut pos = start;
            let mut bufs = Vec::new();
            for len in &lens {
                bufs.push(file_buf(&mut arena, fd, pos, pos + len));
                pos += len;
            }
            let (head, links) = link_chain(&mut arena, &bufs);

            let mut chain = head;
            let total = coalesce_file(&arena, &mut chain, limit).unwrap();

            prop_assert!(total <= limit);
            prop_assert!(total <= lens.iter().sum::<u64>());
            match chain {
                None => prop_assert_eq!(total, lens.iter().sum::<u64>()),
                Some(cl) => {
                    let i = links.iter().position(|&l| l == cl).unwrap();
                    let covered: u64 = lens[..i].iter().sum();
                    prop_assert!(total >= covered);
                    prop_assert!(total < covered + lens[i]);
                }
            }
        }

        #[test]
        fn sends_never_break_cursor_invariants(
            lens in prop::collection::vec(1usize..300, 1..10),
            sends in prop::collection::vec(0u64..500, 1..20),
        ) {
            let mut arena = test_arena();
            let bufs: Vec<_> = lens.iter().map(|&n| pending_buf(&mut arena, n, None)).collect();
            let (head, _) = link_chain(&mut arena, &bufs);
            let total = arena.chain_size(head).unwrap();

            let mut cursor = head;
            let mut consumed = 0u64;
            for s in sends {
                let sent = s.min(total - consumed);
                cursor = update_sent(&mut arena, cursor, sent).unwrap();
                consumed += sent;
                assert_cursors(&arena, head);
                prop_assert_eq!(arena.chain_size(cursor).unwrap(), total - consumed);
            }
        }
    }
}
