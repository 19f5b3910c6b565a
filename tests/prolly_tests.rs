//! Integration tests for prolly tree canonical form
//!
//! These tests check that the tree shape depends only on the final contents,
//! never on how the contents were produced.

use futures::TryStreamExt;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tessera::{
    apply_changes, diff_trees, BlockStore, CachedBlockStore, ChangeType, CollectionType, CoreError,
    Entry, MemoryBlockStore, ProllyConfig, ProllyTree, Value, ValueType,
};

const N: i64 = 10_000;

fn int_map() -> CollectionType {
    CollectionType::map(ValueType::Int, ValueType::Int)
}

fn entries(keys: impl IntoIterator<Item = i64>) -> Vec<Entry> {
    keys.into_iter().map(|i| Entry::new(i, i.wrapping_add(1))).collect()
}

async fn build<S: BlockStore>(store: &Arc<S>, entries: Vec<Entry>) -> ProllyTree<S> {
    ProllyTree::from_entries(Arc::clone(store), int_map(), ProllyConfig::default(), entries)
        .await
        .unwrap()
}

#[test_log::test(tokio::test)]
async fn test_order_independence() {
    let store = Arc::new(MemoryBlockStore::new());
    let sorted = build(&store, entries(0..N)).await;

    let mut shuffled = entries(0..N);
    shuffled.shuffle(&mut StdRng::seed_from_u64(7));
    let from_shuffled = build(&store, shuffled).await;

    assert_eq!(sorted.root_cid(), from_shuffled.root_cid());
    assert!(sorted.height().await.unwrap() >= 2);
    assert_eq!(sorted.len(), N as u64);
}

#[test_log::test(tokio::test)]
async fn test_incremental_equals_bulk() {
    let store = Arc::new(MemoryBlockStore::new());
    let bulk = build(&store, entries(0..N)).await;

    let mut tree = build(&store, entries(0..N - 10)).await;
    for key in N - 10..N {
        tree = tree.set(Entry::new(key, key + 1)).await.unwrap();
    }

    assert_eq!(tree.root_cid(), bulk.root_cid());
}

#[tokio::test]
async fn test_incremental_inserts_in_the_middle() {
    let store = Arc::new(MemoryBlockStore::new());
    let bulk = build(&store, entries(0..N)).await;

    let gaps: Vec<i64> = (0..N).step_by(997).collect();
    let mut tree = build(&store, entries((0..N).filter(|k| !gaps.contains(k)))).await;
    for &key in gaps.iter().rev() {
        tree = tree.set(Entry::new(key, key + 1)).await.unwrap();
    }

    assert_eq!(tree.root_cid(), bulk.root_cid());
}

#[tokio::test]
async fn test_set_existing_is_idempotent() {
    let store = Arc::new(MemoryBlockStore::new());
    let original = build(&store, entries(0..N)).await;

    let mut tree = original.clone();
    for key in 0..N {
        tree = tree.set(Entry::new(key, key + 1)).await.unwrap();
    }

    assert_eq!(tree.root_cid(), original.root_cid());
}

#[tokio::test]
async fn test_removals_equal_bulk() {
    let store = Arc::new(MemoryBlockStore::new());
    let bulk = build(&store, entries(0..N)).await;

    let mut tree = build(&store, entries(0..N + 10)).await;
    for key in N..N + 10 {
        tree = tree.remove(&Value::from(key)).await.unwrap();
    }

    assert_eq!(tree.root_cid(), bulk.root_cid());
}

#[tokio::test]
async fn test_remove_then_add_restores_hash() {
    let store = Arc::new(MemoryBlockStore::new());
    let original = build(&store, entries(0..N)).await;

    for key in [0, 1, 517, 4999, 5000, N - 2, N - 1] {
        let removed = original.remove(&Value::from(key)).await.unwrap();
        assert_ne!(removed.root_cid(), original.root_cid());
        assert!(!removed.has(&Value::from(key)).await.unwrap());

        let restored = removed.set(Entry::new(key, key + 1)).await.unwrap();
        assert_eq!(restored.root_cid(), original.root_cid());
    }
}

#[tokio::test]
async fn test_root_chunks_are_loadable_children() {
    let store = Arc::new(MemoryBlockStore::new());
    let tree = build(&store, entries(0..N)).await;

    let chunks = tree.chunks();
    assert_eq!(chunks.len(), tree.root().len());
    for cid in &chunks {
        assert!(store.has_block(cid).await.unwrap());
    }
}

#[tokio::test]
async fn test_flush_load_roundtrip() {
    let store = Arc::new(MemoryBlockStore::new());
    let tree = build(&store, entries(0..1000)).await;
    let cid = tree.flush().await.unwrap();

    let loaded = ProllyTree::load(Arc::clone(&store), cid).await.unwrap();
    assert_eq!(loaded.len(), 1000);
    assert_eq!(loaded.get(&Value::from(500)).await.unwrap(), Some(Value::from(501)));
}

#[tokio::test]
async fn test_missing_chunk_is_fatal() {
    let store = Arc::new(MemoryBlockStore::new());
    let tree = build(&store, entries(0..N)).await;
    let root = tree.root().as_ref().clone();
    store.clear();

    let detached =
        ProllyTree::from_sequence(Arc::clone(&store), root, ProllyConfig::default()).unwrap();
    let result = detached.get(&Value::from(1)).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_cached_store_produces_same_tree() {
    let memory = Arc::new(MemoryBlockStore::new());
    let cached = Arc::new(CachedBlockStore::new(MemoryBlockStore::new(), 64));

    let a = build(&memory, entries(0..2000)).await;
    let b = build(&cached, entries(0..2000)).await;
    assert_eq!(a.root_cid(), b.root_cid());

    let b = b.set(Entry::new(5000, 0)).await.unwrap();
    assert_eq!(b.get(&Value::from(5000)).await.unwrap(), Some(Value::from(0)));
}

#[tokio::test]
async fn test_iter_at_over_many_chunks() {
    let store = Arc::new(MemoryBlockStore::new());
    let tree = build(&store, entries(0..N)).await;

    let tail: Vec<Entry> = tree.iter_at(N / 2).into_stream().try_collect().await.unwrap();
    assert_eq!(tail, entries(N / 2..N));

    let mut iter = tree.iter();
    let mut count = 0;
    while let Some(entry) = iter.next().await.unwrap() {
        assert_eq!(entry.key, Value::from(count));
        count += 1;
    }
    assert_eq!(count, N);
}

#[tokio::test]
async fn test_diff_and_apply() {
    let store = Arc::new(MemoryBlockStore::new());
    let base = build(&store, entries(0..N)).await;
    let changed = base
        .remove(&Value::from(10))
        .await
        .unwrap()
        .set(Entry::new(20, -20))
        .await
        .unwrap()
        .set(Entry::new(N + 5, 0))
        .await
        .unwrap();

    let diff = diff_trees(&base, &changed).await.unwrap();
    let kinds: Vec<ChangeType> = diff.iter().map(|c| c.change_type).collect();
    assert_eq!(kinds, vec![ChangeType::Remove, ChangeType::Modify, ChangeType::Add]);

    let patched = apply_changes(&base, diff).await.unwrap();
    assert_eq!(patched.root_cid(), changed.root_cid());
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_permutations_share_a_root(
        keys in prop::collection::vec(any::<i64>(), 0..300).prop_shuffle(),
        seed in any::<u64>(),
    ) {
        let config = ProllyConfig::default().with_boundary_bits(3).with_chunk_entries(2, 16);
        let mut shuffled = entries(keys.iter().copied());
        shuffled.shuffle(&mut StdRng::seed_from_u64(seed));

        let (a, b) = run(async {
            let store = Arc::new(MemoryBlockStore::new());
            let a = ProllyTree::from_entries(
                Arc::clone(&store), int_map(), config.clone(), entries(keys.iter().copied()),
            ).await.unwrap();
            let b = ProllyTree::from_entries(store, int_map(), config, shuffled)
                .await
                .unwrap();
            (*a.root_cid(), *b.root_cid())
        });
        prop_assert_eq!(a, b);
    }
}
