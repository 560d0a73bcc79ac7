//! Property tests for in-memory vector store search ordering and MMR selection.

use std::collections::HashMap;

use proptest::prelude::*;
use ragqa::document::{Chunk, SearchResult};
use ragqa::inmemory::InMemoryVectorStore;
use ragqa::vectorstore::VectorStore;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = Chunk> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(id, text, embedding)| Chunk {
            id,
            text,
            embedding,
            metadata: HashMap::new(),
            document_id: "doc_1".to_string(),
        },
    )
}

fn ids(results: &[SearchResult]) -> Vec<String> {
    results.iter().map(|r| r.chunk.id.clone()).collect()
}

fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
    Chunk {
        id: id.to_string(),
        text: id.to_string(),
        embedding,
        metadata: HashMap::new(),
        document_id: "doc".to_string(),
    }
}

/// *For any* set of chunks stored in an `InMemoryVectorStore`, searching
/// returns results ordered by descending cosine similarity, at most `top_k`
/// of them; MMR search returns distinct chunks drawn from the same store and
/// the same selection on every call.
mod prop_inmemory_search {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, mmr_first, mmr_second, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                store.upsert("test", &chunks).await.unwrap();
                let count = store.len("test").await.unwrap();

                let results = store.search("test", &query, top_k).await.unwrap();
                let first = store.mmr_search("test", &query, top_k, 20, 0.5).await.unwrap();
                let second = store.mmr_search("test", &query, top_k, 20, 0.5).await.unwrap();
                (results, first, second, count)
            });

            prop_assert!(results.len() <= top_k);
            prop_assert!(results.len() <= unique_count);
            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }

            prop_assert!(mmr_first.len() <= top_k);
            let first_ids: Vec<&str> = mmr_first.iter().map(|r| r.chunk.id.as_str()).collect();
            let second_ids: Vec<&str> = mmr_second.iter().map(|r| r.chunk.id.as_str()).collect();
            prop_assert_eq!(&first_ids, &second_ids);
            let mut deduped = first_ids.clone();
            deduped.sort_unstable();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), first_ids.len());
        }
    }
}

#[tokio::test]
async fn upsert_replaces_chunks_with_the_same_id() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 2).await.unwrap();

    store.upsert("docs", &[chunk("a", vec![1.0, 0.0])]).await.unwrap();
    store.upsert("docs", &[chunk("a", vec![0.0, 1.0])]).await.unwrap();

    assert_eq!(store.len("docs").await, Some(1));
    let results = store.search("docs", &[0.0, 1.0], 1).await.unwrap();
    assert!((results[0].score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn rejects_wrong_dimensions_and_missing_collections() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 3).await.unwrap();

    assert!(store.upsert("docs", &[chunk("a", vec![1.0, 0.0])]).await.is_err());
    assert!(store.search("other", &[1.0, 0.0, 0.0], 5).await.is_err());
}

#[tokio::test]
async fn delete_removes_chunks() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 2).await.unwrap();
    store
        .upsert("docs", &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])])
        .await
        .unwrap();

    store.delete("docs", &["a"]).await.unwrap();

    let results = store.search("docs", &[1.0, 0.0], 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.id, "b");
}

#[tokio::test]
async fn mmr_search_prefers_diverse_chunks() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 3).await.unwrap();
    store
        .upsert(
            "docs",
            &[
                chunk("top", vec![0.8, 0.6, 0.0]),
                chunk("near_duplicate", vec![0.79, 0.61, 0.0]),
                chunk("different", vec![0.7, -0.7, 0.0]),
            ],
        )
        .await
        .unwrap();

    let similar = store.search("docs", &[1.0, 0.0, 0.0], 2).await.unwrap();
    let diverse = store.mmr_search("docs", &[1.0, 0.0, 0.0], 2, 20, 0.5).await.unwrap();

    assert_eq!(ids(&similar), vec!["top", "near_duplicate"]);
    assert_eq!(ids(&diverse), vec!["top", "different"]);
}

#[tokio::test]
async fn deleted_collections_are_gone() {
    let store = InMemoryVectorStore::new();
    store.create_collection("docs", 2).await.unwrap();
    store.upsert("docs", &[chunk("a", vec![1.0, 0.0])]).await.unwrap();

    store.delete_collection("docs").await.unwrap();

    assert_eq!(store.len("docs").await, None);
    assert!(store.search("docs", &[1.0, 0.0], 1).await.is_err());
}
