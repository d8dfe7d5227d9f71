//! Property tests for in-memory vector store search ordering.

use chrono::Utc;
use docchat_rag::document::{DocumentChunk, EmbeddedChunk};
use docchat_rag::inmemory::InMemoryVectorStore;
use docchat_rag::vectorstore::VectorStore;
use proptest::prelude::*;

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

/// Generate an embedded chunk with a normalized embedding.
fn arb_record(dim: usize) -> impl Strategy<Value = EmbeddedChunk> {
    ("[a-z ]{5,30}", 0usize..10, arb_normalized_embedding(dim)).prop_map(
        |(text, chunk_index, embedding)| EmbeddedChunk {
            chunk: DocumentChunk {
                id: uuid::Uuid::new_v4().to_string(),
                text,
                source_file: "notes.txt".to_string(),
                file_path: "/docs/notes.txt".to_string(),
                chunk_index,
                chunk_count: 10,
                created_at: Utc::now(),
            },
            embedding,
        },
    )
}

/// For any set of records in an InMemoryVectorStore, a query returns results
/// ordered by ascending cosine distance, each distance within [0, 2], and at
/// most `top_k` of them.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_ascending_and_bounded_by_top_k(
            records in proptest::collection::vec(arb_record(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, stored) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                store.add("test", &records).await.unwrap();
                let results = store.query("test", &query, top_k).await.unwrap();
                (results, store.count("test").await.unwrap())
            });

            // every add appends, so nothing was overwritten
            prop_assert_eq!(stored, records.len());
            prop_assert!(results.len() <= top_k);
            prop_assert_eq!(results.len(), top_k.min(records.len()));

            for m in &results {
                prop_assert!((0.0..=2.0).contains(&m.distance));
            }
            for window in results.windows(2) {
                prop_assert!(
                    window[0].distance <= window[1].distance,
                    "results not in ascending order: {} > {}",
                    window[0].distance,
                    window[1].distance,
                );
            }
        }
    }
}
