//! Embedding and upserting retrieval units into the vector index

mod indexer;

pub use indexer::{IndexReport, Indexer};
