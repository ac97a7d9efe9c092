//! Retrieval of context units for a query

mod retriever;

pub use retriever::Retriever;
