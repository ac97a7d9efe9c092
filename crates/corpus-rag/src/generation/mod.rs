//! Prompt assembly and grounded answer generation

pub mod prompt;
pub mod rag;

pub use prompt::{PromptAssembler, DEFAULT_TEMPLATE};
pub use rag::{RagPipeline, RagPipelineBuilder};
