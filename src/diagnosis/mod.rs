pub mod dataset;
pub mod engine;

pub use dataset::{DatasetError, KnowledgeBase};
