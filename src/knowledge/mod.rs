//! Knowledge management — research helper tasks built on the inference client.
//!
//! Submodules:
//! - `prompts`: Prompt templates for each task
//! - `response`: Reply parsers (classification JSON, depth, credibility)
//! - `tasks`: Task functions combining a prompt, one inference call and a parser
//! - `errors`: Task-level error types

pub mod errors;
pub mod prompts;
pub mod response;
pub mod tasks;

// Re-exports for convenience
pub use errors::KnowledgeError;
pub use response::TopicClassification;
pub use tasks::{
    assess_source_credibility, classify_query, classify_query_topic, determine_research_depth,
    get_alternative_topics, update_knowledge_base, DEFAULT_RESEARCH_DEPTH,
};
