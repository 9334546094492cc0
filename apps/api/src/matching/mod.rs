//! Semantic job matching: embeddings, filters, scoring, explanations, and the
//! search service that ties them together.

pub mod embeddings;
pub mod error;
pub mod explainer;
pub mod filters;
pub mod handlers;
pub mod prompts;
pub mod scoring;
pub mod service;
pub mod source;
