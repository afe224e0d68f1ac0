//! Context construction
//!
//! Cleans retrieved evidence, shares a fixed character budget between the
//! evidence categories by priority, and trims each section at sentence or
//! word boundaries.

pub mod budget;
pub mod builder;
pub mod text;
pub mod topics;

pub use budget::{allocate, ContextBudget, SectionDemand, DEFAULT_FLOOR_FRACTION};
pub use builder::{BuiltContext, ContextBuilder, ContextConfig, ContextMetadata, ContextSection};
pub use text::{clean_doc_text, dedup_preserving_order, trim_to_boundary};
pub use topics::{default_topic_patterns, TopicFilter, TopicPattern};
