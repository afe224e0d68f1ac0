//! Concrete retrieval providers

pub mod keyword;

pub use keyword::KeywordProvider;
