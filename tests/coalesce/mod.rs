//! Tests for request deduplication.
//!
//! - registry.rs: the deduplicator used directly
//! - layer.rs: the deduplicator inside a Tower stack

mod layer;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestError {
    pub message: String,
}

impl TestError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TestError: {}", self.message)
    }
}

impl std::error::Error for TestError {}
