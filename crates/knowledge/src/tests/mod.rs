//! Cross-component tests with in-memory fakes for every backend.

mod batch_upserter;
