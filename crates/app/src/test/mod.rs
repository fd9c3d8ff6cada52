//! Shared integration-test infrastructure.


pub(crate) use context::TestContext;
