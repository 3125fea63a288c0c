pub mod capture;
pub mod citations;
pub mod extract;
pub mod orchestrator;
pub mod retry;
pub mod run_store;
pub mod search;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
