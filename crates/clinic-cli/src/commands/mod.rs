pub mod common;
pub mod completions;
pub mod patient;
pub mod prescription;
pub mod queue;
pub mod sync;
pub mod wallet;
