//! Shared service handles used by the engine components and front ends.

mod store;

pub use store::LocalStore;
