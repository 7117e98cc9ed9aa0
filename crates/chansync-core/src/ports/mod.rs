//! Port definitions (driven/secondary ports)
//!
//! Traits implemented by adapter crates. The engine and the Graph adapter
//! depend on these interfaces, not on each other's concrete types.

pub mod token_source;

pub use token_source::TokenSource;
