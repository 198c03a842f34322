//! Test helpers: an in-memory chain and stream assertion macros.

pub mod macros;
mod mock;

pub use mock::{MockBlock, MockChain, MockFilter, MockTransaction, mock_feed};
