//! Balance mutation engine: the sole writer of `users.balance`.

pub mod engine;

pub use engine::{LedgerEngine, NewBet};
