//! Core domain types: money, bets, movements, accounts.

pub mod bet;
pub mod money;
pub mod movement;
pub mod primitives;
pub mod user;

pub use bet::{settlement_delta, Bet, BetResult};
pub use money::Money;
pub use movement::{BalanceMovement, BalanceOperation, MovementType};
pub use primitives::{BetId, TimeMs, UserId};
pub use user::{initial_grant, UserAccount};
