pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod stats;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    BalanceMovement, BalanceOperation, Bet, BetId, BetResult, Money, MovementType, TimeMs,
    UserAccount, UserId,
};
pub use error::AppError;
pub use ledger::{LedgerEngine, NewBet};
