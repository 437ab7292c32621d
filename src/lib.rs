//! TradeArena - paper trading engine with contests, derivatives and achievements

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

pub use config::Config;
pub use error::{Result, TradeError};
pub use services::TradingService;
