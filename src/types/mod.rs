pub mod achievement;
pub mod contest;
pub mod derivative;
pub mod event;
pub mod ledger;
pub mod pricing;
pub mod quote;
pub mod watchlist;

pub use achievement::*;
pub use contest::*;
pub use derivative::*;
pub use event::*;
pub use ledger::*;
pub use pricing::*;
pub use quote::*;
pub use watchlist::*;
