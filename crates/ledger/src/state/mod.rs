pub mod ledger_config;
pub mod mint_counter;
pub mod token_ledger;

pub use ledger_config::*;
pub use mint_counter::*;
pub use token_ledger::*;
