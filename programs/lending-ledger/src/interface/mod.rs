//! External collaborators: the two custody asset ledgers and the price feed

pub mod asset_ledger;
pub mod price_feed;
pub mod spl_token_ledger;

pub use asset_ledger::{AssetLedger, InMemoryAssetLedger};
pub use price_feed::{read_price, AccountPriceFeed, FixedPriceFeed, PriceFeed};
pub use spl_token_ledger::SplTokenLedger;
