pub mod pool_config;
pub mod position;
pub mod position_store;
pub mod price_feed;

pub use pool_config::*;
pub use position::*;
pub use position_store::*;
pub use price_feed::*;
