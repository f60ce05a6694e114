//! Lending engine
//!
//! Stateless operations over a single `Position`, shared by the in-memory
//! ledger and the on-chain processor.

pub mod accrual;
pub mod collateral;
pub mod liquidation;

pub use accrual::InterestAccrual;
pub use collateral::CollateralManager;
pub use liquidation::{LiquidationEngine, LiquidationPlan};
