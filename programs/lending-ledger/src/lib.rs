// Collateralized Lending Ledger
// Native Solana implementation - NO ANCHOR

use solana_program::entrypoint;

pub mod engine;
pub mod error;
pub mod events;
pub mod instructions;
pub mod interface;
pub mod ledger;
pub mod math;
pub mod processor;
pub mod state;

use processor::process_instruction;

// Declare program ID
solana_program::declare_id!("LendLedger111111111111111111111111111111111");

#[cfg(not(feature = "no-entrypoint"))]
entrypoint!(process_instruction);
