pub mod clear;
pub mod config;
pub mod daemon;
pub mod ledger;
pub mod prompts;
pub mod sync;
