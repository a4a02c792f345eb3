// stockroom_server/src/lib.rs

//! HTTP facade over the stockroom ledger.

pub mod config;
pub mod errors;
pub mod seed;
pub mod state;
pub mod web;
