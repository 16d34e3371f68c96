//!
//! Base-chain primitives: transactions and their wire encoding, standard scripts,
//! transaction ids and virtual size, signature hashing and key-spend signing.
//!

pub mod config;
pub mod errors;
pub mod hashing;
pub mod network;
pub mod script;
pub mod sign;
pub mod tx;
