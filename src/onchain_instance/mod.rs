//! # Onchain Program Instance Module
//!
//! This module contains everything needed to talk to the counter program
//! deployed on Solana.
//!
//! ## Features
//! - Connection factory pairing a wallet with an RPC connection
//! - Program interface description (Anchor IDL) loading and validation
//! - Program handle building, signing and sending the four counter instructions
//! - Counter account decoding

/// Connection factory and network seam
pub mod connection;

/// Program interface description
pub mod idl;

/// Counter program handle
pub mod instance;

#[cfg(test)]
pub mod test_support;
