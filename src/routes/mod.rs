// # Routes Module
//
// - HTTP route handlers of the counter page, grouped by concern.
//
//  ## Available Route Modules
// - `health`: Health check endpoint
// - `pages`: Page serving and page context lifecycle
// - `wallet`: Wallet connect control
// - `counter`: The four counter operations

/// Health check endpoint
pub mod health;

/// Page serving and page context lifecycle
pub mod pages;

/// Wallet connect control
pub mod wallet;

/// Counter operation endpoints
pub mod counter;
