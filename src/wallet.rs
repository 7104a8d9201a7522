//! # Wallet Module
//!
//! Wallet capabilities the dispatcher signs with. A page has at most one
//! connected wallet at a time; the dispatcher only ever sees it through
//! [`WalletCapability`].

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signer, read_keypair_file},
    transaction::Transaction,
};
use tracing::{info, warn};

use crate::error::DappError;

/// Public key plus transaction signing, nothing else.
pub trait WalletCapability: Send + Sync {
    fn public_key(&self) -> Pubkey;

    /// Adds this wallet's signature to `transaction`.
    fn sign_transaction(
        &self,
        transaction: &mut Transaction,
        recent_blockhash: Hash,
    ) -> Result<(), DappError>;

    fn kind(&self) -> WalletKind;
}

/// Wallets selectable from the connect control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    /// Throwaway keypair generated on connect
    Burner,
    /// Keypair file configured with WALLET_KEYPAIR_PATH
    Keypair,
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletKind::Burner => write!(f, "burner"),
            WalletKind::Keypair => write!(f, "keypair"),
        }
    }
}

/// Wallet backed by an in-process keypair
pub struct KeypairWallet {
    keypair: Keypair,
    kind: WalletKind,
}

impl KeypairWallet {
    pub fn burner() -> Self {
        Self {
            keypair: Keypair::new(),
            kind: WalletKind::Burner,
        }
    }

    pub fn from_file(path: &str) -> Result<Self, DappError> {
        let keypair = read_keypair_file(path)
            .map_err(|e| DappError::Wallet(format!("Failed to read keypair from {}: {}", path, e)))?;
        Ok(Self {
            keypair,
            kind: WalletKind::Keypair,
        })
    }
}

impl WalletCapability for KeypairWallet {
    fn public_key(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn sign_transaction(
        &self,
        transaction: &mut Transaction,
        recent_blockhash: Hash,
    ) -> Result<(), DappError> {
        transaction
            .try_partial_sign(&[&self.keypair], recent_blockhash)
            .map_err(|e| DappError::Wallet(format!("Signing failed: {}", e)))
    }

    fn kind(&self) -> WalletKind {
        self.kind
    }
}

/// Connects the requested wallet.
pub fn connect(
    kind: WalletKind,
    keypair_path: &str,
) -> Result<Arc<dyn WalletCapability>, DappError> {
    let wallet = match kind {
        WalletKind::Burner => KeypairWallet::burner(),
        WalletKind::Keypair => KeypairWallet::from_file(keypair_path).inspect_err(|e| {
            warn!("Wallet connection failed: {}", e);
        })?,
    };
    info!("Wallet connected ({}): {}", kind, wallet.public_key());
    Ok(Arc::new(wallet))
}
