//! Connection factory: pairs a network connection with a connected wallet.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use tracing::{debug, info, warn};

use crate::error::DappError;
use crate::wallet::WalletCapability;

/// The ledger primitives a session needs.
#[async_trait]
pub trait Network: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Submits a fully signed transaction and waits for the session's commitment.
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    /// Raw account data at `address`.
    async fn fetch_account(&self, address: &Pubkey) -> Result<Vec<u8>>;
}

/// Opens network connections. Production code uses [`RpcConnector`].
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str, commitment: CommitmentConfig) -> Arc<dyn Network>;
}

pub struct RpcNetwork {
    client: RpcClient,
}

impl RpcNetwork {
    pub fn new(endpoint: &str, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_commitment(endpoint.to_string(), commitment),
        }
    }
}

#[async_trait]
impl Network for RpcNetwork {
    async fn latest_blockhash(&self) -> Result<Hash> {
        self.client
            .get_latest_blockhash()
            .await
            .context("Failed to get latest blockhash")
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let signature = self
            .client
            .send_and_confirm_transaction(transaction)
            .await
            .context("Failed to send transaction")?;
        debug!("Transaction confirmed: {}", signature);
        Ok(signature)
    }

    async fn fetch_account(&self, address: &Pubkey) -> Result<Vec<u8>> {
        self.client
            .get_account_data(address)
            .await
            .with_context(|| format!("Failed to fetch account {}", address))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RpcConnector;

#[async_trait]
impl Connector for RpcConnector {
    async fn connect(&self, endpoint: &str, commitment: CommitmentConfig) -> Arc<dyn Network> {
        Arc::new(RpcNetwork::new(endpoint, commitment))
    }
}

/// Network connection + wallet + commitment policy.
#[derive(Clone)]
pub struct SessionHandle {
    pub network: Arc<dyn Network>,
    pub wallet: Arc<dyn WalletCapability>,
    pub commitment: CommitmentConfig,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("wallet", &self.wallet.public_key())
            .field("commitment", &self.commitment)
            .finish()
    }
}

/// Builds a session handle for `wallet`.
///
/// A missing wallet is reported on the log and returned as
/// [`DappError::SessionMissing`]; nothing is connected in that case.
pub async fn get_session(
    wallet: Option<Arc<dyn WalletCapability>>,
    connector: &dyn Connector,
    endpoint: &str,
    commitment: CommitmentConfig,
) -> Result<SessionHandle, DappError> {
    let Some(wallet) = wallet else {
        warn!("Wallet is null!");
        return Err(DappError::SessionMissing);
    };

    let network = connector.connect(endpoint, commitment).await;
    info!(
        "Connection is OK: {} ({:?}) for wallet {}",
        endpoint,
        commitment.commitment,
        wallet.public_key()
    );

    Ok(SessionHandle {
        network,
        wallet,
        commitment,
    })
}
