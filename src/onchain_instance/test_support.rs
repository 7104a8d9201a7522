//! In-memory stand-in for the ledger, used by unit tests.
//!
//! `MockNetwork` executes the counter program's four instructions against an
//! in-memory account map and records every transaction and fetch.

use std::{collections::HashMap, sync::Arc};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};

use super::connection::{Connector, Network};
use super::idl::{account_discriminator, instruction_discriminator};

#[derive(Default)]
pub struct MockNetwork {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    counters: HashMap<Pubkey, u64>,
    raw_accounts: HashMap<Pubkey, Vec<u8>>,
    sent: Vec<Transaction>,
    fetches: Vec<Pubkey>,
    fail_send: Option<String>,
    fail_fetch: Option<String>,
}

impl MockNetwork {
    pub fn fail_sends(&self, message: &str) {
        self.state.lock().fail_send = Some(message.to_string());
    }

    pub fn fail_fetches(&self, message: &str) {
        self.state.lock().fail_fetch = Some(message.to_string());
    }

    pub fn set_counter(&self, address: Pubkey, value: u64) {
        self.state.lock().counters.insert(address, value);
    }

    pub fn put_raw_account(&self, address: Pubkey, data: Vec<u8>) {
        self.state.lock().raw_accounts.insert(address, data);
    }

    pub fn counter(&self, address: &Pubkey) -> Option<u64> {
        self.state.lock().counters.get(address).copied()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().fetches.len()
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.state.lock().sent.clone()
    }

    /// Instruction data of the first instruction of every sent transaction
    pub fn sent_instruction_data(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .sent
            .iter()
            .map(|tx| tx.message.instructions[0].data.clone())
            .collect()
    }

    fn execute(state: &mut MockState, transaction: &Transaction) -> Result<()> {
        transaction
            .verify()
            .map_err(|e| anyhow!("signature verification failed: {}", e))?;

        let ix = transaction
            .message
            .instructions
            .first()
            .ok_or_else(|| anyhow!("empty transaction"))?;
        let my_account = ix
            .accounts
            .first()
            .and_then(|i| transaction.message.account_keys.get(*i as usize))
            .copied()
            .ok_or_else(|| anyhow!("missing counter account"))?;
        if ix.data.len() < 8 {
            bail!("instruction data too short");
        }
        let (discriminator, args) = ix.data.split_at(8);

        if discriminator == instruction_discriminator("initialize").as_slice() {
            if state.counters.contains_key(&my_account) {
                bail!("account {} already in use", my_account);
            }
            state.counters.insert(my_account, 0);
            return Ok(());
        }

        let current = state
            .counters
            .get_mut(&my_account)
            .ok_or_else(|| anyhow!("AccountNotInitialized: {}", my_account))?;
        if discriminator == instruction_discriminator("increment").as_slice() {
            *current = current.checked_add(1).ok_or_else(|| anyhow!("overflow"))?;
        } else if discriminator == instruction_discriminator("decrement").as_slice() {
            *current = current.checked_sub(1).ok_or_else(|| anyhow!("underflow"))?;
        } else if discriminator == instruction_discriminator("set").as_slice() {
            let bytes: [u8; 8] = args
                .get(..8)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| anyhow!("missing set argument"))?;
            *current = u64::from_le_bytes(bytes);
        } else {
            bail!("unknown instruction");
        }
        Ok(())
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let mut state = self.state.lock();
        state.sent.push(transaction.clone());
        if let Some(message) = &state.fail_send {
            bail!("{}", message);
        }
        Self::execute(&mut state, transaction)?;
        Ok(transaction.signatures[0])
    }

    async fn fetch_account(&self, address: &Pubkey) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        state.fetches.push(*address);
        if let Some(message) = &state.fail_fetch {
            bail!("{}", message);
        }
        if let Some(raw) = state.raw_accounts.get(address) {
            return Ok(raw.clone());
        }
        let value = state
            .counters
            .get(address)
            .ok_or_else(|| anyhow!("AccountNotFound: pubkey={}", address))?;
        let mut data = account_discriminator("MyAccount").to_vec();
        data.extend_from_slice(&value.to_le_bytes());
        Ok(data)
    }
}

/// Hands out the same [`MockNetwork`] for every connection and counts them.
#[derive(Default)]
pub struct MockConnector {
    pub network: Arc<MockNetwork>,
    connections: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn connections(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn last_endpoint(&self) -> Option<String> {
        self.connections.lock().last().cloned()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, endpoint: &str, _commitment: CommitmentConfig) -> Arc<dyn Network> {
        self.connections.lock().push(endpoint.to_string());
        // a real connector suspends here; let concurrent callers interleave
        tokio::task::yield_now().await;
        self.network.clone()
    }
}
