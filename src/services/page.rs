//! Page context: everything one loaded page owns.
//!
//! A page gets a fresh counter identity when it is created and keeps its
//! session handle and program handle in ensure-once slots for its lifetime.
//! Connecting or disconnecting a wallet swaps in empty slots.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tokio::sync::{Mutex as AsyncMutex, OnceCell};
use tracing::info;
use uuid::Uuid;

use super::counter_dispatcher::CounterEnv;
use crate::error::DappError;
use crate::onchain_instance::{
    connection::{SessionHandle, get_session},
    instance::{CounterProgram, Operation, ProgramHandle},
};
use crate::wallet::WalletCapability;

#[derive(Default)]
struct HandleSlots {
    session: OnceCell<SessionHandle>,
    program: OnceCell<ProgramHandle>,
}

pub struct PageContext {
    id: Uuid,
    created_at: DateTime<Utc>,
    last_used: Mutex<DateTime<Utc>>,
    identity: Keypair,
    wallet: RwLock<Option<Arc<dyn WalletCapability>>>,
    handles: RwLock<Arc<HandleSlots>>,
    label: Mutex<String>,
    turns: [AsyncMutex<()>; 4],
}

impl PageContext {
    pub fn new() -> Self {
        let now = Utc::now();
        let page = Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_used: Mutex::new(now),
            identity: Keypair::new(),
            wallet: RwLock::new(None),
            handles: RwLock::new(Arc::new(HandleSlots::default())),
            label: Mutex::new(String::new()),
            turns: Default::default(),
        };
        info!("Page {} created with counter account {}", page.id, page.counter_address());
        page
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last time the page was opened or looked up by a request
    pub fn last_used(&self) -> DateTime<Utc> {
        *self.last_used.lock()
    }

    pub(crate) fn touch(&self) {
        *self.last_used.lock() = Utc::now();
    }

    #[cfg(test)]
    pub(crate) fn set_last_used(&self, at: DateTime<Utc>) {
        *self.last_used.lock() = at;
    }

    /// Session identity: the address of this page's counter account
    pub fn counter_address(&self) -> Pubkey {
        self.identity.pubkey()
    }

    pub(crate) fn identity(&self) -> &Keypair {
        &self.identity
    }

    pub fn wallet(&self) -> Option<Arc<dyn WalletCapability>> {
        self.wallet.read().clone()
    }

    pub fn connect_wallet(&self, wallet: Arc<dyn WalletCapability>) {
        *self.wallet.write() = Some(wallet);
        self.reset_handles();
    }

    pub fn disconnect_wallet(&self) {
        *self.wallet.write() = None;
        self.reset_handles();
    }

    fn reset_handles(&self) {
        *self.handles.write() = Arc::new(HandleSlots::default());
    }

    fn handles(&self) -> Arc<HandleSlots> {
        self.handles.read().clone()
    }

    pub fn label(&self) -> String {
        self.label.lock().clone()
    }

    pub(crate) fn render(&self, text: String) {
        *self.label.lock() = text;
    }

    /// Serializes triggers of one operation kind on this page.
    pub(crate) fn turn(&self, operation: Operation) -> &AsyncMutex<()> {
        let index = match operation {
            Operation::Initialize => 0,
            Operation::Increment => 1,
            Operation::Decrement => 2,
            Operation::Set => 3,
        };
        &self.turns[index]
    }

    async fn ensure_session(
        &self,
        env: &CounterEnv,
        slots: &HandleSlots,
    ) -> Result<SessionHandle, DappError> {
        slots
            .session
            .get_or_try_init(|| async {
                get_session(
                    self.wallet(),
                    env.connector.as_ref(),
                    &env.endpoint,
                    env.commitment,
                )
                .await
            })
            .await
            .cloned()
    }

    async fn ensure_program_with(
        &self,
        env: &CounterEnv,
        slots: &HandleSlots,
        session: SessionHandle,
    ) -> Result<ProgramHandle, DappError> {
        slots
            .program
            .get_or_try_init(|| async move {
                let interface = env.interface.round_trip()?;
                let program = CounterProgram::new(session, &interface, env.program_address)?;
                info!("Page {}: program handle constructed", self.id);
                Ok::<_, DappError>(Arc::new(program))
            })
            .await
            .cloned()
    }

    /// Session first, then program; both at most once per wallet connection.
    ///
    /// Session construction only fails with [`DappError::SessionMissing`].
    pub async fn ensure_program(&self, env: &CounterEnv) -> Result<ProgramHandle, DappError> {
        let slots = self.handles();
        let session = self.ensure_session(env, &slots).await?;
        self.ensure_program_with(env, &slots, session).await
    }
}

impl Default for PageContext {
    fn default() -> Self {
        Self::new()
    }
}
