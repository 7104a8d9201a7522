// --- Request and response bodies of the page API ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::PageContext;
use crate::wallet::WalletKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub kind: WalletKind,
    pub public_key: String, // base58 pubkey
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse {
    pub page_id: Uuid,
    pub counter_address: String, // base58 pubkey
    pub created_at: DateTime<Utc>,
    pub wallet: Option<WalletInfo>,
    pub label: String,
}

impl From<&PageContext> for PageResponse {
    fn from(page: &PageContext) -> Self {
        Self {
            page_id: page.id(),
            counter_address: page.counter_address().to_string(),
            created_at: page.created_at(),
            wallet: page.wallet().map(|wallet| WalletInfo {
                kind: wallet.kind(),
                public_key: wallet.public_key().to_string(),
            }),
            label: page.label(),
        }
    }
}

// --- Request structs ---
#[derive(Debug, Deserialize)]
pub struct ConnectWalletRequest {
    pub wallet: WalletKind,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetValueRequest {
    /// Raw text of the numeric input
    #[serde(default)]
    pub value: Option<String>,
}
