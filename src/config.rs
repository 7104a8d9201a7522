//! Configuration module for environment variables and application settings

use std::{env, str::FromStr};

use anchor_client::Cluster;
use anyhow::{Result, anyhow};
use solana_sdk::commitment_config::CommitmentConfig;

/// Default keypair used by the "keypair" wallet option
const DEFAULT_KEYPAIR_PATH: &str = "~/.config/solana/id.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Ledger cluster the session handles connect to
    pub cluster: Cluster,

    /// Commitment used for preflight, confirmation and account reads
    pub commitment: CommitmentConfig,

    /// Optional override for the bundled program interface description
    pub idl_path: Option<String>,

    /// Keypair file backing the "keypair" wallet option (tilde-expanded)
    pub wallet_keypair_path: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Page context retention
    pub pages: PageLimits,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Pages untouched for this long are dropped by the sweeper
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    /// Opening a page beyond this evicts the least recently used one
    pub max_pages: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            sweep_interval_secs: 60,
            max_pages: 1024,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cluster_name = lookup("SOLANA_CLUSTER").unwrap_or_else(|| "localnet".to_string());
        let cluster = Cluster::from_str(&cluster_name)
            .map_err(|e| anyhow!("Invalid SOLANA_CLUSTER '{}': {}", cluster_name, e))?;

        let commitment_name =
            lookup("SOLANA_COMMITMENT").unwrap_or_else(|| "processed".to_string());
        let commitment = CommitmentConfig::from_str(&commitment_name)
            .map_err(|_| anyhow!("Invalid SOLANA_COMMITMENT '{}'", commitment_name))?;

        let defaults = PageLimits::default();
        let wallet_keypair_path = lookup("WALLET_KEYPAIR_PATH")
            .unwrap_or_else(|| DEFAULT_KEYPAIR_PATH.to_string());

        Ok(Self {
            cluster,
            commitment,
            idl_path: lookup("IDL_PATH").filter(|p| !p.trim().is_empty()),
            wallet_keypair_path: shellexpand::tilde(&wallet_keypair_path).to_string(),
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                // $PORT wins over SERVER_PORT for hosted deployments
                port: lookup("PORT")
                    .or_else(|| lookup("SERVER_PORT"))
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(3000),
                allowed_origins: lookup("ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|o| o.trim().to_string())
                            .filter(|o| !o.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            pages: PageLimits {
                idle_timeout_secs: parse_positive(&lookup, "PAGE_IDLE_TIMEOUT_SECS")?
                    .unwrap_or(defaults.idle_timeout_secs),
                sweep_interval_secs: parse_positive(&lookup, "PAGE_SWEEP_INTERVAL_SECS")?
                    .unwrap_or(defaults.sweep_interval_secs),
                max_pages: parse_positive(&lookup, "MAX_PAGES")?
                    .map(|n| n as usize)
                    .unwrap_or(defaults.max_pages),
            },
        })
    }

    /// RPC endpoint of the configured cluster
    pub fn rpc_url(&self) -> &str {
        self.cluster.url()
    }
}

fn parse_positive<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(anyhow!("Invalid {} '{}': expected a positive integer", key, raw)),
        },
    }
}
