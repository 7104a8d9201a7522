//! Program interface description (Anchor IDL) for the counter program.
//!
//! Only the parts of the IDL format the client consumes are modelled; the
//! document must survive a JSON round trip unchanged.

use std::str::FromStr;

use anchor_lang::solana_program::hash::hash;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::DappError;

/// Interface description bundled with the page
pub const BUNDLED_IDL: &str = include_str!("../../idl/counter.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramInterface {
    pub version: String,
    pub name: String,
    pub instructions: Vec<IdlInstruction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<IdlTypeDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<IdlTypeDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<IdlErrorCode>,
    pub metadata: IdlMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    pub accounts: Vec<IdlAccountItem>,
    pub args: Vec<IdlField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdlAccountItem {
    pub name: String,
    pub is_mut: bool,
    pub is_signer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlType {
    Primitive(String),
    Defined { defined: String },
    Option { option: Box<IdlType> },
    Vec { vec: Box<IdlType> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdlTypeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlTypeDefBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdlTypeDefBody {
    pub kind: String,
    #[serde(default)]
    pub fields: Vec<IdlField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdlErrorCode {
    pub code: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdlMetadata {
    pub address: String,
}

impl ProgramInterface {
    pub fn from_json(json: &str) -> Result<Self, DappError> {
        serde_json::from_str(json).map_err(|e| DappError::InterfaceDescription(e.to_string()))
    }

    pub fn bundled() -> Result<Self, DappError> {
        Self::from_json(BUNDLED_IDL)
    }

    /// Serializes to JSON and parses it back. The program handle is always
    /// built from the re-parsed copy.
    pub fn round_trip(&self) -> Result<Self, DappError> {
        let json = serde_json::to_string(self)
            .map_err(|e| DappError::InterfaceDescription(e.to_string()))?;
        Self::from_json(&json)
    }

    pub fn program_address(&self) -> Result<Pubkey, DappError> {
        Pubkey::from_str(&self.metadata.address).map_err(|e| {
            DappError::InterfaceDescription(format!(
                "invalid program address '{}': {}",
                self.metadata.address, e
            ))
        })
    }

    pub fn instruction(&self, name: &str) -> Option<&IdlInstruction> {
        self.instructions.iter().find(|ix| ix.name == name)
    }

    pub fn account(&self, name: &str) -> Option<&IdlTypeDef> {
        self.accounts.iter().find(|acc| acc.name == name)
    }
}

/// `sha256("global:<snake_case_name>")[..8]`
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    sighash("global", &to_snake_case(name))
}

/// `sha256("account:<AccountName>")[..8]`
pub fn account_discriminator(name: &str) -> [u8; 8] {
    sighash("account", name)
}

fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let preimage = format!("{}:{}", namespace, name);
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash(preimage.as_bytes()).to_bytes()[..8]);
    discriminator
}

/// IDL names are camelCase, program entrypoints are snake_case.
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
