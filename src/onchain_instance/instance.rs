use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_program,
    transaction::Transaction,
};
use tracing::{debug, info};

use super::connection::SessionHandle;
use super::idl::{
    IdlAccountItem, IdlField, IdlType, ProgramInterface, account_discriminator,
    instruction_discriminator,
};
use crate::error::DappError;

/// Account type holding the counter, as named in the interface description
pub const COUNTER_ACCOUNT: &str = "MyAccount";
/// Field of [`COUNTER_ACCOUNT`] carrying the value
pub const COUNTER_FIELD: &str = "data";

/// The counter program's mutating methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Initialize,
    Increment,
    Decrement,
    Set,
}

impl Operation {
    #[cfg(test)]
    pub const ALL: [Operation; 4] = [
        Operation::Initialize,
        Operation::Increment,
        Operation::Decrement,
        Operation::Set,
    ];

    pub fn method_name(&self) -> &'static str {
        match self {
            Operation::Initialize => "initialize",
            Operation::Increment => "increment",
            Operation::Decrement => "decrement",
            Operation::Set => "set",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Decoded counter account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterAccount {
    pub data: u64,
}

/// One instruction of the interface description, resolved for sending
#[derive(Debug, Clone)]
struct ResolvedInstruction {
    discriminator: [u8; 8],
    accounts: Vec<IdlAccountItem>,
    args: Vec<IdlField>,
}

/// Callable handle on the deployed counter program.
///
/// Every method issues exactly one transaction (or one account read) through
/// the session's network, signed by the session's wallet.
pub struct CounterProgram {
    session: SessionHandle,
    program_id: Pubkey,
    initialize: ResolvedInstruction,
    increment: ResolvedInstruction,
    decrement: ResolvedInstruction,
    set: ResolvedInstruction,
    account_discriminator: [u8; 8],
    account_layout: Vec<IdlField>,
}

impl CounterProgram {
    /// Binds `interface` and `program_id` to `session`.
    ///
    /// Fails if the description lacks one of the four methods, references
    /// accounts the client cannot supply, or has no usable counter layout.
    pub fn new(
        session: SessionHandle,
        interface: &ProgramInterface,
        program_id: Pubkey,
    ) -> Result<Self, DappError> {
        let resolve = |operation: Operation| -> Result<ResolvedInstruction, DappError> {
            let ix = interface.instruction(operation.method_name()).ok_or_else(|| {
                DappError::InterfaceDescription(format!("missing instruction `{}`", operation))
            })?;
            for account in &ix.accounts {
                if !matches!(account.name.as_str(), "myAccount" | "user" | "systemProgram") {
                    return Err(DappError::InterfaceDescription(format!(
                        "instruction `{}` needs unsupported account `{}`",
                        operation, account.name
                    )));
                }
            }
            let expected_args = usize::from(operation == Operation::Set);
            if ix.args.len() != expected_args {
                return Err(DappError::InterfaceDescription(format!(
                    "instruction `{}` takes {} arguments, expected {}",
                    operation,
                    ix.args.len(),
                    expected_args
                )));
            }
            Ok(ResolvedInstruction {
                discriminator: instruction_discriminator(&ix.name),
                accounts: ix.accounts.clone(),
                args: ix.args.clone(),
            })
        };

        let account = interface.account(COUNTER_ACCOUNT).ok_or_else(|| {
            DappError::InterfaceDescription(format!("missing account type `{}`", COUNTER_ACCOUNT))
        })?;
        let mut has_counter_field = false;
        for field in &account.ty.fields {
            primitive_width(&field.ty)?;
            has_counter_field |= field.name == COUNTER_FIELD;
        }
        if !has_counter_field {
            return Err(DappError::InterfaceDescription(format!(
                "account `{}` has no `{}` field",
                COUNTER_ACCOUNT, COUNTER_FIELD
            )));
        }

        let program = Self {
            initialize: resolve(Operation::Initialize)?,
            increment: resolve(Operation::Increment)?,
            decrement: resolve(Operation::Decrement)?,
            set: resolve(Operation::Set)?,
            account_discriminator: account_discriminator(&account.name),
            account_layout: account.ty.fields.clone(),
            session,
            program_id,
        };
        info!(
            "Program handle ready: {} v{} at {}",
            interface.name, interface.version, program_id
        );
        Ok(program)
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Creates the counter account at `counter`, paid for by the wallet.
    pub async fn initialize(&self, counter: &Keypair) -> Result<Signature, DappError> {
        let ix = self.instruction(Operation::Initialize, &counter.pubkey(), None)?;
        self.rpc(Operation::Initialize, ix, Some(counter)).await
    }

    pub async fn increment(&self, counter: &Pubkey) -> Result<Signature, DappError> {
        let ix = self.instruction(Operation::Increment, counter, None)?;
        self.rpc(Operation::Increment, ix, None).await
    }

    pub async fn decrement(&self, counter: &Pubkey) -> Result<Signature, DappError> {
        let ix = self.instruction(Operation::Decrement, counter, None)?;
        self.rpc(Operation::Decrement, ix, None).await
    }

    pub async fn set(&self, counter: &Pubkey, value: u64) -> Result<Signature, DappError> {
        let ix = self.instruction(Operation::Set, counter, Some(value))?;
        self.rpc(Operation::Set, ix, None).await
    }

    /// Reads and decodes the counter account at `counter`.
    pub async fn fetch_counter(&self, counter: &Pubkey) -> Result<CounterAccount, DappError> {
        let data = self
            .session
            .network
            .fetch_account(counter)
            .await
            .map_err(|e| DappError::RemoteFetch { message: format!("{:#}", e) })?;
        self.decode_counter(&data)
    }

    fn resolved(&self, operation: Operation) -> &ResolvedInstruction {
        match operation {
            Operation::Initialize => &self.initialize,
            Operation::Increment => &self.increment,
            Operation::Decrement => &self.decrement,
            Operation::Set => &self.set,
        }
    }

    fn instruction(
        &self,
        operation: Operation,
        counter: &Pubkey,
        value: Option<u64>,
    ) -> Result<Instruction, DappError> {
        let resolved = self.resolved(operation);
        let wallet = self.session.wallet.public_key();

        let accounts = resolved
            .accounts
            .iter()
            .map(|item| {
                let pubkey = match item.name.as_str() {
                    "myAccount" => *counter,
                    "user" => wallet,
                    _ => system_program::id(),
                };
                AccountMeta {
                    pubkey,
                    is_signer: item.is_signer,
                    is_writable: item.is_mut,
                }
            })
            .collect();

        let mut data = resolved.discriminator.to_vec();
        if let (Some(field), Some(value)) = (resolved.args.first(), value) {
            data.extend_from_slice(&encode_integer(field, value)?);
        }

        Ok(Instruction {
            program_id: self.program_id,
            accounts,
            data,
        })
    }

    async fn rpc(
        &self,
        operation: Operation,
        instruction: Instruction,
        co_signer: Option<&Keypair>,
    ) -> Result<Signature, DappError> {
        let invocation_error = |message: String| DappError::RemoteInvocation { operation, message };
        let network = &self.session.network;
        let wallet = &self.session.wallet;

        let recent_blockhash = network
            .latest_blockhash()
            .await
            .map_err(|e| invocation_error(format!("{:#}", e)))?;

        let message = Message::new(&[instruction], Some(&wallet.public_key()));
        let mut transaction = Transaction::new_unsigned(message);
        if let Some(signer) = co_signer {
            transaction
                .try_partial_sign(&[signer], recent_blockhash)
                .map_err(|e| invocation_error(e.to_string()))?;
        }
        wallet
            .sign_transaction(&mut transaction, recent_blockhash)
            .map_err(|e| invocation_error(e.to_string()))?;

        let signature = network
            .send_transaction(&transaction)
            .await
            .map_err(|e| invocation_error(format!("{:#}", e)))?;
        debug!("{} confirmed: {}", operation, signature);
        Ok(signature)
    }

    fn decode_counter(&self, data: &[u8]) -> Result<CounterAccount, DappError> {
        let fetch_error = |message: String| DappError::RemoteFetch { message };

        if data.len() < 8 || data[..8] != self.account_discriminator {
            return Err(fetch_error(format!(
                "account is not a `{}` (discriminator mismatch)",
                COUNTER_ACCOUNT
            )));
        }

        let mut offset = 8;
        for field in &self.account_layout {
            let width = primitive_width(&field.ty)?;
            let bytes = data
                .get(offset..offset + width)
                .ok_or_else(|| fetch_error(format!("account data truncated at `{}`", field.name)))?;
            if field.name == COUNTER_FIELD {
                let value = decode_integer(&field.ty, bytes).ok_or_else(|| {
                    fetch_error(format!("`{}` is not a non-negative integer", COUNTER_FIELD))
                })?;
                return Ok(CounterAccount { data: value });
            }
            offset += width;
        }
        Err(fetch_error(format!("account has no `{}` field", COUNTER_FIELD)))
    }
}

/// Shared handle type stored in a page's program slot
pub type ProgramHandle = Arc<CounterProgram>;

fn primitive_name(ty: &IdlType) -> Option<&str> {
    match ty {
        IdlType::Primitive(name) => Some(name.as_str()),
        _ => None,
    }
}

/// Byte width of the fixed-size primitives a counter account may contain.
fn primitive_width(ty: &IdlType) -> Result<usize, DappError> {
    let width = match primitive_name(ty) {
        Some("bool" | "u8" | "i8") => 1,
        Some("u16" | "i16") => 2,
        Some("u32" | "i32") => 4,
        Some("u64" | "i64") => 8,
        Some("u128" | "i128") => 16,
        Some("publicKey" | "pubkey") => 32,
        _ => {
            return Err(DappError::InterfaceDescription(format!(
                "unsupported field type {:?}",
                ty
            )));
        }
    };
    Ok(width)
}

fn encode_integer(field: &IdlField, value: u64) -> Result<Vec<u8>, DappError> {
    let out_of_range = || {
        DappError::Validation(format!("{} does not fit argument `{}` ({:?})", value, field.name, field.ty))
    };
    let bytes = match primitive_name(&field.ty) {
        Some("u8") => u8::try_from(value).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
        Some("u16") => u16::try_from(value).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
        Some("u32") => u32::try_from(value).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
        Some("u64") => value.to_le_bytes().to_vec(),
        Some("i64") => i64::try_from(value).map_err(|_| out_of_range())?.to_le_bytes().to_vec(),
        Some("u128") => u128::from(value).to_le_bytes().to_vec(),
        _ => {
            return Err(DappError::InterfaceDescription(format!(
                "argument `{}` has non-integer type {:?}",
                field.name, field.ty
            )));
        }
    };
    Ok(bytes)
}

fn decode_integer(ty: &IdlType, bytes: &[u8]) -> Option<u64> {
    match primitive_name(ty)? {
        "u8" => Some(u64::from(bytes[0])),
        "u16" => Some(u64::from(u16::from_le_bytes(bytes.try_into().ok()?))),
        "u32" => Some(u64::from(u32::from_le_bytes(bytes.try_into().ok()?))),
        "u64" => Some(u64::from_le_bytes(bytes.try_into().ok()?)),
        "i64" => u64::try_from(i64::from_le_bytes(bytes.try_into().ok()?)).ok(),
        "u128" => u64::try_from(u128::from_le_bytes(bytes.try_into().ok()?)).ok(),
        _ => None,
    }
}
