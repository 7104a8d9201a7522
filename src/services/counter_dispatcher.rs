//! Operation dispatcher for the four counter buttons.
//!
//! Every trigger walks the same path:
//! `EnsuringSession -> EnsuringProgram -> Invoking -> Refetching -> Rendered`,
//! dropping into `ErrorReported` on the first failure. Failures are logged
//! and leave the page label untouched; only `set` input problems are shown in
//! the label.

use std::sync::Arc;

use serde::Serialize;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use tracing::{debug, error, info};

use super::page::PageContext;
use crate::error::DappError;
use crate::onchain_instance::{
    connection::Connector,
    idl::ProgramInterface,
    instance::Operation,
};

pub const EMPTY_INPUT_MESSAGE: &str = "Input value cannot be empty";
pub const NOT_A_NUMBER_MESSAGE: &str = "Input value must be a number";

/// Process-wide inputs every page builds its handles from
pub struct CounterEnv {
    pub interface: Arc<ProgramInterface>,
    pub program_address: Pubkey,
    pub connector: Arc<dyn Connector>,
    pub endpoint: String,
    pub commitment: CommitmentConfig,
}

impl CounterEnv {
    pub fn new(
        interface: ProgramInterface,
        connector: Arc<dyn Connector>,
        endpoint: String,
        commitment: CommitmentConfig,
    ) -> Result<Self, DappError> {
        let program_address = interface.program_address()?;
        Ok(Self {
            interface: Arc::new(interface),
            program_address,
            connector,
            endpoint,
            commitment,
        })
    }

    #[cfg(test)]
    pub fn for_tests(connector: Arc<dyn Connector>) -> Self {
        let interface = ProgramInterface::bundled().expect("bundled IDL");
        Self::new(
            interface,
            connector,
            "http://127.0.0.1:8899".to_string(),
            CommitmentConfig::processed(),
        )
        .expect("bundled IDL address")
    }
}

/// Step an operation failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    EnsuringSession,
    EnsuringProgram,
    Invoking,
    Refetching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Rendered,
    Validation,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    pub operation: Operation,
    pub outcome: Outcome,
    /// Label text after the operation
    pub label: String,
    /// Whether the page should empty its numeric input
    pub clear_input: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Label text for a successful operation.
pub fn success_message(operation: Operation, value: u64) -> String {
    match operation {
        Operation::Initialize => format!("Value initialised to {}", value),
        Operation::Increment => format!("Value increment to {}", value),
        // set keeps the decrement wording
        Operation::Decrement | Operation::Set => format!("Value decrement to {}", value),
    }
}

/// Parses the numeric input of `set`.
pub fn parse_set_input(input: Option<&str>) -> Result<u64, DappError> {
    let text = input.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(DappError::Validation(EMPTY_INPUT_MESSAGE.to_string()));
    }
    text.parse::<u64>()
        .map_err(|_| DappError::Validation(NOT_A_NUMBER_MESSAGE.to_string()))
}

/// Runs one triggered operation on `page` to completion.
///
/// `input` is the numeric text field, only read by `set`.
pub async fn dispatch(
    page: &PageContext,
    env: &CounterEnv,
    operation: Operation,
    input: Option<&str>,
) -> OperationReport {
    let _turn = page.turn(operation).lock().await;

    let report = |outcome: Outcome, stage: Option<Stage>, error: Option<&DappError>| {
        OperationReport {
            operation,
            outcome,
            label: page.label(),
            clear_input: false,
            stage,
            error: error.map(|e| e.to_string()),
            signature: None,
        }
    };
    let failed = |stage: Stage, err: DappError| {
        error!("Transaction error ({} on page {}, {:?}): {}", operation, page.id(), stage, err);
        report(Outcome::Error, Some(stage), Some(&err))
    };

    let program = match page.ensure_program(env).await {
        Ok(program) => program,
        Err(err @ DappError::SessionMissing) => return failed(Stage::EnsuringSession, err),
        Err(err) => return failed(Stage::EnsuringProgram, err),
    };

    let counter = page.counter_address();
    debug!(
        "Page {}: {} on program {} as {}",
        page.id(),
        operation,
        program.program_id(),
        program.session().wallet.public_key()
    );
    let invocation = match operation {
        Operation::Initialize => program.initialize(page.identity()).await,
        Operation::Increment => program.increment(&counter).await,
        Operation::Decrement => program.decrement(&counter).await,
        Operation::Set => match parse_set_input(input) {
            Ok(value) => program.set(&counter, value).await,
            Err(err) => {
                debug!("Rejected set input on page {}: {}", page.id(), err);
                page.render(err.to_string());
                return report(Outcome::Validation, None, Some(&err));
            }
        },
    };
    let signature = match invocation {
        Ok(signature) => signature,
        Err(err) => return failed(Stage::Invoking, err),
    };

    let account = match program.fetch_counter(&counter).await {
        Ok(account) => account,
        Err(err) => return failed(Stage::Refetching, err),
    };
    info!("Account: {:?}", account);

    page.render(success_message(operation, account.data));
    OperationReport {
        clear_input: operation == Operation::Set,
        signature: Some(signature.to_string()),
        ..report(Outcome::Rendered, None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onchain_instance::idl::instruction_discriminator;
    use crate::onchain_instance::test_support::MockConnector;
    use crate::wallet::KeypairWallet;

    use std::io;

    struct Fixture {
        connector: Arc<MockConnector>,
        env: CounterEnv,
        page: PageContext,
    }

    fn fixture(with_wallet: bool) -> Fixture {
        let connector = Arc::new(MockConnector::default());
        let env = CounterEnv::for_tests(connector.clone());
        let page = PageContext::new();
        if with_wallet {
            page.connect_wallet(Arc::new(KeypairWallet::burner()));
        }
        Fixture { connector, env, page }
    }

    /// Captures formatted log output for the current thread.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).to_string()
        }
    }

    #[tokio::test]
    async fn test_no_wallet_fails_fast_for_every_operation() {
        let f = fixture(false);
        for operation in Operation::ALL {
            let report = dispatch(&f.page, &f.env, operation, Some("5")).await;
            assert_eq!(report.outcome, Outcome::Error);
            assert_eq!(report.stage, Some(Stage::EnsuringSession));
            assert_eq!(report.error, Some(DappError::SessionMissing.to_string()));
        }
        assert_eq!(f.connector.connections(), 0);
        assert_eq!(f.connector.network.sent_count(), 0);
        assert_eq!(f.page.label(), "");
    }

    #[tokio::test]
    async fn test_initialize_renders_fetched_value() {
        let f = fixture(true);
        let report = dispatch(&f.page, &f.env, Operation::Initialize, None).await;

        assert_eq!(report.outcome, Outcome::Rendered);
        assert_eq!(report.label, "Value initialised to 0");
        assert_eq!(f.page.label(), "Value initialised to 0");
        assert!(report.signature.is_some());
        assert!(!report.clear_input);
        assert_eq!(f.connector.network.counter(&f.page.counter_address()), Some(0));
    }

    #[tokio::test]
    async fn test_initialize_label_uses_refetched_value() {
        let f = fixture(true);
        dispatch(&f.page, &f.env, Operation::Initialize, None).await;
        // the ledger moved on between calls; the label shows what the fetch returns
        f.connector.network.set_counter(f.page.counter_address(), 9);
        let report = dispatch(&f.page, &f.env, Operation::Increment, None).await;
        assert_eq!(report.label, "Value increment to 10");
    }

    #[tokio::test]
    async fn test_operation_messages() {
        let f = fixture(true);
        dispatch(&f.page, &f.env, Operation::Initialize, None).await;

        let report = dispatch(&f.page, &f.env, Operation::Increment, None).await;
        assert_eq!(report.label, "Value increment to 1");

        let report = dispatch(&f.page, &f.env, Operation::Increment, None).await;
        assert_eq!(report.label, "Value increment to 2");

        let report = dispatch(&f.page, &f.env, Operation::Decrement, None).await;
        assert_eq!(report.label, "Value decrement to 1");

        let report = dispatch(&f.page, &f.env, Operation::Set, Some("7")).await;
        assert_eq!(report.label, "Value decrement to 7");
        assert!(report.clear_input);
    }

    #[tokio::test]
    async fn test_set_empty_input_skips_remote_call() {
        let f = fixture(true);
        for input in [None, Some(""), Some("   ")] {
            let report = dispatch(&f.page, &f.env, Operation::Set, input).await;
            assert_eq!(report.outcome, Outcome::Validation);
            assert_eq!(report.label, "Input value cannot be empty");
        }
        assert_eq!(f.connector.network.sent_count(), 0);
        assert_eq!(f.connector.network.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_set_non_numeric_input_skips_remote_call() {
        let f = fixture(true);
        for input in ["abc", "-3", "2.5"] {
            let report = dispatch(&f.page, &f.env, Operation::Set, Some(input)).await;
            assert_eq!(report.outcome, Outcome::Validation);
            assert_eq!(report.label, NOT_A_NUMBER_MESSAGE);
        }
        assert_eq!(f.connector.network.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_set_five_sends_one_call_then_one_fetch() {
        let f = fixture(true);
        f.connector.network.set_counter(f.page.counter_address(), 0);

        let report = dispatch(&f.page, &f.env, Operation::Set, Some("5")).await;

        assert_eq!(report.outcome, Outcome::Rendered);
        assert_eq!(report.label, "Value decrement to 5");
        let sent = f.connector.network.sent_instruction_data();
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0][..8], &instruction_discriminator("set"));
        assert_eq!(&sent[0][8..], &5u64.to_le_bytes());
        assert_eq!(f.connector.network.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_label_and_logs() {
        let f = fixture(true);
        dispatch(&f.page, &f.env, Operation::Initialize, None).await;
        assert_eq!(f.page.label(), "Value initialised to 0");

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        f.connector.network.fail_sends("node is unhealthy");
        for operation in Operation::ALL {
            let report = dispatch(&f.page, &f.env, operation, Some("3")).await;
            assert_eq!(report.outcome, Outcome::Error);
            assert_eq!(report.stage, Some(Stage::Invoking));
            assert_eq!(report.label, "Value initialised to 0");
        }
        assert_eq!(f.page.label(), "Value initialised to 0");
        assert!(logs.contents().contains("node is unhealthy"));
    }

    #[tokio::test]
    async fn test_refetch_failure_keeps_label() {
        let f = fixture(true);
        dispatch(&f.page, &f.env, Operation::Initialize, None).await;
        f.connector.network.fail_fetches("connection reset");

        let report = dispatch(&f.page, &f.env, Operation::Increment, None).await;
        assert_eq!(report.outcome, Outcome::Error);
        assert_eq!(report.stage, Some(Stage::Refetching));
        assert_eq!(f.page.label(), "Value initialised to 0");
        // the mutation itself went through
        assert_eq!(f.connector.network.counter(&f.page.counter_address()), Some(1));
    }

    #[tokio::test]
    async fn test_back_to_back_triggers_share_one_program_handle() {
        let f = fixture(true);
        dispatch(&f.page, &f.env, Operation::Initialize, None).await;

        let (a, b) = tokio::join!(
            dispatch(&f.page, &f.env, Operation::Increment, None),
            dispatch(&f.page, &f.env, Operation::Increment, None)
        );
        assert_eq!(a.outcome, Outcome::Rendered);
        assert_eq!(b.outcome, Outcome::Rendered);
        assert_eq!(f.connector.connections(), 1);
        assert_eq!(f.connector.network.counter(&f.page.counter_address()), Some(2));
        assert_eq!(f.page.label(), "Value increment to 2");
    }

    #[tokio::test]
    async fn test_broken_interface_fails_at_program_stage() {
        let connector = Arc::new(MockConnector::default());
        let mut interface = ProgramInterface::bundled().unwrap();
        interface.accounts.clear();
        let env = CounterEnv::new(
            interface,
            connector.clone(),
            "http://127.0.0.1:8899".to_string(),
            CommitmentConfig::processed(),
        )
        .unwrap();
        let page = PageContext::new();
        page.connect_wallet(Arc::new(KeypairWallet::burner()));

        let report = dispatch(&page, &env, Operation::Increment, None).await;
        assert_eq!(report.stage, Some(Stage::EnsuringProgram));
        assert_eq!(connector.network.sent_count(), 0);
    }

    #[test]
    fn test_parse_set_input() {
        assert_eq!(parse_set_input(Some(" 12 ")).unwrap(), 12);
        assert_eq!(
            parse_set_input(Some("")).unwrap_err(),
            DappError::Validation(EMPTY_INPUT_MESSAGE.into())
        );
        assert_eq!(
            parse_set_input(Some("twelve")).unwrap_err(),
            DappError::Validation(NOT_A_NUMBER_MESSAGE.into())
        );
    }
}
