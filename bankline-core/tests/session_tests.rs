//! Integration tests for the banking session
//!
//! Lifecycle and query behavior against scripted engines that record every
//! call, plus end-to-end walkthroughs against the demo engine in a temporary
//! working directory.
//!
//! Run with: cargo test --test session_tests -- --nocapture

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use bankline_core::adapters::demo::DemoBackend;
use bankline_core::domain::{Account, Credential, DateRange, EngineVersion};
use bankline_core::ports::{
    AccountRef, BankingEngine, EngineAccount, EngineBackend, EngineError, EngineResult,
    EngineTransaction, EngineUser, EngineUserList, EngineValue, UserListHandle,
};
use bankline_core::services::{
    live_sessions, BankingSession, EntryPoint, LoggingService, SessionState,
};
use bankline_core::Error;

// ============================================================================
// Test Helpers
// ============================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn eur(cents: i64) -> Option<EngineValue> {
    Some(EngineValue {
        amount: Decimal::new(cents, 2),
        currency: Some("EUR".to_string()),
    })
}

fn scripted_tx(day: u32, cents: i64) -> EngineTransaction {
    EngineTransaction {
        purpose: vec![format!("payment {}", day)],
        date: Some(date(2014, 5, day)),
        value: eur(cents),
        ..Default::default()
    }
}

fn scripted_account(id: &str) -> EngineAccount {
    EngineAccount {
        unique_id: id.to_string(),
        account_name: Some("Girokonto".to_string()),
        currency: Some("EUR".to_string()),
        account_number: Some(id.to_string()),
        bank_code: Some("10000000".to_string()),
        ..Default::default()
    }
}

/// Canned engine responses
#[derive(Clone, Default)]
struct Script {
    users: Vec<EngineUser>,
    accounts: Vec<EngineAccount>,
    transactions: Vec<EngineTransaction>,
    fail_construct: bool,
    fail_destroy: bool,
    fail_shutdown: bool,
}

/// Backend producing scripted engines and recording what they are asked
struct ScriptedBackend {
    name: String,
    version: EngineVersion,
    script: Script,
    calls: Arc<Mutex<Vec<String>>>,
    open_lists: Arc<AtomicUsize>,
    inits: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl ScriptedBackend {
    fn new(name: &str, script: Script) -> Self {
        Self {
            name: name.to_string(),
            version: EngineVersion::new(5, 4, 1),
            script,
            calls: Arc::new(Mutex::new(Vec::new())),
            open_lists: Arc::new(AtomicUsize::new(0)),
            inits: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn query_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("list_"))
            .count()
    }
}

impl EngineBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> EngineVersion {
        self.version
    }

    fn process_init(&self) -> EngineResult<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn process_shutdown(&self) -> EngineResult<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_shutdown {
            return Err(EngineError::state("global state still referenced"));
        }
        Ok(())
    }

    fn construct(&self, _profile: &str, _working_dir: &Path) -> EngineResult<Box<dyn BankingEngine>> {
        if self.script.fail_construct {
            return Err(EngineError::state("config directory unreadable"));
        }
        Ok(Box::new(ScriptedEngine {
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
            open_lists: Arc::clone(&self.open_lists),
            registered: 0,
        }))
    }
}

struct ScriptedEngine {
    script: Script,
    calls: Arc<Mutex<Vec<String>>>,
    open_lists: Arc<AtomicUsize>,
    registered: usize,
}

impl ScriptedEngine {
    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

impl BankingEngine for ScriptedEngine {
    fn register_credential(&mut self, code: &str, _user: &str, secret: &str) -> EngineResult<()> {
        self.record("register_credential");
        if secret == "wrong" {
            return Err(EngineError::rejected(format!("bad PIN for {}", code)));
        }
        self.registered += 1;
        Ok(())
    }

    fn list_users(&mut self) -> EngineResult<EngineUserList> {
        self.record("list_users");
        if self.registered == 0 {
            return Err(EngineError::NoCredentials);
        }
        self.open_lists.fetch_add(1, Ordering::SeqCst);
        Ok(EngineUserList {
            handle: UserListHandle(7),
            users: self.script.users.clone(),
        })
    }

    fn free_user_list(&mut self, _handle: UserListHandle) -> EngineResult<()> {
        self.record("free_user_list");
        self.open_lists.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn list_accounts(&mut self) -> EngineResult<Vec<EngineAccount>> {
        self.record("list_accounts");
        if self.registered == 0 {
            return Err(EngineError::NoCredentials);
        }
        Ok(self.script.accounts.clone())
    }

    fn list_transactions(
        &mut self,
        account: &AccountRef,
        _from: Option<NaiveDate>,
        _to: Option<NaiveDate>,
    ) -> EngineResult<Vec<EngineTransaction>> {
        self.record("list_transactions");
        if !self.script.accounts.iter().any(|a| a.unique_id == account.unique_id) {
            return Err(EngineError::UnknownAccount(account.unique_id.clone()));
        }
        // Ignores the window on purpose, like some bank servers do
        Ok(self.script.transactions.clone())
    }

    fn destroy(self: Box<Self>) -> EngineResult<()> {
        self.record("destroy");
        if self.script.fail_destroy {
            return Err(EngineError::state("handle still busy"));
        }
        Ok(())
    }
}

fn open_scripted(backend: &Arc<ScriptedBackend>, dir: &TempDir) -> BankingSession {
    let backend: Arc<dyn EngineBackend> = backend.clone();
    BankingSession::open(backend, "custom", dir.path()).expect("open session")
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[test]
fn test_query_before_initialize_is_rejected() {
    let backend = Arc::new(ScriptedBackend::new("it-before-init", Script::default()));
    let mut session = BankingSession::new(backend.clone());

    assert_eq!(session.state(), SessionState::Uninitialized);
    assert!(matches!(session.list_accounts(), Err(Error::SessionNotOpen)));
    assert!(matches!(session.list_users(), Err(Error::SessionNotOpen)));
    assert!(matches!(
        session.register(Credential::new("10000000", "u1", "1234")),
        Err(Error::SessionNotOpen)
    ));
    assert!(backend.calls().is_empty());
}

#[test]
fn test_release_twice_is_a_lifecycle_error() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("it-double-release", Script::default()));
    let mut session = open_scripted(&backend, &dir);

    session.release().unwrap();
    assert_eq!(session.state(), SessionState::Released);
    assert!(matches!(session.release(), Err(Error::Lifecycle(_))));

    // Destroyed exactly once
    let destroys = backend.calls().iter().filter(|c| *c == "destroy").count();
    assert_eq!(destroys, 1);
}

#[test]
fn test_release_without_initialize_is_a_lifecycle_error() {
    let backend = Arc::new(ScriptedBackend::new("it-release-uninit", Script::default()));
    let mut session = BankingSession::new(backend);
    assert!(matches!(session.release(), Err(Error::Lifecycle(_))));
}

#[test]
fn test_queries_after_release_fail() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("it-after-release", Script::default()));
    let mut session = open_scripted(&backend, &dir);
    session.release().unwrap();

    assert!(matches!(session.list_accounts(), Err(Error::SessionNotOpen)));
    assert!(session.version().is_none());
    assert!(matches!(
        session.initialize("custom", dir.path()),
        Err(Error::Lifecycle(_))
    ));
}

#[test]
fn test_initialize_twice_is_a_lifecycle_error() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("it-double-init", Script::default()));
    let mut session = open_scripted(&backend, &dir);

    assert!(matches!(
        session.initialize("custom", dir.path()),
        Err(Error::Lifecycle(_))
    ));
    assert!(session.is_open());
    session.release().unwrap();
}

#[test]
fn test_old_engine_is_refused() {
    let dir = TempDir::new().unwrap();
    let mut backend = ScriptedBackend::new("it-old-engine", Script::default());
    backend.version = EngineVersion::new(4, 9, 0);
    let backend = Arc::new(backend);

    let mut session = BankingSession::new(backend.clone());
    let err = session.initialize("custom", dir.path()).unwrap_err();
    assert!(matches!(err, Error::EngineInit(_)));
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert_eq!(backend.inits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_empty_profile_is_refused() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("it-empty-profile", Script::default()));
    let mut session = BankingSession::new(backend);
    assert!(matches!(
        session.initialize("  ", dir.path()),
        Err(Error::EngineInit(_))
    ));
}

#[test]
fn test_construct_failure_leaves_no_live_session() {
    let dir = TempDir::new().unwrap();
    let script = Script {
        fail_construct: true,
        ..Default::default()
    };
    let backend = Arc::new(ScriptedBackend::new("it-construct-fails", script));

    let mut session = BankingSession::new(backend.clone());
    assert!(matches!(
        session.initialize("custom", dir.path()),
        Err(Error::EngineInit(_))
    ));
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert_eq!(live_sessions("it-construct-fails"), 0);
    assert_eq!(backend.shutdowns.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shutdown_failure_after_construct_failure_is_logged() {
    let data = TempDir::new().unwrap();
    let logger = Arc::new(LoggingService::new(data.path(), EntryPoint::Library, "test").unwrap());
    let script = Script {
        fail_construct: true,
        fail_shutdown: true,
        ..Default::default()
    };
    let backend = Arc::new(ScriptedBackend::new("it-construct-shutdown-fails", script));

    let mut session = BankingSession::new(backend.clone()).with_logger(Arc::clone(&logger));
    let err = session.initialize("custom", data.path().join("tmp")).unwrap_err();
    assert!(matches!(err, Error::EngineInit(_)));
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert_eq!(live_sessions("it-construct-shutdown-fails"), 0);

    let errors = logger.get_errors(10).unwrap();
    let release_failure = errors
        .iter()
        .find(|e| e.event == "session_release_failed")
        .expect("shutdown failure recorded");
    assert_eq!(release_failure.operation.as_deref(), Some("process_shutdown"));
    assert!(errors.iter().any(|e| e.event == "session_init_failed"));
}

#[test]
fn test_process_runtime_is_shared_between_sessions() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("it-shared-runtime", Script::default()));

    let mut first = open_scripted(&backend, &first_dir);
    let mut second = open_scripted(&backend, &second_dir);
    assert_eq!(backend.inits.load(Ordering::SeqCst), 1);
    assert_eq!(live_sessions("it-shared-runtime"), 2);

    first.release().unwrap();
    assert_eq!(backend.shutdowns.load(Ordering::SeqCst), 0);
    second.release().unwrap();
    assert_eq!(backend.shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(live_sessions("it-shared-runtime"), 0);
}

#[test]
fn test_teardown_failure_still_releases() {
    let dir = TempDir::new().unwrap();
    let script = Script {
        fail_destroy: true,
        ..Default::default()
    };
    let backend = Arc::new(ScriptedBackend::new("it-teardown-fails", script));
    let mut session = open_scripted(&backend, &dir);

    assert!(matches!(session.release(), Err(Error::Teardown(_))));
    assert_eq!(session.state(), SessionState::Released);
    assert_eq!(live_sessions("it-teardown-fails"), 0);
}

#[test]
fn test_dropping_an_open_session_tears_it_down() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("it-drop", Script::default()));
    {
        let _session = open_scripted(&backend, &dir);
        assert_eq!(live_sessions("it-drop"), 1);
    }
    assert_eq!(live_sessions("it-drop"), 0);
    assert!(backend.calls().contains(&"destroy".to_string()));
}

#[test]
fn test_scoped_releases_on_error() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("it-scoped", Script::default()));

    let result: Result<(), Error> =
        BankingSession::scoped(backend.clone(), "custom", dir.path(), |session| {
            session.list_accounts()?;
            Ok(())
        });

    // No credentials registered: the query error comes back, the handle is gone
    assert!(matches!(result, Err(Error::QueryFailed { .. })));
    assert_eq!(live_sessions("it-scoped"), 0);
    assert_eq!(backend.calls().last().map(String::as_str), Some("destroy"));
}

// ============================================================================
// Credential Tests
// ============================================================================

#[test]
fn test_invalid_credential_never_reaches_engine() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("it-invalid-cred", Script::default()));
    let mut session = open_scripted(&backend, &dir);

    let err = session.register(Credential::new("", "u1", "1234")).unwrap_err();
    assert!(matches!(err, Error::InvalidCredential(_)));
    let err = session.register(Credential::new("10000000", "u1", "")).unwrap_err();
    assert!(matches!(err, Error::InvalidCredential(_)));

    assert!(!backend.calls().contains(&"register_credential".to_string()));
    session.release().unwrap();
}

#[test]
fn test_rejected_credential_is_not_recorded() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("it-rejected-cred", Script::default()));
    let mut session = open_scripted(&backend, &dir);

    let err = session.register(Credential::new("10000000", "u1", "wrong")).unwrap_err();
    assert!(matches!(err, Error::CredentialRejected(_)));
    assert!(matches!(session.lookup("10000000", "u1"), Err(Error::NotFound(_))));
    assert!(session.registry().unwrap().is_empty());
    session.release().unwrap();
}

#[test]
fn test_reregistering_replaces_the_secret() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new("it-reregister", Script::default()));
    let mut session = open_scripted(&backend, &dir);

    session.register(Credential::new("10000000", "u1", "1111")).unwrap();
    session.register(Credential::new("10000000", "u1", "2222")).unwrap();

    assert_eq!(session.registry().unwrap().len(), 1);
    assert_eq!(session.lookup("10000000", "u1").unwrap().secret(), "2222");
    session.release().unwrap();
}

// ============================================================================
// Query Tests
// ============================================================================

#[test]
fn test_reversed_range_is_rejected_without_engine_call() {
    let dir = TempDir::new().unwrap();
    let script = Script {
        accounts: vec![scripted_account("acc-1")],
        ..Default::default()
    };
    let backend = Arc::new(ScriptedBackend::new("it-reversed-range", script));
    let mut session = open_scripted(&backend, &dir);
    let account = Account::new("acc-1", "10000000", "acc-1");

    let err = session
        .transactions_in_range(&account, date(2014, 5, 16), date(2014, 5, 14))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRange { .. }));
    assert_eq!(backend.query_calls(), 0);
    session.release().unwrap();
}

#[test]
fn test_out_of_window_records_are_dropped() {
    let dir = TempDir::new().unwrap();
    let script = Script {
        accounts: vec![scripted_account("acc-1")],
        transactions: vec![
            scripted_tx(13, -100),
            scripted_tx(14, -200),
            scripted_tx(16, -300),
            scripted_tx(17, -400),
        ],
        ..Default::default()
    };
    let backend = Arc::new(ScriptedBackend::new("it-window", script));
    let mut session = open_scripted(&backend, &dir);
    session.register(Credential::new("10000000", "u1", "1234")).unwrap();
    let account = session.list_accounts().unwrap().remove(0);

    let txs = session
        .transactions_in_range(&account, date(2014, 5, 14), date(2014, 5, 16))
        .unwrap();
    let days: Vec<NaiveDate> = txs.iter().map(|t| t.booking_date).collect();
    assert_eq!(days, vec![date(2014, 5, 14), date(2014, 5, 16)]);

    // Missing fee becomes zero in the transaction currency
    assert!(txs[0].fee.is_zero());
    assert_eq!(txs[0].fee.currency(), "EUR");

    // Single-day window
    let same_day = session
        .transactions_in_range(&account, date(2014, 5, 14), date(2014, 5, 14))
        .unwrap();
    assert_eq!(same_day.len(), 1);

    // Open upper bound
    let from_16 = session
        .transactions(&account, DateRange::new(Some(date(2014, 5, 16)), None).unwrap())
        .unwrap();
    assert_eq!(from_16.len(), 2);

    assert_eq!(session.transactions_all(&account).unwrap().len(), 4);
    session.release().unwrap();
}

#[test]
fn test_missing_currency_is_a_malformed_record() {
    let dir = TempDir::new().unwrap();
    let mut tx = scripted_tx(15, -999);
    tx.value = Some(EngineValue {
        amount: Decimal::new(-999, 2),
        currency: None,
    });
    let script = Script {
        accounts: vec![scripted_account("acc-1")],
        transactions: vec![tx],
        ..Default::default()
    };
    let backend = Arc::new(ScriptedBackend::new("it-no-currency", script));
    let mut session = open_scripted(&backend, &dir);
    session.register(Credential::new("10000000", "u1", "1234")).unwrap();
    let account = session.list_accounts().unwrap().remove(0);

    let err = session.transactions_all(&account).unwrap_err();
    assert!(matches!(err, Error::MalformedRecord(_)));
    session.release().unwrap();
}

#[test]
fn test_duplicate_accounts_are_reported_once() {
    let dir = TempDir::new().unwrap();
    let script = Script {
        accounts: vec![
            scripted_account("acc-1"),
            scripted_account("acc-2"),
            scripted_account("acc-1"),
        ],
        ..Default::default()
    };
    let backend = Arc::new(ScriptedBackend::new("it-dedup", script));
    let mut session = open_scripted(&backend, &dir);
    session.register(Credential::new("10000000", "u1", "1234")).unwrap();

    let ids: Vec<String> = session
        .list_accounts()
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec!["acc-1".to_string(), "acc-2".to_string()]);
    session.release().unwrap();
}

#[test]
fn test_user_collection_is_freed() {
    let dir = TempDir::new().unwrap();
    let script = Script {
        users: vec![EngineUser {
            unique_id: 3,
            user_name: Some(" Erika ".to_string()),
            user_id: Some("u1".to_string()),
            customer_id: None,
        }],
        ..Default::default()
    };
    let backend = Arc::new(ScriptedBackend::new("it-user-free", script));
    let mut session = open_scripted(&backend, &dir);
    session.register(Credential::new("10000000", "u1", "1234")).unwrap();

    let users = session.list_users().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Erika");
    assert_eq!(users[0].customer_id, "u1");
    assert_eq!(backend.open_lists.load(Ordering::SeqCst), 0);

    let calls = backend.calls();
    let listed = calls.iter().position(|c| c == "list_users").unwrap();
    assert_eq!(calls[listed + 1], "free_user_list");
    session.release().unwrap();
}

#[test]
fn test_unknown_account_is_a_query_failure() {
    let dir = TempDir::new().unwrap();
    let script = Script {
        accounts: vec![scripted_account("acc-1")],
        ..Default::default()
    };
    let backend = Arc::new(ScriptedBackend::new("it-unknown-account", script));
    let mut session = open_scripted(&backend, &dir);
    session.register(Credential::new("10000000", "u1", "1234")).unwrap();

    let stranger = Account::new("acc-9", "10000000", "acc-9");
    let err = session.transactions_all(&stranger).unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(
        err,
        Error::QueryFailed {
            operation: "list_transactions",
            error: EngineError::UnknownAccount(_)
        }
    ));

    // The session is still usable
    assert_eq!(session.list_accounts().unwrap().len(), 1);
    session.release().unwrap();
}

// ============================================================================
// Demo Engine Walkthroughs
// ============================================================================

#[test]
fn test_demo_walkthrough() {
    let data = TempDir::new().unwrap();
    let working_dir = data.path().join("tmp");
    let backend = Arc::new(DemoBackend::new());
    let stats = backend.stats();

    let mut session = BankingSession::open(backend, "custom", &working_dir).unwrap();
    let version = session.version().unwrap();
    assert_ne!(version.major, 0);
    assert!(working_dir.join(".lock").exists());

    session.register(Credential::new("10000000", "u1", "1234")).unwrap();
    session.register(Credential::new("20000000", "u2", "5678")).unwrap();

    let users = session.list_users().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(stats.open_user_lists(), 0);

    let accounts = session.list_accounts().unwrap();
    // Girokonto + Tagesgeld + joint at Berlin, Girokonto at Hamburg
    assert_eq!(accounts.len(), 4);
    assert!(accounts.iter().all(|a| a.iban.as_deref().map_or(false, |i| i.starts_with("DE"))));

    let from = date(2014, 5, 14);
    let to = date(2014, 5, 16);
    for account in &accounts {
        let txs = session.transactions_in_range(account, from, to).unwrap();
        for tx in &txs {
            assert!(tx.booking_date >= from && tx.booking_date <= to);
            assert_eq!(tx.account_id, account.id);
            assert_eq!(tx.total.currency(), "EUR");
        }
    }

    // Idempotent re-query
    let giro = &accounts[0];
    let first = session.transactions_in_range(giro, from, to).unwrap();
    let second = session.transactions_in_range(giro, from, to).unwrap();
    assert_eq!(first, second);
    assert!(!first.is_empty());

    // ATM withdrawal carries a fee
    assert!(first.iter().any(|t| !t.fee.is_zero()));

    session.release().unwrap();
    assert_eq!(stats.live_engines(), 0);
}

#[test]
fn test_demo_shared_account_is_deduplicated() {
    let data = TempDir::new().unwrap();
    let backend = Arc::new(DemoBackend::new());

    BankingSession::scoped(backend, "custom", data.path(), |session| {
        session.register(Credential::new("10000000", "alice", "1111"))?;
        session.register(Credential::new("10000000", "bob", "2222"))?;

        let accounts = session.list_accounts()?;
        let joint = accounts
            .iter()
            .filter(|a| a.account_number == "7777777700")
            .count();
        assert_eq!(joint, 1);
        assert_eq!(accounts.len(), 5);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_demo_unregistered_institution_account() {
    let data = TempDir::new().unwrap();
    let backend = Arc::new(DemoBackend::new());
    let mut session = BankingSession::open(backend, "custom", data.path()).unwrap();
    session.register(Credential::new("10000000", "u1", "1234")).unwrap();

    let elsewhere = Account::new("20000000-000000001", "20000000", "000000001");
    assert!(matches!(
        session.transactions_all(&elsewhere),
        Err(Error::QueryFailed { .. })
    ));
    session.release().unwrap();
}

#[test]
fn test_demo_working_directory_is_exclusive() {
    let data = TempDir::new().unwrap();
    let backend: Arc<dyn EngineBackend> = Arc::new(DemoBackend::new());

    let mut first = BankingSession::open(backend.clone(), "custom", data.path()).unwrap();
    let err = BankingSession::open(backend.clone(), "custom", data.path()).unwrap_err();
    assert!(matches!(err, Error::EngineInit(_)));

    first.release().unwrap();
    let mut again = BankingSession::open(backend, "custom", data.path()).unwrap();
    again.release().unwrap();
}

#[test]
fn test_session_events_are_logged_without_secrets() {
    let data = TempDir::new().unwrap();
    let logger = Arc::new(LoggingService::new(data.path(), EntryPoint::Library, "test").unwrap());
    let backend = Arc::new(DemoBackend::new());

    let mut session = BankingSession::new(backend).with_logger(Arc::clone(&logger));
    session.initialize("custom", data.path().join("tmp")).unwrap();
    session.register(Credential::new("10000000", "u1", "s3cret-pin")).unwrap();
    let _ = session.register(Credential::new("99999999", "u1", "other-pin"));
    session.release().unwrap();

    let entries = logger.get_recent(50).unwrap();
    let events: Vec<&str> = entries.iter().map(|e| e.event.as_str()).collect();
    assert!(events.contains(&"session_opened"));
    assert!(events.contains(&"credential_registered"));
    assert!(events.contains(&"credential_register_failed"));
    assert!(events.contains(&"session_released"));

    let dump = format!("{:?}", entries);
    assert!(!dump.contains("s3cret-pin"));
    assert!(!dump.contains("other-pin"));
}
