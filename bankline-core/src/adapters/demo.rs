//! Demo banking engine
//!
//! An in-process engine with two fictional German banks and deterministic
//! account and transaction data around spring 2014:
//! - 10000000 Demobank Berlin: Girokonto, Tagesgeld and a joint account that
//!   every login at the bank can see
//! - 20000000 Musterbank Hamburg: Girokonto
//!
//! Working state (known users, never PINs) lives in
//! `<working_dir>/<profile>.state.json`; the directory is locked while a
//! handle is alive.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use fs2::FileExt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::EngineVersion;
use crate::ports::{
    AccountRef, BankingEngine, EngineAccount, EngineBackend, EngineError, EngineParty,
    EngineResult, EngineTransaction, EngineUser, EngineUserList, EngineValue, UserListHandle,
};

/// Version the demo engine reports
pub const DEMO_VERSION: EngineVersion = EngineVersion::new(6, 5, 4);

const LOCK_FILE: &str = ".lock";
const JOINT_ACCOUNT_NUMBER: &str = "7777777700";

#[derive(Debug)]
struct DemoBank {
    code: &'static str,
    name: &'static str,
    bic: &'static str,
    has_savings: bool,
    has_joint: bool,
}

const BANKS: &[DemoBank] = &[
    DemoBank {
        code: "10000000",
        name: "Demobank Berlin",
        bic: "DEMODEB1XXX",
        has_savings: true,
        has_joint: true,
    },
    DemoBank {
        code: "20000000",
        name: "Musterbank Hamburg",
        bic: "MUSTDEHHXXX",
        has_savings: false,
        has_joint: false,
    },
];

fn find_bank(code: &str) -> Option<&'static DemoBank> {
    BANKS.iter().find(|b| b.code == code)
}

/// Counters shared between a backend and every engine it constructs
#[derive(Debug, Default)]
pub struct DemoStats {
    live_engines: AtomicUsize,
    open_user_lists: AtomicUsize,
    transaction_queries: AtomicUsize,
}

impl DemoStats {
    pub fn live_engines(&self) -> usize {
        self.live_engines.load(Ordering::SeqCst)
    }

    /// User collections handed out and not yet freed
    pub fn open_user_lists(&self) -> usize {
        self.open_user_lists.load(Ordering::SeqCst)
    }

    pub fn transaction_queries(&self) -> usize {
        self.transaction_queries.load(Ordering::SeqCst)
    }
}

/// Factory for demo engine handles
#[derive(Debug, Default)]
pub struct DemoBackend {
    stats: Arc<DemoStats>,
}

impl DemoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Arc<DemoStats> {
        Arc::clone(&self.stats)
    }
}

impl EngineBackend for DemoBackend {
    fn name(&self) -> &str {
        "demo"
    }

    fn version(&self) -> EngineVersion {
        DEMO_VERSION
    }

    fn construct(&self, profile: &str, working_dir: &Path) -> EngineResult<Box<dyn BankingEngine>> {
        let engine = DemoEngine::open(profile, working_dir, Arc::clone(&self.stats))?;
        Ok(Box::new(engine))
    }
}

/// Persistent working state of one profile
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkingState {
    next_user_id: u32,
    users: Vec<StoredUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    unique_id: u32,
    bank_code: String,
    user_id: String,
    customer_id: String,
    name: String,
}

/// A live demo engine handle
pub struct DemoEngine {
    state_path: PathBuf,
    state: WorkingState,
    lock: File,
    pins: BTreeMap<(String, String), Zeroizing<String>>,
    open_lists: HashSet<u64>,
    next_list: u64,
    stats: Arc<DemoStats>,
}

impl DemoEngine {
    fn open(profile: &str, working_dir: &Path, stats: Arc<DemoStats>) -> EngineResult<Self> {
        if profile.is_empty()
            || !profile
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(EngineError::state(format!("invalid profile name '{}'", profile)));
        }

        fs::create_dir_all(working_dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(working_dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive().map_err(|_| {
            EngineError::state(format!(
                "working directory {} is in use by another engine",
                working_dir.display()
            ))
        })?;

        let state_path = working_dir.join(format!("{}.state.json", profile));
        let state = if state_path.exists() {
            let content = fs::read_to_string(&state_path)?;
            serde_json::from_str(&content)
                .map_err(|e| EngineError::state(format!("corrupt working state: {}", e)))?
        } else {
            let state = WorkingState {
                next_user_id: 1,
                users: Vec::new(),
            };
            write_state(&state_path, &state)?;
            state
        };

        stats.live_engines.fetch_add(1, Ordering::SeqCst);

        Ok(Self {
            state_path,
            state,
            lock,
            pins: BTreeMap::new(),
            open_lists: HashSet::new(),
            next_list: 1,
            stats,
        })
    }

    fn ensure_credentials(&self) -> EngineResult<()> {
        if self.pins.is_empty() {
            return Err(EngineError::NoCredentials);
        }
        Ok(())
    }

    fn stored_user(&self, bank_code: &str, user_id: &str) -> Option<&StoredUser> {
        self.state
            .users
            .iter()
            .find(|u| u.bank_code == bank_code && u.user_id == user_id)
    }

    /// Accounts visible to the registered logins, in registration-key order
    fn reachable_accounts(&self) -> Vec<DemoAccount> {
        let mut accounts = Vec::new();
        for (bank_code, user_id) in self.pins.keys() {
            let Some(bank) = find_bank(bank_code) else {
                continue;
            };
            let owner = self
                .stored_user(bank_code, user_id)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| user_id.clone());
            accounts.extend(accounts_for(bank, user_id, &owner));
        }
        accounts
    }
}

fn write_state(path: &Path, state: &WorkingState) -> EngineResult<()> {
    let content = serde_json::to_string_pretty(state)
        .map_err(|e| EngineError::state(format!("cannot encode working state: {}", e)))?;
    fs::write(path, content)?;
    Ok(())
}

impl BankingEngine for DemoEngine {
    fn register_credential(
        &mut self,
        institution_code: &str,
        user_id: &str,
        secret: &str,
    ) -> EngineResult<()> {
        if institution_code.len() != 8 || !institution_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(EngineError::rejected(format!(
                "'{}' is not a valid bank code",
                institution_code
            )));
        }
        if find_bank(institution_code).is_none() {
            return Err(EngineError::rejected(format!("unknown bank {}", institution_code)));
        }
        if secret.is_empty() {
            return Err(EngineError::rejected("empty PIN"));
        }

        if self.stored_user(institution_code, user_id).is_none() {
            let unique_id = self.state.next_user_id.max(1);
            self.state.next_user_id = unique_id + 1;
            self.state.users.push(StoredUser {
                unique_id,
                bank_code: institution_code.to_string(),
                user_id: user_id.to_string(),
                customer_id: user_id.to_string(),
                name: format!("Kunde {}", user_id),
            });
            write_state(&self.state_path, &self.state)?;
        }

        self.pins.insert(
            (institution_code.to_string(), user_id.to_string()),
            Zeroizing::new(secret.to_string()),
        );
        Ok(())
    }

    fn list_users(&mut self) -> EngineResult<EngineUserList> {
        self.ensure_credentials()?;

        let users = self
            .state
            .users
            .iter()
            .filter(|u| self.pins.contains_key(&(u.bank_code.clone(), u.user_id.clone())))
            .map(|u| EngineUser {
                unique_id: u.unique_id,
                user_name: Some(u.name.clone()),
                user_id: Some(u.user_id.clone()),
                customer_id: Some(u.customer_id.clone()),
            })
            .collect();

        let handle = self.next_list;
        self.next_list += 1;
        self.open_lists.insert(handle);
        self.stats.open_user_lists.fetch_add(1, Ordering::SeqCst);

        Ok(EngineUserList {
            handle: UserListHandle(handle),
            users,
        })
    }

    fn free_user_list(&mut self, handle: UserListHandle) -> EngineResult<()> {
        if !self.open_lists.remove(&handle.0) {
            return Err(EngineError::state(format!("unknown user list {}", handle.0)));
        }
        self.stats.open_user_lists.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn list_accounts(&mut self) -> EngineResult<Vec<EngineAccount>> {
        self.ensure_credentials()?;
        Ok(self
            .reachable_accounts()
            .iter()
            .map(DemoAccount::to_engine)
            .collect())
    }

    fn list_transactions(
        &mut self,
        account: &AccountRef,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> EngineResult<Vec<EngineTransaction>> {
        self.ensure_credentials()?;
        self.stats.transaction_queries.fetch_add(1, Ordering::SeqCst);

        let demo_account = self
            .reachable_accounts()
            .into_iter()
            .find(|a| a.unique_id() == account.unique_id)
            .ok_or_else(|| EngineError::UnknownAccount(account.unique_id.clone()))?;

        Ok(demo_account
            .transactions()
            .into_iter()
            .filter(|tx| {
                tx.date.map_or(false, |d| {
                    from.map_or(true, |f| d >= f) && to.map_or(true, |t| d <= t)
                })
            })
            .collect())
    }

    fn destroy(mut self: Box<Self>) -> EngineResult<()> {
        let open = self.open_lists.len();
        if open > 0 {
            self.stats.open_user_lists.fetch_sub(open, Ordering::SeqCst);
            self.open_lists.clear();
        }
        self.pins.clear();
        let persisted = write_state(&self.state_path, &self.state);
        let unlocked = self.lock.unlock().map_err(EngineError::from);
        self.stats.live_engines.fetch_sub(1, Ordering::SeqCst);
        persisted.and(unlocked)
    }
}

// =============================================================================
// Deterministic data
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccountKind {
    Checking,
    Savings,
    Joint,
}

#[derive(Debug, Clone)]
struct DemoAccount {
    bank: &'static DemoBank,
    kind: AccountKind,
    number: String,
    owner: String,
}

/// Seven-digit customer base derived from the login
fn customer_base(user_id: &str) -> u32 {
    let digest = Sha256::digest(user_id.as_bytes());
    let n = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    n % 10_000_000
}

fn accounts_for(bank: &'static DemoBank, user_id: &str, owner: &str) -> Vec<DemoAccount> {
    let base = customer_base(user_id);
    let mut accounts = vec![DemoAccount {
        bank,
        kind: AccountKind::Checking,
        number: format!("{:08}01", base),
        owner: owner.to_string(),
    }];
    if bank.has_savings {
        accounts.push(DemoAccount {
            bank,
            kind: AccountKind::Savings,
            number: format!("{:08}50", base),
            owner: owner.to_string(),
        });
    }
    if bank.has_joint {
        accounts.push(DemoAccount {
            bank,
            kind: AccountKind::Joint,
            number: JOINT_ACCOUNT_NUMBER.to_string(),
            owner: "Familie Mustermann".to_string(),
        });
    }
    accounts
}

/// German IBAN (DEkk BBBBBBBB CCCCCCCCCC) with ISO 7064 mod 97-10 check digits
pub fn german_iban(bank_code: &str, account_number: &str) -> String {
    let bban = format!("{}{:0>10}", bank_code, account_number);
    // "DE00" moved to the end, letters as numbers: D=13, E=14
    let numeric = format!("{}131400", bban);
    let remainder = numeric
        .chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0u32, |acc, d| (acc * 10 + d) % 97);
    format!("DE{:02}{}", 98 - remainder, bban)
}

fn eur(cents: i64) -> Option<EngineValue> {
    Some(EngineValue {
        amount: Decimal::new(cents, 2),
        currency: Some("EUR".to_string()),
    })
}

fn remote(name: &str, bank_code: &str, account_number: &str) -> EngineParty {
    EngineParty {
        bank_code: Some(bank_code.to_string()),
        account_number: Some(account_number.to_string()),
        iban: Some(german_iban(bank_code, account_number)),
        bic: None,
        name: Some(name.to_string()),
    }
}

impl DemoAccount {
    fn unique_id(&self) -> String {
        format!("{}-{}", self.bank.code, self.number)
    }

    fn iban(&self) -> String {
        german_iban(self.bank.code, &self.number)
    }

    fn to_engine(&self) -> EngineAccount {
        let name = match self.kind {
            AccountKind::Checking => "Girokonto",
            AccountKind::Savings => "Tagesgeld",
            AccountKind::Joint => "Gemeinschaftskonto",
        };
        EngineAccount {
            unique_id: self.unique_id(),
            account_name: Some(name.to_string()),
            owner_name: Some(self.owner.clone()),
            currency: Some("EUR".to_string()),
            country: Some("de".to_string()),
            account_number: Some(self.number.clone()),
            bank_code: Some(self.bank.code.to_string()),
            bank_name: Some(self.bank.name.to_string()),
            iban: Some(self.iban()),
            bic: Some(self.bank.bic.to_string()),
        }
    }

    fn local(&self) -> EngineParty {
        EngineParty {
            bank_code: Some(self.bank.code.to_string()),
            account_number: Some(self.number.clone()),
            iban: Some(self.iban()),
            bic: Some(self.bank.bic.to_string()),
            name: Some(self.owner.clone()),
        }
    }

    fn booked(
        &self,
        date: NaiveDate,
        cents: i64,
        text: &str,
        purpose: &[&str],
        party: EngineParty,
    ) -> EngineTransaction {
        EngineTransaction {
            purpose: purpose.iter().map(|p| p.to_string()).collect(),
            transaction_text: Some(text.to_string()),
            status: Some("booked".to_string()),
            local: self.local(),
            remote: party,
            date: Some(date),
            valuta_date: Some(date),
            value: eur(cents),
            ..Default::default()
        }
    }

    /// History from April through June 2014
    fn transactions(&self) -> Vec<EngineTransaction> {
        let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(2014, 4, 1),
            NaiveDate::from_ymd_opt(2014, 6, 30),
        ) else {
            return Vec::new();
        };

        let mut txs = Vec::new();
        let mut date = start;
        while date <= end {
            let day = date.day();
            match self.kind {
                AccountKind::Checking => self.checking_day(date, day, &mut txs),
                AccountKind::Savings => {
                    if day == 28 {
                        txs.push(self.booked(
                            date,
                            42,
                            "ZINSEN",
                            &["ABSCHLUSS ZINSEN"],
                            EngineParty::default(),
                        ));
                    }
                }
                AccountKind::Joint => {
                    if day == 10 {
                        let mut tx = self.booked(
                            date,
                            -5394,
                            "LASTSCHRIFT",
                            &["RUNDFUNKBEITRAG", "QUARTAL"],
                            remote("ARD ZDF Deutschlandradio Beitragsservice", "37050198", "1234567"),
                        );
                        tx.mandate_id = Some("BSV-0042".to_string());
                        tx.customer_reference = Some(format!("RB-{}", date.format("%Y%m")));
                        txs.push(tx);
                    }
                }
            }
            date += Duration::days(1);
        }
        txs
    }

    fn checking_day(&self, date: NaiveDate, day: u32, txs: &mut Vec<EngineTransaction>) {
        if day == 1 {
            let month = date.format("%m/%Y").to_string();
            txs.push(self.booked(
                date,
                245000,
                "GUTSCHRIFT",
                &["GEHALT", month.as_str()],
                remote("ACME GmbH", "20000000", "4455667788"),
            ));
        }
        if day == 3 {
            txs.push(self.booked(
                date,
                -75000,
                "DAUERAUFTRAG",
                &["MIETE WOHNUNG 3"],
                remote("Hausverwaltung Nord", "10000000", "9988776601"),
            ));
        }
        if day == 14 {
            let mut tx = self.booked(
                date,
                -6250,
                "LASTSCHRIFT",
                &["ABSCHLAG STROM"],
                remote("Stadtwerke Demo", "20000000", "1122334455"),
            );
            tx.mandate_id = Some("STW-000123".to_string());
            tx.customer_reference = Some(format!("KREF-{}", date.format("%Y-%m")));
            txs.push(tx);
        }
        if day == 15 {
            let mut tx = self.booked(
                date,
                -10000,
                "BARGELDAUSZAHLUNG",
                &["GA FREMDAUTOMAT"],
                EngineParty::default(),
            );
            tx.fees = eur(-250);
            tx.valuta_date = Some(date + Duration::days(1));
            txs.push(tx);
        }
        if day == 16 {
            txs.push(self.booked(
                date,
                -3417,
                "KARTENZAHLUNG",
                &["REWE SAGT DANKE"],
                remote("REWE Markt", "10000000", "5544332201"),
            ));
        }
        if day % 7 == 0 {
            txs.push(self.booked(
                date,
                -1290,
                "KARTENZAHLUNG",
                &["EDEKA"],
                remote("EDEKA", "20000000", "6677889901"),
            ));
        }
    }
}
