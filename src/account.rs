//! Account records, the active session, and the credential store.
//!
//! The credential store owns the account collection and the single
//! active session. It gates nothing itself beyond its own operations;
//! the tracker facade consults [`CredentialStore::is_current_user_admin`]
//! before every goal mutation.
//!
//! Persisted wire contract (legacy keys, kept so existing data loads):
//! - `"albionUsers"` holds the JSON array of account records
//! - `"currentUser"` holds the JSON account record of the active session

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::error::{LoadReport, LoadStatus, Result, TrackerError};
use crate::password;
use crate::storage::KeyValueStore;

/// Storage key for the account collection.
pub const ACCOUNTS_KEY: &str = "albionUsers";

/// Storage key for the active session pointer.
pub const SESSION_KEY: &str = "currentUser";

/// A registered account. Immutable once created; never deleted.
///
/// The `secret` field holds a PHC-formatted Argon2id hash, never the
/// raw secret. Wire names stay camelCase for compatibility with the
/// persisted records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Account {
    /// Unique (case-insensitively) account name
    pub name: String,
    /// Argon2id hash of the secret, PHC string format
    pub(crate) secret: String,
    /// Whether this account may create and delete goals
    pub is_admin: bool,
    /// Creation time, milliseconds since the UNIX epoch
    pub created_at: u64,
}

impl Account {
    fn identity(&self) -> AccountIdentity {
        AccountIdentity {
            name: self.name.clone(),
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

/// Secret-free view of an account, returned by register and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentity {
    pub name: String,
    pub is_admin: bool,
    pub created_at: u64,
}

/// The active session: a back-reference to one account by name.
/// The account collection remains the sole owner of account data.
#[derive(Debug, Clone)]
struct Session {
    name: String,
}

/// Holds account records and the single active session.
pub struct CredentialStore<S: KeyValueStore, C: Clock> {
    storage: Rc<S>,
    clock: Rc<C>,
    config: TrackerConfig,
    accounts: Vec<Account>,
    session: Option<Session>,
}

impl<S: KeyValueStore, C: Clock> CredentialStore<S, C> {
    /// Create an uninitialized store; call [`initialize`](Self::initialize)
    /// before use.
    pub fn new(storage: Rc<S>, clock: Rc<C>, config: TrackerConfig) -> Self {
        Self {
            storage,
            clock,
            config,
            accounts: Vec::new(),
            session: None,
        }
    }

    /// Load the account collection and any persisted session.
    ///
    /// Absent or corrupt account data seeds the bootstrap admin; a stale
    /// or unparseable session pointer is cleared. Never fails startup.
    pub fn initialize(&mut self) -> LoadReport {
        let mut warnings = Vec::new();
        self.session = None;

        let status = match self.storage.get(ACCOUNTS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Account>>(&raw) {
                Ok(accounts) if !accounts.is_empty() => {
                    debug!(count = accounts.len(), "restored account collection");
                    self.accounts = accounts;
                    LoadStatus::Restored
                }
                Ok(_) => {
                    self.seed_bootstrap(&mut warnings);
                    LoadStatus::Seeded
                }
                Err(e) => {
                    warn!(error = %e, "account records unparseable, reseeding bootstrap");
                    warnings.push(TrackerError::LoadFailed(format!("account records: {e}")));
                    self.seed_bootstrap(&mut warnings);
                    LoadStatus::Recovered
                }
            },
            Ok(None) => {
                self.seed_bootstrap(&mut warnings);
                LoadStatus::Seeded
            }
            Err(e) => {
                warn!(error = %e, "account records unreadable, running in-memory only");
                warnings.push(TrackerError::LoadFailed(format!("account records: {e}")));
                self.seed_bootstrap(&mut warnings);
                LoadStatus::Recovered
            }
        };

        self.restore_session(&mut warnings);
        LoadReport::new(status, warnings)
    }

    /// Register a new account. The secret is hashed before storage and
    /// never echoed back.
    pub fn register(&mut self, name: &str, secret: &str, is_admin: bool) -> Result<AccountIdentity> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::InvalidInput(
                "account name must not be empty".to_string(),
            ));
        }
        if secret.chars().count() < self.config.min_secret_len {
            return Err(TrackerError::InvalidInput(format!(
                "secret must be at least {} characters",
                self.config.min_secret_len
            )));
        }
        if self.find_account(name).is_some() {
            return Err(TrackerError::DuplicateAccount(name.to_string()));
        }

        let account = Account {
            name: name.to_string(),
            secret: password::hash_secret(secret)?,
            is_admin,
            created_at: self.clock.now_ms(),
        };
        let identity = account.identity();
        self.accounts.push(account);
        info!(name = %identity.name, is_admin, "registered account");

        self.persist_accounts()?;
        Ok(identity)
    }

    /// Establish a session for `name` if the secret matches.
    ///
    /// Unknown names and wrong secrets report the same error so callers
    /// cannot probe which accounts exist.
    pub fn login(&mut self, name: &str, secret: &str) -> Result<AccountIdentity> {
        let account = self
            .find_account(name.trim())
            .cloned()
            .ok_or(TrackerError::InvalidCredentials)?;

        if !password::verify_secret(secret, &account.secret) {
            return Err(TrackerError::InvalidCredentials);
        }

        let identity = account.identity();
        let serialized = serde_json::to_string(&account)
            .map_err(|e| TrackerError::PersistenceFailed(format!("session record: {e}")))?;
        self.session = Some(Session {
            name: account.name.clone(),
        });
        info!(name = %identity.name, "session established");

        if let Err(e) = self.storage.set(SESSION_KEY, &serialized) {
            warn!(error = %e, "session active but not persisted");
            return Err(TrackerError::PersistenceFailed(e.to_string()));
        }
        Ok(identity)
    }

    /// Clear the active session. Idempotent: logging out with no active
    /// session is a no-op, not an error.
    pub fn logout(&mut self) -> Result<()> {
        if self.session.take().is_some() {
            info!("session cleared");
        }
        self.storage
            .remove(SESSION_KEY)
            .map_err(|e| TrackerError::PersistenceFailed(e.to_string()))
    }

    /// True iff a session is active and its account has admin rights.
    pub fn is_current_user_admin(&self) -> bool {
        self.current_account()
            .map(|account| account.is_admin)
            .unwrap_or(false)
    }

    /// Identity of the active session's account, if any.
    pub fn current_user(&self) -> Option<AccountIdentity> {
        self.current_account().map(Account::identity)
    }

    /// All registered accounts (hashes included; crate-internal).
    pub(crate) fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    fn current_account(&self) -> Option<&Account> {
        self.session
            .as_ref()
            .and_then(|session| self.find_account(&session.name))
    }

    fn find_account(&self, name: &str) -> Option<&Account> {
        let needle = name.to_lowercase();
        self.accounts
            .iter()
            .find(|account| account.name.to_lowercase() == needle)
    }

    /// Materialize the bootstrap admin account and persist it.
    fn seed_bootstrap(&mut self, warnings: &mut Vec<TrackerError>) {
        let secret = match password::hash_secret(&self.config.bootstrap_secret) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(error = %e, "could not hash bootstrap secret, no account seeded");
                warnings.push(e);
                return;
            }
        };
        self.accounts = vec![Account {
            name: self.config.bootstrap_name.clone(),
            secret,
            is_admin: true,
            created_at: self.clock.now_ms(),
        }];
        info!(name = %self.config.bootstrap_name, "seeded bootstrap admin account");

        if let Err(e) = self.persist_accounts() {
            warnings.push(e);
        }
    }

    /// Restore the persisted session pointer if it still names a known
    /// account; otherwise drop the stale record.
    fn restore_session(&mut self, warnings: &mut Vec<TrackerError>) {
        let raw = match self.storage.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "session record unreadable");
                return;
            }
        };

        match serde_json::from_str::<Account>(&raw) {
            Ok(persisted) if self.find_account(&persisted.name).is_some() => {
                info!(name = %persisted.name, "restored session");
                self.session = Some(Session {
                    name: persisted.name,
                });
            }
            Ok(persisted) => {
                warn!(name = %persisted.name, "persisted session names an unknown account, clearing");
                let _ = self.storage.remove(SESSION_KEY);
            }
            Err(e) => {
                warn!(error = %e, "persisted session unparseable, clearing");
                warnings.push(TrackerError::LoadFailed(format!("session record: {e}")));
                let _ = self.storage.remove(SESSION_KEY);
            }
        }
    }

    fn persist_accounts(&self) -> Result<()> {
        let serialized = serde_json::to_string(&self.accounts)
            .map_err(|e| TrackerError::PersistenceFailed(format!("account records: {e}")))?;
        self.storage.set(ACCOUNTS_KEY, &serialized).map_err(|e| {
            warn!(error = %e, "account collection not persisted, in-memory state kept");
            TrackerError::PersistenceFailed(e.to_string())
        })
    }
}
