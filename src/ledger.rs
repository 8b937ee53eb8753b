//! Credit ledger
//!
//! The balance is an owned value held by [`CreditLedger`]. Persistence is an
//! explicit side effect at the [`CreditStore`] boundary: one key holding the
//! balance as a decimal string, read once at startup and written on every change.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ReziError;

/// Storage key of the balance.
pub const CREDITS_KEY: &str = "rezi-credits";

/// Balance given on first run.
pub const DEFAULT_CREDITS: u32 = 100;

/// Credits debited per successful generation.
pub const GENERATION_COST: u32 = 10;

/// Durable client-local key/value storage.
pub trait CreditStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, ReziError>;
    fn save(&self, key: &str, value: &str) -> Result<(), ReziError>;
}

/// Sled-backed store under the application data directory.
pub struct SledCreditStore {
    db: sled::Db,
}

impl SledCreditStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReziError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            ReziError::Storage(format!(
                "Failed to open credit store at {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(Self { db })
    }
}

impl CreditStore for SledCreditStore {
    fn load(&self, key: &str) -> Result<Option<String>, ReziError> {
        let value = self.db.get(key.as_bytes())?;
        Ok(value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), ReziError> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

/// In-process store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryCreditStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCreditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a raw value for `key`.
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
}

impl CreditStore for MemoryCreditStore {
    fn load(&self, key: &str) -> Result<Option<String>, ReziError> {
        Ok(self.raw(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), ReziError> {
        self.values
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A non-negative credit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CreditBalance(u32);

impl CreditBalance {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn covers(self, amount: u32) -> bool {
        self.0 >= amount
    }

    /// Balance after paying `amount`, or `InsufficientCredit`.
    pub fn debit(self, amount: u32) -> Result<Self, ReziError> {
        self.0
            .checked_sub(amount)
            .map(Self)
            .ok_or(ReziError::InsufficientCredit {
                balance: self.0,
                required: amount,
            })
    }
}

impl std::fmt::Display for CreditBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns the balance and writes it through to its store.
pub struct CreditLedger {
    store: Arc<dyn CreditStore>,
    balance: CreditBalance,
}

impl CreditLedger {
    /// Open the ledger, initialising the stored balance to `default` on first run.
    pub fn open(store: Arc<dyn CreditStore>, default: u32) -> Result<Self, ReziError> {
        let mut ledger = Self {
            store,
            balance: CreditBalance::new(default),
        };
        ledger.initialize_if_absent(default)?;
        Ok(ledger)
    }

    /// Load the stored balance, writing `default` when nothing usable is stored.
    /// Running it again never resets an existing balance.
    pub fn initialize_if_absent(&mut self, default: u32) -> Result<CreditBalance, ReziError> {
        match self.store.load(CREDITS_KEY)? {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(value) => {
                    debug!(balance = value, "Loaded credit balance");
                    self.balance = CreditBalance::new(value);
                }
                Err(_) => {
                    warn!(stored = %raw, default, "Stored credit balance is unreadable; resetting");
                    self.persist(CreditBalance::new(default))?;
                }
            },
            None => {
                info!(default, "No stored credit balance; initialising");
                self.persist(CreditBalance::new(default))?;
            }
        }
        Ok(self.balance)
    }

    pub fn read(&self) -> u32 {
        self.balance.value()
    }

    pub fn balance(&self) -> CreditBalance {
        self.balance
    }

    pub fn can_afford(&self, amount: u32) -> bool {
        self.balance.covers(amount)
    }

    /// Remove `amount` credits. Fails without touching the store when the balance is short.
    pub fn debit(&mut self, amount: u32) -> Result<CreditBalance, ReziError> {
        let next = self.balance.debit(amount)?;
        self.persist(next)?;
        info!(debited = amount, balance = next.value(), "Credits debited");
        Ok(next)
    }

    fn persist(&mut self, balance: CreditBalance) -> Result<(), ReziError> {
        self.store.save(CREDITS_KEY, &balance.value().to_string())?;
        self.balance = balance;
        Ok(())
    }
}

impl std::fmt::Debug for CreditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditLedger")
            .field("balance", &self.balance)
            .finish()
    }
}
