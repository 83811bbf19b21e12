// Account Store Port (Interface)

use crate::domain::{Account, AccountId};
use crate::error::Result;
use crate::port::Transaction;
use async_trait::async_trait;

/// Persistence for user accounts
///
/// Reads return rows as stored, password included. Redaction is the
/// service's job.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Begin a new transaction
    async fn begin(&self) -> Result<Box<dyn AccountTransaction>>;

    /// All accounts
    async fn list(&self) -> Result<Vec<Account>>;

    /// Find account by ID
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>>;

    /// Find account by email (case-insensitive on the supplied value)
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;
}

/// Account writes within a transaction
#[async_trait]
pub trait AccountTransaction: Transaction {
    /// Insert a new account and return the stored row
    async fn insert(&mut self, account: &Account) -> Result<Account>;

    /// Update the non-empty fields of the account with `account.id`
    async fn update(&mut self, account: &Account) -> Result<u64>;

    /// Delete account by ID, returning affected rows
    async fn delete(&mut self, id: AccountId) -> Result<u64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct State {
        accounts: BTreeMap<AccountId, Account>,
        next_id: AccountId,
    }

    /// In-memory AccountStore; writes apply on commit
    #[derive(Clone, Default)]
    pub struct InMemoryAccountStore {
        state: Arc<Mutex<State>>,
        broken: bool,
    }

    impl InMemoryAccountStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Store whose every read fails, as if the database were unreachable
        pub fn broken() -> Self {
            Self {
                broken: true,
                ..Self::default()
            }
        }

        /// Seed an account directly, bypassing transactions
        pub fn seed(&self, email: &str, password: &str, role: &str) -> AccountId {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = state.next_id;
            state.accounts.insert(
                id,
                Account {
                    id,
                    email: email.to_string(),
                    password: password.to_string(),
                    role: role.to_string(),
                    token: None,
                },
            );
            id
        }

        fn check(&self) -> Result<()> {
            if self.broken {
                return Err(AppError::Acquisition("pool timed out".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl AccountStore for InMemoryAccountStore {
        async fn begin(&self) -> Result<Box<dyn AccountTransaction>> {
            self.check()?;
            Ok(Box::new(InMemoryAccountTransaction {
                state: Arc::clone(&self.state),
                staged: Vec::new(),
                deleted: Vec::new(),
            }))
        }

        async fn list(&self) -> Result<Vec<Account>> {
            self.check()?;
            Ok(self.state.lock().unwrap().accounts.values().cloned().collect())
        }

        async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
            self.check()?;
            Ok(self.state.lock().unwrap().accounts.get(&id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
            self.check()?;
            let wanted = email.to_lowercase();
            let state = self.state.lock().unwrap();
            Ok(state
                .accounts
                .values()
                .find(|account| account.email == wanted)
                .cloned())
        }
    }

    pub struct InMemoryAccountTransaction {
        state: Arc<Mutex<State>>,
        staged: Vec<Account>,
        deleted: Vec<AccountId>,
    }

    #[async_trait]
    impl Transaction for InMemoryAccountTransaction {
        async fn commit(&mut self) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            for account in self.staged.drain(..) {
                let entry = state.accounts.entry(account.id).or_default();
                entry.id = account.id;
                if !account.email.is_empty() {
                    entry.email = account.email;
                }
                if !account.password.is_empty() {
                    entry.password = account.password;
                }
                if !account.role.is_empty() {
                    entry.role = account.role;
                }
            }
            for id in self.deleted.drain(..) {
                state.accounts.remove(&id);
            }
            Ok(())
        }

        async fn rollback(&mut self) -> Result<()> {
            self.staged.clear();
            self.deleted.clear();
            Ok(())
        }
    }

    #[async_trait]
    impl AccountTransaction for InMemoryAccountTransaction {
        async fn insert(&mut self, account: &Account) -> Result<Account> {
            let id = {
                let mut state = self.state.lock().unwrap();
                state.next_id += 1;
                state.next_id
            };
            let stored = Account {
                id,
                token: None,
                ..account.clone()
            };
            self.staged.push(stored.clone());
            Ok(stored)
        }

        async fn update(&mut self, account: &Account) -> Result<u64> {
            let exists = self.state.lock().unwrap().accounts.contains_key(&account.id);
            if exists {
                self.staged.push(account.clone());
                Ok(1)
            } else {
                Ok(0)
            }
        }

        async fn delete(&mut self, id: AccountId) -> Result<u64> {
            let exists = self.state.lock().unwrap().accounts.contains_key(&id);
            self.deleted.push(id);
            Ok(u64::from(exists))
        }
    }
}
