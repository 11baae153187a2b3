use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub mod store;

pub type AccountId = String;
pub type Amount = u64;

/// Smallest and largest account number handed out by [`Ledger::open_account`].
pub const ACCOUNT_ID_MIN: u32 = 10_000;
pub const ACCOUNT_ID_MAX: u32 = 99_999;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown account {account}")]
    UnknownAccount { account: AccountId },
    #[error("insufficient funds in account {account}")]
    InsufficientFunds { account: AccountId },
    #[error("account {account} still holds funds")]
    AccountNotEmpty { account: AccountId },
    #[error("no free account numbers left")]
    Exhausted,
    #[error("balance of account {account} would overflow")]
    Overflow { account: AccountId },
}

/// Account balances of one node, serialized as a plain `{"id": balance}` object.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Ledger {
    accounts: BTreeMap<AccountId, Amount>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Sum of all balances. Saturates instead of wrapping on absurd ledgers.
    pub fn total(&self) -> Amount {
        self.accounts
            .values()
            .fold(0u64, |acc, balance| acc.saturating_add(*balance))
    }

    /// Creates an account with a fresh random number and zero balance.
    pub fn open_account<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<AccountId, LedgerError> {
        let capacity = (ACCOUNT_ID_MAX - ACCOUNT_ID_MIN + 1) as usize;
        if self.accounts.len() >= capacity {
            return Err(LedgerError::Exhausted);
        }
        loop {
            let id = rng.gen_range(ACCOUNT_ID_MIN..=ACCOUNT_ID_MAX).to_string();
            if !self.accounts.contains_key(&id) {
                self.accounts.insert(id.clone(), 0);
                return Ok(id);
            }
        }
    }

    pub fn balance(&self, account: &str) -> Result<Amount, LedgerError> {
        self.accounts
            .get(account)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAccount {
                account: account.to_string(),
            })
    }

    pub fn deposit(&mut self, account: &str, amount: Amount) -> Result<Amount, LedgerError> {
        let balance = self.balance_mut(account)?;
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                account: account.to_string(),
            })?;
        Ok(*balance)
    }

    pub fn withdraw(&mut self, account: &str, amount: Amount) -> Result<Amount, LedgerError> {
        let balance = self.balance_mut(account)?;
        if *balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account: account.to_string(),
            });
        }
        *balance -= amount;
        Ok(*balance)
    }

    /// Removes an account whose balance is exactly zero.
    pub fn remove(&mut self, account: &str) -> Result<(), LedgerError> {
        if self.balance(account)? > 0 {
            return Err(LedgerError::AccountNotEmpty {
                account: account.to_string(),
            });
        }
        self.accounts.remove(account);
        Ok(())
    }

    fn balance_mut(&mut self, account: &str) -> Result<&mut Amount, LedgerError> {
        self.accounts
            .get_mut(account)
            .ok_or_else(|| LedgerError::UnknownAccount {
                account: account.to_string(),
            })
    }
}
