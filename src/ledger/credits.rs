use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{LedgerError, Result};
use super::partitions::{CREDITS_PARTITION, encode_credit_key};

/// One user's credit balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAccount {
    pub user_id: String,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// Receipt returned after a successful debit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditReceipt {
    pub user_id: String,
    pub debited: i64,
    pub balance: i64,
}

/// Fjall-backed credit accounts, one row per user
#[derive(Clone)]
pub struct CreditLedger {
    credits: PartitionHandle,
}

impl CreditLedger {
    /// Attach to the credits partition in an already opened keyspace
    pub fn attach(keyspace: &Keyspace) -> Result<Self> {
        let credits =
            keyspace.open_partition(CREDITS_PARTITION, PartitionCreateOptions::default())?;
        Ok(Self { credits })
    }

    /// Current balance; users without an account have 0
    pub fn balance(&self, user_id: &str) -> Result<i64> {
        Ok(self.account(user_id)?.map(|a| a.balance).unwrap_or(0))
    }

    /// Add credits to a user's account
    pub fn grant(&self, user_id: &str, amount: i64) -> Result<CreditAccount> {
        let balance = self.balance(user_id)? + amount;
        let account = self.write_account(user_id, balance)?;
        info!(user_id, amount, balance = account.balance, "Granted credits");
        Ok(account)
    }

    /// Debit credits, refusing when the balance is short
    pub fn debit(&self, user_id: &str, amount: i64) -> Result<CreditReceipt> {
        let available = self.balance(user_id)?;
        if available < amount {
            return Err(LedgerError::InsufficientCredits {
                needed: amount,
                available,
            });
        }
        let account = self.write_account(user_id, available - amount)?;
        debug!(user_id, debited = amount, balance = account.balance, "Debited credits");
        Ok(CreditReceipt {
            user_id: user_id.to_string(),
            debited: amount,
            balance: account.balance,
        })
    }

    fn account(&self, user_id: &str) -> Result<Option<CreditAccount>> {
        let key = encode_credit_key(user_id);
        match self.credits.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn write_account(&self, user_id: &str, balance: i64) -> Result<CreditAccount> {
        let account = CreditAccount {
            user_id: user_id.to_string(),
            balance,
            updated_at: Utc::now(),
        };
        self.credits
            .insert(encode_credit_key(user_id), serde_json::to_vec(&account)?)?;
        Ok(account)
    }
}
