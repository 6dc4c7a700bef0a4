//! Internal token ledger: a balance map behind a single lock.
//!
//! `debit`/`credit`/`transfer` are the only mutation primitives, each a
//! single critical section, so no caller ever observes a balance between
//! a read and its paired write.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::EscrowError;

pub struct Ledger {
    balances: Mutex<HashMap<String, u64>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
        }
    }

    /// Seeds (or overwrites) an account's balance. Used by tests and by the
    /// node's wiring to fund initial holders; never called mid-escrow-flow.
    pub fn set_balance(&self, account: impl Into<String>, balance: u64) {
        self.balances.lock().insert(account.into(), balance);
    }

    pub fn balance(&self, account: &str) -> u64 {
        *self.balances.lock().get(account).unwrap_or(&0)
    }

    /// Debits `amount` from `account`, failing closed if the balance would
    /// go negative.
    pub fn debit(&self, account: &str, amount: u64) -> Result<(), EscrowError> {
        let mut balances = self.balances.lock();
        let held = *balances.get(account).unwrap_or(&0);
        if held < amount {
            return Err(EscrowError::InsufficientBalance {
                held: held as i128,
                requested: amount as i128,
            });
        }
        balances.insert(account.to_string(), held - amount);
        Ok(())
    }

    pub fn credit(&self, account: &str, amount: u64) {
        let mut balances = self.balances.lock();
        let held = *balances.get(account).unwrap_or(&0);
        balances.insert(account.to_string(), held + amount);
    }

    /// Atomic debit-then-credit under one lock acquisition, so no observer
    /// ever sees the tokens missing from both accounts at once.
    pub fn transfer(&self, from: &str, to: &str, amount: u64) -> Result<(), EscrowError> {
        let mut balances = self.balances.lock();
        let held = *balances.get(from).unwrap_or(&0);
        if held < amount {
            return Err(EscrowError::InsufficientBalance {
                held: held as i128,
                requested: amount as i128,
            });
        }
        let to_balance = *balances.get(to).unwrap_or(&0);
        balances.insert(from.to_string(), held - amount);
        balances.insert(to.to_string(), to_balance + amount);
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_conserves_total_supply() {
        let ledger = Ledger::new();
        ledger.set_balance("alice", 1000);
        ledger.set_balance("bob", 0);
        ledger.transfer("alice", "bob", 400).unwrap();
        assert_eq!(ledger.balance("alice"), 600);
        assert_eq!(ledger.balance("bob"), 400);
    }

    #[test]
    fn debit_fails_closed_on_insufficient_balance() {
        let ledger = Ledger::new();
        ledger.set_balance("alice", 50);
        assert!(ledger.debit("alice", 100).is_err());
        assert_eq!(ledger.balance("alice"), 50);
    }

    #[test]
    fn transfer_from_unregistered_account_fails() {
        let ledger = Ledger::new();
        assert!(ledger.transfer("nobody", "bob", 10).is_err());
    }
}
