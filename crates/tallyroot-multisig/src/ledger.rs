//! Disbursement collaborator
//!
//! The multisig never owns balances; it asks a [`Ledger`] whether accounts
//! exist and instructs it to move funds. A committed vote settles through a
//! single [`Ledger::disburse`] call, which must apply all of its
//! instructions or none of them.

use std::collections::HashMap;
use tallyroot_crypto::Address;
use tallyroot_errors::{Error, Result};
use tallyroot_types::Amount;
use tracing::debug;

pub trait Ledger {
    /// Whether `address` has an account
    fn account_exists(&self, address: &Address) -> bool;

    /// Balance of `address`, zero for missing accounts
    fn balance(&self, address: &Address) -> Amount;

    /// Create `account` with an empty balance, charging `fee` to `payer`
    fn create_account(&mut self, payer: &Address, account: &Address, fee: Amount) -> Result<()>;

    /// Move `amount` from `from` to `to`, creating `to` if needed
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()>;

    /// Charge `fee` for creating `receiver`'s account, then pay it `payout`.
    ///
    /// Either both instructions take effect or neither does: a failed
    /// transfer must not leave the fee charged. The default runs them in
    /// order and is only all-or-nothing for ledgers whose `transfer` cannot
    /// fail once `create_account` succeeded; other ledgers override it.
    fn disburse(
        &mut self,
        payer: &Address,
        receiver: &Address,
        fee: Amount,
        payout: Amount,
    ) -> Result<()> {
        disburse_in_order(self, payer, receiver, fee, payout)
    }
}

fn disburse_in_order<L: Ledger + ?Sized>(
    ledger: &mut L,
    payer: &Address,
    receiver: &Address,
    fee: Amount,
    payout: Amount,
) -> Result<()> {
    if fee > 0 {
        ledger.create_account(payer, receiver, fee)?;
    }
    if payout > 0 {
        ledger.transfer(payer, receiver, payout)?;
    }
    Ok(())
}

/// In-memory ledger
#[derive(Debug, Default, Clone)]
pub struct MemLedger {
    accounts: HashMap<Address, Amount>,
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `address`, creating the account if needed
    pub fn fund(&mut self, address: Address, amount: Amount) {
        let balance = self.accounts.entry(address).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    fn debit(&mut self, address: &Address, amount: Amount) -> Result<()> {
        let available = self.balance(address);
        if available < amount {
            return Err(Error::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        if let Some(balance) = self.accounts.get_mut(address) {
            *balance -= amount;
        }
        Ok(())
    }
}

impl Ledger for MemLedger {
    fn account_exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn balance(&self, address: &Address) -> Amount {
        self.accounts.get(address).copied().unwrap_or(0)
    }

    fn create_account(&mut self, payer: &Address, account: &Address, fee: Amount) -> Result<()> {
        if self.account_exists(account) {
            return Err(Error::InvalidRequest(format!("account {account} already exists")));
        }
        self.debit(payer, fee)?;
        self.accounts.insert(*account, 0);
        debug!(%payer, %account, fee, "account created");
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        self.debit(from, amount)?;
        self.fund(*to, amount);
        debug!(%from, %to, amount, "transfer applied");
        Ok(())
    }

    fn disburse(
        &mut self,
        payer: &Address,
        receiver: &Address,
        fee: Amount,
        payout: Amount,
    ) -> Result<()> {
        let mut staged = self.clone();
        disburse_in_order(&mut staged, payer, receiver, fee, payout)?;
        *self = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn test_fund_and_transfer() {
        let mut ledger = MemLedger::new();
        ledger.fund(addr(1), 100);
        ledger.transfer(&addr(1), &addr(2), 40).unwrap();

        assert_eq!(ledger.balance(&addr(1)), 60);
        assert_eq!(ledger.balance(&addr(2)), 40);
        assert!(ledger.account_exists(&addr(2)));
    }

    #[test]
    fn test_overdraft_rejected_without_effect() {
        let mut ledger = MemLedger::new();
        ledger.fund(addr(1), 10);
        let err = ledger.transfer(&addr(1), &addr(2), 11).unwrap_err();

        assert_eq!(
            err,
            Error::InsufficientFunds {
                needed: 11,
                available: 10
            }
        );
        assert_eq!(ledger.balance(&addr(1)), 10);
        assert!(!ledger.account_exists(&addr(2)));
    }

    #[test]
    fn test_create_account_charges_fee() {
        let mut ledger = MemLedger::new();
        ledger.fund(addr(1), 10);
        ledger.create_account(&addr(1), &addr(2), 3).unwrap();

        assert_eq!(ledger.balance(&addr(1)), 7);
        assert!(ledger.account_exists(&addr(2)));
        assert_eq!(ledger.balance(&addr(2)), 0);
        assert!(ledger.create_account(&addr(1), &addr(2), 3).is_err());
    }

    #[test]
    fn test_disburse_is_all_or_nothing() {
        let mut ledger = MemLedger::new();
        ledger.fund(addr(1), 10);

        // The fee fits but the payout does not.
        let err = ledger.disburse(&addr(1), &addr(2), 4, 7).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(ledger.balance(&addr(1)), 10);
        assert!(!ledger.account_exists(&addr(2)));

        ledger.disburse(&addr(1), &addr(2), 4, 6).unwrap();
        assert_eq!(ledger.balance(&addr(1)), 0);
        assert_eq!(ledger.balance(&addr(2)), 6);
    }
}
