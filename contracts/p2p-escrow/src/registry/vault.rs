/*!
 * Custody Vault
 *
 * Holds the on-chain asset deposited by offer participants in the contract's own
 * account. The vault only tracks the aggregate amount it holds; pairing each deposit
 * with exactly one release is the registry's job.
 */

use soroban_sdk::{log, token, Address, Env};

use crate::types::{Error, VAULT_BALANCE_KEY};

/// Authorization to move funds in or out of the vault.
///
/// Only the registry module can mint one, so every custody transfer is routed
/// through a registry operation.
pub(crate) struct VaultCap {
    _sealed: (),
}

impl VaultCap {
    pub(super) fn issue() -> Self {
        VaultCap { _sealed: () }
    }
}

pub(crate) struct CustodyVault<'a> {
    env: &'a Env,
    token: token::Client<'a>,
}

impl<'a> CustodyVault<'a> {
    pub(crate) fn open(env: &'a Env, asset_token: &Address) -> Self {
        CustodyVault {
            env,
            token: token::Client::new(env, asset_token),
        }
    }

    /// Aggregate asset amount currently held in custody.
    pub(crate) fn held(env: &Env) -> i128 {
        env.storage().instance().get(&VAULT_BALANCE_KEY).unwrap_or(0)
    }

    fn set_held(&self, amount: i128) {
        self.env.storage().instance().set(&VAULT_BALANCE_KEY, &amount);
    }

    /// Moves `amount` of the asset from `from` into custody.
    ///
    /// The balance is checked up front so a short depositor gets `InsufficientFunds`
    /// instead of a failed token call, and nothing changes.
    pub(crate) fn deposit(
        &self,
        _cap: &VaultCap,
        from: &Address,
        amount: i128,
    ) -> Result<(), Error> {
        let balance = self.token.balance(from);
        if balance < amount {
            log!(self.env, "Insufficient balance. Required: {}, Available: {}", amount, balance);
            return Err(Error::InsufficientFunds);
        }
        let held = Self::held(self.env)
            .checked_add(amount)
            .ok_or(Error::InvalidAmount)?;

        self.token.transfer(from, &self.env.current_contract_address(), &amount);
        self.set_held(held);
        Ok(())
    }

    /// Moves `amount` of the asset out of custody to `to`.
    pub(crate) fn release(
        &self,
        _cap: &VaultCap,
        to: &Address,
        amount: i128,
    ) -> Result<(), Error> {
        let held = Self::held(self.env);
        if held < amount {
            log!(self.env, "Vault short on release. Required: {}, Held: {}", amount, held);
            return Err(Error::InsufficientFunds);
        }

        self.token.transfer(&self.env.current_contract_address(), to, &amount);
        self.set_held(held - amount);
        Ok(())
    }
}
