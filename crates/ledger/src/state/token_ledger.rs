use std::collections::BTreeMap;

use coupon_sdk::Address;

/// Token balances and collected payments. Token ids are sequential from 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenLedger {
    balances: BTreeMap<Address, u64>,
    total_supply: u64,
    treasury: u128,
}

/// Fully computed post-mint values, written only after every check passed
pub(crate) struct TokenUpdate {
    pub to: Address,
    pub balance: u64,
    pub total_supply: u64,
    pub treasury: u128,
}

impl TokenLedger {
    pub fn balance_of(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Wei collected from payable mints
    pub fn treasury(&self) -> u128 {
        self.treasury
    }

    pub(crate) fn plan_mint(&self, to: Address, quantity: u64, paid: u128) -> Option<TokenUpdate> {
        Some(TokenUpdate {
            to,
            balance: self.balance_of(&to).checked_add(quantity)?,
            total_supply: self.total_supply.checked_add(quantity)?,
            treasury: self.treasury.checked_add(paid)?,
        })
    }

    pub(crate) fn apply(&mut self, update: TokenUpdate) {
        self.balances.insert(update.to, update.balance);
        self.total_supply = update.total_supply;
        self.treasury = update.treasury;
    }
}
