use std::collections::BTreeMap;

use coupon_sdk::{Address, CouponClass, MintCounters};

/// Units minted per (address, class). Only ever grows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MintCounterStore {
    counts: BTreeMap<(Address, CouponClass), u64>,
}

impl MintCounterStore {
    pub fn get(&self, address: &Address, class: CouponClass) -> u64 {
        self.counts.get(&(*address, class)).copied().unwrap_or(0)
    }

    /// Counter after adding `requested`, `None` on overflow
    pub fn checked_next(
        &self,
        address: &Address,
        class: CouponClass,
        requested: u64,
    ) -> Option<u64> {
        self.get(address, class).checked_add(requested)
    }

    pub(crate) fn set(&mut self, address: Address, class: CouponClass, value: u64) {
        debug_assert!(value >= self.get(&address, class));
        self.counts.insert((address, class), value);
    }

    pub fn counters_for(&self, address: &Address) -> MintCounters {
        MintCounters(
            CouponClass::ALL
                .into_iter()
                .map(|class| (class, self.get(address, class)))
                .collect(),
        )
    }
}
