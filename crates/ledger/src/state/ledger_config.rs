use std::collections::BTreeMap;

use coupon_sdk::{Address, ClassPolicy, CouponClass};

use crate::constants::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Only this identity may rotate the issuer key
    pub admin: Address,

    /// Address the coupon signatures must recover to
    pub issuer: Address,

    /// Pricing per class; classes missing here are treated as free
    pub policies: BTreeMap<CouponClass, ClassPolicy>,
}

impl LedgerConfig {
    pub fn new(admin: Address, issuer: Address) -> Self {
        let policies = [
            (CouponClass::Presale, ClassPolicy::priced(PRESALE_PRICE)),
            (CouponClass::Team, ClassPolicy::free()),
        ]
        .into_iter()
        .collect();

        Self {
            admin,
            issuer,
            policies,
        }
    }

    pub fn with_policy(mut self, class: CouponClass, policy: ClassPolicy) -> Self {
        self.policies.insert(class, policy);
        self
    }

    pub fn policy(&self, class: CouponClass) -> ClassPolicy {
        self.policies
            .get(&class)
            .copied()
            .unwrap_or_else(ClassPolicy::free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policies() {
        let config = LedgerConfig::new(Address([1u8; 20]), Address([2u8; 20]));
        assert_eq!(
            config.policy(CouponClass::Presale),
            ClassPolicy::priced(PRESALE_PRICE)
        );
        assert!(!config.policy(CouponClass::Team).payable);
    }
}
