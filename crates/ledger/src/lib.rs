//! Ledger side of coupon-gated minting.
//!
//! [`Ledger`] is the authoritative state machine: it holds the trusted issuer
//! address and the per-(address, class) mint counters, and every call either
//! applies fully or not at all. [`LedgerNode`] wraps it behind a lock so calls
//! are serialized, and exposes it to clients through `coupon_sdk::Provider`.
//!
//! ```rust,no_run
//! use coupon_ledger::{CallContext, Ledger, LedgerConfig};
//! use coupon_sdk::{Address, CouponClass, CouponSigner};
//!
//! let issuer = CouponSigner::random();
//! let admin = Address([1u8; 20]);
//! let mut ledger = Ledger::new(LedgerConfig::new(admin, issuer.address()));
//!
//! let buyer = Address([2u8; 20]);
//! let coupon = issuer.sign(CouponClass::Team, 3, &buyer).unwrap();
//! ledger
//!     .mint(&CallContext::new(buyer), CouponClass::Team, 2, 3, coupon)
//!     .unwrap();
//! assert_eq!(ledger.mint_counters(&buyer).get(CouponClass::Team), 2);
//! ```

pub mod constants;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod node;
pub mod state;

use coupon_sdk::{Address, Coupon, CouponClass, MintCounters};

pub use errors::{LedgerError, Result};
pub use events::LedgerEvent;
pub use instructions::mint::{MintOutcome, MintParams};
pub use node::LedgerNode;
pub use state::{LedgerConfig, MintCounterStore, TokenLedger};

/// Who is calling and what they attached
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    /// Attached payment in wei
    pub value: u128,
}

impl CallContext {
    pub fn new(caller: Address) -> Self {
        Self { caller, value: 0 }
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Ledger {
    pub(crate) config: LedgerConfig,
    pub(crate) counters: MintCounterStore,
    pub(crate) tokens: TokenLedger,
    pub(crate) events: Vec<LedgerEvent>,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            counters: MintCounterStore::default(),
            tokens: TokenLedger::default(),
            events: Vec::new(),
        }
    }

    pub fn mint(
        &mut self,
        ctx: &CallContext,
        class: CouponClass,
        requested: u64,
        allotted: u64,
        coupon: Coupon,
    ) -> Result<MintOutcome> {
        instructions::mint::handler(
            self,
            ctx,
            MintParams {
                class,
                requested,
                allotted,
                coupon,
            },
        )
    }

    pub fn set_issuer_key(&mut self, caller: &Address, new_issuer: Address) -> Result<()> {
        instructions::set_issuer_key::handler(self, caller, new_issuer)
    }

    pub fn mint_counters(&self, address: &Address) -> MintCounters {
        self.counters.counters_for(address)
    }

    pub fn issuer_key(&self) -> Address {
        self.config.issuer
    }

    pub fn admin(&self) -> Address {
        self.config.admin
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.tokens.balance_of(address)
    }

    pub fn total_supply(&self) -> u64 {
        self.tokens.total_supply()
    }

    pub fn treasury(&self) -> u128 {
        self.tokens.treasury()
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }
}
