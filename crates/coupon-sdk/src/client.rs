/// Orchestrates the mint flow for one connected wallet:
/// network check → coupon lookup → counter read → mint → counter re-read.
/// The ledger owns the mint counter; this client only mirrors the last value
/// it read and never adjusts it on its own.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::address::Address;
use crate::class::{ClassPolicy, CouponClass};
use crate::error::{Result, SdkError};
use crate::issuance::CouponEntry;
use crate::provider::{MintReceipt, MintTransaction, Provider};
use crate::source::CouponSource;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Chain the ledger lives on
    pub chain_id: u64,
    /// Shown in the switch-network notice
    pub network_name: String,
    pub contract: Address,
    pub active_class: CouponClass,
    pub policy: ClassPolicy,
    /// When set, fetched coupons must recover to this issuer before use
    pub issuer: Option<Address>,
    /// `None` waits on the provider indefinitely
    pub submit_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(chain_id: u64, network_name: &str, contract: Address, class: CouponClass) -> Self {
        Self {
            chain_id,
            network_name: network_name.to_string(),
            contract,
            active_class: class,
            policy: ClassPolicy::default_for(class),
            issuer: None,
            submit_timeout: None,
        }
    }

    pub fn with_policy(mut self, policy: ClassPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_issuer(mut self, issuer: Address) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = Some(timeout);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eligibility {
    pub account: Address,
    pub allotted: u64,
    /// Last counter read from the ledger, `None` while unknown
    pub minted: Option<u64>,
    pub selected: u64,
    pub minting: bool,
}

impl Eligibility {
    pub fn remaining(&self) -> u64 {
        self.minted
            .map(|minted| self.allotted.saturating_sub(minted))
            .unwrap_or(0)
    }
}

/// What the front end should render
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountView {
    /// Only a switch-network notice; no mint controls
    WrongNetwork {
        expected: String,
        connected: Option<u64>,
    },
    Disconnected,
    /// Terminal for this account
    NoEligibleCoupon { account: Address },
    /// The coupon source could not be reached; connecting again retries
    CouponLookupFailed { account: Address, reason: String },
    Eligible(Eligibility),
}

#[derive(Default)]
struct Session {
    account: Option<Address>,
    connected_chain: Option<u64>,
    entry: Option<CouponEntry>,
    lookup_error: Option<String>,
    minted: Option<u64>,
    selected: u64,
}

impl Session {
    fn remaining(&self) -> u64 {
        match (self.entry, self.minted) {
            (Some(entry), Some(minted)) => entry.quantity.saturating_sub(minted),
            _ => 0,
        }
    }

    fn clamp_selected(&mut self) {
        self.selected = self.selected.min(self.remaining());
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SdkError::MintInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct MintClient<P, S> {
    config: ClientConfig,
    provider: P,
    coupons: S,
    session: RwLock<Session>,
    in_flight: AtomicBool,
}

impl<P: Provider, S: CouponSource> MintClient<P, S> {
    pub fn new(config: ClientConfig, provider: P, coupons: S) -> Self {
        Self {
            config,
            provider,
            coupons,
            session: RwLock::new(Session::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn is_minting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn view(&self) -> AccountView {
        let session = self.session.read().await;

        if session.connected_chain != Some(self.config.chain_id) {
            return AccountView::WrongNetwork {
                expected: self.config.network_name.clone(),
                connected: session.connected_chain,
            };
        }

        let Some(account) = session.account else {
            return AccountView::Disconnected;
        };

        match session.entry {
            None => match &session.lookup_error {
                Some(reason) => AccountView::CouponLookupFailed {
                    account,
                    reason: reason.clone(),
                },
                None => AccountView::NoEligibleCoupon { account },
            },
            Some(entry) => AccountView::Eligible(Eligibility {
                account,
                allotted: entry.quantity,
                minted: session.minted,
                selected: session.selected,
                minting: self.is_minting(),
            }),
        }
    }

    /// Ask the wallet which chain it is on
    pub async fn check_network(&self) -> Result<bool> {
        let chain_id = self.provider.chain_id().await?;
        let matches = chain_id == self.config.chain_id;
        if !matches {
            warn!(
                "Connected to chain {}, please switch to {} ({})",
                chain_id, self.config.network_name, self.config.chain_id
            );
        }
        self.session.write().await.connected_chain = Some(chain_id);
        Ok(matches)
    }

    pub async fn connect(&self, account: Address) -> Result<AccountView> {
        {
            let mut session = self.session.write().await;
            let chain = session.connected_chain;
            *session = Session {
                account: Some(account),
                connected_chain: chain,
                ..Session::default()
            };
        }

        if !self.check_network().await? {
            return Ok(self.view().await);
        }

        let class = self.config.active_class;
        let entry = match self.coupons.coupon_for(class, &account).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                info!("No valid {} mint coupons found for {}", class, account);
                return Ok(self.view().await);
            }
            Err(e) => {
                warn!("Coupon lookup failed for {}: {}", account, e);
                let mut session = self.session.write().await;
                if session.account == Some(account) {
                    session.lookup_error = Some(e.to_string());
                }
                return Err(e);
            }
        };

        if let Some(issuer) = self.config.issuer {
            entry.coupon.verify(class, entry.quantity, &account, &issuer)?;
        }

        // The wallet may have switched accounts while we were fetching
        let still_active = {
            let mut session = self.session.write().await;
            let active = session.account == Some(account);
            if active {
                session.entry = Some(entry);
            }
            active
        };

        if still_active {
            self.refresh().await?;
        }
        Ok(self.view().await)
    }

    pub async fn disconnect(&self) {
        let mut session = self.session.write().await;
        let chain = session.connected_chain;
        *session = Session {
            connected_chain: chain,
            ..Session::default()
        };
    }

    /// Wallet reported a new account list; the first one is active
    pub async fn on_accounts_changed(&self, accounts: &[Address]) -> Result<AccountView> {
        match accounts.first() {
            Some(&account) => self.connect(account).await,
            None => {
                self.disconnect().await;
                Ok(self.view().await)
            }
        }
    }

    /// Wallet switched chains. Back on the target chain everything is reloaded.
    pub async fn on_chain_changed(&self, chain_id: u64) -> Result<AccountView> {
        let account = {
            let mut session = self.session.write().await;
            session.connected_chain = Some(chain_id);
            session.account
        };

        if chain_id != self.config.chain_id {
            warn!("Chain changed to {}, minting disabled", chain_id);
            return Ok(self.view().await);
        }

        match account {
            Some(account) => self.connect(account).await,
            None => Ok(self.view().await),
        }
    }

    /// Re-read this account's counter from the ledger
    pub async fn refresh(&self) -> Result<u64> {
        let account = {
            let session = self.session.read().await;
            if session.connected_chain != Some(self.config.chain_id) {
                return Err(SdkError::NetworkMismatch {
                    expected: self.config.chain_id,
                    actual: session.connected_chain.unwrap_or_default(),
                });
            }
            session.account.ok_or(SdkError::NotConnected)?
        };

        let counters = self.provider.mint_counters(account).await?;
        let minted = counters.get(self.config.active_class);

        let mut session = self.session.write().await;
        if session.account == Some(account) {
            session.minted = Some(minted);
            session.clamp_selected();
        }
        Ok(minted)
    }

    pub async fn remaining(&self) -> u64 {
        self.session.read().await.remaining()
    }

    /// Set the quantity selector, clamped to [0, remaining]
    pub async fn set_quantity(&self, quantity: u64) -> u64 {
        let mut session = self.session.write().await;
        session.selected = quantity;
        session.clamp_selected();
        session.selected
    }

    pub async fn increment(&self) -> u64 {
        let mut session = self.session.write().await;
        session.selected = session.selected.saturating_add(1);
        session.clamp_selected();
        session.selected
    }

    pub async fn decrement(&self) -> u64 {
        let mut session = self.session.write().await;
        session.selected = session.selected.saturating_sub(1);
        session.selected
    }

    /// Submit the selected quantity with the account's coupon.
    ///
    /// Only one submission may be in flight. On success the counter is read
    /// again from the ledger; on a timeout it is marked unknown because the
    /// transaction may still land.
    pub async fn mint(&self) -> Result<MintReceipt> {
        let guard = InFlightGuard::acquire(&self.in_flight)?;
        let tx = self.build_transaction().await?;
        let account = tx.from;

        info!(
            "Minting {} {} unit(s) for {} (value {} wei)",
            tx.requested, tx.class, account, tx.value
        );

        let submitted = self.provider.send_mint(tx);
        let result = match self.config.submit_timeout {
            Some(limit) => match tokio::time::timeout(limit, submitted).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Mint for {} still pending after {:?}", account, limit);
                    self.forget_counter(account).await;
                    return Err(SdkError::SubmitTimeout(limit));
                }
            },
            None => submitted.await,
        };
        drop(guard);

        match result {
            Ok(receipt) => {
                info!("Minted! tx {}", receipt.tx_hash_hex());
                self.forget_counter(account).await;
                if let Err(e) = self.refresh().await {
                    warn!("Minted but failed to refresh counter: {}", e);
                }
                Ok(receipt)
            }
            Err(e) => {
                warn!("Mint failed for {}: {}", account, e);
                Err(e)
            }
        }
    }

    async fn build_transaction(&self) -> Result<MintTransaction> {
        let session = self.session.read().await;

        if session.connected_chain != Some(self.config.chain_id) {
            return Err(SdkError::NetworkMismatch {
                expected: self.config.chain_id,
                actual: session.connected_chain.unwrap_or_default(),
            });
        }
        let account = session.account.ok_or(SdkError::NotConnected)?;
        let entry = match (session.entry, &session.lookup_error) {
            (Some(entry), _) => entry,
            (None, Some(reason)) => return Err(SdkError::CouponService(reason.clone())),
            (None, None) => return Err(SdkError::NoEligibleCoupon(account.to_string())),
        };

        let requested = session.selected;
        let remaining = session.remaining();
        if requested == 0 || requested > remaining {
            return Err(SdkError::InvalidQuantity(format!(
                "requested {}, {} remaining",
                requested, remaining
            )));
        }

        let value = self
            .config
            .policy
            .required_payment(requested)
            .ok_or_else(|| SdkError::InvalidQuantity("payment overflows".into()))?;

        Ok(MintTransaction {
            from: account,
            class: self.config.active_class,
            requested,
            allotted: entry.quantity,
            coupon: entry.coupon,
            value,
        })
    }

    async fn forget_counter(&self, account: Address) {
        let mut session = self.session.write().await;
        if session.account == Some(account) {
            session.minted = None;
            session.clamp_selected();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::PRESALE_PRICE_WEI;
    use crate::coupon::CouponSigner;
    use crate::issuance::IssuanceSet;
    use crate::provider::MintCounters;
    use crate::source::StaticCoupons;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Semaphore;

    const CHAIN: u64 = 4;
    const ALLOTTED: u64 = 3;

    #[derive(Default)]
    struct MockLedger {
        chain_id: u64,
        issuer: Address,
        counters: Mutex<BTreeMap<Address, u64>>,
        apply_mints: bool,
        reject: Option<String>,
        gate: Option<Arc<Semaphore>>,
        counter_reads: AtomicUsize,
        sent: Mutex<Vec<MintTransaction>>,
    }

    impl MockLedger {
        fn new(chain_id: u64, issuer: Address) -> Self {
            Self {
                chain_id,
                issuer,
                apply_mints: true,
                ..Default::default()
            }
        }

        fn reads(&self) -> usize {
            self.counter_reads.load(Ordering::SeqCst)
        }
    }

    impl Provider for MockLedger {
        async fn chain_id(&self) -> Result<u64> {
            Ok(self.chain_id)
        }

        async fn mint_counters(&self, account: Address) -> Result<MintCounters> {
            self.counter_reads.fetch_add(1, Ordering::SeqCst);
            let minted = self.counters.lock().unwrap().get(&account).copied().unwrap_or(0);
            Ok(MintCounters(
                [(CouponClass::Presale, minted)].into_iter().collect(),
            ))
        }

        async fn issuer_key(&self) -> Result<Address> {
            Ok(self.issuer)
        }

        async fn send_mint(&self, tx: MintTransaction) -> Result<MintReceipt> {
            if let Some(gate) = &self.gate {
                let _permit = gate
                    .acquire()
                    .await
                    .map_err(|e| SdkError::Provider(e.to_string()))?;
            }
            self.sent.lock().unwrap().push(tx.clone());
            if let Some(reason) = &self.reject {
                return Err(SdkError::Rejected(reason.clone()));
            }
            if self.apply_mints {
                *self.counters.lock().unwrap().entry(tx.from).or_default() += tx.requested;
            }
            Ok(MintReceipt {
                tx_hash: [1u8; 32],
                first_token_id: 0,
                quantity: tx.requested,
            })
        }
    }

    fn account() -> Address {
        Address([0xab; 20])
    }

    fn coupons(signer: &CouponSigner) -> StaticCoupons {
        let mut set = IssuanceSet::new();
        set.insert(
            &account(),
            CouponEntry {
                quantity: ALLOTTED,
                coupon: signer.sign(CouponClass::Presale, ALLOTTED, &account()).unwrap(),
            },
        );
        StaticCoupons::new(CouponClass::Presale, set)
    }

    fn test_config() -> ClientConfig {
        ClientConfig::new(
            CHAIN,
            "Rinkeby Network",
            Address([0xcc; 20]),
            CouponClass::Presale,
        )
    }

    fn client(ledger: MockLedger, signer: &CouponSigner) -> MintClient<MockLedger, StaticCoupons> {
        let config = test_config();
        MintClient::new(config, ledger, coupons(signer))
    }

    #[tokio::test]
    async fn test_wrong_network_suppresses_minting() {
        let signer = CouponSigner::random();
        let client = client(MockLedger::new(1, signer.address()), &signer);

        let view = client.connect(account()).await.unwrap();
        assert_eq!(
            view,
            AccountView::WrongNetwork {
                expected: "Rinkeby Network".into(),
                connected: Some(1),
            }
        );
        assert_eq!(client.provider().reads(), 0);
        assert!(matches!(
            client.mint().await,
            Err(SdkError::NetworkMismatch { expected: CHAIN, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn test_unknown_account_has_no_coupon() {
        let signer = CouponSigner::random();
        let client = client(MockLedger::new(CHAIN, signer.address()), &signer);
        let stranger = Address([0x11; 20]);

        let view = client.connect(stranger).await.unwrap();
        assert_eq!(view, AccountView::NoEligibleCoupon { account: stranger });
        assert!(matches!(client.mint().await, Err(SdkError::NoEligibleCoupon(_))));
        assert!(client.provider().sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mint_rereads_ledger() {
        let signer = CouponSigner::random();
        let client = client(MockLedger::new(CHAIN, signer.address()), &signer);

        client.connect(account()).await.unwrap();
        assert_eq!(client.remaining().await, ALLOTTED);
        assert_eq!(client.provider().reads(), 1);

        assert_eq!(client.set_quantity(10).await, ALLOTTED);
        assert_eq!(client.set_quantity(2).await, 2);

        let receipt = client.mint().await.unwrap();
        assert_eq!(receipt.quantity, 2);
        assert_eq!(client.provider().reads(), 2);

        let sent = client.provider().sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].allotted, ALLOTTED);
        assert_eq!(sent[0].requested, 2);
        assert_eq!(sent[0].value, 2 * PRESALE_PRICE_WEI);

        match client.view().await {
            AccountView::Eligible(e) => {
                assert_eq!(e.minted, Some(2));
                assert_eq!(e.remaining(), 1);
                assert!(!e.minting);
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_counter_is_never_incremented_locally() {
        let signer = CouponSigner::random();
        let mut ledger = MockLedger::new(CHAIN, signer.address());
        // ledger accepts the call but its counter does not move
        ledger.apply_mints = false;
        let client = client(ledger, &signer);

        client.connect(account()).await.unwrap();
        client.set_quantity(1).await;
        client.mint().await.unwrap();

        assert_eq!(client.provider().reads(), 2);
        assert_eq!(client.remaining().await, ALLOTTED);
    }

    #[tokio::test]
    async fn test_rejection_reason_is_surfaced() {
        let signer = CouponSigner::random();
        let mut ledger = MockLedger::new(CHAIN, signer.address());
        ledger.reject = Some("quota exceeded".into());
        let client = client(ledger, &signer);

        client.connect(account()).await.unwrap();
        client.set_quantity(1).await;

        match client.mint().await {
            Err(SdkError::Rejected(reason)) => assert_eq!(reason, "quota exceeded"),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(!client.is_minting());
        assert_eq!(client.provider().reads(), 1);
        assert_eq!(client.remaining().await, ALLOTTED);
    }

    #[tokio::test]
    async fn test_single_mint_in_flight() {
        let signer = CouponSigner::random();
        let gate = Arc::new(Semaphore::new(0));
        let mut ledger = MockLedger::new(CHAIN, signer.address());
        ledger.gate = Some(gate.clone());
        let client = Arc::new(client(ledger, &signer));

        client.connect(account()).await.unwrap();
        client.set_quantity(1).await;

        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.mint().await })
        };
        while !client.is_minting() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(client.mint().await, Err(SdkError::MintInFlight)));

        gate.add_permits(1);
        first.await.unwrap().unwrap();
        assert!(!client.is_minting());
        assert_eq!(client.provider().sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_timeout_releases_control() {
        let signer = CouponSigner::random();
        let mut ledger = MockLedger::new(CHAIN, signer.address());
        ledger.gate = Some(Arc::new(Semaphore::new(0)));
        let config = test_config().with_submit_timeout(Duration::from_millis(20));
        let client = MintClient::new(config, ledger, coupons(&signer));

        client.connect(account()).await.unwrap();
        client.set_quantity(1).await;

        assert!(matches!(client.mint().await, Err(SdkError::SubmitTimeout(_))));
        assert!(!client.is_minting());
        // the pending transaction may still land, so the old reading is dropped
        assert_eq!(client.remaining().await, 0);
        assert_eq!(client.refresh().await.unwrap(), 0);
        assert_eq!(client.remaining().await, ALLOTTED);
    }

    #[tokio::test]
    async fn test_quantity_selector_bounds() {
        let signer = CouponSigner::random();
        let client = client(MockLedger::new(CHAIN, signer.address()), &signer);
        client.connect(account()).await.unwrap();

        assert_eq!(client.decrement().await, 0);
        for _ in 0..5 {
            client.increment().await;
        }
        assert_eq!(client.set_quantity(u64::MAX).await, ALLOTTED);
        assert_eq!(client.increment().await, ALLOTTED);
        assert_eq!(client.decrement().await, ALLOTTED - 1);

        assert_eq!(client.set_quantity(0).await, 0);
        assert!(matches!(client.mint().await, Err(SdkError::InvalidQuantity(_))));
    }

    #[tokio::test]
    async fn test_wallet_events() {
        let signer = CouponSigner::random();
        let client = client(MockLedger::new(CHAIN, signer.address()), &signer);
        client.connect(account()).await.unwrap();

        let view = client.on_chain_changed(1).await.unwrap();
        assert!(matches!(view, AccountView::WrongNetwork { .. }));

        let view = client.on_chain_changed(CHAIN).await.unwrap();
        assert!(matches!(view, AccountView::Eligible(_)));

        let view = client.on_accounts_changed(&[]).await.unwrap();
        assert_eq!(view, AccountView::Disconnected);
        assert!(matches!(client.refresh().await, Err(SdkError::NotConnected)));

        let view = client.on_accounts_changed(&[account()]).await.unwrap();
        assert!(matches!(view, AccountView::Eligible(_)));
    }

    #[tokio::test]
    async fn test_foreign_issuer_coupon_refused() {
        let signer = CouponSigner::random();
        let trusted = CouponSigner::random();
        let config = test_config().with_issuer(trusted.address());
        let ledger = MockLedger::new(CHAIN, trusted.address());
        let client = MintClient::new(config, ledger, coupons(&signer));

        assert!(matches!(
            client.connect(account()).await,
            Err(SdkError::InvalidCoupon(_))
        ));
        assert_eq!(client.view().await, AccountView::NoEligibleCoupon { account: account() });
    }

    /// Coupon source that is down until `recovered` is set
    struct FlakySource {
        inner: StaticCoupons,
        recovered: AtomicBool,
    }

    impl CouponSource for FlakySource {
        async fn coupon_for(
            &self,
            class: CouponClass,
            account: &Address,
        ) -> Result<Option<CouponEntry>> {
            if !self.recovered.load(Ordering::SeqCst) {
                return Err(SdkError::CouponService("GET failed: 503".into()));
            }
            self.inner.coupon_for(class, account).await
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_terminal() {
        let signer = CouponSigner::random();
        let source = FlakySource {
            inner: coupons(&signer),
            recovered: AtomicBool::new(false),
        };
        let client = MintClient::new(
            test_config(),
            MockLedger::new(CHAIN, signer.address()),
            source,
        );

        assert!(matches!(
            client.connect(account()).await,
            Err(SdkError::CouponService(_))
        ));
        assert_eq!(
            client.view().await,
            AccountView::CouponLookupFailed {
                account: account(),
                reason: "Coupon service error: GET failed: 503".into(),
            }
        );
        assert!(matches!(client.mint().await, Err(SdkError::CouponService(_))));
        assert!(client.provider().sent.lock().unwrap().is_empty());

        client.coupons.recovered.store(true, Ordering::SeqCst);
        let view = client.connect(account()).await.unwrap();
        assert!(matches!(view, AccountView::Eligible(_)));
    }
}
