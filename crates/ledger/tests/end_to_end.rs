use coupon_ledger::{Ledger, LedgerConfig, LedgerNode};
use coupon_sdk::issuance::parse_allowlist;
use coupon_sdk::{
    issue, AccountView, Address, ClientConfig, CouponClass, CouponSigner, IssuanceSet, MintClient,
    Provider, SdkError, StaticCoupons,
};

const CHAIN: u64 = 4;
const ADMIN: Address = Address([0xad; 20]);
const CONTRACT: Address = Address([0xcf; 20]);

const ALLOWLIST: &str = r#"{
    "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed": 3,
    "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359": 1,
    "not-an-address": 9
}"#;

fn buyer() -> Address {
    "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap()
}

/// Issue, ship the set through its pinned JSON form, and stand up a ledger
fn deploy(class: CouponClass) -> (CouponSigner, IssuanceSet, LedgerNode) {
    let issuer = CouponSigner::random();
    let allowlist = parse_allowlist(ALLOWLIST.as_bytes()).unwrap();
    let report = issue(&issuer, class, &allowlist).unwrap();
    assert_eq!(report.skipped, vec!["not-an-address".to_string()]);

    let bytes = report.set.to_json().unwrap();
    let pin = report.set.pin().unwrap();
    let shipped = IssuanceSet::from_pinned_json(&bytes, &pin).unwrap();

    let node = LedgerNode::new(CHAIN, Ledger::new(LedgerConfig::new(ADMIN, issuer.address())));
    (issuer, shipped, node)
}

fn client(
    class: CouponClass,
    set: IssuanceSet,
    node: LedgerNode,
) -> MintClient<LedgerNode, StaticCoupons> {
    let config = ClientConfig::new(CHAIN, "Rinkeby Network", CONTRACT, class);
    MintClient::new(config, node, StaticCoupons::new(class, set))
}

#[tokio::test]
async fn test_presale_flow_against_ledger() {
    let (_, set, node) = deploy(CouponClass::Presale);
    let client = client(CouponClass::Presale, set, node.clone());

    let view = client.connect(buyer()).await.unwrap();
    match view {
        AccountView::Eligible(e) => {
            assert_eq!(e.allotted, 3);
            assert_eq!(e.remaining(), 3);
        }
        other => panic!("unexpected view {:?}", other),
    }

    client.set_quantity(2).await;
    let receipt = client.mint().await.unwrap();
    assert_eq!(receipt.first_token_id, 0);
    assert_eq!(client.remaining().await, 1);

    client.set_quantity(1).await;
    client.mint().await.unwrap();
    assert_eq!(client.remaining().await, 0);
    assert_eq!(client.set_quantity(1).await, 0);

    assert_eq!(node.read(|l| l.balance_of(&buyer())).await, 3);
    assert_eq!(
        node.read(|l| l.treasury()).await,
        3 * coupon_ledger::constants::PRESALE_PRICE
    );
}

#[tokio::test]
async fn test_stale_client_view_is_caught_by_ledger() {
    let (_, set, node) = deploy(CouponClass::Team);
    let first = client(CouponClass::Team, set.clone(), node.clone());
    let second = client(CouponClass::Team, set, node.clone());

    // two sessions for the same account both see the full allowance
    first.connect(buyer()).await.unwrap();
    second.connect(buyer()).await.unwrap();
    first.set_quantity(3).await;
    second.set_quantity(2).await;

    first.mint().await.unwrap();
    match second.mint().await {
        Err(SdkError::Rejected(reason)) => assert!(reason.contains("Quota exceeded")),
        other => panic!("unexpected result {:?}", other),
    }

    second.refresh().await.unwrap();
    assert_eq!(second.remaining().await, 0);
    assert_eq!(node.read(|l| l.total_supply()).await, 3);
}

#[tokio::test]
async fn test_rotation_blocks_outstanding_coupons() {
    let (_, set, node) = deploy(CouponClass::Team);
    let client = client(CouponClass::Team, set, node.clone());
    client.connect(buyer()).await.unwrap();

    let replacement = CouponSigner::random();
    node.set_issuer_key(&ADMIN, replacement.address())
        .await
        .unwrap();
    assert_eq!(node.issuer_key().await.unwrap(), replacement.address());

    client.set_quantity(1).await;
    match client.mint().await {
        Err(SdkError::Rejected(reason)) => assert!(reason.contains("Invalid coupon")),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(client.remaining().await, 3);
}

#[tokio::test]
async fn test_wrong_chain_and_missing_coupon() {
    let (_, set, node) = deploy(CouponClass::Presale);
    let other_chain = LedgerNode::new(1, Ledger::new(LedgerConfig::new(ADMIN, ADMIN)));

    let misconfigured = client(CouponClass::Presale, set.clone(), other_chain);
    assert!(matches!(
        misconfigured.connect(buyer()).await.unwrap(),
        AccountView::WrongNetwork { .. }
    ));

    let client = client(CouponClass::Presale, set, node);
    let stranger = Address([0x42; 20]);
    assert_eq!(
        client.connect(stranger).await.unwrap(),
        AccountView::NoEligibleCoupon { account: stranger }
    );
}
