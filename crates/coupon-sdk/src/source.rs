use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::debug;

use crate::address::Address;
use crate::class::CouponClass;
use crate::error::{Result, SdkError};
use crate::http::HttpClient;
use crate::issuance::{CouponEntry, IssuanceSet};

/// Where the client finds an account's coupon
pub trait CouponSource: Send + Sync {
    fn coupon_for(
        &self,
        class: CouponClass,
        account: &Address,
    ) -> impl Future<Output = Result<Option<CouponEntry>>> + Send;
}

/// A static coupon file bundled with the client; it only covers the class it
/// was issued for
pub struct StaticCoupons {
    pub class: CouponClass,
    pub set: IssuanceSet,
}

impl StaticCoupons {
    pub fn new(class: CouponClass, set: IssuanceSet) -> Self {
        Self { class, set }
    }
}

impl CouponSource for StaticCoupons {
    async fn coupon_for(
        &self,
        class: CouponClass,
        account: &Address,
    ) -> Result<Option<CouponEntry>> {
        if class != self.class {
            return Ok(None);
        }
        Ok(self.set.lookup(account).copied())
    }
}

/// Body of `GET /coupons/:class/:address` on the issuer service
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CouponResponse {
    pub address: Address,
    pub class: CouponClass,
    #[serde(flatten)]
    pub entry: CouponEntry,
}

impl CouponResponse {
    /// The entry, provided the service answered for the account and class asked about
    pub fn entry_for(self, class: CouponClass, account: &Address) -> Result<CouponEntry> {
        if self.address != *account || self.class != class {
            return Err(SdkError::CouponService(format!(
                "asked for {} {} coupon, got one for {} {}",
                account, class, self.address, self.class
            )));
        }
        Ok(self.entry)
    }
}

pub struct HttpCouponSource {
    http: HttpClient,
}

impl HttpCouponSource {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(base_url)?,
        })
    }

    /// Fetch a whole issuance file and check it against a known pin
    pub async fn fetch_pinned_set(&self, class: CouponClass, pin: &str) -> Result<IssuanceSet> {
        let bytes = self.http.get_bytes(&format!("coupons/{}", class)).await?;
        IssuanceSet::from_pinned_json(&bytes, pin)
    }
}

impl CouponSource for HttpCouponSource {
    async fn coupon_for(
        &self,
        class: CouponClass,
        account: &Address,
    ) -> Result<Option<CouponEntry>> {
        let path = format!("coupons/{}/{}", class, account);
        debug!("Fetching coupon from {}", self.http.url(&path));
        let Some(response) = self.http.get_json_opt::<CouponResponse>(&path).await? else {
            return Ok(None);
        };
        response.entry_for(class, account).map(Some)
    }
}
