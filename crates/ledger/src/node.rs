/// Serialized access to a [`Ledger`], presented to clients as a wallet provider.
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use coupon_sdk::crypto::keccak256;
use coupon_sdk::{
    Address, MintCounters, MintReceipt, MintTransaction, Provider, Result as SdkResult, SdkError,
};

use crate::errors::{LedgerError, Result};
use crate::{CallContext, Ledger};

struct NodeState {
    ledger: Ledger,
    /// Executed transactions, fed into the tx hash
    nonce: u64,
}

#[derive(Clone)]
pub struct LedgerNode {
    chain_id: u64,
    state: Arc<Mutex<NodeState>>,
}

impl LedgerNode {
    pub fn new(chain_id: u64, ledger: Ledger) -> Self {
        Self {
            chain_id,
            state: Arc::new(Mutex::new(NodeState { ledger, nonce: 0 })),
        }
    }

    pub fn chain(&self) -> u64 {
        self.chain_id
    }

    pub async fn set_issuer_key(&self, caller: &Address, new_issuer: Address) -> Result<()> {
        let mut state = self.state.lock().await;
        state.ledger.set_issuer_key(caller, new_issuer)?;
        state.nonce = state.nonce.wrapping_add(1);
        Ok(())
    }

    /// Run a read against the current ledger state
    pub async fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let state = self.state.lock().await;
        f(&state.ledger)
    }

    /// Execute a mint as one serialized call
    pub async fn execute_mint(&self, tx: &MintTransaction) -> Result<MintReceipt> {
        let mut state = self.state.lock().await;
        let ctx = CallContext::new(tx.from).with_value(tx.value);
        let outcome = state
            .ledger
            .mint(&ctx, tx.class, tx.requested, tx.allotted, tx.coupon)?;

        // Only seeds the tx hash; the mint above has already committed
        let nonce = state.nonce;
        state.nonce = nonce.wrapping_add(1);

        let receipt = MintReceipt {
            tx_hash: transaction_hash(self.chain_id, nonce, tx),
            first_token_id: outcome.first_token_id,
            quantity: outcome.quantity,
        };
        debug!("Executed mint tx {}", receipt.tx_hash_hex());
        Ok(receipt)
    }
}

fn transaction_hash(chain_id: u64, nonce: u64, tx: &MintTransaction) -> [u8; 32] {
    let mut data = Vec::with_capacity(8 + 8 + 20 + 1 + 8 + 8 + 65 + 16);
    data.extend_from_slice(&chain_id.to_be_bytes());
    data.extend_from_slice(&nonce.to_be_bytes());
    data.extend_from_slice(tx.from.as_bytes());
    data.push(tx.class.id());
    data.extend_from_slice(&tx.requested.to_be_bytes());
    data.extend_from_slice(&tx.allotted.to_be_bytes());
    data.extend_from_slice(&tx.coupon.r);
    data.extend_from_slice(&tx.coupon.s);
    data.push(tx.coupon.v);
    data.extend_from_slice(&tx.value.to_be_bytes());
    keccak256(&data)
}

impl From<LedgerError> for SdkError {
    fn from(e: LedgerError) -> Self {
        SdkError::Rejected(e.to_string())
    }
}

impl Provider for LedgerNode {
    async fn chain_id(&self) -> SdkResult<u64> {
        Ok(self.chain_id)
    }

    async fn mint_counters(&self, account: Address) -> SdkResult<MintCounters> {
        Ok(self.read(|ledger| ledger.mint_counters(&account)).await)
    }

    async fn issuer_key(&self) -> SdkResult<Address> {
        Ok(self.read(|ledger| ledger.issuer_key()).await)
    }

    async fn send_mint(&self, tx: MintTransaction) -> SdkResult<MintReceipt> {
        Ok(self.execute_mint(&tx).await?)
    }
}
