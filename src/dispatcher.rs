use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::bridge::{Bridge, BridgeMethod, BridgeRequest, PendingCalls, RecvTimeoutError};
use crate::decode::decode_past_purchases;
use crate::models::*;
use crate::{Error, Result};

/// Wait applied to `get_past_purchases` when none is given.
pub const DEFAULT_PAST_PURCHASES_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns store operations into bridge requests.
pub struct Dispatcher<B: Bridge> {
    bridge: B,
    pending: Arc<PendingCalls>,
}

impl<B: Bridge> Dispatcher<B> {
    pub fn new(bridge: B, pending: Arc<PendingCalls>) -> Self {
        Self { bridge, pending }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn pending(&self) -> &Arc<PendingCalls> {
        &self.pending
    }

    pub fn initialize(&self) -> Result<()> {
        self.fire(BridgeMethod::Initialize, Value::Null)
    }

    /// Results arrive later as a `products_ready` event.
    pub fn query_products(&self, product_ids: Vec<String>) -> Result<()> {
        if product_ids.is_empty() {
            return Err(Error::NoProductIds);
        }
        self.fire(
            BridgeMethod::QueryProducts,
            to_arguments(QueryProductsRequest { product_ids })?,
        )
    }

    /// The outcome arrives as a `purchase_updated` event.
    pub fn buy_product(&self, product_id: String) -> Result<()> {
        self.fire(
            BridgeMethod::BuyProduct,
            to_arguments(BuyProductRequest { product_id })?,
        )
    }

    /// Each restored transaction arrives as its own `purchase_updated` event.
    pub fn restore_purchases(&self) -> Result<()> {
        self.fire(BridgeMethod::RestorePurchases, Value::Null)
    }

    pub fn finish_transaction(&self, transaction_id: String) -> Result<()> {
        self.fire(
            BridgeMethod::FinishTransaction,
            to_arguments(FinishTransactionRequest { transaction_id })?,
        )
    }

    /// Asks the store for past purchases and blocks up to `timeout` for the
    /// answer. No answer in time, or an empty one, is an empty list.
    pub fn get_past_purchases(&self, timeout: Duration) -> Result<Vec<RawPurchase>> {
        let call = self.pending.register();
        let request = BridgeRequest {
            id: call.id,
            method: BridgeMethod::GetPastPurchases,
            arguments: Value::Null,
            wait_for_result: true,
        };
        debug!("bridge request {} #{} (waiting {:?})", request.method.name(), request.id, timeout);
        if let Err(err) = self.bridge.send(request) {
            self.pending.cancel(call.id);
            return Err(err);
        }

        let id = call.id;
        match self.pending.wait(call, timeout) {
            Ok(None) => {
                debug!("get_past_purchases #{id} answered with nothing");
                Ok(Vec::new())
            }
            Ok(Some(payload)) => decode_past_purchases(Some(&payload)),
            Err(RecvTimeoutError::Timeout) => {
                warn!("get_past_purchases #{id} got no result within {timeout:?}");
                Ok(Vec::new())
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("get_past_purchases #{id} was dropped before an answer arrived");
                Ok(Vec::new())
            }
        }
    }

    fn fire(&self, method: BridgeMethod, arguments: Value) -> Result<()> {
        let request = BridgeRequest {
            id: self.pending.next_id(),
            method,
            arguments,
            wait_for_result: false,
        };
        debug!("bridge request {} #{}", method.name(), request.id);
        self.bridge.send(request)
    }
}

fn to_arguments<T: Serialize>(request: T) -> Result<Value> {
    serde_json::to_value(request).map_err(Into::into)
}
