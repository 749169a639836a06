use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::bridge::{Bridge, PendingCalls};
use crate::config::IapConfig;
use crate::dispatcher::Dispatcher;
use crate::events::{EventKind, IapEvent, SubscriptionId, Subscriptions};
use crate::models::*;
use crate::platform::{ensure_mobile, Platform};
use crate::Result;

/// In-app purchase control.
///
/// Holds the default product ids and event subscriptions, and forwards store
/// operations to the native bridge once attached to a mobile app.
pub struct InAppPurchase<B: Bridge> {
    product_ids: RwLock<Option<Vec<String>>>,
    past_purchases_timeout: Duration,
    attached: RwLock<Option<Platform>>,
    dispatcher: Dispatcher<B>,
    subscriptions: Arc<Subscriptions>,
}

impl<B: Bridge> InAppPurchase<B> {
    pub fn new(config: IapConfig, bridge: B, pending: Arc<PendingCalls>) -> Self {
        Self::with_subscriptions(config, bridge, pending, Arc::new(Subscriptions::new()))
    }

    /// Like [`InAppPurchase::new`], sharing a subscription table that the
    /// bridge's event listeners already route into.
    pub fn with_subscriptions(
        config: IapConfig,
        bridge: B,
        pending: Arc<PendingCalls>,
        subscriptions: Arc<Subscriptions>,
    ) -> Self {
        Self {
            past_purchases_timeout: config.past_purchases_timeout(),
            product_ids: RwLock::new(config.product_ids),
            attached: RwLock::new(None),
            dispatcher: Dispatcher::new(bridge, pending),
            subscriptions,
        }
    }

    /// Binds the control to a running app on `platform`.
    pub fn attach(&self, platform: Platform) {
        *self.attached.write().unwrap_or_else(PoisonError::into_inner) = Some(platform);
    }

    pub fn detach(&self) {
        *self.attached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn platform(&self) -> Option<Platform> {
        *self.attached.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configured product ids, empty when none are set.
    pub fn product_ids(&self) -> Vec<String> {
        self.product_ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    pub fn set_product_ids(&self, product_ids: Option<Vec<String>>) {
        *self.product_ids.write().unwrap_or_else(PoisonError::into_inner) = product_ids;
    }

    pub fn subscriptions(&self) -> &Arc<Subscriptions> {
        &self.subscriptions
    }

    pub fn bridge(&self) -> &B {
        self.dispatcher.bridge()
    }

    pub fn on_products_ready<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&[ProductDetails]) + Send + Sync + 'static,
    {
        self.subscriptions
            .subscribe(EventKind::ProductsReady, move |event| {
                if let IapEvent::ProductsReady(products) = event {
                    handler(products.as_slice());
                }
            })
    }

    pub fn on_purchase_updated<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&PurchaseEvent) + Send + Sync + 'static,
    {
        self.subscriptions
            .subscribe(EventKind::PurchaseUpdated, move |event| {
                if let IapEvent::PurchaseUpdated(purchase) = event {
                    handler(purchase);
                }
            })
    }

    pub fn on_purchase_error<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&PurchaseError) + Send + Sync + 'static,
    {
        self.subscriptions
            .subscribe(EventKind::PurchaseError, move |event| {
                if let IapEvent::PurchaseError(error) = event {
                    handler(error);
                }
            })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    /// Feeds a raw bridge notification to the subscribed handlers.
    pub fn handle_event(&self, name: &str, payload: &str) {
        self.subscriptions.route(name, payload);
    }

    /// Starts the store connection.
    pub fn initialize(&self) -> Result<()> {
        self.check_mobile_platform()?;
        self.dispatcher.initialize()
    }

    /// Queries product details; they arrive via `products_ready`. Falls back to
    /// the configured ids when `product_ids` is `None` or empty.
    pub fn query_products(&self, product_ids: Option<Vec<String>>) -> Result<()> {
        self.check_mobile_platform()?;
        let ids = match product_ids {
            Some(ids) if !ids.is_empty() => ids,
            _ => self.product_ids(),
        };
        self.dispatcher.query_products(ids)
    }

    pub fn buy_product(&self, product_id: impl Into<String>) -> Result<()> {
        self.check_mobile_platform()?;
        self.dispatcher.buy_product(product_id.into())
    }

    pub fn restore_purchases(&self) -> Result<()> {
        self.check_mobile_platform()?;
        self.dispatcher.restore_purchases()
    }

    /// Fetches past purchases, waiting up to `wait_timeout` (the configured
    /// default when `None`). Returns an empty list if the store does not answer.
    pub fn get_past_purchases(&self, wait_timeout: Option<Duration>) -> Result<Vec<RawPurchase>> {
        self.check_mobile_platform()?;
        self.dispatcher
            .get_past_purchases(wait_timeout.unwrap_or(self.past_purchases_timeout))
    }

    /// Completes a transaction. Required on iOS once the purchase is delivered.
    pub fn finish_transaction(&self, transaction_id: impl Into<String>) -> Result<()> {
        self.check_mobile_platform()?;
        self.dispatcher.finish_transaction(transaction_id.into())
    }

    fn check_mobile_platform(&self) -> Result<Platform> {
        ensure_mobile(self.platform())
    }
}
