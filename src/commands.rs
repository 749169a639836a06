use std::time::Duration;

use tauri::{command, AppHandle, Runtime};

use crate::models::*;
use crate::{IapExt, Result};

#[command]
pub(crate) async fn initialize<R: Runtime>(app: AppHandle<R>) -> Result<()> {
    app.inapp_purchase().initialize()
}

#[command]
pub(crate) async fn query_products<R: Runtime>(
    app: AppHandle<R>,
    payload: Option<ProductIdsRequest>,
) -> Result<()> {
    app.inapp_purchase()
        .query_products(payload.and_then(|p| p.product_ids))
}

#[command]
pub(crate) async fn buy_product<R: Runtime>(
    app: AppHandle<R>,
    payload: BuyProductRequest,
) -> Result<()> {
    app.inapp_purchase().buy_product(payload.product_id)
}

#[command]
pub(crate) async fn restore_purchases<R: Runtime>(app: AppHandle<R>) -> Result<()> {
    app.inapp_purchase().restore_purchases()
}

#[command]
pub(crate) async fn get_past_purchases<R: Runtime>(
    app: AppHandle<R>,
    payload: Option<GetPastPurchasesRequest>,
) -> Result<Vec<RawPurchase>> {
    let wait_timeout = payload
        .and_then(|p| p.wait_timeout)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
    off_async_worker(move || app.inapp_purchase().get_past_purchases(wait_timeout)).await
}

/// Runs a blocking call on the blocking pool so the async worker stays free.
async fn off_async_worker<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tauri::async_runtime::spawn_blocking(call).await?
}

#[command]
pub(crate) async fn finish_transaction<R: Runtime>(
    app: AppHandle<R>,
    payload: FinishTransactionRequest,
) -> Result<()> {
    app.inapp_purchase().finish_transaction(payload.transaction_id)
}

#[command]
pub(crate) async fn set_product_ids<R: Runtime>(
    app: AppHandle<R>,
    payload: ProductIdsRequest,
) -> Result<()> {
    app.inapp_purchase().set_product_ids(payload.product_ids);
    Ok(())
}

#[command]
pub(crate) async fn get_product_ids<R: Runtime>(app: AppHandle<R>) -> Result<Vec<String>> {
    Ok(app.inapp_purchase().product_ids())
}
