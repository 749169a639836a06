use std::sync::Arc;

use log::warn;
use serde::Serialize;
use serde_json::Value;
use tauri::{
    ipc::{Channel, InvokeResponseBody},
    plugin::{PluginApi, PluginHandle},
    AppHandle, Runtime,
};

use crate::bridge::{Bridge, BridgeMethod, BridgeRequest, InFlight, PendingCalls};
use crate::config::IapConfig;
use crate::control::InAppPurchase;
use crate::decode::past_purchases_payload;
use crate::events::{EventKind, Subscriptions};
use crate::platform::Platform;

#[cfg(target_os = "android")]
const PLUGIN_IDENTIFIER: &str = "app.tauri.inapppurchase";

#[cfg(target_os = "ios")]
tauri::ios_plugin_binding!(init_plugin_inapp_purchase);

/// Access to the in-app purchase APIs.
pub type Iap<R> = InAppPurchase<NativeBridge<R>>;

// registers the Kotlin or Swift plugin and subscribes to its store events
pub fn init<R: Runtime>(
    _app: &AppHandle<R>,
    api: PluginApi<R, Option<IapConfig>>,
) -> crate::Result<Iap<R>> {
    let config = api.config().clone().unwrap_or_default();
    #[cfg(target_os = "android")]
    let handle = api.register_android_plugin(PLUGIN_IDENTIFIER, "InAppPurchasePlugin")?;
    #[cfg(target_os = "ios")]
    let handle = api.register_ios_plugin(init_plugin_inapp_purchase)?;

    let pending = Arc::new(PendingCalls::new());
    let subscriptions = Arc::new(Subscriptions::new());
    let bridge = NativeBridge {
        handle: Arc::new(handle),
        pending: pending.clone(),
        past_purchases: InFlight::new(),
    };
    for kind in EventKind::ALL {
        bridge.listen(kind, subscriptions.clone())?;
    }

    let iap = InAppPurchase::with_subscriptions(config, bridge, pending, subscriptions);
    iap.attach(Platform::current());
    Ok(iap)
}

#[derive(Serialize)]
struct RegisterListener {
    event: &'static str,
    handler: Channel,
}

/// Bridge to the native plugin registered with Tauri.
pub struct NativeBridge<R: Runtime> {
    handle: Arc<PluginHandle<R>>,
    pending: Arc<PendingCalls>,
    past_purchases: InFlight,
}

impl<R: Runtime> NativeBridge<R> {
    /// Forwards every `kind` event the native plugin triggers into `subscriptions`.
    fn listen(&self, kind: EventKind, subscriptions: Arc<Subscriptions>) -> crate::Result<()> {
        let handler = Channel::new(move |body| {
            match body {
                InvokeResponseBody::Json(payload) => subscriptions.route(kind.name(), &payload),
                InvokeResponseBody::Raw(bytes) => {
                    subscriptions.route(kind.name(), &String::from_utf8_lossy(&bytes))
                }
            }
            Ok(())
        });
        self.handle
            .run_mobile_plugin::<Value>(
                "registerListener",
                RegisterListener {
                    event: kind.name(),
                    handler,
                },
            )
            .map(|_| ())
            .map_err(Into::into)
    }
}

impl<R: Runtime> Bridge for NativeBridge<R> {
    fn send(&self, request: BridgeRequest) -> crate::Result<()> {
        let command = native_command(request.method);
        let arguments = match request.arguments {
            Value::Null => Value::Object(Default::default()),
            arguments => arguments,
        };

        if !request.wait_for_result {
            return self
                .handle
                .run_mobile_plugin::<Value>(command, arguments)
                .map(|_| ())
                .map_err(Into::into);
        }

        // A native call that never returns keeps its blocking thread parked
        // after the caller has timed out, so only one may be outstanding.
        let Some(guard) = self.past_purchases.try_begin() else {
            warn!("{command} is still waiting on the store; answering #{} empty", request.id);
            self.pending.complete(request.id, None);
            return Ok(());
        };
        let handle = self.handle.clone();
        let pending = self.pending.clone();
        tauri::async_runtime::spawn_blocking(move || {
            let result = match handle.run_mobile_plugin::<Value>(command, arguments) {
                Ok(value) => past_purchases_payload(value),
                Err(err) => {
                    warn!("{command} failed: {err}");
                    None
                }
            };
            drop(guard);
            pending.complete(request.id, result);
        });
        Ok(())
    }
}

fn native_command(method: BridgeMethod) -> &'static str {
    match method {
        BridgeMethod::Initialize => "initialize",
        BridgeMethod::QueryProducts => "queryProducts",
        BridgeMethod::BuyProduct => "buyProduct",
        BridgeMethod::RestorePurchases => "restorePurchases",
        BridgeMethod::GetPastPurchases => "getPastPurchases",
        BridgeMethod::FinishTransaction => "finishTransaction",
    }
}
