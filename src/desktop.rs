use std::marker::PhantomData;
use std::sync::Arc;

use tauri::{plugin::PluginApi, AppHandle, Runtime};

use crate::bridge::{Bridge, BridgeRequest, PendingCalls};
use crate::config::IapConfig;
use crate::control::InAppPurchase;
use crate::platform::Platform;

/// Access to the in-app purchase APIs.
pub type Iap<R> = InAppPurchase<DesktopBridge<R>>;

pub fn init<R: Runtime>(
    _app: &AppHandle<R>,
    api: PluginApi<R, Option<IapConfig>>,
) -> crate::Result<Iap<R>> {
    let config = api.config().clone().unwrap_or_default();
    let iap = InAppPurchase::new(config, DesktopBridge(PhantomData), Arc::new(PendingCalls::new()));
    // the platform guard rejects desktop hosts before anything reaches the bridge
    iap.attach(Platform::current());
    Ok(iap)
}

/// Placeholder bridge for hosts without a native store plugin.
pub struct DesktopBridge<R: Runtime>(PhantomData<fn() -> R>);

impl<R: Runtime> Bridge for DesktopBridge<R> {
    fn send(&self, request: BridgeRequest) -> crate::Result<()> {
        Err(crate::Error::Bridge(format!(
            "{} is not available: no native store on this platform",
            request.method.name()
        )))
    }
}
