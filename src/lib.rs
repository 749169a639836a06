use tauri::{
  plugin::{Builder, TauriPlugin},
  AppHandle, Emitter, Manager, Runtime,
};

pub use bridge::{Bridge, BridgeMethod, BridgeRequest, InFlight, InFlightGuard, PendingCalls, RecvTimeoutError, RequestId};
pub use config::IapConfig;
pub use control::InAppPurchase;
pub use decode::*;
pub use events::{EventKind, IapEvent, SubscriptionId, Subscriptions};
pub use models::*;
pub use platform::Platform;

#[cfg(desktop)]
mod desktop;
#[cfg(mobile)]
mod mobile;

mod bridge;
mod commands;
mod config;
mod control;
mod decode;
mod dispatcher;
mod error;
mod events;
mod models;
mod platform;

pub use dispatcher::{Dispatcher, DEFAULT_PAST_PURCHASES_TIMEOUT};
pub use error::{Error, Result};

#[cfg(desktop)]
pub use desktop::Iap;
#[cfg(mobile)]
pub use mobile::Iap;

/// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to access the in-app purchase APIs.
pub trait IapExt<R: Runtime> {
  fn inapp_purchase(&self) -> &Iap<R>;
}

impl<R: Runtime, T: Manager<R>> crate::IapExt<R> for T {
  fn inapp_purchase(&self) -> &Iap<R> {
    self.state::<Iap<R>>().inner()
  }
}

/// Initializes the plugin.
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<IapConfig>> {
  Builder::<R, Option<IapConfig>>::new("inapp-purchase")
    .invoke_handler(tauri::generate_handler![
      commands::initialize,
      commands::query_products,
      commands::buy_product,
      commands::restore_purchases,
      commands::get_past_purchases,
      commands::finish_transaction,
      commands::set_product_ids,
      commands::get_product_ids,
    ])
    .setup(|app, api| {
      #[cfg(mobile)]
      let iap = mobile::init(app, api)?;
      #[cfg(desktop)]
      let iap = desktop::init(app, api)?;
      forward_to_webview(app, iap.subscriptions());
      app.manage(iap);
      Ok(())
    })
    .build()
}

/// Re-emits every decoded store event to the webview as `inapp-purchase://<event>`.
fn forward_to_webview<R: Runtime>(app: &AppHandle<R>, subscriptions: &Subscriptions) {
  for kind in EventKind::ALL {
    let app = app.clone();
    let name = format!("inapp-purchase://{}", kind.name().replace('_', "-"));
    subscriptions.subscribe(kind, move |event| {
      let emitted = match event {
        IapEvent::ProductsReady(products) => app.emit(&name, products),
        IapEvent::PurchaseUpdated(purchase) => app.emit(&name, purchase),
        IapEvent::PurchaseError(error) => app.emit(&name, error),
      };
      if let Err(err) = emitted {
        log::warn!("failed to emit {name}: {err}");
      }
    });
  }
}
