use serde::{ser::Serializer, Serialize};

use crate::platform::Platform;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("InAppPurchase must be attached to a running app first")]
  NotAttached,
  #[error("InAppPurchase is supported on Android and iOS platforms only, not on {0}")]
  UnsupportedPlatform(Platform),
  #[error("No product IDs provided")]
  NoProductIds,
  #[error("malformed bridge payload: {0}")]
  Decode(#[from] serde_json::Error),
  #[error("bridge rejected request: {0}")]
  Bridge(String),
  #[error(transparent)]
  Tauri(#[from] tauri::Error),
  #[cfg(mobile)]
  #[error(transparent)]
  PluginInvoke(#[from] tauri::plugin::mobile::PluginInvokeError),
}

impl Serialize for Error {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(self.to_string().as_ref())
  }
}
