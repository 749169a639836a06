use std::fmt;

use serde::Serialize;

use crate::{Error, Result};

/// Host operating system the control runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Macos,
    Windows,
    Linux,
    Unknown,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Unknown
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, Platform::Android | Platform::Ios)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Android => "Android",
            Platform::Ios => "iOS",
            Platform::Macos => "macOS",
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
            Platform::Unknown => "an unknown platform",
        };
        f.write_str(name)
    }
}

/// Gate for every store operation: the control must be attached, and the
/// platform it was attached on must be Android or iOS.
pub fn ensure_mobile(attached: Option<Platform>) -> Result<Platform> {
    match attached {
        None => Err(Error::NotAttached),
        Some(platform) if platform.is_mobile() => Ok(platform),
        Some(platform) => Err(Error::UnsupportedPlatform(platform)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_control_is_a_precondition_error() {
        assert!(matches!(ensure_mobile(None), Err(Error::NotAttached)));
    }

    #[test]
    fn desktop_platforms_are_rejected_by_name() {
        for platform in [
            Platform::Macos,
            Platform::Windows,
            Platform::Linux,
            Platform::Unknown,
        ] {
            match ensure_mobile(Some(platform)) {
                Err(Error::UnsupportedPlatform(p)) => assert_eq!(p, platform),
                other => panic!("expected unsupported platform, got {other:?}"),
            }
        }
    }

    #[test]
    fn mobile_platforms_pass() {
        assert_eq!(ensure_mobile(Some(Platform::Ios)).unwrap(), Platform::Ios);
        assert_eq!(
            ensure_mobile(Some(Platform::Android)).unwrap(),
            Platform::Android
        );
    }

    #[test]
    fn error_message_names_the_platform() {
        let err = ensure_mobile(Some(Platform::Windows)).unwrap_err();
        assert!(err.to_string().ends_with("not on Windows"));
    }
}
