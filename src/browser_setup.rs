//! Locating the Chrome/Chromium executable the driver pool launches.

use std::env;
use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::pool::PoolConfig;
use crate::{LookupError, Result};

/// Environment variable naming the executable.
pub const CHROME_ENV: &str = "CHROME";

#[cfg(target_os = "macos")]
const KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(windows)]
const KNOWN_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(all(unix, not(target_os = "macos")))]
const KNOWN_PATHS: &[&str] = &[
    "/opt/google/chrome/chrome",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

const KNOWN_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Where the executable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeOrigin {
    /// `pool.chrome_path`
    Config,
    /// The `CHROME` environment variable.
    Env,
    /// A command found on `PATH`.
    Command,
    /// A well-known install location.
    KnownPath,
}

impl fmt::Display for ChromeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match self {
            Self::Config => "pool.chrome_path",
            Self::Env => CHROME_ENV,
            Self::Command => "PATH",
            Self::KnownPath => "install location",
        };
        f.write_str(origin)
    }
}

/// Finds the executable for `config`.
///
/// An explicit `pool.chrome_path` must exist. Without one, the `CHROME`
/// variable, commands on `PATH` and well-known install locations are tried
/// in that order.
pub fn find_chrome(config: &PoolConfig) -> Result<(PathBuf, ChromeOrigin)> {
    locate(
        config.chrome_path.as_deref(),
        env::var_os(CHROME_ENV).map(PathBuf::from),
    )
}

fn locate(configured: Option<&str>, from_env: Option<PathBuf>) -> Result<(PathBuf, ChromeOrigin)> {
    if let Some(path) = configured {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(LookupError::Browser(format!(
                "pool.chrome_path {} does not exist",
                path.display()
            )));
        }
        return Ok((path, ChromeOrigin::Config));
    }

    let found = from_env
        .filter(|path| path.exists())
        .map(|path| (path, ChromeOrigin::Env))
        .or_else(|| {
            KNOWN_COMMANDS
                .iter()
                .find_map(|cmd| which::which(cmd).ok())
                .map(|path| (path, ChromeOrigin::Command))
        })
        .or_else(|| {
            KNOWN_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|path| path.exists())
                .map(|path| (path, ChromeOrigin::KnownPath))
        });

    match found {
        Some((path, origin)) => {
            debug!("Chrome found via {}: {}", origin, path.display());
            Ok((path, origin))
        }
        None => Err(LookupError::Browser(format!(
            "Chrome/Chromium not found; install it, set pool.chrome_path or the {} variable",
            CHROME_ENV
        ))),
    }
}
