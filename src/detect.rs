//! Application type detection.
//!
//! Looks for a well-known startup file in the application root. Detection
//! failures are not errors: an unreadable or unrecognized root yields
//! `None` and the options carry an empty app type.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Supported application types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    Rack,
    Wsgi,
    Node,
}

impl AppType {
    /// All types in detection order.
    pub const ALL: [AppType; 3] = [AppType::Rack, AppType::Wsgi, AppType::Node];

    /// Name used in pool options.
    pub fn name(&self) -> &'static str {
        match self {
            AppType::Rack => "rack",
            AppType::Wsgi => "wsgi",
            AppType::Node => "node",
        }
    }

    /// Startup file whose presence identifies this type.
    pub fn startup_file(&self) -> &'static str {
        match self {
            AppType::Rack => "config.ru",
            AppType::Wsgi => "passenger_wsgi.py",
            AppType::Node => "app.js",
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detects the application type of an app root.
pub trait AppTypeDetector: Send + Sync {
    fn detect(&self, app_root: &Path) -> Option<AppType>;
}

/// Detector that inspects the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAppTypeDetector;

impl AppTypeDetector for FsAppTypeDetector {
    fn detect(&self, app_root: &Path) -> Option<AppType> {
        let found = AppType::ALL
            .into_iter()
            .find(|t| app_root.join(t.startup_file()).is_file());
        if found.is_none() {
            tracing::debug!(app_root = %app_root.display(), "Could not detect application type");
        }
        found
    }
}
