//! Append-only click records and the device classification they carry.

use serde::Serialize;
use std::fmt;

/// Coarse device classification produced by [`crate::clicktracker::ua`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Bot,
    #[default]
    Unknown,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceType::Desktop => "desktop",
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Bot => "bot",
            DeviceType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Desktop => "desktop",
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Bot => "bot",
            DeviceType::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "desktop" => DeviceType::Desktop,
            "mobile" => DeviceType::Mobile,
            "tablet" => DeviceType::Tablet,
            "bot" => DeviceType::Bot,
            _ => DeviceType::Unknown,
        }
    }
}

/// The immutable bundle captured synchronously from the request, before
/// dispatch to the background click-tracking worker pool. The request
/// object itself is never read off its original thread.
#[derive(Debug, Clone)]
pub struct ClickSnapshot {
    pub client_ip: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

/// Everything a completed enrichment pass learned about one click, ready
/// to persist. Any field may be absent — partial enrichment is acceptable.
#[derive(Debug, Clone, Default)]
pub struct NewClickEvent {
    pub mapping_id: i64,
    pub client_ip: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub browser_name: Option<String>,
    pub browser_version: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub device_type: DeviceType,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub timezone: Option<String>,
}
