//! User-agent parsing: a real parser's classification first, falling
//! back to the heuristics spec.md §4.8 enumerates.

use crate::domain::DeviceType;

pub struct ParsedUa {
    pub browser_name: Option<String>,
    pub browser_version: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub device_type: DeviceType,
}

const BOT_TOKENS: &[&str] = &["bot", "crawler", "spider", "headless", "selenium", "webdriver"];
const TABLET_TOKENS: &[&str] = &["ipad", "tablet", "kindle", "playbook"];
const MOBILE_TOKENS: &[&str] = &["mobile", "iphone", "ipod", "blackberry", "windows phone", "android"];
const DESKTOP_TOKENS: &[&str] = &["windows", "macintosh", "linux", "x11"];

pub fn parse(user_agent: &str) -> ParsedUa {
    let lower = user_agent.to_lowercase();
    let parser = woothee::parser::Parser::new();

    if let Some(result) = parser.parse(user_agent) {
        let device_type = classify_from_woothee(&result, &lower);
        return ParsedUa {
            browser_name: non_unknown(result.name),
            browser_version: non_unknown(result.version),
            os_name: non_unknown(result.os),
            os_version: non_unknown(result.os_version.as_ref()),
            device_type,
        };
    }

    ParsedUa {
        browser_name: None,
        browser_version: None,
        os_name: None,
        os_version: None,
        device_type: classify_heuristic(&lower),
    }
}

fn non_unknown(s: &str) -> Option<String> {
    if s.is_empty() || s == "UNKNOWN" {
        None
    } else {
        Some(s.to_string())
    }
}

fn classify_from_woothee(result: &woothee::parser::WootheeResult, lower: &str) -> DeviceType {
    if BOT_TOKENS.iter().any(|t| lower.contains(t)) || result.category == "crawler" {
        return DeviceType::Bot;
    }
    match result.category {
        "smartphone" => {
            if TABLET_TOKENS.iter().any(|t| lower.contains(t)) {
                DeviceType::Tablet
            } else {
                DeviceType::Mobile
            }
        }
        "mobilephone" => DeviceType::Mobile,
        "pc" => DeviceType::Desktop,
        _ => classify_heuristic(lower),
    }
}

fn classify_heuristic(lower: &str) -> DeviceType {
    if BOT_TOKENS.iter().any(|t| lower.contains(t)) {
        return DeviceType::Bot;
    }
    if TABLET_TOKENS.iter().any(|t| lower.contains(t)) {
        return DeviceType::Tablet;
    }
    if MOBILE_TOKENS.iter().any(|t| lower.contains(t)) {
        return DeviceType::Mobile;
    }
    if DESKTOP_TOKENS.iter().any(|t| lower.contains(t)) {
        return DeviceType::Desktop;
    }
    DeviceType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_iphone_as_mobile() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        assert_eq!(parse(ua).device_type, DeviceType::Mobile);
    }

    #[test]
    fn classifies_ipad_as_tablet() {
        let ua = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        assert_eq!(parse(ua).device_type, DeviceType::Tablet);
    }

    #[test]
    fn classifies_known_bot_tokens() {
        assert_eq!(parse("Googlebot/2.1 (+http://www.google.com/bot.html)").device_type, DeviceType::Bot);
        assert_eq!(parse("curl headless-chrome/1.0").device_type, DeviceType::Bot);
    }

    #[test]
    fn classifies_windows_as_desktop() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
        assert_eq!(parse(ua).device_type, DeviceType::Desktop);
    }

    #[test]
    fn unrecognized_ua_is_unknown() {
        assert_eq!(parse("").device_type, DeviceType::Unknown);
    }
}
