//! IP → country/region/city via a local GeoLite2 MMDB, loaded once at
//! startup and skipped entirely for non-public addresses.

use ipnet::IpNet;
use maxminddb::geoip2;
use std::net::IpAddr;
use std::sync::OnceLock;

pub struct GeoHit {
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub timezone: Option<String>,
}

pub struct GeoIpClient {
    reader: Option<maxminddb::Reader<Vec<u8>>>,
}

impl GeoIpClient {
    pub fn open(database_path: Option<&str>) -> Self {
        let reader = database_path.and_then(|path| {
            maxminddb::Reader::open_readfile(path)
                .inspect_err(|e| tracing::warn!(error = %e, path, "failed to open GeoIP database"))
                .ok()
        });
        Self { reader }
    }

    /// `None` for private/loopback/link-local ranges, or on any lookup
    /// failure — the caller treats this identically to a GeoIP timeout.
    pub fn lookup(&self, ip: &str) -> Option<GeoHit> {
        let reader = self.reader.as_ref()?;
        let addr: IpAddr = ip.parse().ok()?;
        if is_non_public(&addr) {
            return None;
        }

        let city: geoip2::City = reader.lookup(addr).ok()?;

        let country_code = city
            .country
            .as_ref()
            .and_then(|c| c.iso_code)
            .map(str::to_string);
        let country_name = city
            .country
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|n| n.get("en"))
            .map(|s| s.to_string());
        let city_name = city
            .city
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|n| n.get("en"))
            .map(|s| s.to_string());
        let region = city
            .subdivisions
            .as_ref()
            .and_then(|s| s.first())
            .and_then(|s| s.names.as_ref())
            .and_then(|n| n.get("en"))
            .map(|s| s.to_string());
        let timezone = city
            .location
            .as_ref()
            .and_then(|l| l.time_zone)
            .map(str::to_string);

        Some(GeoHit {
            country_code,
            country_name,
            city: city_name,
            region,
            timezone,
        })
    }
}

fn private_ranges() -> &'static [IpNet] {
    static RANGES: OnceLock<Vec<IpNet>> = OnceLock::new();
    RANGES.get_or_init(|| {
        [
            "10.0.0.0/8",
            "172.16.0.0/12",
            "192.168.0.0/16",
            "127.0.0.0/8",
            "169.254.0.0/16",
            "::1/128",
            "fc00::/7",
            "fe80::/10",
        ]
        .iter()
        .map(|s| s.parse().expect("static CIDR literal is valid"))
        .collect()
    })
}

fn is_non_public(addr: &IpAddr) -> bool {
    private_ranges().iter().any(|net| net.contains(addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_is_non_public() {
        assert!(is_non_public(&"127.0.0.1".parse().unwrap()));
        assert!(is_non_public(&"::1".parse().unwrap()));
    }

    #[test]
    fn rfc1918_is_non_public() {
        assert!(is_non_public(&"10.1.2.3".parse().unwrap()));
        assert!(is_non_public(&"192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn link_local_is_non_public() {
        assert!(is_non_public(&"169.254.1.1".parse().unwrap()));
    }

    #[test]
    fn public_address_is_not_excluded() {
        assert!(!is_non_public(&"8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn lookup_without_database_returns_none() {
        let client = GeoIpClient::open(None);
        assert!(client.lookup("8.8.8.8").is_none());
    }
}
