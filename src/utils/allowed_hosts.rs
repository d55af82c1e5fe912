use crate::utils::error::{HostError, Result};
use url::Url;

/// 解析後的 outbound 白名單，格式 `scheme://host:port`，各段可用 `*`
#[derive(Debug, Clone, Default)]
pub struct AllowedHosts {
    entries: Vec<HostPattern>,
}

#[derive(Debug, Clone)]
struct HostPattern {
    scheme: SchemeMatch,
    host: HostMatch,
    port: PortMatch,
}

#[derive(Debug, Clone)]
enum SchemeMatch {
    Any,
    Exact(String),
}

#[derive(Debug, Clone)]
enum HostMatch {
    Any,
    Exact(String),
    /// `*.example.com` 比對子網域，不含裸網域本身
    Suffix(String),
}

#[derive(Debug, Clone)]
enum PortMatch {
    Any,
    Exact(u16),
}

impl AllowedHosts {
    pub fn parse(field_name: &str, entries: &[String]) -> Result<Self> {
        let entries = entries
            .iter()
            .map(|entry| parse_entry(field_name, entry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn allows(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let port = url.port_or_known_default();

        self.entries.iter().any(|entry| {
            entry.matches_scheme(url.scheme())
                && entry.matches_host(host)
                && entry.matches_port(port)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HostPattern {
    fn matches_scheme(&self, scheme: &str) -> bool {
        match &self.scheme {
            SchemeMatch::Any => true,
            SchemeMatch::Exact(expected) => expected == scheme,
        }
    }

    fn matches_host(&self, host: &str) -> bool {
        match &self.host {
            HostMatch::Any => true,
            HostMatch::Exact(expected) => expected.eq_ignore_ascii_case(host),
            HostMatch::Suffix(suffix) => host
                .to_ascii_lowercase()
                .strip_suffix(suffix)
                .is_some_and(|prefix| prefix.ends_with('.')),
        }
    }

    fn matches_port(&self, port: Option<u16>) -> bool {
        match (&self.port, port) {
            (PortMatch::Any, _) => true,
            (PortMatch::Exact(expected), Some(actual)) => *expected == actual,
            (PortMatch::Exact(_), None) => false,
        }
    }
}

fn parse_entry(field_name: &str, entry: &str) -> Result<HostPattern> {
    let invalid = |reason: &str| HostError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: entry.to_string(),
        reason: reason.to_string(),
    };

    let (scheme_part, authority) = entry
        .split_once("://")
        .ok_or_else(|| invalid("Expected 'scheme://host[:port]'"))?;

    if authority.is_empty() || authority.contains('/') {
        return Err(invalid("Host part must not be empty or contain a path"));
    }

    let scheme = match scheme_part {
        "*" => SchemeMatch::Any,
        "http" | "https" => SchemeMatch::Exact(scheme_part.to_string()),
        _ => return Err(invalid("Scheme must be 'http', 'https' or '*'")),
    };

    let (host_part, port_part) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };

    if host_part.is_empty() {
        return Err(invalid("Host must not be empty"));
    }

    let host = if host_part == "*" {
        HostMatch::Any
    } else if let Some(suffix) = host_part.strip_prefix("*.") {
        if suffix.is_empty() || suffix.contains('*') {
            return Err(invalid("Invalid host wildcard"));
        }
        HostMatch::Suffix(suffix.to_ascii_lowercase())
    } else if host_part.contains('*') {
        return Err(invalid("Host wildcards must be of the form '*.domain'"));
    } else {
        HostMatch::Exact(host_part.to_ascii_lowercase())
    };

    let port = match port_part {
        Some("*") => PortMatch::Any,
        Some(digits) => PortMatch::Exact(
            digits
                .parse::<u16>()
                .map_err(|_| invalid("Port must be a number or '*'"))?,
        ),
        None => match &scheme {
            SchemeMatch::Exact(s) if s == "http" => PortMatch::Exact(80),
            SchemeMatch::Exact(s) if s == "https" => PortMatch::Exact(443),
            _ => PortMatch::Any,
        },
    };

    Ok(HostPattern { scheme, host, port })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(entries: &[&str]) -> AllowedHosts {
        let entries: Vec<String> = entries.iter().map(|s| s.to_string()).collect();
        AllowedHosts::parse("allowed_outbound_hosts", &entries).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_exact_entry() {
        let allowed = hosts(&["https://api.example.com"]);
        assert!(allowed.allows(&url("https://api.example.com/v1/things")));
        assert!(!allowed.allows(&url("http://api.example.com/")));
        assert!(!allowed.allows(&url("https://other.example.com/")));
        assert!(!allowed.allows(&url("https://api.example.com:8443/")));
    }

    #[test]
    fn test_default_ports() {
        let allowed = hosts(&["http://127.0.0.1:9100"]);
        assert!(allowed.allows(&url("http://127.0.0.1:9100/metrics")));
        assert!(!allowed.allows(&url("http://127.0.0.1:9200/metrics")));
    }

    #[test]
    fn test_wildcards() {
        let allowed = hosts(&["*://*:*"]);
        assert!(allowed.allows(&url("http://anything.example:1234/")));

        let subdomains = hosts(&["https://*.example.com"]);
        assert!(subdomains.allows(&url("https://api.example.com/")));
        assert!(subdomains.allows(&url("https://a.b.example.com/")));
        assert!(!subdomains.allows(&url("https://example.com/")));
        assert!(!subdomains.allows(&url("https://notexample.com/")));
    }

    #[test]
    fn test_wildcard_port() {
        let allowed = hosts(&["http://localhost:*"]);
        assert!(allowed.allows(&url("http://localhost:3001/")));
        assert!(allowed.allows(&url("http://localhost/")));
    }

    #[test]
    fn test_empty_list_denies_everything() {
        let allowed = hosts(&[]);
        assert!(allowed.is_empty());
        assert!(!allowed.allows(&url("https://example.com/")));
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        let bad = ["example.com", "ftp://example.com", "https://", "https://exa*mple.com"];
        for entry in bad {
            assert!(
                AllowedHosts::parse("allowed_outbound_hosts", &[entry.to_string()]).is_err(),
                "expected parse failure for {entry}"
            );
        }
    }
}
