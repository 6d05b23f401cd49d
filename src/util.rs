use reqwest::Url;

/// Parse a strictly positive millisecond count from an env-style string.
pub fn parse_positive_millis(s: &str) -> Option<u64> {
    s.trim().parse::<u64>().ok().filter(|ms| *ms > 0)
}

/// Returns true for localhost, loopback IPv4/IPv6, and 0.0.0.0 URLs.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    match parsed.host_str() {
        Some(host) => {
            let normalized = host.trim().to_ascii_lowercase();
            normalized == "localhost"
                || normalized == "::1"
                || normalized == "0.0.0.0"
                || normalized.starts_with("127.")
        }
        None => false,
    }
}
