use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("ipweather/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the location and weather lookups.
pub(crate) fn build_client(timeout: Duration, accept_invalid_certs: bool) -> reqwest::Result<Client> {
    if accept_invalid_certs {
        tracing::warn!("TLS certificate validation is disabled (accept_invalid_certs = true)");
    }

    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_bodies_are_untouched() {
        assert_eq!(truncate_body("{\"cod\":401}"), "{\"cod\":401}");
    }

    #[test]
    fn long_bodies_are_cut_on_char_boundary() {
        let body = "я".repeat(150);
        let cut = truncate_body(&body);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 203);
    }
}
