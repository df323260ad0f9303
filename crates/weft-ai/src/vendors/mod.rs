use std::sync::OnceLock;

use reqwest::Client;

mod openai_compat;

pub use openai_compat::OpenAiCompatVendor;

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    if base_url.ends_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    }
}

pub(crate) fn shared_http_client(base_url: &str) -> &'static Client {
    static DEFAULT_CLIENT: OnceLock<Client> = OnceLock::new();
    static LOOPBACK_CLIENT: OnceLock<Client> = OnceLock::new();

    if is_loopback_base_url(base_url) {
        LOOPBACK_CLIENT.get_or_init(|| {
            Client::builder()
                .no_proxy()
                .build()
                .unwrap_or_else(|_| Client::new())
        })
    } else {
        DEFAULT_CLIENT.get_or_init(Client::new)
    }
}

pub(crate) fn is_loopback_base_url(base_url: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(base_url) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1" || host == "::1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_trailing_slash() {
        assert_eq!(join_url("http://a/v1/", "models"), "http://a/v1/models");
        assert_eq!(join_url("http://a/v1", "models"), "http://a/v1/models");
    }

    #[test]
    fn loopback_detection() {
        assert!(is_loopback_base_url("http://localhost:8080/v1"));
        assert!(is_loopback_base_url("http://127.0.0.1/v1"));
        assert!(!is_loopback_base_url("https://api.example.com/v1"));
        assert!(!is_loopback_base_url("not a url"));
    }
}
