//! HTTP transport for bindery clients.
//!
//! [`ReqwestTransport`] implements the engine's [`Transport`] trait on top of
//! `reqwest`. It keeps one `reqwest::Client` per connection profile (connect
//! timeout and redirect policy) and applies the read timeout per request.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use bindery_api::ReqwestTransport;
//! use bindery_engine::{ClientBuilder, ClientConfig};
//!
//! let config = ClientConfig::load();
//! bindery_api::validate_base_url(&config.base_url)?;
//! let builder = ClientBuilder::from_config(&config, Arc::new(ReqwestTransport::new()));
//! let table = builder.build(specs)?;
//! let value = table.invoke("GitHub#contributors(String,String)", argv).await?;
//! ```

use std::{env, sync::Mutex, time::Duration};

use anyhow::{Result, anyhow};
use bindery_engine::{Request, Response, Transport, TransportError};
use bindery_types::{HttpMethod, RequestOptions};
use indexmap::IndexMap;
use reqwest::{Client, Method, Url, redirect::Policy};
use tracing::debug;

/// Hostnames allowed to use plain HTTP.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];
const MAX_REDIRECTS: usize = 10;

/// Connection profile a cached client was built for.
type ClientKey = (u64, bool);

#[derive(Debug)]
pub struct ReqwestTransport {
    clients: Mutex<IndexMap<ClientKey, Client>>,
    user_agent: String,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(IndexMap::new()),
            user_agent: format!("bindery/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        }
    }

    /// The client for `options`, built on first use.
    fn client(&self, options: &RequestOptions) -> Result<Client, TransportError> {
        let key = (options.connect_timeout_ms, options.follow_redirects);
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| TransportError::new("transport client cache is poisoned"))?;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let redirect = if options.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(options.connect_timeout_ms))
            .redirect(redirect)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|error| TransportError::with_source("build http client", error))?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    #[cfg(test)]
    fn cached_clients(&self) -> usize {
        self.clients.lock().map(|clients| clients.len()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request, options: &RequestOptions) -> Result<Response, TransportError> {
        let client = self.client(options)?;
        debug!(method = %request.method, url = %request.url, "building request");

        let mut builder = client
            .request(reqwest_method(request.method), request.url.as_str())
            .timeout(Duration::from_millis(options.read_timeout_ms));
        for (name, values) in &request.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let mut headers: IndexMap<String, Vec<String>> = IndexMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        let body = response.bytes().await.map_err(transport_error)?.to_vec();
        debug!(status = status.as_u16(), bytes = body.len(), "received response");

        Ok(Response {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            headers,
            body,
        })
    }
}

fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
        HttpMethod::Trace => Method::TRACE,
    }
}

fn transport_error(error: reqwest::Error) -> TransportError {
    let timed_out = error.is_timeout();
    let transport = TransportError::with_source(error.to_string(), error);
    if timed_out { transport.timed_out() } else { transport }
}

/// Validate that a base URL is acceptable for use by a client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
pub fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid base URL '{}': {}", base, e))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("base URL '{}' must include a host", base))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(anyhow!(
            "base URL must use https for non-localhost hosts; got '{}://'",
            parsed_base_url.scheme()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_requires_https_outside_localhost() {
        assert!(validate_base_url("https://api.github.com").is_ok());
        assert!(validate_base_url("http://localhost:8080").is_ok());
        assert!(validate_base_url("http://127.0.0.1").is_ok());
        assert!(validate_base_url("http://api.github.com").is_err());
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn methods_map_one_to_one() {
        assert_eq!(reqwest_method(HttpMethod::Patch), Method::PATCH);
        assert_eq!(reqwest_method(HttpMethod::Trace).as_str(), HttpMethod::Trace.as_str());
    }

    #[test]
    fn clients_are_cached_per_connection_profile() {
        let transport = ReqwestTransport::new();
        let defaults = RequestOptions::default();
        transport.client(&defaults).expect("client");
        transport
            .client(&RequestOptions {
                read_timeout_ms: 5,
                ..defaults
            })
            .expect("client");
        assert_eq!(transport.cached_clients(), 1);

        transport
            .client(&RequestOptions {
                follow_redirects: false,
                ..defaults
            })
            .expect("client");
        assert_eq!(transport.cached_clients(), 2);
    }
}
