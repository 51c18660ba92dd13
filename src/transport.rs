//! HTTP transport for the firewall API
//!
//! Calls are sent to `{base_url}/{module}/{controller}/{command}[/{param}]`
//! with the API key and secret as basic-auth credentials. Reads use GET,
//! everything else POSTs a JSON body.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use declarative::{ApiCall, Transport, TransportError};
use serde_json::{Value, json};
use std::time::Duration;

use crate::config::ConnectionSettings;

/// Blocking HTTP client bound to one firewall
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
}

impl HttpTransport {
    /// Build a client from resolved connection settings
    pub fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let mut config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)));

        if !settings.ssl_verify {
            log::warn!("TLS certificate verification is disabled for {}", settings.base_url);
            config = config.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }

        let base_url = settings.base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
            anyhow::bail!("Firewall URL '{base_url}' must start with http:// or https://");
        }

        Ok(Self {
            agent: ureq::Agent::new_with_config(config.build()),
            base_url,
            authorization: basic_auth(&settings.api_key, &settings.api_secret),
        })
    }

    fn url(&self, call: &ApiCall) -> String {
        format!("{}/{}", self.base_url, call.path())
    }
}

impl Transport for HttpTransport {
    fn get(&self, call: &ApiCall) -> Result<Value, TransportError> {
        let url = self.url(call);
        log::trace!("GET {url}");

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .header("User-Agent", "opnsync")
            .call();
        read_response(call, response)
    }

    fn post(&self, call: &ApiCall) -> Result<Value, TransportError> {
        let url = self.url(call);
        log::trace!("POST {url}");

        let body = call.data.clone().unwrap_or_else(|| json!({}));
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .header("User-Agent", "opnsync")
            .send_json(&body);
        read_response(call, response)
    }
}

fn basic_auth(key: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{key}:{secret}")))
}

fn read_response(
    call: &ApiCall,
    response: std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<Value, TransportError> {
    let mut response = response.map_err(|e| map_error(call, e))?;

    response
        .body_mut()
        .read_json::<Value>()
        .map_err(|e| TransportError::Malformed {
            path: call.path(),
            message: e.to_string(),
        })
}

fn map_error(call: &ApiCall, err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::StatusCode(status) => TransportError::Status {
            path: call.path(),
            status,
        },
        other => TransportError::Network {
            path: call.path(),
            message: other.to_string(),
        },
    }
}

/// Connect, with the firewall URL in the error
pub fn connect(settings: &ConnectionSettings) -> Result<HttpTransport> {
    HttpTransport::connect(settings)
        .with_context(|| format!("Could not set up a client for {}", settings.base_url))
}
