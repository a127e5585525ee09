//! # Bindery Engine
//!
//! Turns compiled [`MethodSpec`](bindery_types::MethodSpec)s and per-call
//! arguments into resolved HTTP requests and dispatches them.
//!
//! ## Key Features
//!
//! - **Template resolution**: path, query, header and body templates with
//!   per-part encoding rules ([`RequestTemplate`])
//! - **Strategy selection**: form-encoded, body-encoded or resolve-only
//!   factories per method ([`TemplateFactory`])
//! - **Dispatch**: a `config_key → handler` table sharing one transport,
//!   encoder, decoder and error decoder ([`DispatchTable`])
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bindery_engine::{ClientBuilder, Request, Response, Transport, TransportError};
//! use bindery_types::{HttpMethod, MethodSpec, RequestOptions};
//! use serde_json::json;
//!
//! struct Offline;
//!
//! #[async_trait::async_trait]
//! impl Transport for Offline {
//!     async fn execute(&self, _: Request, _: &RequestOptions) -> Result<Response, TransportError> {
//!         Err(TransportError::new("offline"))
//!     }
//! }
//!
//! let mut spec = MethodSpec::new("GitHub#contributors(String,String)");
//! spec.http_method = Some(HttpMethod::Get);
//! spec.url_template = "/repos/{owner}/{repo}/contributors".into();
//! spec.name_param(0, "owner");
//! spec.name_param(1, "repo");
//!
//! let table = ClientBuilder::new(Arc::new(Offline))
//!     .base_url("https://api.github.com")
//!     .build(vec![spec])?;
//! let request = table.resolve("GitHub#contributors(String,String)", &[json!("rust-lang"), json!("rust")])?;
//! assert_eq!(request.url, "https://api.github.com/repos/rust-lang/rust/contributors");
//! # Ok::<(), bindery_engine::ClientError>(())
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod factory;
pub mod http;
mod logging;
pub mod template;
pub mod transport;

pub use client::ClientBuilder;
pub use codec::{
    DefaultErrorDecoder, DefaultQueryMapEncoder, Decoder, Encoder, ErrorDecoder, FormEncoder, JsonDecoder, JsonEncoder,
    QueryMapEncoder,
};
pub use config::{ClientConfig, LogLevel};
pub use dispatch::{DispatchTable, MethodHandler};
pub use error::{ClientError, DecodeError, EncodeError, ResolveError, TransportError};
pub use factory::{Strategy, TemplateFactory};
pub use http::{Request, Response};
pub use serde_json::Value;
pub use template::{RequestTemplate, TemplateBody, Variable, Variables};
pub use transport::Transport;

use serde::{Serialize, de::DeserializeOwned};

/// Converts a typed argument into the value passed to a dispatch table.
pub fn argument<T: Serialize + ?Sized>(value: &T) -> Result<Value, ClientError> {
    serde_json::to_value(value).map_err(ClientError::Argument)
}

/// Converts a decoded response value into the declared return type.
pub fn decode_value<T: DeserializeOwned>(config_key: &str, value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|error| ClientError::Decode {
        config_key: config_key.to_string(),
        source: DecodeError::with_source(format!("cannot convert response: {error}"), error),
    })
}
