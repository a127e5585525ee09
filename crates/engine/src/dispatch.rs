//! The per-client table of method handlers.

use std::{sync::Arc, time::Instant};

use bindery_types::{MethodSpec, RequestOptions};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::{
    ClientError, ResolveError,
    codec::{Decoder, ErrorDecoder},
    config::LogLevel,
    factory::TemplateFactory,
    http::Request,
    logging::{log_request, log_response},
    transport::Transport,
};

/// Collaborators and defaults shared by every handler of one client.
pub(crate) struct Shared {
    pub(crate) base_url: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) decoder: Arc<dyn Decoder>,
    pub(crate) error_decoder: Arc<dyn ErrorDecoder>,
    pub(crate) options: RequestOptions,
    pub(crate) decode_404: bool,
    pub(crate) default_headers: IndexMap<String, String>,
    pub(crate) log_level: LogLevel,
}

/// One bound method: its spec, the template factory and the client's collaborators.
pub struct MethodHandler {
    spec: Arc<MethodSpec>,
    factory: TemplateFactory,
    shared: Arc<Shared>,
}

impl MethodHandler {
    pub(crate) fn new(spec: Arc<MethodSpec>, factory: TemplateFactory, shared: Arc<Shared>) -> Self {
        Self { spec, factory, shared }
    }

    pub fn spec(&self) -> &MethodSpec {
        &self.spec
    }

    pub fn factory(&self) -> &TemplateFactory {
        &self.factory
    }

    /// Builds the request `argv` would send, without sending it.
    pub fn resolve(&self, argv: &[Value]) -> Result<Request, ClientError> {
        let mut template = self.factory.create(argv)?;
        for (name, value) in &self.shared.default_headers {
            template.header_if_absent(name, value.clone());
        }
        template.request(&self.shared.base_url).map_err(|source| ClientError::Resolve {
            config_key: self.spec.config_key.clone(),
            source,
        })
    }

    pub async fn invoke(&self, argv: &[Value]) -> Result<Value, ClientError> {
        let config_key = self.spec.config_key.as_str();
        let request = self.resolve(argv)?;
        let options = self.options(argv)?;
        log_request(self.shared.log_level, config_key, &request);

        let started = Instant::now();
        let response = self
            .shared
            .transport
            .execute(request, &options)
            .await
            .map_err(|source| ClientError::Transport {
                config_key: config_key.to_string(),
                source,
            })?;
        log_response(self.shared.log_level, config_key, &response, started.elapsed());

        if response.is_success() {
            return self
                .shared
                .decoder
                .decode(&response, &self.spec.return_type)
                .map_err(|source| ClientError::Decode {
                    config_key: config_key.to_string(),
                    source,
                });
        }
        if response.status == 404 && self.shared.decode_404 && !self.spec.return_type.is_unit() {
            debug!(config_key, "decoding 404 as null");
            return Ok(Value::Null);
        }
        Err(self.shared.error_decoder.decode(config_key, &response))
    }

    /// The client default, replaced by a non-null `RequestOptions` argument.
    fn options(&self, argv: &[Value]) -> Result<RequestOptions, ClientError> {
        let Some(index) = self.spec.options_index else {
            return Ok(self.shared.options);
        };
        match argv.get(index) {
            None | Some(Value::Null) => Ok(self.shared.options),
            Some(value) => serde_json::from_value(value.clone()).map_err(|source| ClientError::Resolve {
                config_key: self.spec.config_key.clone(),
                source: ResolveError::InvalidOptions { index, source },
            }),
        }
    }
}

/// `config_key → handler` for every method of one client. Immutable once built.
pub struct DispatchTable {
    handlers: IndexMap<String, MethodHandler>,
}

impl DispatchTable {
    pub(crate) fn new(handlers: IndexMap<String, MethodHandler>) -> Self {
        Self { handlers }
    }

    pub fn config_keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn handler(&self, config_key: &str) -> Option<&MethodHandler> {
        self.handlers.get(config_key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn resolve(&self, config_key: &str, argv: &[Value]) -> Result<Request, ClientError> {
        self.lookup(config_key)?.resolve(argv)
    }

    /// Sends the call bound to `config_key` and returns the decoded response.
    pub async fn invoke(&self, config_key: &str, argv: Vec<Value>) -> Result<Value, ClientError> {
        self.lookup(config_key)?.invoke(&argv).await
    }

    fn lookup(&self, config_key: &str) -> Result<&MethodHandler, ClientError> {
        self.handlers
            .get(config_key)
            .ok_or_else(|| ClientError::UnknownMethod(config_key.to_string()))
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
