use std::sync::Arc;

use bindery_registry::{ContractRegistry, LiveIntrospector};
use bindery_types::{ContractError, DeclarationDocument, MethodSpec, RequestOptions};
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    ClientError,
    codec::{
        DefaultErrorDecoder, DefaultQueryMapEncoder, Decoder, Encoder, ErrorDecoder, FormEncoder, JsonDecoder, JsonEncoder,
        QueryMapEncoder,
    },
    config::{ClientConfig, LogLevel},
    dispatch::{DispatchTable, MethodHandler, Shared},
    factory::TemplateFactory,
    transport::Transport,
};

/// Collects the collaborators of a client and binds specs into a [`DispatchTable`].
#[derive(Clone)]
pub struct ClientBuilder {
    base_url: String,
    transport: Arc<dyn Transport>,
    encoder: Arc<dyn Encoder>,
    decoder: Arc<dyn Decoder>,
    query_map_encoder: Arc<dyn QueryMapEncoder>,
    error_decoder: Arc<dyn ErrorDecoder>,
    options: RequestOptions,
    decode_404: bool,
    default_headers: IndexMap<String, String>,
    log_level: LogLevel,
}

impl ClientBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::from_config(&ClientConfig::default(), transport)
    }

    pub fn from_config(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            transport,
            encoder: Arc::new(FormEncoder::<JsonEncoder>::default()),
            decoder: Arc::new(JsonDecoder),
            query_map_encoder: Arc::new(DefaultQueryMapEncoder),
            error_decoder: Arc::new(DefaultErrorDecoder),
            options: config.options,
            decode_404: config.decode_404,
            default_headers: config.default_headers.clone(),
            log_level: config.log_level,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    pub fn decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn query_map_encoder(mut self, encoder: impl QueryMapEncoder + 'static) -> Self {
        self.query_map_encoder = Arc::new(encoder);
        self
    }

    pub fn error_decoder(mut self, decoder: impl ErrorDecoder + 'static) -> Self {
        self.error_decoder = Arc::new(decoder);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn decode_404(mut self, decode_404: bool) -> Self {
        self.decode_404 = decode_404;
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Validates `specs` and binds one handler per config key.
    pub fn build(&self, specs: Vec<MethodSpec>) -> Result<DispatchTable, ClientError> {
        let shared = Arc::new(Shared {
            base_url: self.base_url.clone(),
            transport: self.transport.clone(),
            decoder: self.decoder.clone(),
            error_decoder: self.error_decoder.clone(),
            options: self.options,
            decode_404: self.decode_404,
            default_headers: self.default_headers.clone(),
            log_level: self.log_level,
        });

        let mut handlers = IndexMap::with_capacity(specs.len());
        for spec in specs {
            spec.validate()?;
            if handlers.contains_key(&spec.config_key) {
                return Err(ContractError::DuplicateConfigKey(spec.config_key).into());
            }
            let spec = Arc::new(spec);
            let factory = TemplateFactory::select(spec.clone(), self.encoder.clone(), self.query_map_encoder.clone());
            debug!(config_key = %spec.config_key, strategy = ?factory.strategy(), "bound method");
            handlers.insert(spec.config_key.clone(), MethodHandler::new(spec, factory, shared.clone()));
        }
        Ok(DispatchTable::new(handlers))
    }

    /// Compiles `interface` at bind time with `registry` and binds the result.
    pub fn build_live(
        &self,
        registry: &ContractRegistry,
        document: &DeclarationDocument,
        interface: &str,
    ) -> Result<DispatchTable, ClientError> {
        let introspector = LiveIntrospector::from_document(document, interface)?;
        self.build(registry.compile(&introspector)?)
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .field("decode_404", &self.decode_404)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}
