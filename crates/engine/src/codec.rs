//! Collaborator traits for body encoding, response decoding and error mapping,
//! with JSON and form defaults.

use bindery_types::{TypeDescriptor, value_to_string};
use bindery_util::{body_preview, encode_query_component, status_error_message};
use indexmap::IndexMap;
use serde_json::Value;

use crate::{ClientError, DecodeError, EncodeError, RequestTemplate, http::Response};

pub const CONTENT_TYPE: &str = "Content-Type";
const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Writes a body argument (or the form map) into a request template.
pub trait Encoder: Send + Sync {
    fn encode(&self, value: &Value, body_type: &TypeDescriptor, template: &mut RequestTemplate) -> Result<(), EncodeError>;
}

/// Turns a successful response into a value of the declared return type.
pub trait Decoder: Send + Sync {
    fn decode(&self, response: &Response, return_type: &TypeDescriptor) -> Result<Value, DecodeError>;
}

/// Flattens a query-map argument into parameter name → value.
pub trait QueryMapEncoder: Send + Sync {
    fn encode(&self, value: &Value) -> Result<IndexMap<String, Value>, EncodeError>;
}

/// Maps an unsuccessful response to the error returned from dispatch.
pub trait ErrorDecoder: Send + Sync {
    fn decode(&self, config_key: &str, response: &Response) -> ClientError;
}

/// JSON bodies; string arguments declared as strings are sent raw.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, value: &Value, body_type: &TypeDescriptor, template: &mut RequestTemplate) -> Result<(), EncodeError> {
        if let Value::String(text) = value
            && body_type.is_string_like()
        {
            template.set_body(text.clone().into_bytes());
            return Ok(());
        }
        let bytes = serde_json::to_vec(value)
            .map_err(|error| EncodeError::with_source(format!("cannot encode {body_type} as JSON"), error))?;
        template.header_if_absent(CONTENT_TYPE, JSON_CONTENT_TYPE);
        template.set_body(bytes);
        Ok(())
    }
}

/// URL-encodes the form map and delegates every other body to `E`.
///
/// A form map is still written through the delegate when the template
/// already declares a JSON content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormEncoder<E = JsonEncoder> {
    delegate: E,
}

impl<E: Encoder> FormEncoder<E> {
    pub fn new(delegate: E) -> Self {
        Self { delegate }
    }
}

impl<E: Encoder> Encoder for FormEncoder<E> {
    fn encode(&self, value: &Value, body_type: &TypeDescriptor, template: &mut RequestTemplate) -> Result<(), EncodeError> {
        let is_json = template
            .content_type()
            .is_some_and(|content_type| content_type.to_ascii_lowercase().contains("json"));
        if *body_type != TypeDescriptor::form_map() || is_json {
            return self.delegate.encode(value, body_type, template);
        }
        let Value::Object(fields) = value else {
            return Err(EncodeError::new(format!("form body must be an object, got {value}")));
        };
        let mut pairs = Vec::new();
        for (name, field) in fields {
            let name = encode_query_component(name);
            let values: Vec<&Value> = match field {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for value in values.into_iter().filter(|value| !value.is_null()) {
                pairs.push(format!("{name}={}", encode_query_component(&value_to_string(value))));
            }
        }
        template.header_if_absent(CONTENT_TYPE, FORM_CONTENT_TYPE);
        template.set_body(pairs.join("&").into_bytes());
        Ok(())
    }
}

/// JSON responses; string returns take the body as text, unit returns and
/// empty bodies decode to `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, response: &Response, return_type: &TypeDescriptor) -> Result<Value, DecodeError> {
        if return_type.is_unit() || response.body.is_empty() {
            return Ok(Value::Null);
        }
        if return_type.is_string_like() {
            return Ok(Value::String(String::from_utf8_lossy(&response.body).into_owned()));
        }
        serde_json::from_slice(&response.body).map_err(|error| {
            DecodeError::with_source(
                format!("response is not valid JSON for {return_type}: {}", body_preview(&response.body, Some(120))),
                error,
            )
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultQueryMapEncoder;

impl QueryMapEncoder for DefaultQueryMapEncoder {
    fn encode(&self, value: &Value) -> Result<IndexMap<String, Value>, EncodeError> {
        match value {
            Value::Null => Ok(IndexMap::new()),
            Value::Object(entries) => Ok(entries
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()),
            other => Err(EncodeError::new(format!("query map must be an object, got {other}"))),
        }
    }
}

/// Reports the status, reason and a preview of the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorDecoder;

impl ErrorDecoder for DefaultErrorDecoder {
    fn decode(&self, config_key: &str, response: &Response) -> ClientError {
        let preview = body_preview(&response.body, None);
        let body = match status_error_message(response.status) {
            Some(hint) if preview.is_empty() => hint,
            Some(hint) => format!("{hint}: {preview}"),
            None => preview,
        };
        ClientError::Status {
            config_key: config_key.to_string(),
            status: response.status,
            reason: response.reason.clone(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_types::HttpMethod;
    use serde_json::json;

    fn template() -> RequestTemplate {
        RequestTemplate::new(HttpMethod::Post, "/submit")
    }

    fn body(template: &RequestTemplate) -> String {
        template
            .request("https://api.example.com")
            .expect("request")
            .body_text()
            .unwrap_or_default()
    }

    #[test]
    fn json_encoder_sets_content_type_and_keeps_raw_strings() {
        let mut object = template();
        JsonEncoder
            .encode(&json!({"title": "bug"}), &TypeDescriptor::named("Issue"), &mut object)
            .expect("encode");
        assert_eq!(body(&object), "{\"title\":\"bug\"}");
        assert_eq!(object.content_type(), Some("application/json"));

        let mut text = template();
        JsonEncoder
            .encode(&json!("plain text"), &TypeDescriptor::string(), &mut text)
            .expect("encode");
        assert_eq!(body(&text), "plain text");
        assert_eq!(text.content_type(), None);
    }

    #[test]
    fn form_encoder_urlencodes_the_form_map() {
        let mut form = template();
        FormEncoder::<JsonEncoder>::default()
            .encode(&json!({"name": "a b", "tags": ["x", "y&z"], "skip": null}), &TypeDescriptor::form_map(), &mut form)
            .expect("encode");
        assert_eq!(body(&form), "name=a%20b&tags=x&tags=y%26z");
        assert_eq!(form.content_type(), Some(FORM_CONTENT_TYPE));
    }

    #[test]
    fn form_encoder_delegates_for_json_content_type() {
        let mut form = template();
        form.header_if_absent(CONTENT_TYPE, "application/json");
        FormEncoder::<JsonEncoder>::default()
            .encode(&json!({"name": "a"}), &TypeDescriptor::form_map(), &mut form)
            .expect("encode");
        assert_eq!(body(&form), "{\"name\":\"a\"}");
    }

    #[test]
    fn json_decoder_handles_unit_text_and_json() {
        let response = Response::new(200, "[1,2]");
        assert_eq!(JsonDecoder.decode(&response, &TypeDescriptor::unit()).expect("unit"), Value::Null);
        assert_eq!(JsonDecoder.decode(&response, &TypeDescriptor::string()).expect("text"), json!("[1,2]"));
        assert_eq!(JsonDecoder.decode(&response, &TypeDescriptor::named("Vec")).expect("json"), json!([1, 2]));
        assert!(JsonDecoder.decode(&Response::new(200, "nope"), &TypeDescriptor::named("Vec")).is_err());
    }

    #[test]
    fn query_map_encoder_skips_nulls_and_rejects_scalars() {
        let encoded = DefaultQueryMapEncoder
            .encode(&json!({"sort": "stars", "page": null}))
            .expect("encode");
        assert_eq!(encoded.keys().collect::<Vec<_>>(), vec!["sort"]);
        assert!(DefaultQueryMapEncoder.encode(&Value::Null).expect("null").is_empty());
        assert!(DefaultQueryMapEncoder.encode(&json!(3)).is_err());
    }

    #[test]
    fn error_decoder_reports_status_and_hint() {
        let error = DefaultErrorDecoder.decode("GitHub#me()", &Response::new(401, "bad credentials"));
        assert_eq!(error.status(), Some(401));
        assert_eq!(error.config_key(), Some("GitHub#me()"));
        assert!(error.to_string().contains("Unauthorized"));
    }
}
