use serde::{Deserialize, Serialize};

use crate::MethodSpec;

/// Compiled specs of one interface, as written by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecManifest {
    pub interface: String,
    pub specs: Vec<MethodSpec>,
}

impl SpecManifest {
    pub fn find(&self, config_key: &str) -> Option<&MethodSpec> {
        self.specs.iter().find(|spec| spec.config_key == config_key)
    }

    pub fn to_postcard(&self) -> postcard::Result<Vec<u8>> {
        postcard::to_stdvec(self)
    }

    /// Reads a generator output file: a sequence of manifests, JSON or postcard.
    pub fn read_all(bytes: &[u8]) -> anyhow::Result<Vec<SpecManifest>> {
        if looks_like_json(bytes) {
            return Ok(serde_json::from_slice(bytes)?);
        }
        Ok(postcard::from_bytes(bytes)?)
    }
}

fn looks_like_json(bytes: &[u8]) -> bool {
    matches!(bytes.iter().find(|byte| !byte.is_ascii_whitespace()), Some(b'{') | Some(b'['))
}

impl TryFrom<Vec<u8>> for SpecManifest {
    type Error = anyhow::Error;

    /// Reads a JSON manifest when the bytes look like a JSON object, postcard otherwise.
    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if looks_like_json(&bytes) {
            return Ok(serde_json::from_slice(&bytes)?);
        }
        Ok(postcard::from_bytes(&bytes)?)
    }
}
