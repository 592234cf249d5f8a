//! # Key Route Registry
//!
//! Maps a route name to the codec that turns a JSON value into a
//! [`PublicKey`] and back. A registry is built once at startup through
//! [`KeyRegistryBuilder`] and is immutable afterwards; callers share it by
//! reference (or `Arc`).
//!
//! ## JSON Form
//!
//! ```text
//! {"type": "ed25519", "value": "<hex>"}
//! {"type": "threshold-multisig", "value": {"threshold": 2, "pubkeys": [ ... ]}}
//! ```

use crate::ecdsa::{Secp256k1PublicKey, SECP256K1_ROUTE};
use crate::keys::{PubKey, PublicKey};
use crate::multisig::{ThresholdMultisigKey, THRESHOLD_MULTISIG_ROUTE};
use crate::signatures::{Ed25519PublicKey, ED25519_ROUTE};
use crate::sr25519::{Sr25519PublicKey, SR25519_ROUTE};
use crate::CryptoError;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Decode the `value` part of a tagged key.
pub type DecodeFn = fn(&KeyRegistry, &Value) -> Result<PublicKey, CryptoError>;

/// Encode a key into the `value` part of a tagged key.
pub type EncodeFn = fn(&KeyRegistry, &PublicKey) -> Result<Value, CryptoError>;

/// Codec registered under one route.
#[derive(Clone, Copy)]
pub struct KeyCodec {
    /// JSON to key.
    pub decode: DecodeFn,
    /// Key to JSON.
    pub encode: EncodeFn,
}

/// Builder for [`KeyRegistry`].
#[derive(Default)]
pub struct KeyRegistryBuilder {
    routes: HashMap<String, KeyCodec>,
}

impl KeyRegistryBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `codec` under `route`. Each route may be registered once.
    pub fn register(mut self, route: &str, codec: KeyCodec) -> Result<Self, CryptoError> {
        if self.routes.contains_key(route) {
            return Err(CryptoError::DuplicateRoute(route.to_string()));
        }
        self.routes.insert(route.to_string(), codec);
        Ok(self)
    }

    /// Register the four built-in algorithms.
    pub fn with_builtin_keys(self) -> Result<Self, CryptoError> {
        builtin_codecs()
            .into_iter()
            .try_fold(self, |builder, (route, codec)| builder.register(route, codec))
    }

    /// Freeze the registry.
    pub fn build(self) -> KeyRegistry {
        KeyRegistry {
            routes: self.routes,
        }
    }
}

/// Immutable route-name to codec mapping.
#[derive(Clone)]
pub struct KeyRegistry {
    routes: HashMap<String, KeyCodec>,
}

impl KeyRegistry {
    /// Registry holding exactly the built-in algorithms.
    pub fn with_builtin_keys() -> Self {
        let routes = builtin_codecs()
            .into_iter()
            .map(|(route, codec)| (route.to_string(), codec))
            .collect();
        Self { routes }
    }

    /// Whether `route` is registered.
    pub fn contains(&self, route: &str) -> bool {
        self.routes.contains_key(route)
    }

    /// Registered route names, sorted.
    pub fn routes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn codec(&self, route: &str) -> Result<&KeyCodec, CryptoError> {
        self.routes
            .get(route)
            .ok_or_else(|| CryptoError::UnregisteredRoute(route.to_string()))
    }

    /// Encode a key as `{"type": route, "value": ...}`.
    pub fn encode(&self, key: &PublicKey) -> Result<Value, CryptoError> {
        let route = key.route();
        let value = (self.codec(route)?.encode)(self, key)?;
        Ok(json!({ "type": route, "value": value }))
    }

    /// Decode a tagged key.
    pub fn decode(&self, tagged: &Value) -> Result<PublicKey, CryptoError> {
        let route = tagged
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing key type"))?;
        let value = tagged
            .get("value")
            .ok_or_else(|| malformed("missing key value"))?;
        (self.codec(route)?.decode)(self, value)
    }

    /// Encode to a JSON string.
    pub fn encode_string(&self, key: &PublicKey) -> Result<String, CryptoError> {
        Ok(self.encode(key)?.to_string())
    }

    /// Decode from a JSON string.
    pub fn decode_str(&self, json: &str) -> Result<PublicKey, CryptoError> {
        let value: Value = serde_json::from_str(json).map_err(|e| malformed(&e.to_string()))?;
        self.decode(&value)
    }
}

fn builtin_codecs() -> [(&'static str, KeyCodec); 4] {
    [
        (
            ED25519_ROUTE,
            KeyCodec {
                decode: decode_ed25519,
                encode: encode_raw,
            },
        ),
        (
            SECP256K1_ROUTE,
            KeyCodec {
                decode: decode_secp256k1,
                encode: encode_raw,
            },
        ),
        (
            SR25519_ROUTE,
            KeyCodec {
                decode: decode_sr25519,
                encode: encode_raw,
            },
        ),
        (
            THRESHOLD_MULTISIG_ROUTE,
            KeyCodec {
                decode: decode_multisig,
                encode: encode_multisig,
            },
        ),
    ]
}

fn malformed(reason: &str) -> CryptoError {
    CryptoError::MalformedEncoding(reason.to_string())
}

fn hex_value(value: &Value) -> Result<Vec<u8>, CryptoError> {
    let text = value
        .as_str()
        .ok_or_else(|| malformed("key value is not a string"))?;
    hex::decode(text).map_err(|e| malformed(&e.to_string()))
}

fn encode_raw(_: &KeyRegistry, key: &PublicKey) -> Result<Value, CryptoError> {
    Ok(Value::String(hex::encode(key.to_bytes())))
}

fn decode_ed25519(_: &KeyRegistry, value: &Value) -> Result<PublicKey, CryptoError> {
    Ok(Ed25519PublicKey::from_slice(&hex_value(value)?)?.into())
}

fn decode_secp256k1(_: &KeyRegistry, value: &Value) -> Result<PublicKey, CryptoError> {
    Ok(Secp256k1PublicKey::from_slice(&hex_value(value)?)?.into())
}

fn decode_sr25519(_: &KeyRegistry, value: &Value) -> Result<PublicKey, CryptoError> {
    Ok(Sr25519PublicKey::from_slice(&hex_value(value)?)?.into())
}

fn encode_multisig(registry: &KeyRegistry, key: &PublicKey) -> Result<Value, CryptoError> {
    let PublicKey::ThresholdMultisig(multisig) = key else {
        return Err(malformed("expected a threshold key"));
    };
    let pubkeys = multisig
        .pubkeys()
        .iter()
        .map(|sub| registry.encode(sub))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "threshold": multisig.threshold(), "pubkeys": pubkeys }))
}

fn decode_multisig(registry: &KeyRegistry, value: &Value) -> Result<PublicKey, CryptoError> {
    let threshold = value
        .get("threshold")
        .and_then(Value::as_u64)
        .ok_or_else(|| malformed("missing threshold"))?;
    let pubkeys = value
        .get("pubkeys")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing pubkeys"))?
        .iter()
        .map(|sub| registry.decode(sub))
        .collect::<Result<Vec<_>, _>>()?;
    let threshold = usize::try_from(threshold).map_err(|_| malformed("threshold overflow"))?;
    Ok(ThresholdMultisigKey::new(threshold, pubkeys)?.into())
}
