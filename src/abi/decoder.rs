//! Log and call-input decoding against an [`AbiRegistry`]

use super::AbiRegistry;
use crate::error::{AbiError, Result};
use alloy::dyn_abi::{DynSolValue, EventExt, JsonAbiExt};
use alloy::json_abi::Param;
use alloy::primitives::{Address, Selector, B256};
use alloy::rpc::types::Log;
use serde::Serialize;
use std::sync::Arc;

/// A decoded ABI value, rendered for display and JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    Address(Address),
    /// Decimal string, full precision
    Uint(String),
    /// Decimal string, full precision
    Int(String),
    Bool(bool),
    /// `0x`-prefixed hex
    Bytes(String),
    String(String),
    Array(Vec<DecodedValue>),
    Tuple(Vec<DecodedValue>),
}

impl From<&DynSolValue> for DecodedValue {
    fn from(value: &DynSolValue) -> Self {
        match value {
            DynSolValue::Address(a) => DecodedValue::Address(*a),
            DynSolValue::Uint(v, _) => DecodedValue::Uint(v.to_string()),
            DynSolValue::Int(v, _) => DecodedValue::Int(v.to_string()),
            DynSolValue::Bool(b) => DecodedValue::Bool(*b),
            DynSolValue::FixedBytes(word, size) => {
                DecodedValue::Bytes(format!("0x{}", hex::encode(&word[..(*size).min(32)])))
            }
            DynSolValue::Bytes(b) => DecodedValue::Bytes(format!("0x{}", hex::encode(b))),
            DynSolValue::String(s) => DecodedValue::String(s.clone()),
            DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
                DecodedValue::Array(items.iter().map(Into::into).collect())
            }
            DynSolValue::Tuple(items) => DecodedValue::Tuple(items.iter().map(Into::into).collect()),
            other => DecodedValue::Bytes(format!("0x{}", hex::encode(other.abi_encode()))),
        }
    }
}

/// One named parameter of a decoded event or call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedValue {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: DecodedValue,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, value: DecodedValue) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            value,
        }
    }

    fn from_param(param: &Param, value: &DynSolValue) -> Self {
        Self::new(param.name.clone(), param.ty.clone(), value.into())
    }
}

/// A log decoded into a named event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedEvent {
    /// Emitting contract
    pub address: Address,
    pub transaction_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
    /// Event name
    pub name: String,
    /// Event parameters in declaration order
    pub events: Vec<NamedValue>,
    /// Values merged in from a companion event, see [`EventCorrelator`](crate::EventCorrelator)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_events: Option<Vec<NamedValue>>,
}

/// Call input decoded against a registered function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedCall {
    pub name: String,
    pub signature: String,
    pub params: Vec<NamedValue>,
}

/// Decodes logs and call input using a shared registry
#[derive(Debug, Clone)]
pub struct LogDecoder {
    registry: Arc<AbiRegistry>,
}

impl LogDecoder {
    pub fn new(registry: Arc<AbiRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AbiRegistry {
        &self.registry
    }

    /// Decode a single log.
    ///
    /// `Ok(None)` when the log has no topics or its topic0 is unknown;
    /// `Err` when a known event fails to decode.
    pub fn decode(&self, log: &Log) -> Result<Option<DecodedEvent>> {
        let topics = log.inner.data.topics();
        let Some(topic0) = topics.first() else {
            return Ok(None);
        };
        let Some(event) = self.registry.event(topic0) else {
            return Ok(None);
        };

        let decoded = event
            .decode_log_parts(topics.iter().copied(), &log.inner.data.data)
            .map_err(|e| AbiError::Decode(format!("{}: {}", event.name, e)))?;

        let mut indexed = decoded.indexed.iter();
        let mut body = decoded.body.iter();
        let mut values = Vec::with_capacity(event.inputs.len());
        for input in &event.inputs {
            let value = if input.indexed {
                indexed.next()
            } else {
                body.next()
            };
            let value = value.ok_or_else(|| {
                AbiError::Decode(format!("{}: missing value for {}", event.name, input.name))
            })?;
            values.push(NamedValue::new(
                input.name.clone(),
                input.ty.clone(),
                value.into(),
            ));
        }

        Ok(Some(DecodedEvent {
            address: log.inner.address,
            transaction_hash: log.transaction_hash,
            block_number: log.block_number,
            log_index: log.log_index,
            name: event.name.clone(),
            events: values,
            combined_events: None,
        }))
    }

    /// Decode a batch of logs, skipping unknown events.
    ///
    /// Fails as a whole if any known event fails to decode.
    pub fn decode_logs(&self, logs: &[Log]) -> Result<Vec<DecodedEvent>> {
        let mut decoded = Vec::with_capacity(logs.len());
        for log in logs {
            if let Some(event) = self.decode(log)? {
                decoded.push(event);
            }
        }
        Ok(decoded)
    }

    /// Decode transaction input data (`selector ++ args`).
    ///
    /// `Ok(None)` for input shorter than a selector or an unknown selector.
    pub fn decode_method(&self, input: &[u8]) -> Result<Option<DecodedCall>> {
        if input.len() < 4 {
            return Ok(None);
        }
        let selector = Selector::from_slice(&input[..4]);
        let Some(function) = self.registry.function(&selector) else {
            return Ok(None);
        };

        let values = function
            .abi_decode_input(&input[4..])
            .map_err(|e| AbiError::Decode(format!("{}: {}", function.name, e)))?;

        let params = function
            .inputs
            .iter()
            .zip(values.iter())
            .map(|(param, value)| NamedValue::from_param(param, value))
            .collect();

        Ok(Some(DecodedCall {
            name: function.name.clone(),
            signature: function.signature(),
            params,
        }))
    }
}
