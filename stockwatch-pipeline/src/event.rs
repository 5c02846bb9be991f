//! Sale event ingestion.
//!
//! Payloads arrive as JSON, optionally wrapped in a Pub/Sub push envelope
//! (`{"data": "<base64 json>"}`). Validation and defaulting happen here,
//! once; everything downstream works on a fully typed `SaleEvent`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::SaleEvent;

/// Store id used when the payload does not carry one.
pub const UNKNOWN: &str = "UNKNOWN";

/// Wire shape of a sale event. Only `transaction_id` and `product_id` are
/// required.
#[derive(Debug, Deserialize)]
struct RawSaleEvent {
    transaction_id: Option<String>,
    product_id: Option<String>,
    product_name: Option<String>,
    category: Option<String>,
    store_id: Option<String>,
    quantity: Option<i64>,
    price: Option<f64>,
    total: Option<f64>,
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PubSubEnvelope {
    data: String,
}

impl SaleEvent {
    /// Parse and validate a bare JSON event.
    pub fn from_json(bytes: &[u8]) -> PipelineResult<Self> {
        let raw: RawSaleEvent = serde_json::from_slice(bytes)
            .map_err(|e| PipelineError::MalformedEvent(format!("invalid JSON: {}", e)))?;
        raw.validate()
    }

    /// Parse a payload that is either a bare event or a Pub/Sub envelope.
    pub fn from_payload(bytes: &[u8]) -> PipelineResult<Self> {
        match serde_json::from_slice::<PubSubEnvelope>(bytes) {
            Ok(envelope) => Self::from_json(&decode_envelope_data(&envelope.data)?),
            Err(_) => Self::from_json(bytes),
        }
    }

    /// Serialize to the wire shape used by `from_json`.
    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl RawSaleEvent {
    fn validate(self) -> PipelineResult<SaleEvent> {
        let transaction_id = required("transaction_id", self.transaction_id)?;
        let product_id = required("product_id", self.product_id)?;

        let quantity = self.quantity.unwrap_or(1);
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                PipelineError::MalformedEvent(format!(
                    "quantity must be positive, got {}",
                    quantity
                ))
            })?;

        let price = self.price.unwrap_or(0.0);
        let total = self.total.unwrap_or(price);
        for (field, value) in [("price", price), ("total", total)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::MalformedEvent(format!(
                    "{} must be a non-negative number, got {}",
                    field, value
                )));
            }
        }

        Ok(SaleEvent {
            product_name: self.product_name.unwrap_or_else(|| product_id.clone()),
            category: self.category.unwrap_or_else(|| UNKNOWN.to_string()),
            store_id: self.store_id.unwrap_or_else(|| UNKNOWN.to_string()),
            timestamp: self
                .timestamp
                .unwrap_or_else(|| Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
            transaction_id,
            product_id,
            quantity,
            price,
            total,
        })
    }
}

fn required(field: &str, value: Option<String>) -> PipelineResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PipelineError::MalformedEvent(format!("missing required field '{}'", field)))
}

/// Decode the base64 `data` field of a Pub/Sub envelope.
pub fn decode_envelope_data(data: &str) -> PipelineResult<Vec<u8>> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| PipelineError::MalformedEvent(format!("invalid base64 data: {}", e)))
}

/// Wrap an event in a Pub/Sub envelope, as a publisher would.
pub fn encode_envelope(event: &SaleEvent) -> PipelineResult<String> {
    let data = STANDARD.encode(event.to_json()?);
    Ok(serde_json::json!({ "data": data }).to_string())
}
