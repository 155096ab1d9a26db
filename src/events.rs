//! Post-processing of decoded logs into application-level events
//!
//! The legacy exchange contract emits one logical trade as two adjacent logs
//! in the same transaction: an `Order` with the order terms and a `Trade`
//! with the fill. [`EventCorrelator`] folds the fill into the order.

use crate::abi::{DecodedCall, DecodedEvent, LogDecoder, NamedValue};
use alloy::primitives::Address;
use alloy::rpc::types::Log;

/// Name of the order half of the exchange interaction
pub const ORDER_EVENT: &str = "Order";
/// Name of the fill half of the exchange interaction
pub const TRADE_EVENT: &str = "Trade";
/// Number of values a complete `Order` event carries
pub const ORDER_VALUE_COUNT: usize = 8;
/// Positions of the `Trade` values copied into `combined_events`
pub const TRADE_COMBINED_POSITIONS: [usize; 3] = [0, 2, 3];

/// Merges `Order` + `Trade` pairs emitted by the designated exchange contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCorrelator {
    exchange: Address,
}

impl EventCorrelator {
    pub fn new(exchange: Address) -> Self {
        Self { exchange }
    }

    pub fn exchange(&self) -> Address {
        self.exchange
    }

    /// Correlate a decoded batch, preserving order.
    ///
    /// An `Order` from the exchange is kept only if a `Trade` from the exchange
    /// follows it within the same transaction; it then carries that trade's
    /// values at [`TRADE_COMBINED_POSITIONS`], skipping positions the trade
    /// lacks. An `Order` without a transaction hash never matches. Everything
    /// else passes through.
    pub fn correlate(&self, events: Vec<DecodedEvent>) -> Vec<DecodedEvent> {
        let mut combined = Vec::with_capacity(events.len());

        for (i, event) in events.iter().enumerate() {
            if !self.is_order(event) {
                combined.push(event.clone());
                continue;
            }

            let trade = event.transaction_hash.and_then(|hash| {
                events[i + 1..]
                    .iter()
                    .take_while(|next| next.transaction_hash == Some(hash))
                    .find(|next| next.address == self.exchange && next.name == TRADE_EVENT)
            });

            match trade {
                Some(trade) => {
                    let mut order = event.clone();
                    order.combined_events = Some(trade_values(trade));
                    combined.push(order);
                }
                None => {
                    tracing::debug!(
                        "Dropping unmatched {} event in tx {:?}",
                        ORDER_EVENT,
                        event.transaction_hash
                    );
                }
            }
        }

        combined
    }

    fn is_order(&self, event: &DecodedEvent) -> bool {
        event.address == self.exchange
            && event.name == ORDER_EVENT
            && event.events.len() == ORDER_VALUE_COUNT
    }
}

/// The trade values folded into an order
fn trade_values(trade: &DecodedEvent) -> Vec<NamedValue> {
    TRADE_COMBINED_POSITIONS
        .iter()
        .filter_map(|&pos| trade.events.get(pos).cloned())
        .collect()
}

/// Decoder plus optional correlation, applied to whole batches
#[derive(Debug, Clone)]
pub struct LogProcessor {
    decoder: LogDecoder,
    correlator: Option<EventCorrelator>,
}

impl LogProcessor {
    pub fn new(decoder: LogDecoder) -> Self {
        Self {
            decoder,
            correlator: None,
        }
    }

    pub fn with_correlator(mut self, correlator: EventCorrelator) -> Self {
        self.correlator = Some(correlator);
        self
    }

    pub fn decoder(&self) -> &LogDecoder {
        &self.decoder
    }

    /// Decode and correlate a batch of raw logs.
    ///
    /// All-or-nothing: a decode failure anywhere yields `None`.
    pub fn process_logs(&self, logs: &[Log]) -> Option<Vec<DecodedEvent>> {
        match self.decoder.decode_logs(logs) {
            Ok(events) => Some(match &self.correlator {
                Some(correlator) => correlator.correlate(events),
                None => events,
            }),
            Err(e) => {
                tracing::warn!("Failed to decode {} logs: {}", logs.len(), e);
                None
            }
        }
    }

    /// Decode transaction input; `None` if unknown or undecodable
    pub fn process_input(&self, input: &[u8]) -> Option<DecodedCall> {
        match self.decoder.decode_method(input) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!("Failed to decode method input: {}", e);
                None
            }
        }
    }
}
