//! Registry of known contract interfaces, keyed by event topic and function selector

use alloy::json_abi::{Event, Function, JsonAbi};
use alloy::primitives::{Selector, B256};
use std::collections::HashMap;

/// Interface descriptors used by [`LogDecoder`](super::LogDecoder).
///
/// Built once at startup and shared read-only (usually behind an `Arc`).
/// Later registrations win selector collisions, so register the interface
/// that should own overloaded names last.
#[derive(Debug, Clone, Default)]
pub struct AbiRegistry {
    interfaces: Vec<JsonAbi>,
    events: HashMap<B256, Event>,
    functions: HashMap<Selector, Function>,
}

impl AbiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of interfaces, in priority order
    pub fn with_interfaces<I>(interfaces: I) -> Self
    where
        I: IntoIterator<Item = JsonAbi>,
    {
        let mut registry = Self::new();
        for abi in interfaces {
            registry.add_interface(abi);
        }
        registry
    }

    /// Register an interface descriptor.
    ///
    /// Returns `false` if an identical descriptor was already registered. The
    /// entries are re-applied in that case so the descriptor takes precedence
    /// over anything registered in between, but nothing is duplicated.
    pub fn add_interface(&mut self, abi: JsonAbi) -> bool {
        for event in abi.events().filter(|e| !e.anonymous) {
            self.events.insert(event.selector(), event.clone());
        }
        for function in abi.functions() {
            self.functions.insert(function.selector(), function.clone());
        }

        if self.interfaces.contains(&abi) {
            tracing::debug!("Interface already registered, refreshed precedence");
            return false;
        }

        self.interfaces.push(abi);
        true
    }

    /// Look up a non-anonymous event by its topic0
    pub fn event(&self, topic0: &B256) -> Option<&Event> {
        self.events.get(topic0)
    }

    /// Look up a function by its 4-byte selector
    pub fn function(&self, selector: &Selector) -> Option<&Function> {
        self.functions.get(selector)
    }

    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
