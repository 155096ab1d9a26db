//! Interface registry, ABI file loading, and log/input decoding

mod decoder;
mod loader;
mod registry;

pub use decoder::{DecodedCall, DecodedEvent, DecodedValue, LogDecoder, NamedValue};
pub use loader::{load_abi_file, load_registry};
pub use registry::AbiRegistry;
