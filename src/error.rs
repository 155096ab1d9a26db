//! Error types for explorer-rpc

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// RPC and proxy related errors
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// ABI encode/decode errors
    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed caller input
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Coarse classification used by callers deciding whether to retry, split or give up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or provider failure
    Transport,
    /// ABI or JSON payload could not be decoded
    Decode,
    /// Well-formed response carrying a semantic error
    Protocol,
    /// Missing descriptor, API key or bad configuration
    Config,
    /// Malformed numeric, address or range input
    InvalidInput,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Rpc(e) => e.kind(),
            Error::Abi(AbiError::NoAbi(_)) => ErrorKind::Config,
            Error::Abi(AbiError::FileNotFound(_)) => ErrorKind::Config,
            Error::Abi(_) => ErrorKind::Decode,
            Error::Json(_) => ErrorKind::Decode,
            Error::Config(_) => ErrorKind::Config,
            Error::Input(_) => ErrorKind::InvalidInput,
            Error::Io(_) => ErrorKind::Transport,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// True for failures a proxy retry may cure (bad payloads, rate-limit text in `result`)
    pub fn is_decode(&self) -> bool {
        self.kind() == ErrorKind::Decode
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

/// RPC-specific errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("JSON-RPC error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("Proxy API returned status {message}: {result}")]
    ProxyStatus { message: String, result: String },

    #[error("Invalid response from endpoint: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Timeout(_)
            | RpcError::ConnectionFailed(_)
            | RpcError::HttpStatus { .. }
            | RpcError::Http(_)
            | RpcError::Provider(_) => ErrorKind::Transport,
            RpcError::Protocol { .. } | RpcError::ProxyStatus { .. } => ErrorKind::Protocol,
            RpcError::InvalidResponse(_) => ErrorKind::Decode,
        }
    }

    /// Map a reqwest failure onto the transport variants
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            RpcError::Timeout(timeout_ms)
        } else if err.is_connect() {
            RpcError::ConnectionFailed(err.to_string())
        } else {
            RpcError::Http(err)
        }
    }
}

/// ABI-related errors
#[derive(Error, Debug)]
pub enum AbiError {
    #[error("No ABI entry for function: {0}")]
    NoAbi(String),

    #[error("Failed to encode call: {0}")]
    Encode(String),

    #[error("Failed to decode: {0}")]
    Decode(String),

    #[error("Failed to parse ABI: {0}")]
    ParseError(String),

    #[error("ABI file not found: {0}")]
    FileNotFound(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Proxy API key is required but not configured")]
    MissingApiKey,

    #[error("Invalid config file: {0}")]
    InvalidFile(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Config file parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Malformed numeric, address or range input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid digit '{digit}' for base {base}")]
    InvalidDigit { digit: char, base: u32 },

    #[error("Unsupported base: {0}")]
    InvalidBase(u32),

    #[error("Bit width must be between 1 and 4096, got {0}")]
    InvalidBitWidth(u32),

    #[error("Value {value} does not fit in {bits} bits")]
    OutOfRange { value: String, bits: u32 },

    #[error("Invalid block range: start {start} > end {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err: Error = RpcError::Timeout(55_000).into();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_transport());

        let err: Error = AbiError::Decode("short output".into()).into();
        assert!(err.is_decode());

        let err: Error = AbiError::NoAbi("balanceOf".into()).into();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err: Error = RpcError::Protocol {
            code: -32005,
            message: "query returned more than 1000 results".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err: Error = InputError::InvalidDigit { digit: 'g', base: 16 }.into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_rpc_error_kinds() {
        let transport = [
            RpcError::Timeout(1),
            RpcError::ConnectionFailed("refused".into()),
            RpcError::HttpStatus {
                status: 503,
                body: String::new(),
            },
            RpcError::Provider("down".into()),
        ];
        assert!(transport.iter().all(|e| e.kind() == ErrorKind::Transport));

        let status = RpcError::ProxyStatus {
            message: "NOTOK".into(),
            result: "Invalid API Key".into(),
        };
        assert_eq!(status.kind(), ErrorKind::Protocol);
        assert_eq!(
            RpcError::InvalidResponse("not json".into()).kind(),
            ErrorKind::Decode
        );
    }
}
