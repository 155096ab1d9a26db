//! Contract read descriptor: target, interface, function and arguments

use crate::error::{AbiError, Result};
use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes};
use std::sync::Arc;

/// A read-only contract function call
#[derive(Debug, Clone)]
pub struct ContractCall {
    pub address: Address,
    abi: Arc<JsonAbi>,
    function: String,
    args: Vec<DynSolValue>,
}

impl ContractCall {
    pub fn new(address: Address, abi: Arc<JsonAbi>, function: impl Into<String>) -> Self {
        Self {
            address,
            abi,
            function: function.into(),
            args: Vec::new(),
        }
    }

    /// Build from a human-readable signature, e.g.
    /// `"function balanceOf(address) returns (uint256)"`
    pub fn from_signature(address: Address, signature: &str) -> Result<Self> {
        let signature = signature.trim();
        let signature = if signature.starts_with("function ") {
            signature.to_string()
        } else {
            format!("function {}", signature)
        };
        let function = Function::parse(&signature)
            .map_err(|e| AbiError::ParseError(format!("{}: {}", signature, e)))?;

        let name = function.name.clone();
        let mut abi = JsonAbi::default();
        abi.functions.entry(name.clone()).or_default().push(function);
        Ok(Self::new(address, Arc::new(abi), name))
    }

    pub fn with_args(mut self, args: Vec<DynSolValue>) -> Self {
        self.args = args;
        self
    }

    /// Coerce string arguments using the function's input types
    pub fn with_str_args<S: AsRef<str>>(mut self, args: &[S]) -> Result<Self> {
        let function = self.function_abi_for_arity(args.len())?;
        let mut values = Vec::with_capacity(args.len());
        for (input, arg) in function.inputs.iter().zip(args) {
            let ty = DynSolType::parse(&input.selector_type())
                .map_err(|e| AbiError::Encode(format!("type '{}': {}", input.ty, e)))?;
            let value = ty.coerce_str(arg.as_ref()).map_err(|e| {
                AbiError::Encode(format!("value '{}' for '{}': {}", arg.as_ref(), input.ty, e))
            })?;
            values.push(value);
        }
        self.args = values;
        Ok(self)
    }

    pub fn function_name(&self) -> &str {
        &self.function
    }

    pub fn args(&self) -> &[DynSolValue] {
        &self.args
    }

    /// The ABI entry for this call; `NoAbi` if the interface lacks it
    pub fn function_abi(&self) -> Result<&Function> {
        self.function_abi_for_arity(self.args.len())
    }

    /// Prefers the overload matching the argument count
    fn function_abi_for_arity(&self, arity: usize) -> Result<&Function> {
        let overloads = self
            .abi
            .function(&self.function)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| AbiError::NoAbi(self.function.clone()))?;

        Ok(overloads
            .iter()
            .find(|f| f.inputs.len() == arity)
            .unwrap_or(&overloads[0]))
    }

    /// Selector-prefixed calldata
    pub fn calldata(&self) -> Result<Bytes> {
        let function = self.function_abi()?;
        function
            .abi_encode_input(&self.args)
            .map(Bytes::from)
            .map_err(|e| AbiError::Encode(format!("{}: {}", self.function, e)).into())
    }

    /// Decode raw `eth_call` output against the function's outputs
    pub fn decode_output(&self, output: &[u8]) -> Result<Vec<DynSolValue>> {
        let function = self.function_abi()?;
        function
            .abi_decode_output(output)
            .map_err(|e| AbiError::Decode(format!("{} output: {}", self.function, e)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::DecodedValue;
    use crate::error::Error;
    use alloy::primitives::{address, U256};

    const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

    fn balance_of() -> ContractCall {
        ContractCall::from_signature(TOKEN, "balanceOf(address owner) returns (uint256)")
            .unwrap()
            .with_str_args(&["0x1111111111111111111111111111111111111111"])
            .unwrap()
    }

    #[test]
    fn test_calldata_has_selector() {
        let data = balance_of().calldata().unwrap();
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(data.len(), 4 + 32);
    }

    #[test]
    fn test_decode_output() {
        let output = U256::from(1_500_000u64).to_be_bytes::<32>();
        let values = balance_of().decode_output(&output).unwrap();
        assert_eq!(
            DecodedValue::from(&values[0]),
            DecodedValue::Uint("1500000".to_string())
        );

        let err = balance_of().decode_output(&[0u8; 3]).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_missing_function_is_no_abi() {
        let call = ContractCall::new(TOKEN, Arc::new(JsonAbi::default()), "decimals");
        assert!(matches!(
            call.calldata().unwrap_err(),
            Error::Abi(AbiError::NoAbi(name)) if name == "decimals"
        ));
    }

    #[test]
    fn test_bad_argument() {
        let err = ContractCall::from_signature(TOKEN, "balanceOf(address) returns (uint256)")
            .unwrap()
            .with_str_args(&["not-an-address"])
            .unwrap_err();
        assert!(matches!(err, Error::Abi(AbiError::Encode(_))));
    }
}
