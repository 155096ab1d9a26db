//! Minimal views of receipt and block payloads
//!
//! Only the fields the explorer reads are modelled; both the live provider and
//! the proxy API return the standard JSON-RPC shapes, so one set of types
//! serves both paths.

use alloy::primitives::{Address, B256, U256, U64};
use alloy::rpc::types::Log;
use serde::{Deserialize, Serialize};

/// Transaction receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_hash: Option<B256>,
    /// `None` while the transaction is pending
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub transaction_index: Option<U64>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// `0x1` success, `0x0` reverted; absent before Byzantium
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub gas_used: Option<U256>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn block_number(&self) -> Option<u64> {
        self.block_number.map(|n| n.to::<u64>())
    }

    /// A receipt is usable once it is mined into a block
    pub fn is_confirmed(&self) -> bool {
        self.block_number.is_some()
    }

    pub fn succeeded(&self) -> Option<bool> {
        self.status.map(|s| s == U64::from(1))
    }
}

/// Block header fields from `eth_getBlockByNumber`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    #[serde(default)]
    pub number: Option<U64>,
    #[serde(default)]
    pub hash: Option<B256>,
    pub timestamp: U64,
}

impl BlockInfo {
    pub fn timestamp(&self) -> u64 {
        self.timestamp.to::<u64>()
    }
}

/// Timestamp of a block, as returned by [`RpcClient::block_time`](super::RpcClient::block_time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTime {
    pub block_number: u64,
    /// Unix seconds
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_receipt() {
        let receipt: Receipt = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockHash": null,
            "blockNumber": null,
            "logs": []
        }))
        .unwrap();
        assert!(!receipt.is_confirmed());
        assert_eq!(receipt.succeeded(), None);
    }

    #[test]
    fn test_mined_receipt() {
        let receipt: Receipt = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "blockNumber": "0x3d0900",
            "from": "0x1111111111111111111111111111111111111111",
            "to": null,
            "status": "0x1",
            "gasUsed": "0x5208",
            "logs": []
        }))
        .unwrap();
        assert!(receipt.is_confirmed());
        assert_eq!(receipt.block_number(), Some(4_000_000));
        assert_eq!(receipt.succeeded(), Some(true));
        assert_eq!(receipt.gas_used, Some(U256::from(21_000u64)));
    }

    #[test]
    fn test_block_info() {
        let block: BlockInfo = serde_json::from_value(serde_json::json!({
            "number": "0x10",
            "hash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "timestamp": "0x5a0b9a8c",
            "transactions": []
        }))
        .unwrap();
        assert_eq!(block.timestamp(), 0x5a0b9a8c);
    }
}
