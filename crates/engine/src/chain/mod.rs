//! Chain adapter: the two JSON-RPC reads the engine needs. No nonces,
//! gas, signatures, or write calls exist here.

pub mod rpc;

pub use rpc::HttpChainReader;

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, H256};

#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Value of one storage slot at the chain head.
    async fn read_storage_slot(&self, address: Address, slot: H256) -> Result<H256>;

    /// Runtime bytecode at an address; empty if none is deployed.
    async fn read_code(&self, address: Address) -> Result<Vec<u8>>;
}
