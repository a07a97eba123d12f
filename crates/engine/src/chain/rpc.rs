use crate::chain::ChainReader;
use crate::error::EngineError;
use anyhow::Result;
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, H256};
use tracing::debug;

/// JSON-RPC backed reader over an HTTP provider.
pub struct HttpChainReader {
    provider: Provider<Http>,
}

impl HttpChainReader {
    pub fn new(rpc_endpoint: &str) -> Result<Self, EngineError> {
        let provider = Provider::<Http>::try_from(rpc_endpoint).map_err(|e| {
            EngineError::InputInvalid(format!("bad RPC endpoint `{rpc_endpoint}`: {e}"))
        })?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl ChainReader for HttpChainReader {
    async fn read_storage_slot(&self, address: Address, slot: H256) -> Result<H256> {
        debug!(%address, %slot, "eth_getStorageAt");
        let value = self.provider.get_storage_at(address, slot, None).await?;
        Ok(value)
    }

    async fn read_code(&self, address: Address) -> Result<Vec<u8>> {
        debug!(%address, "eth_getCode");
        let code = self.provider.get_code(address, None).await?;
        Ok(code.to_vec())
    }
}
