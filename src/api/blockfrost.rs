use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{join_url, send_json, ChainSource};
use crate::error::{ApiError, ApiResult};

const VENUE: &str = "blockfrost";

#[derive(Debug, Clone)]
pub struct BlockfrostClient {
    client: Client,
    base_url: String,
    project_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddressTransaction {
    pub tx_hash: String,
    pub tx_index: u32,
    pub block_height: u64,
    pub block_time: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetAmount {
    pub unit: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Utxo {
    pub address: String,
    pub amount: Vec<AssetAmount>,
}

#[derive(Debug, Clone, Deserialize)]
struct TxUtxos {
    inputs: Vec<Utxo>,
    outputs: Vec<Utxo>,
}

#[derive(Debug, Clone, Deserialize)]
struct TxContent {
    hash: String,
    block_time: i64,
    fees: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TxMetadata {
    pub label: String,
    #[serde(default)]
    pub json_metadata: Value,
}

/// Transaction content, UTxOs and metadata gathered in one place.
#[derive(Debug, Clone)]
pub struct TxDetails {
    pub hash: String,
    pub block_time: i64,
    pub fee: u64,
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<Utxo>,
    pub metadata: Vec<TxMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub is_healthy: bool,
}

impl BlockfrostClient {
    pub fn new(client: Client, base_url: String, project_id: String) -> Self {
        Self {
            client,
            base_url,
            project_id,
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Value> {
        let request = self
            .client
            .get(join_url(&self.base_url, path))
            .header("project_id", &self.project_id)
            .query(query);
        send_json(VENUE, request).await
    }

    pub async fn health(&self) -> ApiResult<HealthResponse> {
        decode(self.get("/health", &[]).await?)
    }

    pub async fn get_transaction(&self, tx_hash: &str) -> ApiResult<Value> {
        self.get(&format!("/txs/{tx_hash}"), &[]).await
    }

    pub async fn get_transaction_utxos(&self, tx_hash: &str) -> ApiResult<Value> {
        self.get(&format!("/txs/{tx_hash}/utxos"), &[]).await
    }

    /// Transactions without metadata answer 404; that is not an error here.
    pub async fn get_transaction_metadata(&self, tx_hash: &str) -> ApiResult<Vec<TxMetadata>> {
        match self.get(&format!("/txs/{tx_hash}/metadata"), &[]).await {
            Ok(body) => decode(body),
            Err(ApiError::Status { status: 404, .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn get_address_transactions(
        &self,
        address: &str,
        count: u32,
        page: u32,
    ) -> ApiResult<Vec<AddressTransaction>> {
        let query = [
            ("count", count.to_string()),
            ("page", page.to_string()),
            ("order", "desc".to_string()),
        ];
        match self
            .get(&format!("/addresses/{address}/transactions"), &query)
            .await
        {
            Ok(body) => decode(body),
            Err(ApiError::Status { status: 404, .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn get_transaction_details(&self, tx_hash: &str) -> ApiResult<TxDetails> {
        let content = self.get_transaction(tx_hash).await?;
        let utxos = self.get_transaction_utxos(tx_hash).await?;
        let metadata = self.get_transaction_metadata(tx_hash).await?;
        assemble_details(content, utxos, metadata)
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: Value) -> ApiResult<T> {
    serde_json::from_value(body).map_err(|e| ApiError::malformed(VENUE, e.to_string()))
}

pub fn assemble_details(
    content: Value,
    utxos: Value,
    metadata: Vec<TxMetadata>,
) -> ApiResult<TxDetails> {
    let content: TxContent = decode(content)?;
    let utxos: TxUtxos = decode(utxos)?;
    let fee = content
        .fees
        .parse::<u64>()
        .map_err(|_| ApiError::malformed(VENUE, format!("fees `{}` is not lovelace", content.fees)))?;

    Ok(TxDetails {
        hash: content.hash,
        block_time: content.block_time,
        fee,
        inputs: utxos.inputs,
        outputs: utxos.outputs,
        metadata,
    })
}

#[async_trait]
impl ChainSource for BlockfrostClient {
    async fn address_transactions(
        &self,
        address: &str,
        count: u32,
        page: u32,
    ) -> ApiResult<Vec<AddressTransaction>> {
        self.get_address_transactions(address, count, page).await
    }

    async fn transaction_details(&self, tx_hash: &str) -> ApiResult<TxDetails> {
        self.get_transaction_details(tx_hash).await
    }
}
