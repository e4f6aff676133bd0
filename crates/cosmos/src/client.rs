//! Cosmos SDK LCD client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace, warn};

use quill_core::error::{SourceError, SourceResult};
use quill_core::models::Tx;
use quill_core::ports::TxSource;
use quill_handlers::wasm::{ContractInfo, Params, WasmSource};

use crate::types::{
    ContractInfoResponse, GRPC_NOT_FOUND, GatewayError, GetTxsEventResponse, LatestBlockResponse,
    NodeInfoResponse, ParamsResponse, supports_query_search,
};

/// Header selecting the state height of a query.
const BLOCK_HEIGHT_HEADER: &str = "x-cosmos-block-height";

/// Configuration for the Cosmos client.
#[derive(Debug, Clone)]
pub struct CosmosClientConfig {
    /// LCD base URL (e.g., "http://localhost:1317").
    pub lcd_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Transactions fetched per page.
    pub page_limit: u64,
}

impl Default for CosmosClientConfig {
    fn default() -> Self {
        Self {
            lcd_url: "http://127.0.0.1:1317".to_string(),
            request_timeout: Duration::from_secs(30),
            page_limit: 100,
        }
    }
}

/// How `GetTxsEvent` takes its filter and pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxSearch {
    /// `query=` with `page`/`limit` (SDK v0.50+).
    Query,
    /// `events=` with `pagination.offset`/`pagination.limit`.
    Events,
}

/// LCD adapter implementing the [`TxSource`] and [`WasmSource`] ports.
pub struct CosmosClient {
    client: Client,
    base_url: String,
    page_limit: u64,
    chain_id: String,
    tx_search: TxSearch,
}

impl CosmosClient {
    /// Connect to a node and read its chain id.
    #[instrument(skip_all, fields(url = %config.lcd_url))]
    pub async fn connect(config: CosmosClientConfig) -> SourceResult<Self> {
        debug!("Connecting to node");

        let url = url::Url::parse(&config.lcd_url)
            .map_err(|e| SourceError::ConnectionFailed(format!("invalid LCD url: {}", e)))?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SourceError::ConnectionFailed(e.to_string()))?;

        let mut this = Self {
            client,
            base_url: url.as_str().trim_end_matches('/').to_string(),
            page_limit: config.page_limit.max(1),
            chain_id: String::new(),
            tx_search: TxSearch::Query,
        };

        let latest = this.latest_block().await?;
        this.chain_id = latest.block.header.chain_id;
        this.tx_search = this.detect_tx_search().await;

        debug!(chain_id = %this.chain_id, tx_search = ?this.tx_search, "Connected successfully");

        Ok(this)
    }

    /// Chain id reported by the node at connection time.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    async fn latest_block(&self) -> SourceResult<LatestBlockResponse> {
        self.get_json("/cosmos/base/tendermint/v1beta1/blocks/latest", None, &[])
            .await
    }

    /// Pick the tx search style from the node's SDK version.
    async fn detect_tx_search(&self) -> TxSearch {
        let version = match self
            .get_json::<NodeInfoResponse>("/cosmos/base/tendermint/v1beta1/node_info", None, &[])
            .await
        {
            Ok(info) => info
                .application_version
                .map(|v| v.cosmos_sdk_version)
                .unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to read node version, assuming SDK v0.50+");
                String::new()
            }
        };

        if supports_query_search(&version) {
            TxSearch::Query
        } else {
            TxSearch::Events
        }
    }

    /// GET `path` and decode the JSON body.
    ///
    /// `height` pins the state the query reads from.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        height: Option<u64>,
        query: &[(&str, String)],
    ) -> SourceResult<T> {
        let url = format!("{}{}", self.base_url, path);
        trace!(%url, ?height, "LCD request");

        let mut request = self.client.get(&url).query(query);
        if let Some(height) = height {
            request = request.header(BLOCK_HEIGHT_HEADER, height.to_string());
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(map_status_error(status, path, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| SourceError::InvalidResponse(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl TxSource for CosmosClient {
    async fn latest_height(&self) -> SourceResult<u64> {
        Ok(self.latest_block().await?.block.header.height)
    }

    #[instrument(skip(self))]
    async fn txs_at_height(&self, height: u64) -> SourceResult<Vec<Tx>> {
        let mut txs = Vec::new();
        let mut page_index = 0u64;

        loop {
            let params = tx_search_params(self.tx_search, height, page_index, self.page_limit);
            let page: GetTxsEventResponse = self
                .get_json("/cosmos/tx/v1beta1/txs", None, &params)
                .await?;

            let fetched = page.tx_responses.len() as u64;
            for response in page.tx_responses {
                if response.height != height {
                    return Err(SourceError::InvalidResponse(format!(
                        "tx {} reported at height {} while querying {}",
                        response.txhash, response.height, height
                    )));
                }
                txs.push(response.into_tx()?);
            }

            // v0.50 rejects a page past the last one
            let done = page.total > 0 && txs.len() as u64 >= page.total;
            if fetched < self.page_limit || done {
                break;
            }
            page_index += 1;
        }

        trace!(count = txs.len(), "Fetched transactions");
        Ok(txs)
    }
}

#[async_trait]
impl WasmSource for CosmosClient {
    async fn get_contract_info(&self, height: u64, address: &str) -> SourceResult<ContractInfo> {
        let response: ContractInfoResponse = self
            .get_json(&format!("/cosmwasm/wasm/v1/contract/{}", address), Some(height), &[])
            .await?;
        Ok(response.contract_info.into())
    }

    async fn get_params(&self, height: u64) -> SourceResult<Params> {
        let response: ParamsResponse = self
            .get_json("/cosmwasm/wasm/v1/codes/params", Some(height), &[])
            .await?;
        Ok(response.params)
    }
}

/// Query string for page `page_index` (0-based) of the txs at `height`.
fn tx_search_params(
    style: TxSearch,
    height: u64,
    page_index: u64,
    limit: u64,
) -> Vec<(&'static str, String)> {
    let filter = format!("tx.height={}", height);
    let order = ("order_by", "ORDER_BY_ASC".to_string());

    match style {
        TxSearch::Query => vec![
            ("query", filter),
            order,
            ("page", (page_index + 1).to_string()),
            ("limit", limit.to_string()),
        ],
        TxSearch::Events => vec![
            ("events", filter),
            order,
            ("pagination.offset", (page_index * limit).to_string()),
            ("pagination.limit", limit.to_string()),
        ],
    }
}

// =============================================================================
// Error mapping
// =============================================================================

fn map_transport_error(e: reqwest::Error) -> SourceError {
    if e.is_connect() || e.is_timeout() {
        SourceError::ConnectionFailed(e.to_string())
    } else {
        SourceError::RpcError(e.to_string())
    }
}

/// Map a non-success response to a [`SourceError`].
///
/// The gateway reports missing state either as HTTP 404 or as gRPC code 5.
fn map_status_error(status: StatusCode, path: &str, body: &str) -> SourceError {
    let gateway = serde_json::from_str::<GatewayError>(body).ok();

    if status == StatusCode::NOT_FOUND || gateway.as_ref().is_some_and(|g| g.code == GRPC_NOT_FOUND)
    {
        let detail = gateway.map(|g| g.message).unwrap_or_default();
        return SourceError::NotFound(format!("{} {}", path, detail).trim_end().to_string());
    }

    match gateway {
        Some(g) => SourceError::RpcError(format!("{} ({}): {}", path, status, g.message)),
        None => SourceError::RpcError(format!("{} ({})", path, status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_by_http_status() {
        let err = map_status_error(StatusCode::NOT_FOUND, "/cosmwasm/wasm/v1/contract/wasm1x", "");
        assert!(matches!(err, SourceError::NotFound(ref m) if m == "/cosmwasm/wasm/v1/contract/wasm1x"));
    }

    // Test critique: le gateway renvoie 500 + code gRPC 5 pour un contrat absent
    #[test]
    fn test_not_found_by_grpc_code() {
        let body = r#"{"code": 5, "message": "not found: wasm1x", "details": []}"#;
        let err = map_status_error(StatusCode::INTERNAL_SERVER_ERROR, "/c", body);
        assert!(matches!(err, SourceError::NotFound(ref m) if m.contains("not found: wasm1x")));
    }

    #[test]
    fn test_other_errors_are_rpc_errors() {
        let body = r#"{"code": 3, "message": "invalid height"}"#;
        let err = map_status_error(StatusCode::BAD_REQUEST, "/p", body);
        assert!(matches!(err, SourceError::RpcError(ref m) if m.contains("invalid height")));

        let err = map_status_error(StatusCode::BAD_GATEWAY, "/p", "<html>");
        assert!(matches!(err, SourceError::RpcError(_)));
    }

    // Test critique: les nodes v0.50+ rejettent une recherche sans `query`
    #[test]
    fn test_tx_search_params_query_style() {
        let params = tx_search_params(TxSearch::Query, 1234, 2, 100);
        assert_eq!(
            params,
            vec![
                ("query", "tx.height=1234".to_string()),
                ("order_by", "ORDER_BY_ASC".to_string()),
                ("page", "3".to_string()),
                ("limit", "100".to_string()),
            ]
        );
        assert!(params.iter().all(|(k, _)| *k != "events"));
    }

    #[test]
    fn test_tx_search_params_events_style() {
        let params = tx_search_params(TxSearch::Events, 1234, 2, 100);
        assert_eq!(
            params,
            vec![
                ("events", "tx.height=1234".to_string()),
                ("order_by", "ORDER_BY_ASC".to_string()),
                ("pagination.offset", "200".to_string()),
                ("pagination.limit", "100".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_config() {
        let config = CosmosClientConfig::default();
        assert_eq!(config.page_limit, 100);
        assert!(url::Url::parse(&config.lcd_url).is_ok());
    }
}
