use crate::error::LedgerError;
use crate::query::LedgerQuery;
use ap_types::{AccountAddress, CodeFingerprint, StorageWord};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// One account record as the ledger's `account` endpoint returns it.
///
/// Fields the pipeline does not consume (contract root, kind, ...) are
/// ignored on decode.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    pub address: AccountAddress,
    #[serde(default)]
    pub code: Option<CodeFingerprint>,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub balance: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct StorageRecord {
    key: StorageWord,
    value: StorageWord,
}

/// REST client for the ledger-query service.
#[derive(Clone)]
pub struct LedgerProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for LedgerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerProvider").field("base_url", &self.base_url.as_str()).finish()
    }
}

impl LedgerProvider {
    /// `base_url` is the API root, version segment included, e.g.
    /// `http://localhost:3000/eth/v1.2`.
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self, LedgerError> {
        if base_url.cannot_be_a_base() {
            return Err(LedgerError::InvalidEndpoint {
                url: base_url.to_string(),
                reason: "cannot serve as a base url".into(),
            });
        }
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segment: &str) -> Url {
        let mut url = self.base_url.clone();
        url_join_segment(&mut url, segment);
        url
    }

    async fn get_json<T>(&self, mut url: Url, query: &[(&str, &str)]) -> Result<T, LedgerError>
    where
        T: serde::de::DeserializeOwned,
    {
        for (name, value) in query {
            url.query_pairs_mut().append_pair(name, value);
        }

        tracing::debug!(url = %url, "ledger query");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Status { status: status.as_u16(), context: url.to_string() });
        }
        response
            .json()
            .await
            .map_err(|e| LedgerError::Decode { context: url.to_string(), reason: e.to_string() })
    }

    /// Raw `account` endpoint query.
    pub async fn accounts(&self, query: &[(&str, &str)]) -> Result<Vec<AccountRecord>, LedgerError> {
        self.get_json(self.endpoint("account"), query).await
    }
}

/// Appends one path segment to a url, tolerating a trailing slash on the
/// base.
fn url_join_segment(url: &mut Url, segment: &str) {
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(segment);
    }
}

#[async_trait]
impl LedgerQuery for LedgerProvider {
    async fn code_for(&self, address: &AccountAddress) -> Result<CodeFingerprint, LedgerError> {
        let address_hex = address.to_string();
        let records = self.accounts(&[("address", address_hex.as_str())]).await?;
        let record = records.into_iter().next().ok_or(LedgerError::UnknownAccount(*address))?;
        record.code.filter(|code| !code.as_str().is_empty()).ok_or(LedgerError::MissingCode(*address))
    }

    async fn accounts_running(&self, code: &CodeFingerprint) -> Result<Vec<AccountAddress>, LedgerError> {
        let records = self.accounts(&[("code", code.as_str())]).await?;
        Ok(records.into_iter().map(|record| record.address).collect())
    }

    async fn storage_of(&self, address: &AccountAddress) -> Result<BTreeMap<StorageWord, StorageWord>, LedgerError> {
        let address_hex = address.to_string();
        let records: Vec<StorageRecord> =
            self.get_json(self.endpoint("storage"), &[("address", address_hex.as_str())]).await?;
        Ok(records.into_iter().map(|record| (record.key, record.value)).collect())
    }
}
