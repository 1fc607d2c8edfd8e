use crate::accessor::{AttachContract, StorageAttacher};
use crate::error::StateError;
use crate::fanout::{FetchOutcome, FetchTask};
use ac_ledger::{LedgerProvider, LedgerQuery};
use ac_registry::{ContractRegistry, TemplateStore};
use ap_config::ExplorerConfig;
use ap_resilience::RetryConfig;
use ap_types::{AccountAddress, ContractStateSnapshot, ContractTemplate};
use ap_utils::{CollectBarrier, FuseBarrier};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Gap between consecutive fan-out task start times. Smooths the burst
/// against the ledger without serializing the batch.
const DEFAULT_STAGGER_INTERVAL: Duration = Duration::from_millis(15);

/// The aggregation pipeline: template resolution, instance discovery,
/// staggered fan-out, and fan-in of every task's settled outcome.
pub struct StateAggregator {
    registry: Arc<dyn TemplateStore>,
    ledger: Arc<dyn LedgerQuery>,
    attacher: Arc<dyn AttachContract>,
    stagger_interval: Duration,
    retry: RetryConfig,
    config_document: Value,
}

impl StateAggregator {
    pub fn new(
        registry: Arc<dyn TemplateStore>,
        ledger: Arc<dyn LedgerQuery>,
        attacher: Arc<dyn AttachContract>,
    ) -> Self {
        Self {
            registry,
            ledger,
            attacher,
            stagger_interval: DEFAULT_STAGGER_INTERVAL,
            retry: RetryConfig::default(),
            config_document: Value::Object(Default::default()),
        }
    }

    /// Production wiring: file registry, REST ledger client, storage-backed
    /// attacher, knobs from the config file.
    pub fn from_config(config: &ExplorerConfig) -> Result<Self, StateError> {
        let ledger: Arc<dyn LedgerQuery> =
            Arc::new(LedgerProvider::new(config.api_url.clone(), config.request_timeout).map_err(StateError::Setup)?);
        let attacher = Arc::new(StorageAttacher::new(Arc::clone(&ledger)));
        let registry = Arc::new(ContractRegistry::new(&config.meta_dir));
        let document = serde_json::to_value(config)?;

        Ok(Self::new(registry, ledger, attacher)
            .with_stagger_interval(config.stagger_interval)
            .with_retry_config(config.retry_config())
            .with_config_document(document))
    }

    pub fn with_stagger_interval(mut self, interval: Duration) -> Self {
        self.stagger_interval = interval;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Document fused into instance detail views, conventionally the
    /// explorer's own configuration.
    pub fn with_config_document(mut self, document: Value) -> Self {
        self.config_document = document;
        self
    }

    /// All deployed instances' states for a contract type.
    ///
    /// Snapshots arrive in completion order — callers that need a stable
    /// order sort by address themselves. A missing template and an
    /// instance-free bytecode both yield an empty list; only discovery
    /// failures are errors. Instances whose fetch exhausted its retries are
    /// omitted here; [`Self::fetch_states_for`] exposes their tagged
    /// outcomes.
    pub async fn get_states_for(
        &self,
        contract_name: &str,
        properties: Option<&[String]>,
    ) -> Result<Vec<ContractStateSnapshot>, StateError> {
        let outcomes = self.fetch_states_for(contract_name, properties).await?;
        Ok(outcomes.into_iter().filter_map(FetchOutcome::into_snapshot).collect())
    }

    /// Outcome-level variant of [`Self::get_states_for`]: one settled
    /// outcome per discovered instance, exhausted fetches included.
    pub async fn fetch_states_for(
        &self,
        contract_name: &str,
        properties: Option<&[String]>,
    ) -> Result<Vec<FetchOutcome>, StateError> {
        let Some(template) = self.registry.latest(contract_name)? else {
            tracing::debug!(contract = contract_name, "no template record, nothing to aggregate");
            return Ok(Vec::new());
        };

        let addresses = self.discover_instances(&template).await?;
        if addresses.is_empty() {
            tracing::debug!(contract = contract_name, "bytecode has no running instances");
            return Ok(Vec::new());
        }

        tracing::debug!(contract = contract_name, instances = addresses.len(), "fanning out state fetches");
        Ok(self.fetch_all(Arc::new(template), addresses, properties).await)
    }

    /// Current state of one deployed instance. Missing metadata is `None`,
    /// not an error.
    pub async fn state_of(
        &self,
        contract_name: &str,
        address: AccountAddress,
        properties: Option<&[String]>,
    ) -> Result<Option<FetchOutcome>, StateError> {
        let Some(template) = self.registry.instance(contract_name, &address)? else {
            return Ok(None);
        };
        let task = FetchTask {
            address,
            template: Arc::new(template),
            properties: properties.map(|subset| subset.to_vec().into()),
            start_delay: Duration::ZERO,
            retry: self.retry.clone(),
        };
        Ok(Some(task.run(Arc::clone(&self.attacher)).await))
    }

    /// Point lookup into a mapping-typed variable of one instance, shaped
    /// `{mapping: {key: value}}`.
    pub async fn mapping_value(
        &self,
        contract_name: &str,
        address: AccountAddress,
        mapping: &str,
        key: &str,
    ) -> Result<Option<Value>, StateError> {
        let Some(template) = self.registry.instance(contract_name, &address)? else {
            return Ok(None);
        };
        let accessor = self.attacher.attach(&template, address).await?;
        let value = accessor.mapping_entry(mapping, key).await?;

        let mut entry = Map::new();
        entry.insert(key.to_owned(), value);
        let mut document = Map::new();
        document.insert(mapping.to_owned(), Value::Object(entry));
        Ok(Some(Value::Object(document)))
    }

    /// The instance detail document: the explorer config fused with the
    /// instance's metadata record.
    pub async fn instance_detail(
        &self,
        contract_name: &str,
        address: AccountAddress,
    ) -> Result<Option<Value>, StateError> {
        let Some(template) = self.registry.instance(contract_name, &address)? else {
            return Ok(None);
        };
        let meta = serde_json::to_value(&template)?;

        let (config_tx, config_rx) = mpsc::channel(1);
        let (meta_tx, meta_rx) = mpsc::channel(1);
        let barrier = FuseBarrier::new(vec![config_rx, meta_rx]);

        let _ = config_tx.send(self.config_document.clone()).await;
        drop(config_tx);
        let _ = meta_tx.send(json!({ "contractMeta": meta })).await;
        drop(meta_tx);

        Ok(Some(barrier.wait().await))
    }

    /// The two sequential remote lookups of the discovery chain, funneled
    /// through the collect barrier: template address → bytecode → every
    /// address running that bytecode.
    async fn discover_instances(&self, template: &ContractTemplate) -> Result<Vec<AccountAddress>, StateError> {
        let code = self.ledger.code_for(&template.address).await?;
        let running = self.ledger.accounts_running(&code).await?;

        let (tx, rx) = mpsc::channel(running.len().max(1));
        let barrier = CollectBarrier::new(rx);
        for address in running {
            // Sized for the full set; a send only fails if the barrier is
            // gone, and we hold it until `wait`.
            let _ = tx.send(address).await;
        }
        drop(tx);
        Ok(barrier.wait().await)
    }

    /// Staggered fan-out and completion-order fan-in: task *i* starts after
    /// `i × stagger_interval`, and the set resolves only when every task has
    /// settled.
    async fn fetch_all(
        &self,
        template: Arc<ContractTemplate>,
        addresses: Vec<AccountAddress>,
        properties: Option<&[String]>,
    ) -> Vec<FetchOutcome> {
        let properties: Option<Arc<[String]>> = properties.map(|subset| subset.to_vec().into());

        let mut tasks = JoinSet::new();
        for (index, address) in addresses.into_iter().enumerate() {
            let task = FetchTask {
                address,
                template: Arc::clone(&template),
                properties: properties.clone(),
                start_delay: self.stagger_interval * index as u32,
                retry: self.retry.clone(),
            };
            tasks.spawn(task.run(Arc::clone(&self.attacher)));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(settled) = tasks.join_next().await {
            match settled {
                Ok(outcome) => outcomes.push(outcome),
                // A panicked task must not poison its siblings' outcomes.
                Err(join_error) => tracing::error!(%join_error, "fetch task aborted"),
            }
        }
        outcomes
    }
}
