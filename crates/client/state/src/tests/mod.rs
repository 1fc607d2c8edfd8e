//! Pipeline tests over mocked collaborators: template store, ledger query,
//! and attacher. Timing-sensitive cases run on the paused clock, so stagger
//! and backoff delays elapse instantly and deterministically.

use crate::accessor::{AttachContract, ContractAccessor, MockAttachContract};
use crate::error::{FetchError, StateError};
use crate::fanout::FetchOutcome;
use crate::StateAggregator;
use ac_ledger::{LedgerError, MockLedgerQuery};
use ac_registry::MockTemplateStore;
use ap_resilience::RetryConfig;
use ap_types::{AccountAddress, CodeFingerprint, ContractTemplate};
use assert_matches::assert_matches;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

const TEMPLATE_ADDR: &str = "00000000000000000000000000000000000000aa";

fn template() -> ContractTemplate {
    serde_json::from_value(json!({
        "name": "Sample",
        "address": TEMPLATE_ADDR,
        "bin": "6080604052",
        "xabi": {
            "funcs": ["reset"],
            "vars": [
                {"name": "total", "type": "uint", "slot": 0},
                {"name": "label", "type": "string", "slot": 1}
            ]
        }
    }))
    .unwrap()
}

fn addr(n: u8) -> AccountAddress {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    AccountAddress::new(bytes)
}

fn entries() -> Map<String, Value> {
    let mut entries = Map::new();
    entries.insert("total".into(), json!(7));
    entries.insert("label".into(), json!("plug"));
    entries
}

#[derive(Debug)]
struct FixedAccessor {
    entries: Map<String, Value>,
    mapping_values: Map<String, Value>,
}

#[async_trait]
impl ContractAccessor for FixedAccessor {
    fn variable_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    async fn variable(&self, name: &str) -> Result<Value, FetchError> {
        self.entries.get(name).cloned().ok_or_else(|| FetchError::UnknownVariable(name.to_owned()))
    }

    async fn mapping_entry(&self, name: &str, _key: &str) -> Result<Value, FetchError> {
        self.mapping_values.get(name).cloned().ok_or_else(|| FetchError::NotAMapping(name.to_owned()))
    }
}

/// Attacher whose failure script and call log drive the retry tests.
struct TestAttacher {
    /// Failed tries before success, per address; `usize::MAX` never succeeds.
    failures: HashMap<AccountAddress, usize>,
    entries: Map<String, Value>,
    mapping_values: Map<String, Value>,
    calls: Mutex<HashMap<AccountAddress, usize>>,
    starts: Mutex<Vec<(AccountAddress, Instant)>>,
}

impl TestAttacher {
    fn succeeding() -> Self {
        Self {
            failures: HashMap::new(),
            entries: entries(),
            mapping_values: Map::new(),
            calls: Mutex::new(HashMap::new()),
            starts: Mutex::new(Vec::new()),
        }
    }

    fn with_failures(mut self, address: AccountAddress, count: usize) -> Self {
        self.failures.insert(address, count);
        self
    }

    fn with_mapping_value(mut self, name: &str, value: Value) -> Self {
        self.mapping_values.insert(name.to_owned(), value);
        self
    }

    fn attach_count(&self, address: AccountAddress) -> usize {
        self.calls.lock().unwrap().get(&address).copied().unwrap_or(0)
    }

    fn first_start(&self, address: AccountAddress) -> Option<Instant> {
        self.starts.lock().unwrap().iter().find(|(a, _)| *a == address).map(|(_, at)| *at)
    }
}

#[async_trait]
impl AttachContract for TestAttacher {
    async fn attach(
        &self,
        _template: &ContractTemplate,
        address: AccountAddress,
    ) -> Result<Arc<dyn ContractAccessor>, FetchError> {
        self.starts.lock().unwrap().push((address, Instant::now()));
        let attempts_so_far = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(address).or_insert(0);
            *count += 1;
            *count
        };
        let budget = self.failures.get(&address).copied().unwrap_or(0);
        if attempts_so_far <= budget {
            return Err(FetchError::Attach(LedgerError::Status { status: 500, context: "storage".into() }));
        }
        Ok(Arc::new(FixedAccessor { entries: self.entries.clone(), mapping_values: self.mapping_values.clone() }))
    }
}

fn registry_with_template() -> MockTemplateStore {
    let mut registry = MockTemplateStore::new();
    registry.expect_latest().times(1).returning(|name| {
        assert_eq!(name, "Sample");
        Ok(Some(template()))
    });
    registry
}

fn ledger_with_instances(addresses: Vec<AccountAddress>) -> MockLedgerQuery {
    let mut ledger = MockLedgerQuery::new();
    ledger.expect_code_for().times(1).returning(|address| {
        assert_eq!(*address, TEMPLATE_ADDR.parse().unwrap());
        Ok(CodeFingerprint::new("60806040"))
    });
    ledger.expect_accounts_running().times(1).returning(move |code| {
        assert_eq!(code.as_str(), "60806040");
        Ok(addresses.clone())
    });
    ledger
}

fn aggregator(
    registry: MockTemplateStore,
    ledger: MockLedgerQuery,
    attacher: Arc<dyn AttachContract>,
) -> StateAggregator {
    StateAggregator::new(Arc::new(registry), Arc::new(ledger), attacher)
}

#[tokio::test(start_paused = true)]
async fn aggregates_one_snapshot_per_instance() {
    let instances = vec![addr(1), addr(2), addr(3)];
    let attacher = Arc::new(TestAttacher::succeeding());
    let aggregator = aggregator(registry_with_template(), ledger_with_instances(instances.clone()), attacher);

    let snapshots = aggregator.get_states_for("Sample", None).await.unwrap();

    assert_eq!(snapshots.len(), 3);
    let mut seen: Vec<AccountAddress> = snapshots.iter().map(|s| s.address).collect();
    seen.sort();
    assert_eq!(seen, instances);
    for snapshot in &snapshots {
        assert_eq!(snapshot.state, json!({"total": 7, "label": "plug"}));
    }
}

#[tokio::test]
async fn missing_template_yields_empty_without_discovery() {
    let mut registry = MockTemplateStore::new();
    registry.expect_latest().times(1).returning(|_| Ok(None));
    // No expectations: any ledger or attach call would panic the test.
    let aggregator = aggregator(registry, MockLedgerQuery::new(), Arc::new(MockAttachContract::new()));

    let snapshots = aggregator.get_states_for("Sample", None).await.unwrap();
    assert!(snapshots.is_empty());
}

#[tokio::test]
async fn zero_discovered_instances_schedule_no_fetches() {
    let aggregator =
        aggregator(registry_with_template(), ledger_with_instances(Vec::new()), Arc::new(MockAttachContract::new()));

    let snapshots = aggregator.get_states_for("Sample", None).await.unwrap();
    assert!(snapshots.is_empty());
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_until_success() {
    let instance = addr(1);
    let attacher = Arc::new(TestAttacher::succeeding().with_failures(instance, 3));
    let aggregator =
        aggregator(registry_with_template(), ledger_with_instances(vec![instance]), Arc::clone(&attacher) as Arc<dyn AttachContract>);

    let snapshots = aggregator.get_states_for("Sample", None).await.unwrap();

    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].address, instance);
    assert_eq!(snapshots[0].state["total"], json!(7));
    // Three failed tries, then the one that stuck.
    assert_eq!(attacher.attach_count(instance), 4);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_settle_as_tagged_failures() {
    let healthy = addr(1);
    let broken = addr(2);
    let attacher = Arc::new(TestAttacher::succeeding().with_failures(broken, usize::MAX));
    let aggregator =
        aggregator(registry_with_template(), ledger_with_instances(vec![healthy, broken]), Arc::clone(&attacher) as Arc<dyn AttachContract>);

    // The whole aggregate must settle in bounded time even with a hopeless
    // instance; the timeout only fires if it hangs.
    let outcomes = tokio::time::timeout(Duration::from_secs(3600), aggregator.fetch_states_for("Sample", None))
        .await
        .expect("aggregation must not hang on exhausted retries")
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    let failure = outcomes.iter().find(|o| o.address() == broken).unwrap();
    assert_matches!(
        failure,
        FetchOutcome::Exhausted { error, .. } if error.starts_with("exhausted-retries")
    );
    assert_eq!(attacher.attach_count(broken), 10);

    let resolved: Vec<_> = outcomes.iter().filter_map(|o| o.clone().into_snapshot()).collect();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].address, healthy);
}

#[tokio::test]
async fn discovery_failures_propagate_instead_of_masquerading_as_empty() {
    let mut ledger = MockLedgerQuery::new();
    ledger
        .expect_code_for()
        .times(1)
        .returning(|_| Err(LedgerError::Status { status: 500, context: "account".into() }));

    let aggregator = aggregator(registry_with_template(), ledger, Arc::new(MockAttachContract::new()));

    assert_matches!(
        aggregator.get_states_for("Sample", None).await,
        Err(StateError::Discovery(LedgerError::Status { status: 500, .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn fan_out_staggers_task_starts_linearly() {
    let instances: Vec<AccountAddress> = (1..=4).map(addr).collect();
    let attacher = Arc::new(TestAttacher::succeeding());
    let aggregator =
        aggregator(registry_with_template(), ledger_with_instances(instances.clone()), Arc::clone(&attacher) as Arc<dyn AttachContract>)
            .with_stagger_interval(Duration::from_millis(15));

    let base = Instant::now();
    aggregator.get_states_for("Sample", None).await.unwrap();

    for (index, instance) in instances.iter().enumerate() {
        let started = attacher.first_start(*instance).expect("every instance attaches");
        assert!(
            started - base >= Duration::from_millis(15) * index as u32,
            "task {index} started after {:?}, before its stagger offset",
            started - base
        );
    }
}

#[tokio::test(start_paused = true)]
async fn results_arrive_in_completion_order() {
    let delayed = addr(1);
    let prompt = addr(2);
    // The first-scheduled instance fails once, pushing its completion past
    // the second's.
    let attacher = Arc::new(TestAttacher::succeeding().with_failures(delayed, 1));
    let aggregator =
        aggregator(registry_with_template(), ledger_with_instances(vec![delayed, prompt]), Arc::clone(&attacher) as Arc<dyn AttachContract>);

    let outcomes = aggregator.fetch_states_for("Sample", None).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].address(), prompt);
    assert_eq!(outcomes[1].address(), delayed);
}

#[tokio::test(start_paused = true)]
async fn property_subset_limits_the_snapshot() {
    let instance = addr(1);
    let attacher = Arc::new(TestAttacher::succeeding());
    let aggregator = aggregator(registry_with_template(), ledger_with_instances(vec![instance]), attacher);

    let properties = vec!["total".to_owned(), "undeclared".to_owned()];
    let snapshots = aggregator.get_states_for("Sample", Some(&properties)).await.unwrap();

    assert_eq!(snapshots.len(), 1);
    // The declared property is present, the undeclared one is dropped.
    assert_eq!(snapshots[0].state, json!({"total": 7}));
}

#[tokio::test]
async fn state_of_reads_one_instance_through_the_instance_record() {
    let instance = addr(5);
    let mut registry = MockTemplateStore::new();
    registry.expect_instance().times(1).returning(move |name, address| {
        assert_eq!(name, "Sample");
        Ok(Some(template().with_address(*address)))
    });

    let aggregator = StateAggregator::new(
        Arc::new(registry),
        Arc::new(MockLedgerQuery::new()),
        Arc::new(TestAttacher::succeeding()),
    );

    let outcome = aggregator.state_of("Sample", instance, None).await.unwrap().unwrap();
    assert_matches!(outcome, FetchOutcome::Resolved(snapshot) if snapshot.address == instance);
}

#[tokio::test]
async fn state_of_a_recordless_instance_is_none() {
    let mut registry = MockTemplateStore::new();
    registry.expect_instance().times(1).returning(|_, _| Ok(None));

    let aggregator = StateAggregator::new(
        Arc::new(registry),
        Arc::new(MockLedgerQuery::new()),
        Arc::new(MockAttachContract::new()),
    );

    assert!(aggregator.state_of("Sample", addr(5), None).await.unwrap().is_none());
}

#[tokio::test]
async fn mapping_value_wraps_the_entry_in_its_path() {
    let instance = addr(5);
    let mut registry = MockTemplateStore::new();
    registry.expect_instance().returning(move |_, address| Ok(Some(template().with_address(*address))));

    let attacher = Arc::new(TestAttacher::succeeding().with_mapping_value("balances", json!(100)));
    let aggregator = StateAggregator::new(Arc::new(registry), Arc::new(MockLedgerQuery::new()), attacher);

    let document = aggregator.mapping_value("Sample", instance, "balances", "alice").await.unwrap().unwrap();
    assert_eq!(document, json!({"balances": {"alice": 100}}));
}

#[tokio::test]
async fn instance_detail_fuses_config_and_metadata() {
    let instance = addr(5);
    let mut registry = MockTemplateStore::new();
    registry.expect_instance().returning(move |_, address| Ok(Some(template().with_address(*address))));

    let aggregator = StateAggregator::new(
        Arc::new(registry),
        Arc::new(MockLedgerQuery::new()),
        Arc::new(MockAttachContract::new()),
    )
    .with_config_document(json!({"apiUrl": "http://localhost:3000/eth/v1.2"}));

    let detail = aggregator.instance_detail("Sample", instance).await.unwrap().unwrap();

    assert_eq!(detail["apiUrl"], "http://localhost:3000/eth/v1.2");
    assert_eq!(detail["contractMeta"]["name"], "Sample");
    assert_eq!(detail["contractMeta"]["address"], instance.to_string());
}

#[test]
fn exhausted_outcomes_serialize_as_tagged_failures() {
    let outcome = FetchOutcome::Exhausted { address: addr(9), error: "exhausted-retries: boom".into() };
    let rendered = serde_json::to_value(&outcome).unwrap();
    assert_eq!(rendered, json!({"address": addr(9).to_string(), "error": "exhausted-retries: boom"}));
}

#[tokio::test(start_paused = true)]
async fn retry_config_override_caps_the_attempts() {
    let instance = addr(1);
    let attacher = Arc::new(TestAttacher::succeeding().with_failures(instance, usize::MAX));
    let aggregator =
        aggregator(registry_with_template(), ledger_with_instances(vec![instance]), Arc::clone(&attacher) as Arc<dyn AttachContract>)
            .with_retry_config(RetryConfig { max_attempts: 3, ..Default::default() });

    let outcomes = aggregator.fetch_states_for("Sample", None).await.unwrap();

    assert_matches!(&outcomes[0], FetchOutcome::Exhausted { .. });
    assert_eq!(attacher.attach_count(instance), 3);
}
