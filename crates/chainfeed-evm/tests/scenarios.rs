//! End-to-end consumer behaviour against in-process fakes of the registry,
//! blob store and JSON-RPC node.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chainfeed_abi::{fingerprint, DecodeTable, DynSolValue};
use chainfeed_core::{
    BlockNumber, ConsumerConfig, CursorStore, IngestError, MemoryCursorStore, MemoryQueue,
    PutAck, TargetRecord, TrackedEvent, WorkQueue,
};
use chainfeed_evm::{BlobStore, ConsumerBuilder, ContractRegistry, Dispatcher, LogFetcher};
use chainfeed_rpc::{JsonRpcRequest, JsonRpcResponse, RpcTransport, TransportError};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

const TAGGER: &str = "0xabc0000000000000000000000000000000000001";
const DENIED: &str = "0x2b88b7c1f40cbd59344e739edbb9c5630af2bbcb";

const TAGGER_ABI: &str = r#"[{"type":"event","name":"Tagged","anonymous":false,"inputs":[
    {"name":"tagger","type":"address","indexed":true},
    {"name":"tag","type":"string","indexed":false},
    {"name":"target","type":"uint256","indexed":false}]}]"#;

// ─── Fakes ────────────────────────────────────────────────────────────────────

struct FakeRegistry(Vec<TargetRecord>);

impl FakeRegistry {
    fn tagger(addresses: &[&str]) -> Arc<Self> {
        Arc::new(Self(
            addresses
                .iter()
                .map(|a| TargetRecord {
                    family: "tagger".into(),
                    address: a.to_string(),
                    descriptor_hash: "QmTagger".into(),
                })
                .collect(),
        ))
    }

    fn of(&self, family: &str) -> Vec<&TargetRecord> {
        self.0.iter().filter(|t| t.family == family).collect()
    }
}

#[async_trait]
impl ContractRegistry for FakeRegistry {
    async fn target_count(&self, family: &str) -> Result<u64, IngestError> {
        Ok(self.of(family).len() as u64)
    }

    async fn target_at(&self, family: &str, index: u64) -> Result<TargetRecord, IngestError> {
        Ok(self.of(family)[index as usize].clone())
    }

    fn describe(&self) -> String {
        "fake registry".into()
    }
}

struct FakeBlobs;

#[async_trait]
impl BlobStore for FakeBlobs {
    async fn fetch_blob(&self, hash: &str, timeout: Duration) -> Result<Vec<u8>, IngestError> {
        match hash {
            "QmTagger" => Ok(TAGGER_ABI.as_bytes().to_vec()),
            _ => Err(IngestError::Timeout { ms: timeout.as_millis() as u64 }),
        }
    }
}

/// `eth_getLogs` node with a scripted reply queue per address. Once a script
/// runs dry it answers with an empty array.
#[derive(Default)]
struct FakeNode {
    scripts: Mutex<HashMap<String, VecDeque<Result<Value, u16>>>>,
    calls: Mutex<Vec<(String, String)>>,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeNode {
    fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Default::default() }
    }

    fn script(&self, address: &str, reply: Result<Value, u16>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push_back(reply);
    }

    /// `(address, fromBlock)` of every request so far.
    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, address: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(a, _)| a == address)
            .map(|(_, from)| from)
            .collect()
    }
}

#[async_trait]
impl RpcTransport for FakeNode {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        assert_eq!(req.method, "eth_getLogs");
        let filter = &req.params[0];
        assert_eq!(filter["toBlock"], "latest");
        assert_eq!(filter["topics"], json!([]));
        let address = filter["address"].as_str().unwrap().to_string();
        let from = filter["fromBlock"].as_str().unwrap().to_string();
        self.calls.lock().unwrap().push((address.clone(), from));

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&address)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(json!([])));
        match reply {
            Ok(result) => Ok(JsonRpcResponse::ok(1, result)),
            Err(code) => Err(TransportError::Status { code }),
        }
    }

    fn url(&self) -> &str {
        "fake://node"
    }
}

// ─── Log builders ─────────────────────────────────────────────────────────────

fn topic0() -> String {
    fingerprint::keccak256_signature("Tagged(address,string,uint256)")
}

fn tagger_topic() -> String {
    let tagger: Address = "0x00000000000000000000000000000000000000ee".parse().unwrap();
    format!("0x{}", hex::encode(DynSolValue::Address(tagger).abi_encode()))
}

fn tagged_data(tag: &str, target: u64) -> String {
    let data = DynSolValue::Tuple(vec![
        DynSolValue::String(tag.into()),
        DynSolValue::Uint(U256::from(target), 256),
    ])
    .abi_encode_params();
    format!("0x{}", hex::encode(data))
}

fn tagged_log(block: u64, tx: &str) -> Value {
    json!({
        "address": TAGGER,
        "blockNumber": format!("0x{block:x}"),
        "transactionHash": tx,
        "logIndex": "0x0",
        "topics": [topic0(), tagger_topic()],
        "data": tagged_data("rust", block),
        "blockHash": "0xbeef",
        "removed": false
    })
}

// ─── Harness ──────────────────────────────────────────────────────────────────

struct Harness {
    node: Arc<FakeNode>,
    queue: Arc<MemoryQueue>,
    cursors: Arc<MemoryCursorStore>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<Result<(), IngestError>>,
}

fn start(registry: Arc<FakeRegistry>, node: Arc<FakeNode>, origin: BlockNumber) -> Harness {
    let queue = Arc::new(MemoryQueue::new());
    let cursors = Arc::new(MemoryCursorStore::new());
    let consumer = ConsumerBuilder::new(ConsumerConfig::default())
        .families(["tagger"])
        .origin_block(origin)
        .poll_interval_ms(20)
        .transport(node.clone())
        .registry(registry)
        .blob_store(Arc::new(FakeBlobs))
        .queue(queue.clone())
        .cursor_store(cursors.clone())
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let task = tokio::spawn(async move { consumer.run(token).await });
    Harness { node, queue, cursors, cancel, task }
}

impl Harness {
    async fn wait_until(&self, what: &str, cond: impl Fn(&Self) -> bool) {
        let reached = tokio::time::timeout(Duration::from_secs(5), async {
            while !cond(self) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(reached.is_ok(), "timed out waiting for {what}");
    }

    async fn stop(self) -> (Arc<FakeNode>, Arc<MemoryQueue>, Arc<MemoryCursorStore>) {
        self.cancel.cancel();
        self.task.await.unwrap().unwrap();
        (self.node, self.queue, self.cursors)
    }
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_tagged_logs_queue_two_jobs_and_advance_cursor() {
    let node = Arc::new(FakeNode::default());
    node.script(TAGGER, Ok(json!([tagged_log(0x12, "0xbb"), tagged_log(0x10, "0xaa")])));

    let h = start(FakeRegistry::tagger(&[TAGGER]), node, BlockNumber::ZERO);
    h.wait_until("second poll", |h| h.node.calls_for(TAGGER).len() >= 2).await;
    let (node, queue, cursors) = h.stop().await;

    let jobs = queue.pending();
    assert_eq!(jobs.len(), 2);
    let keys: Vec<_> = jobs.iter().map(|j| j.idempotency_key.as_str()).collect();
    assert_eq!(keys, vec!["Tagged:0xbb", "Tagged:0xaa"]);
    assert!(matches!(jobs[0].payload.event, TrackedEvent::Tagged(_)));
    assert_eq!(jobs[0].payload.block_number, BlockNumber(0x12));

    // resumes after the highest block, not the last one in the batch
    let cursor = cursors.load(TAGGER).await.unwrap().unwrap();
    assert_eq!(cursor.next_block, BlockNumber(0x13));
    let froms = node.calls_for(TAGGER);
    assert_eq!(froms[0], "0x0");
    assert_eq!(froms[1], "0x13");
}

#[tokio::test]
async fn server_error_leaves_cursor_and_retries_same_range() {
    let node = Arc::new(FakeNode::default());
    node.script(TAGGER, Err(500));
    node.script(TAGGER, Err(500));

    let origin = BlockNumber(0x41736a);
    let h = start(FakeRegistry::tagger(&[TAGGER]), node, origin);
    h.wait_until("two failed polls", |h| h.node.calls_for(TAGGER).len() >= 2).await;
    let (node, queue, cursors) = h.stop().await;

    assert!(queue.is_empty());
    assert!(cursors.load(TAGGER).await.unwrap().is_none());
    let froms = node.calls_for(TAGGER);
    assert_eq!(froms[0], "0x41736a");
    assert_eq!(froms[1], "0x41736a");
}

#[tokio::test]
async fn fetcher_maps_server_error_to_none() {
    let node = Arc::new(FakeNode::default());
    node.script(TAGGER, Err(500));
    node.script(TAGGER, Ok(json!([])));
    let fetcher = LogFetcher::new(node);

    assert!(fetcher.fetch_logs(TAGGER, BlockNumber(1)).await.is_none());
    assert_eq!(fetcher.fetch_logs(TAGGER, BlockNumber(1)).await, Some(json!([])));
}

#[tokio::test]
async fn fetcher_maps_null_result_to_none() {
    let node = Arc::new(FakeNode::default());
    node.script(TAGGER, Ok(Value::Null));
    let fetcher = LogFetcher::new(node);

    assert!(fetcher.fetch_logs(TAGGER, BlockNumber(1)).await.is_none());
}

#[tokio::test]
async fn null_result_is_retried_on_next_tick() {
    let node = Arc::new(FakeNode::default());
    node.script(TAGGER, Ok(Value::Null));
    node.script(TAGGER, Ok(json!([tagged_log(0x12, "0xbb")])));

    let h = start(FakeRegistry::tagger(&[TAGGER]), node, BlockNumber::ZERO);
    h.wait_until("poll after the null reply", |h| h.node.calls_for(TAGGER).len() >= 3).await;
    let (node, queue, cursors) = h.stop().await;

    assert_eq!(queue.len(), 1);
    let cursor = cursors.load(TAGGER).await.unwrap().unwrap();
    assert_eq!(cursor.next_block, BlockNumber(0x13));
    let froms = node.calls_for(TAGGER);
    assert_eq!(froms[0], "0x0");
    assert_eq!(froms[1], "0x0");
    assert_eq!(froms[2], "0x13");
}

#[tokio::test]
async fn denylisted_contract_is_never_polled() {
    let node = Arc::new(FakeNode::default());
    let h = start(FakeRegistry::tagger(&[DENIED, TAGGER]), node, BlockNumber::ZERO);
    h.wait_until("a few polls", |h| h.node.calls_for(TAGGER).len() >= 3).await;
    let (node, _, _) = h.stop().await;

    assert!(node.calls().iter().all(|(addr, _)| addr != DENIED));
}

#[tokio::test]
async fn partial_decode_queues_only_the_good_entry() {
    let table = DecodeTable::new();
    table.register_bytes(TAGGER_ABI.as_bytes()).unwrap();
    let queue = Arc::new(MemoryQueue::new());
    let dispatcher = Dispatcher::new(table, queue.clone());

    let mut bad_data = tagged_log(0x30, "0xbad1");
    bad_data["data"] = json!("0xdeadbeef");
    let mut missing_topic = tagged_log(0x31, "0xbad2");
    missing_topic["topics"] = json!([topic0()]);
    let good = tagged_log(0x20, "0x600d");

    let out = dispatcher
        .process(Some(&json!([bad_data, good, missing_topic])))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(out.submitted, 1);
    assert_eq!(out.failed, 2);
    assert_eq!(out.highest_block, Some(BlockNumber(0x20)));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.pending()[0].idempotency_key, "Tagged:0x600d");
}

#[tokio::test]
async fn redelivered_event_keeps_its_key() {
    let table = DecodeTable::new();
    table.register_bytes(TAGGER_ABI.as_bytes()).unwrap();
    let queue = Arc::new(MemoryQueue::new());
    let dispatcher = Dispatcher::new(table, queue.clone());

    let batch = json!([tagged_log(0x40, "0xcafe")]);
    let first = dispatcher.process(Some(&batch)).await.unwrap().unwrap();
    let second = dispatcher.process(Some(&batch)).await.unwrap().unwrap();

    assert_eq!((first.submitted, first.duplicates), (1, 0));
    assert_eq!((second.submitted, second.duplicates), (0, 1));
    assert_eq!(queue.len(), 1);

    let job = queue.try_next().unwrap();
    assert_eq!(queue.put(job.clone()).await.unwrap(), PutAck::Duplicate);
}

#[tokio::test]
async fn slow_node_never_sees_overlapping_fetches() {
    let node = Arc::new(FakeNode::with_delay(Duration::from_millis(120)));
    let h = start(FakeRegistry::tagger(&[TAGGER]), node, BlockNumber::ZERO);
    h.wait_until("three slow polls", |h| h.node.calls_for(TAGGER).len() >= 3).await;
    let (node, _, _) = h.stop().await;

    assert_eq!(node.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stored_cursor_below_origin_is_raised() {
    let node = Arc::new(FakeNode::default());
    let queue = Arc::new(MemoryQueue::new());
    let cursors = Arc::new(MemoryCursorStore::new());
    cursors
        .save(&chainfeed_core::Cursor::new(TAGGER, BlockNumber(5)))
        .await
        .unwrap();

    let consumer = ConsumerBuilder::new(ConsumerConfig::default())
        .families(["tagger"])
        .origin_block(BlockNumber(100))
        .poll_interval_ms(20)
        .transport(node.clone())
        .registry(FakeRegistry::tagger(&[TAGGER]))
        .blob_store(Arc::new(FakeBlobs))
        .queue(queue)
        .cursor_store(cursors)
        .build()
        .unwrap();
    let instances = consumer.discover().await;
    assert_eq!(instances.len(), 1);

    let cancel = CancellationToken::new();
    let poller = consumer.poller(instances[0].clone());
    let task = tokio::spawn(poller.run(cancel.clone()));
    tokio::time::timeout(Duration::from_secs(5), async {
        while node.calls_for(TAGGER).is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    cancel.cancel();
    task.await.unwrap().unwrap();

    assert_eq!(node.calls_for(TAGGER)[0], "0x64");
}

#[tokio::test]
async fn non_array_result_stops_only_that_poller() {
    const OTHER: &str = "0xabc0000000000000000000000000000000000002";
    let node = Arc::new(FakeNode::default());
    node.script(TAGGER, Ok(json!({"unexpected": "object"})));

    let h = start(FakeRegistry::tagger(&[TAGGER, OTHER]), node, BlockNumber::ZERO);
    h.wait_until("other contract keeps polling", |h| h.node.calls_for(OTHER).len() >= 4).await;
    let (node, _, _) = h.stop().await;

    assert_eq!(node.calls_for(TAGGER).len(), 1);
}
