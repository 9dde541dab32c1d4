//! Two-stage pipeline drain behavior
//!
//! This test verifies that:
//! 1. A root group and its dependent drain a short burst completely
//! 2. Both cursors converge on the last published sequence
//! 3. Both groups are still running afterwards
//! 4. The dependent never processes a sequence its upstream has not finished

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use sequent::prelude::*;

/// Appends every processed call to a shared log and publishes its own
/// progress, so cross-group ordering can be asserted afterwards.
struct StageRecorder {
    label: &'static str,
    log: Arc<Mutex<Vec<(String, i64, &'static str)>>>,
    upstream: Option<Arc<AtomicI64>>,
    progress: Arc<AtomicI64>,
}

#[async_trait]
impl Handler<String> for StageRecorder {
    async fn process(
        &self,
        event: &String,
        sequence: i64,
        _end_of_batch: bool,
    ) -> Result<(), BoxError> {
        if let Some(upstream) = &self.upstream {
            assert!(
                upstream.load(Ordering::SeqCst) >= sequence,
                "sequence {sequence} reached '{}' before its upstream finished it",
                self.label
            );
        }
        self.log
            .lock()
            .unwrap()
            .push((event.clone(), sequence, self.label));
        self.progress.store(sequence, Ordering::SeqCst);
        Ok(())
    }
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 2s");
}

fn two_stage_spec() -> WorkflowSpec {
    WorkflowSpec::new()
        .group(GroupSpec::new("parse").handler("stage_parse"))
        .group(GroupSpec::new("index").handler("stage_index").wait_for("parse"))
        .publisher("ingest")
}

#[tokio::test]
async fn test_two_stage_drain_converges() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let parse_progress = Arc::new(AtomicI64::new(-1));
    let index_progress = Arc::new(AtomicI64::new(-1));

    let mut handlers = HandlerRegistry::new();
    handlers.register(
        "stage_parse",
        StageRecorder {
            label: "parse",
            log: Arc::clone(&log),
            upstream: None,
            progress: Arc::clone(&parse_progress),
        },
    );
    handlers.register(
        "stage_index",
        StageRecorder {
            label: "index",
            log: Arc::clone(&log),
            upstream: Some(Arc::clone(&parse_progress)),
            progress: Arc::clone(&index_progress),
        },
    );

    let workflow = build_workflow(two_stage_spec(), handlers).await.unwrap();

    for i in 0..3i64 {
        let sequence = workflow
            .publish("ingest", format!("event-{i}"))
            .await
            .unwrap();
        assert_eq!(sequence, i, "publishes are assigned dense sequences");
    }

    let wf = &workflow;
    eventually(|| wf.status("index").map(|s| s.cursor) == Some(2)).await;

    let parse = workflow.status("parse").unwrap();
    let index = workflow.status("index").unwrap();
    assert_eq!(parse.cursor, 2);
    assert_eq!(index.cursor, 2);
    assert_eq!(parse.state, GroupState::Running);
    assert_eq!(index.state, GroupState::Running);

    // Per sequence, "parse" strictly precedes "index" in the shared log.
    let entries = log.lock().unwrap().clone();
    for sequence in 0..3i64 {
        let parse_pos = entries
            .iter()
            .position(|(_, s, l)| *s == sequence && *l == "parse")
            .unwrap();
        let index_pos = entries
            .iter()
            .position(|(_, s, l)| *s == sequence && *l == "index")
            .unwrap();
        assert!(parse_pos < index_pos);
    }

    // Payloads arrive intact at the downstream stage.
    assert!(entries
        .iter()
        .any(|(event, s, l)| event == "event-1" && *s == 1 && *l == "index"));

    workflow.shutdown().await;
}

#[tokio::test]
async fn test_graph_exposes_stage_layout() {
    let mut handlers = HandlerRegistry::new();
    handlers.register_fn("stage_parse", |_: &String, _| Ok(()));
    handlers.register_fn("stage_index", |_: &String, _| Ok(()));

    let workflow = build_workflow(two_stage_spec(), handlers).await.unwrap();

    let stages = workflow.graph().stages();
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0].members(), ["parse"]);
    assert_eq!(stages[1].members(), ["index"]);
    assert_eq!(workflow.graph().depth_of("index"), Some(2));

    workflow.shutdown().await;
}
