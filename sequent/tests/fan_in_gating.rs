//! Fan-in gating on multiple upstream groups
//!
//! This test verifies that:
//! 1. A group waiting on two upstreams never overtakes the slower one
//! 2. Releasing the slow upstream lets the fan-in group drain fully
//! 3. Stage assignment places the fan-in group below its deepest upstream

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use sequent::prelude::*;

/// Holds every sequence until the shared flag is flipped.
struct HoldUntilReleased {
    open: Arc<AtomicBool>,
}

#[async_trait]
impl Handler<String> for HoldUntilReleased {
    async fn process(&self, _: &String, _: i64, _: bool) -> Result<(), BoxError> {
        while !self.open.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        Ok(())
    }
}

/// Remembers the highest sequence it has processed.
struct TrackProgress {
    progress: Arc<AtomicI64>,
}

#[async_trait]
impl Handler<String> for TrackProgress {
    async fn process(&self, _: &String, sequence: i64, _: bool) -> Result<(), BoxError> {
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

#[tokio::test]
async fn test_fan_in_waits_for_slowest_upstream() {
    let open = Arc::new(AtomicBool::new(false));
    let merged = Arc::new(AtomicI64::new(-1));

    let mut handlers = HandlerRegistry::new();
    handlers.register_fn("pass", |_: &String, _| Ok(()));
    handlers.register(
        "hold",
        HoldUntilReleased {
            open: Arc::clone(&open),
        },
    );
    handlers.register(
        "merge",
        TrackProgress {
            progress: Arc::clone(&merged),
        },
    );

    let spec = WorkflowSpec::new()
        .group(GroupSpec::new("fast").handler("pass"))
        .group(GroupSpec::new("slow").handler("hold"))
        .group(
            GroupSpec::new("join")
                .handler("merge")
                .wait_for("fast")
                .wait_for("slow"),
        )
        .publisher("ingest");

    let workflow = build_workflow(spec, handlers).await.unwrap();

    for i in 0..4 {
        workflow
            .publish("ingest", format!("event-{i}"))
            .await
            .unwrap();
    }

    let wf = &workflow;
    eventually(|| wf.status("fast").map(|s| s.cursor) == Some(3)).await;

    // The fast branch is done, but the join group is gated on the
    // minimum of both upstream cursors.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(workflow.status("slow").unwrap().cursor, -1);
    assert_eq!(workflow.status("join").unwrap().cursor, -1);
    assert_eq!(merged.load(Ordering::SeqCst), -1);

    open.store(true, Ordering::SeqCst);
    eventually(|| wf.status("join").map(|s| s.cursor) == Some(3)).await;
    assert_eq!(workflow.status("slow").unwrap().cursor, 3);
    assert_eq!(merged.load(Ordering::SeqCst), 3);

    workflow.shutdown().await;
}

#[tokio::test]
async fn test_fan_in_sits_one_stage_below_deepest_upstream() {
    let mut handlers = HandlerRegistry::new();
    handlers.register_fn("noop", |_: &String, _| Ok(()));

    // "deep" is two hops from the source; "join" must land below it even
    // though its other upstream is a root group.
    let spec = WorkflowSpec::new()
        .group(GroupSpec::new("root").handler("noop"))
        .group(GroupSpec::new("deep").handler("noop").wait_for("root"))
        .group(
            GroupSpec::new("join")
                .handler("noop")
                .wait_for("deep")
                .wait_for("root"),
        )
        .publisher("ingest");

    let workflow = build_workflow(spec, handlers).await.unwrap();
    let graph = workflow.graph();
    assert_eq!(graph.depth_of("root"), Some(1));
    assert_eq!(graph.depth_of("deep"), Some(2));
    assert_eq!(graph.depth_of("join"), Some(3));
    assert_eq!(graph.stages().len(), 3);

    workflow.shutdown().await;
}
