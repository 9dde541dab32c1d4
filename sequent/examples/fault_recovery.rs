//! Fault isolation and group restart.
//!
//! The journal handler fails deterministically on its third event. Its
//! group faults and freezes while the audit group keeps draining; after
//! inspecting the captured fault we restart the journal and it resumes
//! with the exact sequence that failed.
//!
//! Run with
//!
//! ```not_rust
//! cargo run --example fault_recovery
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sequent::prelude::*;

/// Fails the first attempt at sequence 2, then behaves.
struct FlakyWriter {
    tripped: AtomicBool,
}

#[async_trait]
impl Handler<String> for FlakyWriter {
    async fn process(&self, event: &String, sequence: i64, _: bool) -> Result<(), BoxError> {
        if sequence == 2 && !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(format!("disk hiccup while writing '{event}'").into());
        }
        println!("journal[{sequence}] {event}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut handlers = HandlerRegistry::new();
    handlers.register(
        "flaky_journal",
        FlakyWriter {
            tripped: AtomicBool::new(false),
        },
    );
    handlers.register_fn("audit_trail", |event: &String, sequence| {
        println!("audit[{sequence}] {event}");
        Ok(())
    });

    let spec = WorkflowSpec::new()
        .group(GroupSpec::new("journal").handler("flaky_journal"))
        .group(GroupSpec::new("audit").handler("audit_trail"))
        .publisher("events-in");

    let workflow = build_workflow(spec, handlers).await?;

    for i in 0..5 {
        workflow.publish("events-in", format!("event-{i}")).await?;
    }

    while workflow.status("journal").map(|s| s.state) != Some(GroupState::Faulted) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let journal = workflow.status("journal").unwrap();
    let fault = journal.fault.unwrap();
    println!(
        "journal faulted: handler '{}' at sequence {}: {}",
        fault.handler, fault.sequence, fault.message
    );
    println!(
        "journal cursor frozen at {}, audit still at work",
        journal.cursor
    );

    while workflow.status("audit").map(|s| s.cursor) != Some(4) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    println!("audit finished the stream at cursor 4");

    workflow.restart("journal").await?;
    while workflow.status("journal").map(|s| s.cursor) != Some(4) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    println!("journal recovered and caught up at cursor 4");

    workflow.shutdown().await;
    Ok(())
}
