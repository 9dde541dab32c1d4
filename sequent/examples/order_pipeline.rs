//! A four-group order pipeline with a diamond dependency.
//!
//! Orders enter through one permitted endpoint and are journaled first;
//! enrichment and audit follow the journal in parallel, and archiving
//! waits for both. Every group sees every order, in order, at its own
//! pace.
//!
//! Run with
//!
//! ```not_rust
//! cargo run --example order_pipeline
//! ```

use std::time::Duration;

use sequent::prelude::*;

#[derive(Clone, Debug)]
struct Order {
    id: String,
    amount_cents: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut handlers = HandlerRegistry::new();
    handlers.register_fn("write_journal", |order: &Order, sequence| {
        println!("journal[{sequence}] {} ({} cents)", order.id, order.amount_cents);
        Ok(())
    });
    handlers.register_fn("enrich_pricing", |order: &Order, sequence| {
        let taxed = order.amount_cents + order.amount_cents / 5;
        println!("enrich[{sequence}] {} taxed to {} cents", order.id, taxed);
        Ok(())
    });
    handlers.register_fn("audit_trail", |order: &Order, sequence| {
        println!("audit[{sequence}] {}", order.id);
        Ok(())
    });
    handlers.register_fn("archive_order", |order: &Order, sequence| {
        println!("archive[{sequence}] {}", order.id);
        Ok(())
    });

    let spec = WorkflowSpec::new()
        .group(GroupSpec::new("journal").handler("write_journal"))
        .group(
            GroupSpec::new("enrich")
                .handler("enrich_pricing")
                .wait_for("journal"),
        )
        .group(
            GroupSpec::new("audit")
                .handler("audit_trail")
                .wait_for("journal"),
        )
        .group(
            GroupSpec::new("archive")
                .handler("archive_order")
                .wait_for("enrich")
                .wait_for("audit"),
        )
        .publisher("orders-in")
        .capacity(256);

    let workflow = build_workflow(spec, handlers).await?;

    for stage in workflow.graph().stages() {
        println!("stage {}: {:?}", stage.depth(), stage.members());
    }
    println!("{}", workflow.graph().to_dot());

    for i in 1..=5i64 {
        let order = Order {
            id: format!("ORD-{i:04}"),
            amount_cents: 2_500 * i,
        };
        workflow.publish("orders-in", order).await?;
    }

    // Give the pipeline a moment to drain, then inspect each group.
    tokio::time::sleep(Duration::from_millis(200)).await;
    for status in workflow.statuses() {
        println!(
            "{}: {} at cursor {}",
            status.group, status.state, status.cursor
        );
    }

    workflow.shutdown().await;
    Ok(())
}
