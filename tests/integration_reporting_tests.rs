//! # Reporting Integration Tests / 报告集成测试
//!
//! Runs real trees through the summary-generating listener and the
//! composite listener and checks the aggregated counts, failure details
//! and JSON export.
//!
//! 将真实的树交给摘要生成监听器和组合监听器运行，检查聚合计数、
//! 失败详情以及 JSON 导出。

mod common;

use anyhow::anyhow;
use common::{RecordingListener, StubNode};
use std::sync::Arc;

use hierarchy_runner::core::executor::{ExecutionRequest, HierarchicalTestExecutor};
use hierarchy_runner::core::listener::{CompositeExecutionListener, ExecutionListener};
use hierarchy_runner::core::node::TestNode;
use hierarchy_runner::reporting::SummaryGeneratingListener;

async fn run_with(root: Arc<dyn TestNode>, listener: Arc<dyn ExecutionListener>) {
    let handle = HierarchicalTestExecutor::new(ExecutionRequest::new(root, listener))
        .execute()
        .expect("plan should build");
    handle.await.expect("root task should not panic");
}

fn mixed_tree() -> Arc<dyn TestNode> {
    StubNode::container("root")
        .with_child(StubNode::test("passing").build())
        .with_child(
            StubNode::test("failing")
                .on_execute(|| async { Err(anyhow!("expected 4, got 5")) })
                .build(),
        )
        .with_child(StubNode::test("skipped").with_skip("needs a database").build())
        .build()
}

#[tokio::test]
async fn summary_counts_every_outcome_once() {
    let summary_listener = Arc::new(SummaryGeneratingListener::new());
    run_with(mixed_tree(), summary_listener.clone()).await;

    let summary = summary_listener.summary();
    assert_eq!(summary.containers, 1);
    assert_eq!(summary.tests, 3);
    assert_eq!(summary.successful, 2, "root and the passing leaf");
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.aborted, 0);
    assert_eq!(summary.total(), 4);
    assert!(summary.has_failures());
    assert!(summary.started_at.is_some());
    assert!(summary.finished_at.is_some());
}

#[tokio::test]
async fn summary_records_failure_details() {
    let summary_listener = Arc::new(SummaryGeneratingListener::new());
    run_with(mixed_tree(), summary_listener.clone()).await;

    let summary = summary_listener.summary();
    assert_eq!(summary.failures.len(), 1);
    let detail = &summary.failures[0];
    assert_eq!(detail.node, "failing");
    assert!(detail.message.contains("expected 4, got 5"));
}

#[tokio::test]
async fn summary_exports_as_json() {
    let summary_listener = Arc::new(SummaryGeneratingListener::new());
    run_with(mixed_tree(), summary_listener.clone()).await;

    let json = summary_listener.summary().to_json().expect("serializable");
    assert!(json.contains("\"failed\": 1"));
    assert!(json.contains("expected 4, got 5"));
}

#[tokio::test]
async fn composite_listener_fans_events_out_to_all_members() {
    let recording = RecordingListener::new();
    let summary_listener = Arc::new(SummaryGeneratingListener::new());
    let members: Vec<Arc<dyn ExecutionListener>> =
        vec![recording.clone(), summary_listener.clone()];
    let composite: Arc<dyn ExecutionListener> = Arc::new(CompositeExecutionListener::new(members));

    run_with(mixed_tree(), composite).await;

    // Both members observed the full run.
    recording.assert_one_pair("root");
    recording.assert_one_pair("failing");
    assert_eq!(summary_listener.summary().total(), 4);
}
