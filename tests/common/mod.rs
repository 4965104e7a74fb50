// Shared test helpers: a closure-driven node fixture and a listener that
// records every event for later assertions.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use hierarchy_runner::core::context::ExecutionContext;
use hierarchy_runner::core::listener::ExecutionListener;
use hierarchy_runner::core::models::{ReportEntry, SkipDecision, TestExecutionResult};
use hierarchy_runner::core::node::{ExecutionMode, NodeType, TestNode};
use hierarchy_runner::core::resources::ExclusiveResource;

type SyncHook = Arc<dyn Fn() -> Result<()> + Send + Sync>;
type AsyncHook = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A configurable node for building test trees without a discovery layer.
pub struct StubNode {
    name: String,
    node_type: NodeType,
    mode: ExecutionMode,
    resources: Vec<ExclusiveResource>,
    children: Vec<Arc<dyn TestNode>>,
    skip_reason: Option<String>,
    report_entries: Vec<(String, String)>,
    on_before: Option<SyncHook>,
    on_execute: Option<AsyncHook>,
    on_after: Option<SyncHook>,
}

impl StubNode {
    pub fn test(name: &str) -> Self {
        Self::with_type(name, NodeType::Test)
    }

    pub fn container(name: &str) -> Self {
        Self::with_type(name, NodeType::Container)
    }

    fn with_type(name: &str, node_type: NodeType) -> Self {
        StubNode {
            name: name.to_string(),
            node_type,
            mode: ExecutionMode::Concurrent,
            resources: Vec::new(),
            children: Vec::new(),
            skip_reason: None,
            report_entries: Vec::new(),
            on_before: None,
            on_execute: None,
            on_after: None,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_resource(mut self, resource: ExclusiveResource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_child(mut self, child: Arc<dyn TestNode>) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_skip(mut self, reason: &str) -> Self {
        self.skip_reason = Some(reason.to_string());
        self
    }

    pub fn with_report_entry(mut self, key: &str, value: &str) -> Self {
        self.report_entries.push((key.to_string(), value.to_string()));
        self
    }

    pub fn on_before<F: Fn() -> Result<()> + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.on_before = Some(Arc::new(hook));
        self
    }

    pub fn on_after<F: Fn() -> Result<()> + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.on_after = Some(Arc::new(hook));
        self
    }

    pub fn on_execute<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_execute = Some(Arc::new(move || hook().boxed()));
        self
    }

    pub fn build(self) -> Arc<dyn TestNode> {
        Arc::new(self)
    }
}

#[async_trait]
impl TestNode for StubNode {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn node_type(&self) -> NodeType {
        self.node_type
    }

    fn children(&self) -> Vec<Arc<dyn TestNode>> {
        self.children.clone()
    }

    fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }

    fn exclusive_resources(&self) -> Vec<ExclusiveResource> {
        self.resources.clone()
    }

    async fn should_be_skipped(&self, _context: &ExecutionContext) -> Result<SkipDecision> {
        Ok(match &self.skip_reason {
            Some(reason) => SkipDecision::skip(reason.clone()),
            None => SkipDecision::do_not_skip(),
        })
    }

    async fn before(&self, context: ExecutionContext) -> Result<ExecutionContext> {
        if let Some(hook) = &self.on_before {
            hook()?;
        }
        Ok(context)
    }

    async fn execute(&self, context: ExecutionContext) -> Result<ExecutionContext> {
        for (key, value) in &self.report_entries {
            context.publish_report_entry(self, &ReportEntry::single(key.clone(), value.clone()));
        }
        if let Some(hook) = &self.on_execute {
            hook().await?;
        }
        Ok(context)
    }

    async fn after(&self, _context: &ExecutionContext) -> Result<()> {
        if let Some(hook) = &self.on_after {
            hook()?;
        }
        Ok(())
    }
}

/// One observed listener event, identified by node name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(String),
    Finished(String, Status),
    Reported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Successful,
    Failed,
    Skipped,
    Aborted,
}

impl Status {
    fn of(result: &TestExecutionResult) -> Self {
        match result {
            TestExecutionResult::Successful => Status::Successful,
            TestExecutionResult::Failed { .. } => Status::Failed,
            TestExecutionResult::Skipped { .. } => Status::Skipped,
            TestExecutionResult::Aborted { .. } => Status::Aborted,
        }
    }
}

/// Records every event, in arrival order, for later inspection.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingListener::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Position of the started event for `name`, if observed.
    pub fn started_index(&self, name: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|event| matches!(event, Event::Started(n) if n == name))
    }

    /// Position of the finished event for `name`, if observed.
    pub fn finished_index(&self, name: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|event| matches!(event, Event::Finished(n, _) if n == name))
    }

    /// The finished status reported for `name`, if observed.
    pub fn status_of(&self, name: &str) -> Option<Status> {
        self.events().iter().find_map(|event| match event {
            Event::Finished(n, status) if n == name => Some(*status),
            _ => None,
        })
    }

    /// Asserts that the child's whole event pair is nested strictly
    /// between the parent's started and finished events.
    pub fn assert_nested(&self, parent: &str, child: &str) {
        let parent_start = self.started_index(parent).expect("parent started");
        let parent_finish = self.finished_index(parent).expect("parent finished");
        let child_start = self.started_index(child).expect("child started");
        let child_finish = self.finished_index(child).expect("child finished");
        assert!(
            parent_start < child_start && child_finish < parent_finish,
            "events of {child} not nested in {parent}: {:?}",
            self.events()
        );
    }

    /// Asserts that exactly one started and one finished event were seen
    /// for `name`, in that order.
    pub fn assert_one_pair(&self, name: &str) {
        let events = self.events();
        let starts = events
            .iter()
            .filter(|event| matches!(event, Event::Started(n) if n == name))
            .count();
        let finishes = events
            .iter()
            .filter(|event| matches!(event, Event::Finished(n, _) if n == name))
            .count();
        assert_eq!(starts, 1, "expected one started event for {name}");
        assert_eq!(finishes, 1, "expected one finished event for {name}");
        assert!(
            self.started_index(name).unwrap() < self.finished_index(name).unwrap(),
            "finished before started for {name}"
        );
    }
}

impl ExecutionListener for RecordingListener {
    fn execution_started(&self, node: &dyn TestNode) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Started(node.display_name().to_string()));
    }

    fn execution_finished(&self, node: &dyn TestNode, result: &TestExecutionResult) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Finished(
                node.display_name().to_string(),
                Status::of(result),
            ));
    }

    fn report_entry_published(&self, node: &dyn TestNode, _entry: &ReportEntry) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Reported(node.display_name().to_string()));
    }
}
