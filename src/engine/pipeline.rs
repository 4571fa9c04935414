// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The pipeline scheduler.
//!
//! Every graph edge becomes one bounded channel. A node with more than one
//! downstream writes into a mux that copies records onto each edge; a node
//! with more than one upstream reads from a demux that merges its edges.
//! Each task, mux and demux runs on its own tokio task. When a source returns
//! its sender is dropped, and the close cascades down the graph as every
//! downstream drains and returns in turn.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::consts::MAX_CHANNEL_SIZE;
use crate::dag::{Graph, NodeId};
use crate::engine::demux::run_demux;
use crate::engine::mux::run_mux;
use crate::errors::{GraphError, PipelineError, TaskError, TaskFailure};
use crate::observability::messages::engine::{
    PipelineCompleted, PipelineStarted, TaskFailed, TaskFinished, TaskStarted,
};
use crate::observability::messages::validation::UnusedTask;
use crate::observability::messages::StructuredLog;
use crate::traits::{RecordReceiver, RecordSender, Task};

/// What a clean run reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records received by each task that ran, keyed by task name.
    pub input_counts: BTreeMap<String, u64>,
}

/// A wired-up graph of initialised tasks, ready to run once.
pub struct Pipeline {
    graph: Graph,
    tasks: HashMap<String, Box<dyn Task>>,
    channel_size: usize,
}

impl Pipeline {
    /// Pairs `tasks` with the nodes of `graph`.
    ///
    /// Tasks the graph does not reference are logged and dropped. Every node
    /// must have a task of the same name. `channel_size` is clamped to
    /// `1..=MAX_CHANNEL_SIZE`.
    pub fn new(
        graph: Graph,
        tasks: Vec<Box<dyn Task>>,
        channel_size: usize,
    ) -> Result<Self, PipelineError> {
        let mut by_name = HashMap::with_capacity(tasks.len());
        for task in tasks {
            if !graph.contains(task.name()) {
                UnusedTask { task: task.name() }.log();
                continue;
            }
            by_name.insert(task.name().to_string(), task);
        }

        if let Some(node) = graph.nodes().iter().find(|n| !by_name.contains_key(&n.name)) {
            return Err(GraphError::TaskNotFound(node.name.clone()).into());
        }

        Ok(Self {
            graph,
            tasks: by_name,
            channel_size: channel_size.clamp(1, MAX_CHANNEL_SIZE),
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn channel_size(&self) -> usize {
        self.channel_size
    }

    /// Runs every task until the graph drains.
    ///
    /// The first failure of a `fail_on_error` task cancels the shared token
    /// so that cooperative tasks stop early; the run still waits for every
    /// unit to return. All fatal failures are reported together, sorted by
    /// task name. A panicking task is always fatal.
    ///
    /// Only failures that actually happen are reported. A task that observes
    /// the cancellation returns cleanly, so a second `fail_on_error` task that
    /// would have failed on records it never received is not listed.
    pub async fn run(mut self) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let cancel = CancellationToken::new();
        let failures: Arc<Mutex<Vec<TaskFailure>>> = Arc::new(Mutex::new(Vec::new()));
        let mut wiring = Wiring::new(&self.graph, self.channel_size);

        PipelineStarted {
            task_count: self.graph.len(),
            mux_count: wiring.muxes.len(),
            demux_count: wiring.demuxes.len(),
            channel_size: self.channel_size,
        }
        .log();

        let mut coordinators = JoinSet::new();
        for (task, input, outputs) in wiring.muxes.drain(..) {
            coordinators.spawn(run_mux(task, input, outputs, cancel.clone()));
        }
        for (task, inputs, output) in wiring.demuxes.drain(..) {
            coordinators.spawn(run_demux(task, inputs, output, cancel.clone()));
        }

        let mut units = JoinSet::new();
        for id in 0..self.graph.len() {
            let name = self.graph.node(id).name.clone();
            let Some(task) = self.tasks.remove(&name) else {
                continue;
            };
            let input = wiring.inputs[id].take();
            let output = wiring.outputs[id].take();
            units.spawn(run_unit(
                name,
                task,
                input,
                output,
                cancel.clone(),
                Arc::clone(&failures),
            ));
        }
        drop(wiring);

        let mut summary = RunSummary::default();
        while let Some(joined) = units.join_next().await {
            if let Ok((name, input_count)) = joined {
                summary.input_counts.insert(name, input_count);
            }
        }
        while coordinators.join_next().await.is_some() {}

        let mut failures = std::mem::take(&mut *failures.lock().await);
        failures.sort_by(|a, b| a.task.cmp(&b.task));

        PipelineCompleted {
            task_count: self.graph.len(),
            failed_count: failures.len(),
            duration: started.elapsed(),
        }
        .log();

        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(PipelineError::TasksFailed(failures))
        }
    }
}

/// Channel ends for every node plus the coordinators that own the rest.
struct Wiring {
    inputs: Vec<Option<RecordReceiver>>,
    outputs: Vec<Option<RecordSender>>,
    muxes: Vec<(String, RecordReceiver, Vec<RecordSender>)>,
    demuxes: Vec<(String, Vec<RecordReceiver>, RecordSender)>,
}

impl Wiring {
    fn new(graph: &Graph, channel_size: usize) -> Self {
        let count = graph.len();
        let mut edge_senders: Vec<Vec<RecordSender>> = (0..count).map(|_| Vec::new()).collect();
        let mut edge_receivers: HashMap<(NodeId, NodeId), RecordReceiver> = HashMap::new();

        for (from, node) in graph.nodes().iter().enumerate() {
            for &to in &node.downstream {
                let (tx, rx) = mpsc::channel(channel_size);
                edge_senders[from].push(tx);
                edge_receivers.insert((from, to), rx);
            }
        }

        let mut wiring = Wiring {
            inputs: (0..count).map(|_| None).collect(),
            outputs: (0..count).map(|_| None).collect(),
            muxes: Vec::new(),
            demuxes: Vec::new(),
        };

        for (id, senders) in edge_senders.into_iter().enumerate() {
            let name = graph.node(id).name.clone();
            match senders.len() {
                0 => {}
                1 => wiring.outputs[id] = senders.into_iter().next(),
                _ => {
                    let (tx, rx) = mpsc::channel(channel_size);
                    wiring.outputs[id] = Some(tx);
                    wiring.muxes.push((name, rx, senders));
                }
            }
        }

        for (id, node) in graph.nodes().iter().enumerate() {
            let mut receivers: Vec<RecordReceiver> = node
                .upstream
                .iter()
                .filter_map(|&from| edge_receivers.remove(&(from, id)))
                .collect();
            match receivers.len() {
                0 => {}
                1 => wiring.inputs[id] = receivers.pop(),
                _ => {
                    let (tx, rx) = mpsc::channel(channel_size);
                    wiring.inputs[id] = Some(rx);
                    wiring.demuxes.push((node.name.clone(), receivers, tx));
                }
            }
        }

        wiring
    }
}

/// Runs one task to completion and classifies its outcome.
async fn run_unit(
    name: String,
    mut task: Box<dyn Task>,
    input: Option<RecordReceiver>,
    output: Option<RecordSender>,
    cancel: CancellationToken,
    failures: Arc<Mutex<Vec<TaskFailure>>>,
) -> (String, u64) {
    let started = Instant::now();
    let fail_on_error = task.fail_on_error();
    let span = {
        let message = TaskStarted {
            task: &name,
            has_input: input.is_some(),
            has_output: output.is_some(),
        };
        message.log();
        message.span("run")
    };

    let run_cancel = cancel.clone();
    let handle = tokio::spawn(
        async move {
            let result = task.run(input, output, run_cancel).await;
            (task.input_count(), result)
        }
        .instrument(span),
    );

    match handle.await {
        Ok((input_count, Ok(()))) | Ok((input_count, Err(TaskError::DownstreamClosed))) => {
            TaskFinished {
                task: &name,
                input_count,
                duration: started.elapsed(),
            }
            .log();
            (name, input_count)
        }
        Ok((input_count, Err(error))) => {
            TaskFailed {
                task: &name,
                error: &error,
                fatal: fail_on_error,
            }
            .log();
            if fail_on_error {
                record_failure(&failures, &name, error.to_string()).await;
                cancel.cancel();
            }
            (name, input_count)
        }
        Err(join_error) => {
            TaskFailed {
                task: &name,
                error: &join_error,
                fatal: true,
            }
            .log();
            let message = if join_error.is_panic() {
                "task panicked".to_string()
            } else {
                join_error.to_string()
            };
            record_failure(&failures, &name, message).await;
            cancel.cancel();
            (name, 0)
        }
    }
}

async fn record_failure(failures: &Mutex<Vec<TaskFailure>>, task: &str, message: String) {
    failures.lock().await.push(TaskFailure {
        task: task.to_string(),
        message,
    });
}
