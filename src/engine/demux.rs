// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::observability::messages::engine::CoordinatorClosed;
use crate::observability::messages::StructuredLog;
use crate::traits::{RecordReceiver, RecordSender};

/// Fan-in: merges every record from `inputs` into `output`.
///
/// One reader runs per input; ordering across inputs is not defined. The
/// output closes once every reader has finished. Returns the number of
/// records forwarded.
pub(crate) async fn run_demux(
    task: String,
    inputs: Vec<RecordReceiver>,
    output: RecordSender,
    cancel: CancellationToken,
) -> u64 {
    let records = Arc::new(AtomicU64::new(0));
    let mut readers = JoinSet::new();

    for mut input in inputs {
        let output = output.clone();
        let cancel = cancel.clone();
        let records = Arc::clone(&records);
        readers.spawn(async move {
            loop {
                let record = tokio::select! {
                    _ = cancel.cancelled() => return,
                    record = input.recv() => record,
                };
                let Some(record) = record else {
                    return;
                };
                if output.send(record).await.is_err() {
                    return;
                }
                records.fetch_add(1, Ordering::Relaxed);
            }
        });
    }
    drop(output);

    while readers.join_next().await.is_some() {}

    let records = records.load(Ordering::Relaxed);
    CoordinatorClosed {
        kind: "demux",
        task: &task,
        records,
    }
    .log();
    records
}
