// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio_util::sync::CancellationToken;

use crate::observability::messages::engine::CoordinatorClosed;
use crate::observability::messages::StructuredLog;
use crate::traits::{RecordReceiver, RecordSender};

/// Fan-out: copies every record from `input` to each of `outputs`.
///
/// Each downstream gets its own `meta` and `context` maps; the payload buffer
/// is shared. A downstream that hangs up is dropped from the set and the rest
/// keep receiving. Returns the number of records read.
pub(crate) async fn run_mux(
    task: String,
    mut input: RecordReceiver,
    mut outputs: Vec<RecordSender>,
    cancel: CancellationToken,
) -> u64 {
    let mut records = 0u64;

    while !outputs.is_empty() {
        let record = tokio::select! {
            _ = cancel.cancelled() => break,
            record = input.recv() => record,
        };
        let Some(record) = record else {
            break;
        };
        records += 1;

        let mut open = Vec::with_capacity(outputs.len());
        for output in outputs {
            let sent = tokio::select! {
                _ = cancel.cancelled() => false,
                sent = output.send(record.clone()) => sent.is_ok(),
            };
            if sent {
                open.push(output);
            }
        }
        outputs = open;
    }

    CoordinatorClosed {
        kind: "mux",
        task: &task,
        records,
    }
    .log();
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_each_downstream_gets_every_record_in_order() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (a_tx, mut a_rx) = mpsc::channel(8);
        let (b_tx, mut b_rx) = mpsc::channel(8);

        for i in 0..3 {
            in_tx.send(Record::new(i, "src", format!("r{}", i))).await.unwrap();
        }
        drop(in_tx);

        let read = run_mux("src".into(), in_rx, vec![a_tx, b_tx], CancellationToken::new()).await;
        assert_eq!(read, 3);

        for rx in [&mut a_rx, &mut b_rx] {
            let mut ids = Vec::new();
            while let Some(r) = rx.recv().await {
                ids.push(r.id);
            }
            assert_eq!(ids, vec![0, 1, 2]);
        }
    }

    #[tokio::test]
    async fn test_copies_are_independent() {
        let (in_tx, in_rx) = mpsc::channel(1);
        let (a_tx, mut a_rx) = mpsc::channel(1);
        let (b_tx, mut b_rx) = mpsc::channel(1);

        let mut record = Record::new(0, "src", "payload");
        record.context.insert("k".into(), "v".into());
        in_tx.send(record).await.unwrap();
        drop(in_tx);
        run_mux("src".into(), in_rx, vec![a_tx, b_tx], CancellationToken::new()).await;

        let mut a = a_rx.recv().await.unwrap();
        let b = b_rx.recv().await.unwrap();
        a.context.insert("k".into(), "changed".into());
        assert_eq!(b.context.get("k").map(String::as_str), Some("v"));
        assert_eq!(a.data.as_ptr(), b.data.as_ptr());
    }

    #[tokio::test]
    async fn test_closed_downstream_is_dropped() {
        let (in_tx, in_rx) = mpsc::channel(4);
        let (a_tx, a_rx) = mpsc::channel(4);
        let (b_tx, mut b_rx) = mpsc::channel(4);
        drop(a_rx);

        in_tx.send(Record::new(0, "src", "x")).await.unwrap();
        in_tx.send(Record::new(1, "src", "y")).await.unwrap();
        drop(in_tx);

        let read = run_mux("src".into(), in_rx, vec![a_tx, b_tx], CancellationToken::new()).await;
        assert_eq!(read, 2);
        assert_eq!(b_rx.recv().await.map(|r| r.id), Some(0));
        assert_eq!(b_rx.recv().await.map(|r| r.id), Some(1));
    }
}
