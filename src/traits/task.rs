// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::TaskError;
use crate::record::Record;
use crate::tasks::BaseTask;

/// Sending half of an inter-task channel. Dropping it closes the stream.
pub type RecordSender = mpsc::Sender<Record>;
/// Receiving half of an inter-task channel.
pub type RecordReceiver = mpsc::Receiver<Record>;

/// A node of work in the pipeline.
///
/// The channel shape decides the role: a source gets no input, a sink gets no
/// output, a transform gets both. `run` owns its `output`, so the stream is
/// closed on every return path when the sender is dropped.
#[async_trait]
pub trait Task: Send {
    /// Validates settings and prepares resources before the pipeline starts.
    async fn init(&mut self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Streams records until the input closes, the task's own end condition
    /// is reached, or `cancel` fires.
    async fn run(
        &mut self,
        input: Option<RecordReceiver>,
        output: Option<RecordSender>,
        cancel: CancellationToken,
    ) -> Result<(), TaskError>;

    /// Shared state every task embeds.
    fn base(&self) -> &BaseTask;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn input_count(&self) -> u64 {
        self.base().input_count()
    }

    fn fail_on_error(&self) -> bool {
        self.base().fail_on_error()
    }
}
