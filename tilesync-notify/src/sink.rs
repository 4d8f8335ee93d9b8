//! Delivery sinks: where a channel hands its flushed batches.
//!
//! The transport behind a sink (socket, IPC, in-process viewer) is not
//! this crate's concern. Sinks are called on the document thread and must
//! not block.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::mpsc;

use crate::protocol::FlushedBatch;

pub trait DeliverySink {
    fn deliver(&mut self, batch: FlushedBatch);
}

impl<F> DeliverySink for F
where
    F: FnMut(FlushedBatch),
{
    fn deliver(&mut self, batch: FlushedBatch) {
        self(batch)
    }
}

/// Collects batches in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    batches: Rc<RefCell<Vec<FlushedBatch>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything collected so far.
    pub fn take(&self) -> Vec<FlushedBatch> {
        std::mem::take(&mut *self.batches.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.batches.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.borrow().is_empty()
    }
}

impl DeliverySink for CollectingSink {
    fn deliver(&mut self, batch: FlushedBatch) {
        self.batches.borrow_mut().push(batch);
    }
}

/// Forwards batches to an async transport task.
#[derive(Debug, Clone)]
pub struct MpscSink {
    sender: mpsc::UnboundedSender<FlushedBatch>,
}

impl MpscSink {
    pub fn new(sender: mpsc::UnboundedSender<FlushedBatch>) -> Self {
        Self { sender }
    }

    /// A sink plus the receiver the transport task reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FlushedBatch>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DeliverySink for MpscSink {
    fn deliver(&mut self, batch: FlushedBatch) {
        let viewer = batch.viewer;
        if self.sender.send(batch).is_err() {
            log::debug!("Transport for viewer {viewer} closed, batch dropped");
        }
    }
}
