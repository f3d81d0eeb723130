//! The bounded intake queue sitting between the HTTP surface and the batch
//! assembler. A thin wrapper over [`flume::bounded`], the same channel the
//! teacher's runtime uses to move messages between pipeline stages.

use flume::{Receiver, Sender, TrySendError};

use crate::error::Error;

/// One item admitted into the pipeline: a feature row plus the handle the
/// assembler uses to deliver its prediction (or error) back to the caller.
pub struct Ticket {
    /// The request's feature row.
    pub features: Vec<f64>,
    /// Resolved exactly once, by the assembler that consumed this ticket.
    pub respond_to: tokio::sync::oneshot::Sender<Result<f64, Error>>,
}

/// A bounded FIFO of [`Ticket`]s. Cloning an `IntakeQueue` clones the
/// channel handles, not the queue; every clone shares the same backing
/// buffer, matching `flume`'s MPMC semantics.
#[derive(Clone)]
pub struct IntakeQueue {
    tx: Sender<Ticket>,
    rx: Receiver<Ticket>,
}

impl IntakeQueue {
    /// Creates a queue with room for `capacity` outstanding tickets.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = flume::bounded(capacity);
        IntakeQueue { tx, rx }
    }

    /// Current number of tickets sitting in the queue, used by the
    /// admission middleware to compare against the high watermark.
    pub fn size(&self) -> usize {
        self.tx.len()
    }

    /// Queue capacity, as given to [`IntakeQueue::new`].
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }

    /// Attempts to admit `ticket` without waiting. Returns
    /// [`Error::Overloaded`] if the queue is at capacity.
    pub fn offer(&self, ticket: Ticket) -> Result<(), Error> {
        self.tx.try_send(ticket).map_err(|e| match e {
            TrySendError::Full(_) => Error::Overloaded,
            TrySendError::Disconnected(_) => Error::ChannelClosed,
        })
    }

    /// Awaits the next ticket. Used by the assembler's batch-growth loop.
    pub async fn recv_async(&self) -> Result<Ticket, Error> {
        self.rx.recv_async().await.map_err(|_| Error::ChannelClosed)
    }

    /// Drains every ticket currently buffered without blocking, used during
    /// shutdown to resolve stranded callers with [`Error::Cancelled`]
    /// instead of leaving their HTTP handlers hanging.
    pub fn drain(&self) -> Vec<Ticket> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(x: f64) -> (Ticket, tokio::sync::oneshot::Receiver<Result<f64, Error>>) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        (
            Ticket {
                features: vec![x],
                respond_to: tx,
            },
            rx,
        )
    }

    #[test]
    fn offer_respects_capacity() {
        let queue = IntakeQueue::new(1);
        let (t1, _r1) = ticket(1.0);
        let (t2, _r2) = ticket(2.0);
        queue.offer(t1).unwrap();
        let err = queue.offer(t2).unwrap_err();
        assert!(matches!(err, Error::Overloaded));
        assert_eq!(queue.size(), 1);
    }

    #[tokio::test]
    async fn recv_returns_in_fifo_order() {
        let queue = IntakeQueue::new(4);
        let (t1, _r1) = ticket(1.0);
        let (t2, _r2) = ticket(2.0);
        queue.offer(t1).unwrap();
        queue.offer(t2).unwrap();
        let first = queue.recv_async().await.unwrap();
        assert_eq!(first.features, vec![1.0]);
        let second = queue.recv_async().await.unwrap();
        assert_eq!(second.features, vec![2.0]);
    }

    #[test]
    fn drain_empties_queue() {
        let queue = IntakeQueue::new(4);
        let (t1, _r1) = ticket(1.0);
        let (t2, _r2) = ticket(2.0);
        queue.offer(t1).unwrap();
        queue.offer(t2).unwrap();
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(queue.size(), 0);
    }
}
