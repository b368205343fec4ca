//! Bounded notice queue drained by a background task

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{NotificationDispatcher, TransferNotice};
use crate::transfer::state::TransferState;

/// Debit and credit notice for one committed transfer
#[derive(Debug, Clone)]
pub struct NoticePair {
    pub debit: TransferNotice,
    pub credit: TransferNotice,
}

/// Totals reported by the worker when the queue closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub notified: u64,
    pub notify_failed: u64,
}

/// Producer side. Enqueueing never waits: a full queue drops the notice.
#[derive(Clone, Default)]
pub struct NotificationQueue {
    tx: Option<mpsc::Sender<NoticePair>>,
}

impl NotificationQueue {
    /// Start the delivery task. It runs until every queue clone is dropped.
    pub fn spawn(
        dispatcher: Arc<dyn NotificationDispatcher>,
        capacity: usize,
    ) -> (Self, JoinHandle<DispatchStats>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(dispatcher, rx));
        (Self { tx: Some(tx) }, handle)
    }

    /// Queue that discards everything
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Returns false if the pair was dropped
    pub fn enqueue(&self, pair: NoticePair) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };

        match tx.try_send(pair) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(pair)) => {
                warn!(
                    transaction_id = %pair.debit.transaction_id,
                    "Notification queue full, notices dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(pair)) => {
                warn!(
                    transaction_id = %pair.debit.transaction_id,
                    "Notification worker stopped, notices dropped"
                );
                false
            }
        }
    }
}

async fn run_worker(
    dispatcher: Arc<dyn NotificationDispatcher>,
    mut rx: mpsc::Receiver<NoticePair>,
) -> DispatchStats {
    info!(dispatcher = dispatcher.name(), "Notification worker started");
    let mut stats = DispatchStats::default();

    while let Some(pair) = rx.recv().await {
        // A panicking dispatcher costs this pair only, not the worker
        let delivery = AssertUnwindSafe(async {
            futures::join!(
                dispatcher.notify_debit(&pair.debit),
                dispatcher.notify_credit(&pair.credit)
            )
        })
        .catch_unwind()
        .await;

        let Ok((debit, credit)) = delivery else {
            error!(
                transaction_id = %pair.debit.transaction_id,
                "Notification dispatcher panicked"
            );
            stats.notify_failed += 1;
            continue;
        };

        let next = if debit.is_ok() && credit.is_ok() {
            TransferState::Notified
        } else {
            TransferState::NotifyFailed
        };
        let state = TransferState::Committed.transition(next).unwrap_or(next);

        if let Err(e) = &debit {
            warn!(
                transaction_id = %pair.debit.transaction_id,
                customer_id = %pair.debit.customer_id,
                error = %e,
                "Debit notice failed"
            );
        }
        if let Err(e) = &credit {
            warn!(
                transaction_id = %pair.credit.transaction_id,
                customer_id = %pair.credit.customer_id,
                error = %e,
                "Credit notice failed"
            );
        }

        match state {
            TransferState::Notified => stats.notified += 1,
            _ => stats.notify_failed += 1,
        }
        debug!(transaction_id = %pair.debit.transaction_id, state = %state, "Notices processed");
    }

    info!(
        notified = stats.notified,
        notify_failed = stats.notify_failed,
        "Notification worker stopped"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationError;
    use crate::notification::mock::RecordingNotifier;
    use async_trait::async_trait;
    use crate::sequence::TransactionId;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn pair(id: &str) -> NoticePair {
        let notice = TransferNotice {
            transaction_id: TransactionId::from_stored(id),
            customer_id: "CUST_1".into(),
            account_number: "1111111111".into(),
            counterparty_account_number: "2222222222".into(),
            amount: Decimal::new(10000, 2),
            balance_after: Decimal::new(40000, 2),
            occurred_at: Utc::now(),
        };
        NoticePair {
            debit: notice.clone(),
            credit: notice,
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_and_counts() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, handle) = NotificationQueue::spawn(notifier.clone(), 8);

        assert!(queue.enqueue(pair("TXN_20240115001")));
        assert!(queue.enqueue(pair("TXN_20240115002")));
        drop(queue);

        let stats = handle.await.unwrap();
        assert_eq!(stats.notified, 2);
        assert_eq!(stats.notify_failed, 0);
        assert_eq!(notifier.debits().len(), 2);
        assert_eq!(notifier.credits().len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_raised() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let (queue, handle) = NotificationQueue::spawn(notifier, 8);

        assert!(queue.enqueue(pair("TXN_20240115001")));
        drop(queue);

        let stats = handle.await.unwrap();
        assert_eq!(stats.notify_failed, 1);
    }

    #[test]
    fn test_disabled_queue_drops() {
        let queue = NotificationQueue::disabled();
        assert!(!queue.is_enabled());
        assert!(!queue.enqueue(pair("TXN_20240115001")));
    }

    /// Panics on one transaction id, records everything else
    struct PanicsOn {
        poison: &'static str,
        inner: RecordingNotifier,
    }

    #[async_trait]
    impl NotificationDispatcher for PanicsOn {
        fn name(&self) -> &'static str {
            "panics-on"
        }

        async fn notify_debit(&self, notice: &TransferNotice) -> Result<(), NotificationError> {
            if notice.transaction_id.as_str() == self.poison {
                panic!("template rendering blew up");
            }
            self.inner.notify_debit(notice).await
        }

        async fn notify_credit(&self, notice: &TransferNotice) -> Result<(), NotificationError> {
            self.inner.notify_credit(notice).await
        }
    }

    #[tokio::test]
    async fn test_worker_survives_dispatcher_panic() {
        let notifier = Arc::new(PanicsOn {
            poison: "TXN_20240115001",
            inner: RecordingNotifier::default(),
        });
        let (queue, handle) = NotificationQueue::spawn(notifier.clone(), 8);

        assert!(queue.enqueue(pair("TXN_20240115001")));
        assert!(queue.enqueue(pair("TXN_20240115002")));
        drop(queue);

        let stats = handle.await.unwrap();
        assert_eq!(stats.notify_failed, 1);
        assert_eq!(stats.notified, 1);
        assert_eq!(notifier.inner.debits().len(), 1);
        assert_eq!(
            notifier.inner.debits()[0].transaction_id.as_str(),
            "TXN_20240115002"
        );
    }
}
