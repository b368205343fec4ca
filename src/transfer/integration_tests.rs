//! Integration Tests for the transfer engine
//!
//! Drive validation, execution, id allocation and notification end to end
//! against the in-memory bank. No database required.

#[cfg(test)]
mod integration_tests {
    use chrono::{Duration, NaiveDate};
    use rust_decimal::Decimal;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::account::models::{Customer, LinkedUser};
    use crate::clock::ManualClock;
    use crate::ledger::{FaultPoint, MemoryBank};
    use crate::notification::mock::RecordingNotifier;
    use crate::notification::queue::NotificationQueue;
    use crate::sequence::{InProcessDailySequence, PersistedDailySequence, TransactionIdSource};
    use crate::transfer::engine::TransferEngine;
    use crate::transfer::error::TransferError;
    use crate::transfer::state::TransferState;
    use crate::transfer::types::{RejectCode, TransferRequest};
    use crate::transfer::validation::MSG_SENDER_DEACTIVATED;

    const ALICE: &str = "1000000001";
    const BOB: &str = "2000000002";
    const CAROL: &str = "3000000003";
    const ALICE_PIN: &str = "482913";

    fn money(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    struct TestHarness {
        bank: MemoryBank,
        clock: Arc<ManualClock>,
    }

    impl TestHarness {
        async fn new(alice: Decimal, bob: Decimal) -> Self {
            let bank = MemoryBank::new();
            for (id, name, email, pin) in [
                ("CUST_1", "Alice", "alice@example.com", ALICE_PIN),
                ("CUST_2", "Bob", "bob@example.com", "111111"),
                ("CUST_3", "Carol", "carol@example.com", "222222"),
            ] {
                bank.add_customer(Customer {
                    customer_id: id.into(),
                    name: name.into(),
                    email: email.into(),
                    customer_pin: pin.into(),
                })
                .await;
            }
            bank.add_user(LinkedUser {
                user_id: "USER_1".into(),
                email: "alice@example.com".into(),
                active: true,
            })
            .await;
            bank.open_account("CUST_1", ALICE, alice).await;
            bank.open_account("CUST_2", BOB, bob).await;
            bank.open_account("CUST_3", CAROL, money(0)).await;

            Self {
                bank,
                clock: Arc::new(ManualClock::at_date(day())),
            }
        }

        fn engine_with(
            &self,
            ids: Arc<dyn TransactionIdSource>,
            notifications: NotificationQueue,
        ) -> TransferEngine {
            TransferEngine::builder(Arc::new(self.bank.clone()), Arc::new(self.bank.clone()))
                .with_id_source(ids)
                .with_clock(self.clock.clone())
                .with_notifications(notifications)
                .build()
        }

        fn engine(&self) -> TransferEngine {
            self.engine_with(
                Arc::new(PersistedDailySequence::new("TXN_")),
                NotificationQueue::disabled(),
            )
        }

        async fn total(&self) -> Decimal {
            let mut sum = Decimal::ZERO;
            for number in [ALICE, BOB, CAROL] {
                sum += self.bank.balance(number).await.unwrap();
            }
            sum
        }
    }

    fn alice_to_bob(amount: Decimal) -> TransferRequest {
        TransferRequest::new(ALICE, BOB, amount, ALICE_PIN).with_description("rent")
    }

    // ========================================================================
    // Happy Path Tests
    // ========================================================================

    #[tokio::test]
    async fn test_transfer_moves_funds_and_records_transaction() {
        let h = TestHarness::new(money(500000), money(200000)).await;
        let engine = h.engine();

        let receipt = engine
            .submit_transfer(&alice_to_bob(money(100000)))
            .await
            .unwrap();

        assert_eq!(receipt.state, TransferState::Committed);
        assert_eq!(receipt.transaction_id.as_str(), "TXN_20240115001");
        assert_eq!(h.bank.balance(ALICE).await, Some(money(400000)));
        assert_eq!(h.bank.balance(BOB).await, Some(money(300000)));

        let history = engine.list_transactions_for_account(ALICE).await.unwrap();
        assert_eq!(history.len(), 1);
        let txn = &history[0];
        assert_eq!(txn.transaction_id, receipt.transaction_id);
        assert_eq!(txn.account_id, "ACC_1");
        assert_eq!(txn.sender_account_number, ALICE);
        assert_eq!(txn.receiver_account_number, BOB);
        assert_eq!(txn.amount, money(100000));
        assert_eq!(txn.description.as_deref(), Some("rent"));
    }

    #[tokio::test]
    async fn test_exact_balance_drains_to_zero() {
        let h = TestHarness::new(money(25000), money(0)).await;
        let engine = h.engine();

        engine.submit_transfer(&alice_to_bob(money(25000))).await.unwrap();
        assert_eq!(h.bank.balance(ALICE).await, Some(money(0)));
    }

    #[tokio::test]
    async fn test_ids_increase_within_a_day_and_reset_next_day() {
        let h = TestHarness::new(money(100000), money(0)).await;
        let engine = h.engine();

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(
                engine
                    .submit_transfer(&alice_to_bob(money(100)))
                    .await
                    .unwrap()
                    .transaction_id,
            );
        }
        assert_eq!(
            ids.iter().map(|i| i.as_str()).collect::<Vec<_>>(),
            vec!["TXN_20240115001", "TXN_20240115002", "TXN_20240115003"]
        );

        h.clock.advance(Duration::days(1));
        let next = engine
            .submit_transfer(&alice_to_bob(money(100)))
            .await
            .unwrap();
        assert_eq!(next.transaction_id.as_str(), "TXN_20240116001");
    }

    #[tokio::test]
    async fn test_history_is_most_recent_first_for_both_sides() {
        let h = TestHarness::new(money(100000), money(100000)).await;
        let engine = h.engine();

        let first = engine
            .submit_transfer(&alice_to_bob(money(1000)))
            .await
            .unwrap();
        h.clock.advance(Duration::minutes(5));
        let second = engine
            .submit_transfer(&TransferRequest::new(BOB, ALICE, money(500), "111111"))
            .await
            .unwrap();
        h.clock.advance(Duration::minutes(5));
        engine
            .submit_transfer(&TransferRequest::new(BOB, CAROL, money(200), "111111"))
            .await
            .unwrap();

        let history = engine.list_transactions_for_account(ALICE).await.unwrap();
        let ids: Vec<_> = history.iter().map(|t| t.transaction_id.clone()).collect();
        assert_eq!(ids, vec![second.transaction_id, first.transaction_id]);

        assert_eq!(engine.list_all_transactions().await.unwrap().len(), 3);
        assert!(
            engine
                .list_transactions_for_account("9999999999")
                .await
                .unwrap()
                .is_empty()
        );
    }

    // ========================================================================
    // Rejection Tests
    // ========================================================================

    #[tokio::test]
    async fn test_insufficient_balance_changes_nothing() {
        let h = TestHarness::new(money(50000), money(0)).await;
        let engine = h.engine();

        let err = engine
            .submit_transfer(&alice_to_bob(money(100000)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientBalance {
                available: money(50000),
                required: money(100000),
            }
        );
        assert_eq!(err.http_status(), 409);
        assert_eq!(h.bank.balance(ALICE).await, Some(money(50000)));
        assert_eq!(h.bank.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_one_cent_over_balance_fails() {
        let h = TestHarness::new(money(25000), money(0)).await;
        let engine = h.engine();

        let err = engine
            .submit_transfer(&alice_to_bob(money(25001)))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn test_self_transfer_rejected_before_any_mutation() {
        let h = TestHarness::new(money(10000), money(0)).await;
        let engine = h.engine();

        let outcome = engine
            .validate_transfer(Some(&TransferRequest::new(
                ALICE, ALICE, money(100), ALICE_PIN,
            )))
            .await;
        assert_eq!(outcome.error_code(), Some(RejectCode::SameAccount));

        let err = engine
            .submit_transfer(&TransferRequest::new(ALICE, ALICE, money(100), ALICE_PIN))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Validation(_)));
        assert_eq!(h.bank.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_deactivated_sender_reported_before_balance() {
        let h = TestHarness::new(money(100), money(0)).await;
        h.bank.set_account_status(ALICE, "DEACTIVATED").await;
        let engine = h.engine();

        let err = engine
            .submit_transfer(&alice_to_bob(money(100000)))
            .await
            .unwrap_err();
        assert_eq!(err, TransferError::Deactivated(MSG_SENDER_DEACTIVATED.into()));
        assert_eq!(err.http_status(), 403);
    }

    #[tokio::test]
    async fn test_executor_rechecks_status_at_execution_time() {
        let h = TestHarness::new(money(10000), money(0)).await;
        let engine = h.engine();

        let validated = engine
            .validate_transfer(Some(&alice_to_bob(money(100))))
            .await
            .into_result()
            .unwrap();

        // Receiver closed between validation and execution
        h.bank.set_account_status(BOB, "CLOSED").await;

        let err = engine.execute_transfer(&validated).await.unwrap_err();
        assert!(matches!(err, TransferError::Deactivated(_)));
        assert_eq!(h.bank.balance(ALICE).await, Some(money(10000)));
    }

    // ========================================================================
    // Atomicity Tests
    // ========================================================================

    #[tokio::test]
    async fn test_fault_at_any_step_leaves_no_trace() {
        for point in [
            FaultPoint::Begin,
            FaultPoint::LockAccount,
            FaultPoint::NextOrdinal,
            FaultPoint::InsertTransaction,
            FaultPoint::Debit,
            FaultPoint::Credit,
            FaultPoint::Commit,
        ] {
            let h = TestHarness::new(money(500000), money(200000)).await;
            let engine = h.engine();
            let before = h.total().await;

            h.bank.fail_next(point);
            let err = engine
                .submit_transfer(&alice_to_bob(money(100000)))
                .await
                .unwrap_err();

            assert!(
                matches!(err, TransferError::SystemFailure(_)),
                "{:?}: {:?}",
                point,
                err
            );
            assert_eq!(h.bank.balance(ALICE).await, Some(money(500000)), "{:?}", point);
            assert_eq!(h.bank.balance(BOB).await, Some(money(200000)), "{:?}", point);
            assert_eq!(h.bank.transaction_count().await, 0, "{:?}", point);
            assert_eq!(h.total().await, before);

            // The aborted attempt consumed no ordinal
            let receipt = engine
                .submit_transfer(&alice_to_bob(money(100000)))
                .await
                .unwrap();
            assert_eq!(receipt.transaction_id.as_str(), "TXN_20240115001", "{:?}", point);
        }
    }

    #[tokio::test]
    async fn test_in_process_sequence_resumes_after_restart() {
        let h = TestHarness::new(money(100000), money(0)).await;

        let first_run = h.engine_with(
            Arc::new(InProcessDailySequence::new("TXN_")),
            NotificationQueue::disabled(),
        );
        for _ in 0..2 {
            first_run
                .submit_transfer(&alice_to_bob(money(100)))
                .await
                .unwrap();
        }
        drop(first_run);

        // Fresh counter, same store
        let second_run = h.engine_with(
            Arc::new(InProcessDailySequence::new("TXN_")),
            NotificationQueue::disabled(),
        );
        let receipt = second_run
            .submit_transfer(&alice_to_bob(money(100)))
            .await
            .unwrap();
        assert_eq!(receipt.transaction_id.as_str(), "TXN_20240115003");
    }

    // ========================================================================
    // Concurrency Tests
    // ========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_debits_never_overdraw() {
        let h = TestHarness::new(money(15000), money(0)).await;
        let engine = Arc::new(h.engine());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.submit_transfer(&alice_to_bob(money(10000))).await })
            })
            .collect();

        let mut ok = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(TransferError::InsufficientBalance { .. }) => insufficient += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(insufficient, 1);
        assert_eq!(h.bank.balance(ALICE).await, Some(money(5000)));
        assert_eq!(h.bank.balance(BOB).await, Some(money(10000)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_conserve_funds_with_unique_ids() {
        let h = TestHarness::new(money(1000000), money(1000000)).await;
        let engine = Arc::new(h.engine());
        let before = h.total().await;

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let request = if i % 2 == 0 {
                        TransferRequest::new(ALICE, BOB, money(1000 + i), ALICE_PIN)
                    } else {
                        TransferRequest::new(BOB, ALICE, money(700 + i), "111111")
                    };
                    engine.submit_transfer(&request).await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().transaction_id);
        }

        let unique: HashSet<_> = ids.iter().cloned().collect();
        assert_eq!(unique.len(), 40);
        assert_eq!(h.total().await, before);

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted.first().unwrap().as_str(), "TXN_20240115001");
        assert_eq!(sorted.last().unwrap().as_str(), "TXN_20240115040");
    }

    // ========================================================================
    // Notification Tests
    // ========================================================================

    #[tokio::test]
    async fn test_notices_sent_to_both_parties() {
        let h = TestHarness::new(money(500000), money(200000)).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, worker) = NotificationQueue::spawn(notifier.clone(), 16);
        let engine = h.engine_with(Arc::new(PersistedDailySequence::new("TXN_")), queue);

        let receipt = engine
            .submit_transfer(&alice_to_bob(money(100000)))
            .await
            .unwrap();
        drop(engine);
        let stats = worker.await.unwrap();

        assert_eq!(stats.notified, 1);
        let debit = &notifier.debits()[0];
        assert_eq!(debit.transaction_id, receipt.transaction_id);
        assert_eq!(debit.customer_id, "CUST_1");
        assert_eq!(debit.balance_after, money(400000));
        let credit = &notifier.credits()[0];
        assert_eq!(credit.customer_id, "CUST_2");
        assert_eq!(credit.counterparty_account_number, ALICE);
        assert_eq!(credit.balance_after, money(300000));
    }

    #[tokio::test]
    async fn test_failing_notifier_does_not_fail_transfer() {
        let h = TestHarness::new(money(500000), money(200000)).await;
        let notifier = Arc::new(RecordingNotifier::failing());
        let (queue, worker) = NotificationQueue::spawn(notifier, 16);
        let engine = h.engine_with(Arc::new(PersistedDailySequence::new("TXN_")), queue);

        let receipt = engine.submit_transfer(&alice_to_bob(money(100000))).await;
        assert!(receipt.is_ok());
        assert_eq!(h.bank.balance(BOB).await, Some(money(300000)));

        drop(engine);
        let stats = worker.await.unwrap();
        assert_eq!(stats.notify_failed, 1);
    }

    #[tokio::test]
    async fn test_no_notices_for_rejected_transfer() {
        let h = TestHarness::new(money(100), money(0)).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, worker) = NotificationQueue::spawn(notifier.clone(), 16);
        let engine = h.engine_with(Arc::new(PersistedDailySequence::new("TXN_")), queue);

        assert!(engine.submit_transfer(&alice_to_bob(money(100000))).await.is_err());
        drop(engine);
        worker.await.unwrap();

        assert!(notifier.debits().is_empty());
    }
}
