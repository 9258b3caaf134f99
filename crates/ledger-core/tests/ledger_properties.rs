use contracts::{CommissionDetail, EntryKind, EntryStatus, PlatformConfig};
use ledger_core::commission::{commission_amount, plan_cascade};
use ledger_core::store::{NewEntry, SqliteLedgerStore};
use ledger_core::StoreError;
use proptest::prelude::*;

fn credit(user_id: &str, amount: i64, kind: EntryKind, source_ref_id: &str) -> NewEntry {
    NewEntry {
        user_id: user_id.to_string(),
        amount,
        kind,
        source_ref_id: source_ref_id.to_string(),
        status: EntryStatus::Vested,
        description: String::new(),
        commission: None,
        created_at: 1_700_000_000,
        vested_at: Some(1_700_000_000),
    }
}

#[test]
fn balance_components_split_vested_pending_and_net() {
    let mut store = SqliteLedgerStore::open_in_memory().expect("store");

    store
        .append(&credit("u1", 40, EntryKind::TaskCompletion, "task:a:a1"))
        .expect("vested credit");
    store
        .append(&NewEntry {
            status: EntryStatus::Pending,
            vested_at: None,
            ..credit("u1", 25, EntryKind::TaskCompletion, "task:b:a1")
        })
        .expect("pending credit");
    store
        .append(&credit("u1", -15, EntryKind::WithdrawalDebit, "wd:000001"))
        .expect("debit");

    let components = store.balance_components("u1").expect("components");
    assert_eq!(components.vested_credits, 40);
    assert_eq!(components.pending_credits, 25);
    assert_eq!(components.vested_net, 25);
}

#[test]
fn reversed_entries_drop_out_of_every_aggregate() {
    let mut store = SqliteLedgerStore::open_in_memory().expect("store");

    let entry_id = store
        .append(&credit("u1", 40, EntryKind::TaskCompletion, "task:a:a1"))
        .expect("credit");
    store.reverse(entry_id).expect("reverse");

    let components = store.balance_components("u1").expect("components");
    assert_eq!(components.vested_credits, 0);
    assert_eq!(components.vested_net, 0);

    let (entries, total) = store.list_by_user("u1", 0, 10).expect("list");
    assert_eq!(total, 1);
    assert_eq!(entries[0].status, EntryStatus::Reversed);
}

#[test]
fn commission_stats_count_distinct_earners() {
    let mut store = SqliteLedgerStore::open_in_memory().expect("store");

    for (earner, origin, amount) in [("u4", "task:a:a1", 5), ("u4", "task:b:a1", 7), ("u5", "task:a:a1", 3)] {
        store
            .append(&NewEntry {
                commission: Some(CommissionDetail {
                    from_user_id: earner.to_string(),
                    level: 1,
                    percent: 50,
                    original_amount: amount * 2,
                }),
                ..credit(
                    "u1",
                    amount,
                    EntryKind::ReferralCommissionL1,
                    &format!("cmsn:{earner}:{origin}:l1"),
                )
            })
            .expect("commission entry");
    }

    let stats = store
        .referral_level_stats("u1", EntryKind::ReferralCommissionL1)
        .expect("stats");
    assert_eq!(stats.count, 2);
    assert_eq!(stats.total_commission, 15);
}

proptest! {
    #[test]
    fn reservations_never_exceed_the_cap(
        cap in 10_i64..250,
        amounts in prop::collection::vec(1_i64..40, 1..30),
    ) {
        let mut store = SqliteLedgerStore::open_in_memory().expect("store");

        let mut accepted_total = 0;
        for amount in amounts {
            let outcome = store
                .try_reserve("u1", 19_700, amount, cap, false)
                .expect("reserve");
            if outcome.accepted {
                accepted_total += amount;
            }
            prop_assert!(accepted_total <= cap);
            prop_assert_eq!(outcome.remaining, cap - accepted_total);
        }

        let totals = store.daily_totals("u1", 19_700).expect("totals");
        prop_assert_eq!(totals.credits_earned, accepted_total);
    }

    #[test]
    fn duplicate_source_refs_are_rejected_until_reversal(
        amount in 1_i64..500,
        source_tail in "[a-z]{1,12}",
    ) {
        let mut store = SqliteLedgerStore::open_in_memory().expect("store");
        let source_ref = format!("task:{source_tail}:a1");

        let first = store
            .append(&credit("u1", amount, EntryKind::TaskCompletion, &source_ref))
            .expect("first append");
        let duplicate = store.append(&credit("u1", amount, EntryKind::TaskCompletion, &source_ref));
        prop_assert!(matches!(duplicate, Err(StoreError::DuplicateSourceRef)));

        // Reversal frees the slot for a corrected re-credit.
        store.reverse(first).expect("reverse");
        store
            .append(&credit("u1", amount, EntryKind::TaskCompletion, &source_ref))
            .expect("re-credit after reversal");
    }

    #[test]
    fn cascade_totals_stay_bounded_by_the_original(
        original in 1_i64..100_000,
        chain_len in 0_usize..6,
    ) {
        let config = PlatformConfig::default();
        let chain: Vec<String> = (0..chain_len).map(|i| format!("r{i}")).collect();
        let planned = plan_cascade(&chain, original, &config);

        prop_assert!(planned.len() <= 3);
        let total: i64 = planned.iter().map(|hop| hop.amount).sum();
        prop_assert!(total <= original);

        for hop in &planned {
            prop_assert!(hop.amount > 0);
            prop_assert_eq!(
                hop.amount,
                commission_amount(original, config.commission_percent(hop.level).expect("percent"))
            );
        }
    }

    #[test]
    fn pagination_partitions_the_history_without_gaps(
        entry_count in 1_usize..40,
        page_size in 1_usize..10,
    ) {
        let mut store = SqliteLedgerStore::open_in_memory().expect("store");
        for index in 0..entry_count {
            store
                .append(&NewEntry {
                    created_at: 1_700_000_000 + index as i64,
                    ..credit("u1", 1, EntryKind::TaskCompletion, &format!("task:t{index}:a1"))
                })
                .expect("append");
        }

        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let (page, total) = store.list_by_user("u1", offset, page_size).expect("page");
            prop_assert_eq!(total, entry_count);
            if page.is_empty() {
                break;
            }
            offset += page.len();
            seen.extend(page);
        }

        prop_assert_eq!(seen.len(), entry_count);
        // Newest first, no duplicates.
        for window in seen.windows(2) {
            prop_assert!(window[0].created_at >= window[1].created_at);
            prop_assert_ne!(window[0].entry_id, window[1].entry_id);
        }
    }
}
