use super::common::*;
use chrono::Duration;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::campaigns::domain::{CollectId, Payment, PaymentId, UserId, UserRegistration};
use crate::campaigns::notifications::NotificationKind;
use crate::campaigns::repository::{CampaignRepository, RepositoryError};
use crate::campaigns::validation::ValidationError;
use crate::campaigns::{CampaignService, CampaignServiceError, InMemoryCampaignRepository};

#[test]
fn register_rejects_duplicate_usernames() {
    let (service, _, _) = build_service();
    register(&service, "testuser");

    let duplicate = service.register_user(UserRegistration {
        username: "testuser".to_string(),
        email: "other@example.com".to_string(),
    });
    match duplicate {
        Err(CampaignServiceError::Repository(RepositoryError::Conflict)) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn usernames_differing_in_case_are_distinct() {
    let (service, _, _) = build_service();
    let lower = register(&service, "testuser");
    let upper = register(&service, "TestUser");
    assert_ne!(lower.id, upper.id);
}

#[test]
fn create_collect_starts_empty_and_notifies_author() {
    let (service, _, mailer) = build_service();
    let author = register(&service, "author");

    let collect = service
        .create_collect(author.id, collect_draft(Some(50_000), now()), now())
        .expect("collect created");

    assert_eq!(collect.current_amount.to_string(), "0.00");
    assert_eq!(
        collect.target_amount.map(|target| target.to_string()),
        Some("50000.00".to_string())
    );
    let created = mailer.of_kind(NotificationKind::CollectCreated);
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].recipient, "author@example.com");
    assert!(created[0]
        .body
        .contains(&format!("https://crowdfund.test/api/collects/{}/", collect.id)));
}

#[test]
fn create_collect_rejects_past_end_date() {
    let (service, _, mailer) = build_service();
    let author = register(&service, "author");
    let mut draft = collect_draft(None, now());
    draft.end_datetime = now() - Duration::days(1);

    match service.create_collect(author.id, draft, now()) {
        Err(CampaignServiceError::Validation(err)) => assert_eq!(err.field(), "end_datetime"),
        other => panic!("expected end date validation error, got {other:?}"),
    }
    assert!(mailer.messages().is_empty());
}

#[test]
fn create_collect_requires_known_author() {
    let (service, _, _) = build_service();
    match service.create_collect(UserId(99), collect_draft(None, now()), now()) {
        Err(CampaignServiceError::UnknownUser(UserId(99))) => {}
        other => panic!("expected unknown user, got {other:?}"),
    }
}

#[test]
fn payment_updates_running_total_and_notifies_both_parties() {
    let (service, repository, mailer) = build_service();
    let author = register(&service, "author");
    let donor = register(&service, "donor");
    let collect = service
        .create_collect(author.id, collect_draft(Some(10_000), now()), now())
        .expect("collect created");
    mailer.clear();

    let payment = service
        .make_payment(donor.id, payment_draft(collect.id, 1_500), now())
        .expect("payment accepted");
    assert_eq!(payment.amount.to_string(), "1500.00");

    let stored = repository
        .fetch_collect(collect.id)
        .expect("fetch succeeds")
        .expect("collect present");
    assert_eq!(stored.current_amount, Decimal::from(1_500));

    let receipt = mailer.of_kind(NotificationKind::DonationReceipt);
    assert_eq!(receipt.len(), 1);
    assert_eq!(receipt[0].recipient, "donor@example.com");
    assert!(receipt[0].body.contains("Remaining to collect: 8500.00"));

    let received = mailer.of_kind(NotificationKind::DonationReceived);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].recipient, "author@example.com");
    assert!(received[0].body.contains("Progress: 15.0%"));
    assert!(mailer.of_kind(NotificationKind::GoalReached).is_empty());
}

#[test]
fn author_donating_to_own_collect_gets_receipt_only() {
    let (service, _, mailer) = build_service();
    let author = register(&service, "author");
    let collect = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("collect created");
    mailer.clear();

    service
        .make_payment(author.id, payment_draft(collect.id, 200), now())
        .expect("payment accepted");

    assert_eq!(mailer.of_kind(NotificationKind::DonationReceipt).len(), 1);
    assert!(mailer.of_kind(NotificationKind::DonationReceived).is_empty());
}

#[test]
fn payment_exceeding_target_is_rejected_without_side_effects() {
    let (service, repository, mailer) = build_service();
    let author = register(&service, "author");
    let donor = register(&service, "donor");
    let collect = service
        .create_collect(author.id, collect_draft(Some(10_000), now()), now())
        .expect("collect created");
    mailer.clear();

    match service.make_payment(donor.id, payment_draft(collect.id, 15_000), now()) {
        Err(CampaignServiceError::Validation(ValidationError::ExceedsTarget { remaining })) => {
            assert_eq!(remaining, Decimal::from(10_000));
        }
        other => panic!("expected target overflow, got {other:?}"),
    }

    assert!(repository.list_payments().expect("list").is_empty());
    let stored = repository
        .fetch_collect(collect.id)
        .expect("fetch")
        .expect("present");
    assert!(stored.current_amount.is_zero());
    assert!(mailer.messages().is_empty());
}

#[test]
fn validation_order_reports_amount_before_collect_state() {
    let (service, _, _) = build_service();
    let donor = register(&service, "donor");

    match service.make_payment(donor.id, payment_draft(CollectId(404), 0), now()) {
        Err(CampaignServiceError::Validation(ValidationError::NonPositiveAmount)) => {}
        other => panic!("expected amount error first, got {other:?}"),
    }
    match service.make_payment(donor.id, payment_draft(CollectId(404), 10), now()) {
        Err(CampaignServiceError::Validation(ValidationError::UnknownCollect(CollectId(404)))) => {}
        other => panic!("expected unknown collect, got {other:?}"),
    }
}

#[test]
fn payment_to_finished_collect_is_rejected() {
    let (service, _, _) = build_service();
    let author = register(&service, "author");
    let donor = register(&service, "donor");
    let collect = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("collect created");

    let later = collect.end_datetime + Duration::minutes(1);
    match service.make_payment(donor.id, payment_draft(collect.id, 100), later) {
        Err(CampaignServiceError::Validation(ValidationError::CollectClosed)) => {}
        other => panic!("expected closed collect, got {other:?}"),
    }
}

#[test]
fn sub_cent_amounts_are_rejected() {
    let (service, _, _) = build_service();
    let author = register(&service, "author");
    let collect = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("collect created");

    let mut draft = payment_draft(collect.id, 0);
    draft.amount = Decimal::new(1_001, 3);
    match service.make_payment(author.id, draft, now()) {
        Err(CampaignServiceError::Validation(ValidationError::TooManyDecimalPlaces {
            field: "amount",
        })) => {}
        other => panic!("expected scale error, got {other:?}"),
    }
}

#[test]
fn oversized_amounts_are_rejected_without_blocking_the_ledger() {
    let (service, repository, _) = build_service();
    let author = register(&service, "author");
    let donor = register(&service, "donor");
    let untargeted = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("collect created");

    let mut huge = payment_draft(untargeted.id, 0);
    huge.amount = Decimal::MAX;
    for _ in 0..2 {
        match service.make_payment(donor.id, huge.clone(), now()) {
            Err(CampaignServiceError::Validation(ValidationError::TooManyDigits {
                field: "amount",
                ..
            })) => {}
            other => panic!("expected digit limit, got {other:?}"),
        }
    }

    let mut nearly_full = repository
        .fetch_collect(untargeted.id)
        .expect("fetch")
        .expect("present");
    nearly_full.current_amount = Decimal::new(999_999_999_900, 2);
    repository
        .update_collect(nearly_full)
        .expect("total seeded");
    match service.make_payment(donor.id, payment_draft(untargeted.id, 1), now()) {
        Err(CampaignServiceError::Validation(ValidationError::TotalOverflow)) => {}
        other => panic!("expected total overflow, got {other:?}"),
    }

    let mut cents = payment_draft(untargeted.id, 0);
    cents.amount = Decimal::new(99, 2);
    service
        .make_payment(donor.id, cents, now())
        .expect("payment below the bound accepted");
    let fresh = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("second collect created");
    service
        .make_payment(donor.id, payment_draft(fresh.id, 10), now())
        .expect("ledger still usable");
}

#[test]
fn goal_reached_is_sent_once_when_target_is_crossed() {
    let (service, _, mailer) = build_service();
    let author = register(&service, "author");
    let first = register(&service, "first");
    let second = register(&service, "second");
    let collect = service
        .create_collect(author.id, collect_draft(Some(1_000), now()), now())
        .expect("collect created");

    service
        .make_payment(first.id, payment_draft(collect.id, 600), now())
        .expect("first payment");
    assert!(mailer.of_kind(NotificationKind::GoalReached).is_empty());

    let closing = service
        .make_payment(second.id, payment_draft(collect.id, 400), now())
        .expect("closing payment");
    let reached = mailer.of_kind(NotificationKind::GoalReached);
    assert_eq!(reached.len(), 1);
    assert_eq!(reached[0].recipient, "author@example.com");
    assert!(reached[0].body.contains("Donors: 2"));

    service
        .delete_payment(second.id, closing.id, now())
        .expect("payment withdrawn");
    service
        .make_payment(second.id, payment_draft(collect.id, 400), now())
        .expect("payment repeated");

    assert_eq!(
        mailer.of_kind(NotificationKind::GoalReached).len(),
        1,
        "goal notification must not repeat"
    );
    let details = service.get_collect(collect.id).expect("collect present");
    assert!(details.collect.goal_notified);
    assert!(details.collect.goal_reached());
}

#[test]
fn delete_payment_subtracts_from_total() {
    let (service, repository, _) = build_service();
    let author = register(&service, "author");
    let donor = register(&service, "donor");
    let collect = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("collect created");
    let kept = service
        .make_payment(donor.id, payment_draft(collect.id, 300), now())
        .expect("payment");
    let withdrawn = service
        .make_payment(donor.id, payment_draft(collect.id, 200), now())
        .expect("payment");

    service
        .delete_payment(donor.id, withdrawn.id, now())
        .expect("withdrawn");

    let stored = repository
        .fetch_collect(collect.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.current_amount, kept.amount);
    assert_eq!(
        service.payments_for_collect(collect.id).expect("payments"),
        vec![kept]
    );
}

#[test]
fn only_the_donator_may_withdraw_a_payment() {
    let (service, _, _) = build_service();
    let author = register(&service, "author");
    let donor = register(&service, "donor");
    let collect = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("collect created");
    let payment = service
        .make_payment(donor.id, payment_draft(collect.id, 300), now())
        .expect("payment");

    match service.delete_payment(author.id, payment.id, now()) {
        Err(CampaignServiceError::Forbidden { actor, .. }) => assert_eq!(actor, author.id),
        other => panic!("expected forbidden, got {other:?}"),
    }
    match service.delete_payment(donor.id, PaymentId(999), now()) {
        Err(CampaignServiceError::PaymentNotFound(PaymentId(999))) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn delete_collect_removes_payments_and_checks_author() {
    let (service, repository, _) = build_service();
    let author = register(&service, "author");
    let donor = register(&service, "donor");
    let collect = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("collect created");
    service
        .make_payment(donor.id, payment_draft(collect.id, 300), now())
        .expect("payment");

    assert!(matches!(
        service.delete_collect(donor.id, collect.id),
        Err(CampaignServiceError::Forbidden { .. })
    ));
    service
        .delete_collect(author.id, collect.id)
        .expect("collect deleted");

    assert!(repository.list_payments().expect("list").is_empty());
    assert!(matches!(
        service.get_collect(collect.id),
        Err(CampaignServiceError::CollectNotFound(_))
    ));
}

#[test]
fn failed_total_update_rolls_back_payment() {
    let repository = Arc::new(FrozenTotalsRepository::default());
    let mailer = Arc::new(MemoryMailer::default());
    let service = CampaignService::new(repository.clone(), mailer.clone(), settings());
    let author = register(&service, "author");
    let collect = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("collect created");
    mailer.clear();

    match service.make_payment(author.id, payment_draft(collect.id, 100), now()) {
        Err(CampaignServiceError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected repository failure, got {other:?}"),
    }
    assert!(repository.inner.list_payments().expect("list").is_empty());
    assert!(mailer.messages().is_empty());
}

#[test]
fn failed_withdrawal_restores_the_payment() {
    let repository = Arc::new(FrozenTotalsRepository::default());
    let service = CampaignService::new(
        repository.clone(),
        Arc::new(MemoryMailer::default()),
        settings(),
    );
    let author = register(&service, "author");
    let donor = register(&service, "donor");
    let collect = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("collect created");
    let payment = repository
        .inner
        .insert_payment(Payment {
            id: PaymentId(41),
            collect_id: collect.id,
            donator: donor.clone(),
            amount: Decimal::new(25_000, 2),
            comment: None,
            date_added: now(),
        })
        .expect("payment stored");

    match service.delete_payment(donor.id, payment.id, now()) {
        Err(CampaignServiceError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected repository failure, got {other:?}"),
    }
    assert_eq!(
        repository.inner.fetch_payment(payment.id).expect("fetch"),
        Some(payment)
    );
}

#[test]
fn notification_failures_do_not_fail_payments() {
    let repository = Arc::new(InMemoryCampaignRepository::default());
    let service = CampaignService::new(repository.clone(), Arc::new(FailingMailer), settings());
    let author = register(&service, "author");
    let donor = register(&service, "donor");
    let collect = service
        .create_collect(author.id, collect_draft(Some(500), now()), now())
        .expect("collect created despite mail failure");

    service
        .make_payment(donor.id, payment_draft(collect.id, 500), now())
        .expect("payment accepted despite mail failure");
    let stored = repository
        .fetch_collect(collect.id)
        .expect("fetch")
        .expect("present");
    assert!(stored.goal_reached());
}

#[test]
fn repository_outage_surfaces_as_repository_error() {
    let service = CampaignService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryMailer::default()),
        settings(),
    );
    assert!(matches!(
        service.list_payments(),
        Err(CampaignServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}

#[test]
fn list_collects_paginates_newest_first() {
    let (service, _, _) = build_service();
    let author = register(&service, "author");
    for offset in 0..3 {
        let created_at = now() + Duration::minutes(offset);
        let mut draft = collect_draft(None, created_at);
        draft.name = format!("Collect {offset}");
        service
            .create_collect(author.id, draft, created_at)
            .expect("collect created");
    }

    let first = service.list_collects(1).expect("first page");
    assert_eq!(first.count, 3);
    assert_eq!(first.results.len(), 2);
    assert_eq!(first.results[0].collect.name, "Collect 2");
    assert!(first.has_next());
    assert!(!first.has_previous());

    let second = service.list_collects(2).expect("second page");
    assert_eq!(second.results.len(), 1);
    assert!(!second.has_next());
    assert!(second.has_previous());

    assert!(matches!(
        service.list_collects(3),
        Err(CampaignServiceError::PageOutOfRange(3))
    ));
}

#[test]
fn donors_count_counts_distinct_donators() {
    let (service, _, _) = build_service();
    let author = register(&service, "author");
    let donor = register(&service, "donor");
    let collect = service
        .create_collect(author.id, collect_draft(None, now()), now())
        .expect("collect created");
    for amount in [100, 200] {
        service
            .make_payment(donor.id, payment_draft(collect.id, amount), now())
            .expect("payment");
    }
    service
        .make_payment(author.id, payment_draft(collect.id, 50), now())
        .expect("payment");

    let details = service.get_collect(collect.id).expect("details");
    assert_eq!(details.payments.len(), 3);
    assert_eq!(details.donors_count, 2);
    assert_eq!(details.collect.current_amount, Decimal::from(350));
}
