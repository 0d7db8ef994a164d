use std::sync::{Arc, Barrier};

use super::common::*;
use crate::intake::domain::{ApplicationId, ApplicationStatus, NewLoanApplication};
use crate::intake::memory::MAX_IDENTIFIER_ATTEMPTS;
use crate::intake::service::IntakeError;
use crate::intake::status::can_transition;
use crate::intake::store::{RecordStore, StatusChange, StoreError};
use crate::intake::validation::IntakeGuard;

fn new_application() -> NewLoanApplication {
    IntakeGuard
        .loan_application(&loan_submission(), noon().date_naive())
        .expect("fixture submission is valid")
}

#[test]
fn mobile_lookup_is_exact_at_the_store() {
    let fixture = fixture();
    let record = fixture
        .store
        .create_loan_application(new_application())
        .expect("created");
    assert_eq!(record.mobile, "9876543210");

    let found = fixture
        .store
        .loan_application_by_id_and_mobile(&record.application_id, "9876543210")
        .expect("lookup");
    assert_eq!(found, Some(record.clone()));

    for other_format in ["+91-9876543210", "+91 98765 43210", "09876543210"] {
        let found = fixture
            .store
            .loan_application_by_id_and_mobile(&record.application_id, other_format)
            .expect("lookup");
        assert_eq!(found, None, "{other_format}");
    }
}

#[test]
fn colliding_identifier_is_drawn_again() {
    let ids = Arc::new(ScriptedIds::new(&[
        "LN2026000001",
        "LN2026000001",
        "LN2026000002",
    ]));
    let (store, service) = scripted_fixture(ids.clone());

    let first = service
        .submit_application(&loan_submission())
        .expect("first submission");
    let second = service
        .submit_application(&loan_submission())
        .expect("second submission");

    assert_eq!(first.application_id.0, "LN2026000001");
    assert_eq!(second.application_id.0, "LN2026000002");
    assert_eq!(ids.draws(), 3);
    assert_eq!(store.loan_applications().expect("list").len(), 2);
}

#[test]
fn exhausted_identifier_space_overwrites_nothing() {
    let ids = Arc::new(ScriptedIds::new(&["LN2026000001"]));
    let (store, service) = scripted_fixture(ids.clone());
    let original = service
        .submit_application(&loan_submission())
        .expect("first submission");

    let mut resubmission = loan_submission();
    resubmission.full_name = Some("Kavya Iyer".to_string());
    let error = service
        .submit_application(&resubmission)
        .expect_err("every draw collides");

    assert!(matches!(
        error,
        IntakeError::Store(StoreError::IdentifierSpaceExhausted { attempts })
            if attempts == MAX_IDENTIFIER_ATTEMPTS
    ));
    assert_eq!(ids.draws(), 1 + MAX_IDENTIFIER_ATTEMPTS);

    let stored = store.loan_applications().expect("list");
    assert_eq!(stored, vec![original]);
    assert_eq!(stored[0].full_name, "Priya Sharma");
}

#[test]
fn checked_transition_refuses_and_reports_current_status() {
    let fixture = fixture();
    let record = fixture
        .store
        .create_loan_application(new_application())
        .expect("created");

    let change = fixture
        .store
        .transition_loan_application_status(
            &record.application_id,
            ApplicationStatus::Disbursed,
            can_transition,
        )
        .expect("transition");
    assert_eq!(
        change,
        StatusChange::Refused {
            current: ApplicationStatus::Submitted
        }
    );
    assert_eq!(
        fixture
            .store
            .loan_application(&record.application_id)
            .expect("lookup"),
        Some(record)
    );

    let missing = fixture
        .store
        .transition_loan_application_status(
            &ApplicationId("LN2026999999".to_string()),
            ApplicationStatus::UnderReview,
            can_transition,
        )
        .expect("transition");
    assert_eq!(missing, StatusChange::Missing);
}

#[test]
fn concurrent_updates_from_approved_admit_one_winner() {
    let fixture = staffed_fixture();
    let agent = fixture
        .service
        .authenticate(&login_token(&fixture))
        .expect("authenticated");

    for _ in 0..20 {
        let record = fixture
            .service
            .submit_application(&loan_submission())
            .expect("submission accepted");
        let id = record.application_id.0.as_str();
        for step in ["under-review", "approved"] {
            fixture
                .service
                .update_application_status(&agent, id, step)
                .expect("forward move");
        }

        let barrier = Barrier::new(2);
        let results: Vec<_> = std::thread::scope(|scope| {
            let racers: Vec<_> = ["disbursed", "rejected"]
                .into_iter()
                .map(|target| {
                    let (service, agent, barrier) = (&fixture.service, &agent, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        service.update_application_status(agent, id, target)
                    })
                })
                .collect();
            racers
                .into_iter()
                .map(|racer| racer.join().expect("racer finished"))
                .collect()
        });

        let winners: Vec<_> = results.iter().filter_map(|result| result.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "{results:?}");
        let winner = winners[0].status;

        let loser = results
            .iter()
            .find_map(|result| result.as_ref().err())
            .expect("one update refused");
        assert!(
            matches!(loser, IntakeError::InvalidTransition { from, .. } if *from == winner),
            "{loser:?}"
        );

        let stored = fixture
            .store
            .loan_application(&record.application_id)
            .expect("lookup")
            .expect("present");
        assert_eq!(stored.status, winner);
    }
}

#[test]
fn plain_status_update_overwrites_and_bumps_timestamp() {
    let fixture = fixture();
    let record = fixture
        .store
        .create_loan_application(new_application())
        .expect("created");

    let updated = fixture
        .store
        .update_loan_application_status(&record.application_id, ApplicationStatus::Approved)
        .expect("update")
        .expect("present");
    assert_eq!(updated.status, ApplicationStatus::Approved);
    assert!(updated.last_updated > record.last_updated);

    let missing = fixture
        .store
        .update_loan_application_status(
            &ApplicationId("LN2026999999".to_string()),
            ApplicationStatus::Approved,
        )
        .expect("update");
    assert_eq!(missing, None);
    assert_eq!(fixture.store.loan_applications().expect("list").len(), 1);
}
