//! Tests for the pure job state machine.

use crate::job::domain::{
    CompletionPayload, JobDomainError, JobEvent, JobStatus, apply_transition,
};
use crate::test_support::{
    accepted_job, assigned_job, at, in_progress_job, item, pending_job, staff,
};
use rstest::rstest;

#[rstest]
#[case(JobStatus::Pending, JobStatus::Assigned, true)]
#[case(JobStatus::Assigned, JobStatus::Accepted, true)]
#[case(JobStatus::Accepted, JobStatus::InProgress, true)]
#[case(JobStatus::InProgress, JobStatus::Completed, true)]
#[case(JobStatus::Assigned, JobStatus::Rejected, true)]
#[case(JobStatus::Accepted, JobStatus::Rejected, true)]
#[case(JobStatus::InProgress, JobStatus::Cancelled, true)]
#[case(JobStatus::Pending, JobStatus::InProgress, false)]
#[case(JobStatus::Pending, JobStatus::Accepted, false)]
#[case(JobStatus::Assigned, JobStatus::InProgress, false)]
#[case(JobStatus::InProgress, JobStatus::Rejected, false)]
#[case(JobStatus::Completed, JobStatus::Cancelled, false)]
#[case(JobStatus::Rejected, JobStatus::Assigned, false)]
fn transition_graph(#[case] from: JobStatus, #[case] to: JobStatus, #[case] allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[rstest]
fn terminal_statuses_have_no_exits() {
    for status in JobStatus::ALL.into_iter().filter(|status| status.is_terminal()) {
        assert!(
            JobStatus::ALL
                .into_iter()
                .all(|target| !status.can_transition_to(target)),
            "{status} should be terminal"
        );
    }
}

#[rstest]
#[case("in_progress", Some(JobStatus::InProgress))]
#[case(" Completed ", Some(JobStatus::Completed))]
#[case("done", None)]
fn parses_status(#[case] raw: &str, #[case] expected: Option<JobStatus>) {
    assert_eq!(JobStatus::try_from(raw).ok(), expected);
}

#[rstest]
fn accept_records_acceptance_time() {
    let alice = staff("alice");
    let job = accepted_job("job-1", &alice);

    assert_eq!(job.status(), JobStatus::Accepted);
    assert_eq!(job.accepted_at(), Some(at(2)));
    assert_eq!(job.assigned_staff_id(), Some(&alice));
}

#[rstest]
fn pending_job_cannot_start() {
    let job = pending_job("job-1");
    let err = apply_transition(
        &job,
        &JobEvent::Start {
            staff_id: staff("alice"),
            location_unavailable: false,
            at: at(5),
        },
    )
    .expect_err("pending job must not start");

    assert_eq!(
        err,
        JobDomainError::InvalidTransition {
            job_id: job.id().clone(),
            from: JobStatus::Pending,
            event: "start",
        }
    );
    assert_eq!(job.status(), JobStatus::Pending);
}

#[rstest]
fn only_the_assignee_may_accept() {
    let job = assigned_job("job-1", &staff("alice"));
    let err = apply_transition(
        &job,
        &JobEvent::Accept {
            staff_id: staff("bob"),
            at: at(2),
        },
    )
    .expect_err("bob is not the assignee");

    assert!(matches!(err, JobDomainError::NotAssignedToStaff { .. }));
}

#[rstest]
fn start_carries_location_flag() {
    let alice = staff("alice");
    let job = apply_transition(
        &accepted_job("job-1", &alice),
        &JobEvent::Start {
            staff_id: alice,
            location_unavailable: true,
            at: at(40),
        },
    )
    .expect("start");

    assert_eq!(job.status(), JobStatus::InProgress);
    assert_eq!(job.started_at(), Some(at(40)));
    assert!(job.location_unavailable());
}

#[rstest]
#[case(false, true)]
#[case(true, false)]
fn completion_requires_required_items(#[case] safety_done: bool, #[case] expect_incomplete: bool) {
    let alice = staff("alice");
    let payload = if safety_done {
        CompletionPayload::new().with_completed_items([item("safety")])
    } else {
        CompletionPayload::new().with_completed_items([item("photos")])
    };
    let result = apply_transition(
        &in_progress_job("job-1", &alice),
        &JobEvent::Complete {
            staff_id: alice,
            payload,
            at: at(60),
        },
    );

    match result {
        Err(JobDomainError::IncompleteRequirements { missing, .. }) => {
            assert!(expect_incomplete);
            assert_eq!(missing, vec![item("safety")]);
        }
        Ok(job) => {
            assert!(!expect_incomplete);
            assert_eq!(job.status(), JobStatus::Completed);
            assert_eq!(job.completed_at(), Some(at(60)));
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn toggled_items_count_towards_completion() {
    let alice = staff("alice");
    let toggled = apply_transition(
        &in_progress_job("job-1", &alice),
        &JobEvent::ToggleChecklistItem {
            staff_id: alice.clone(),
            item_id: item("safety"),
            done: true,
            at: at(20),
        },
    )
    .expect("toggle");
    assert!(toggled.missing_requirements().is_empty());

    let completed = apply_transition(
        &toggled,
        &JobEvent::Complete {
            staff_id: alice,
            payload: CompletionPayload::new().with_notes("All good"),
            at: at(25),
        },
    )
    .expect("complete");
    assert_eq!(completed.completion_notes(), Some("All good"));
}

#[rstest]
fn unknown_checklist_item_is_rejected() {
    let alice = staff("alice");
    let err = apply_transition(
        &in_progress_job("job-1", &alice),
        &JobEvent::ToggleChecklistItem {
            staff_id: alice,
            item_id: item("ladder"),
            done: true,
            at: at(20),
        },
    )
    .expect_err("unknown item");

    assert!(matches!(err, JobDomainError::UnknownChecklistItem { .. }));
}

#[rstest]
fn arrival_is_recorded_once() {
    let job = in_progress_job("job-1", &staff("alice"));
    let first = apply_transition(&job, &JobEvent::RecordArrival { at: at(10) }).expect("arrive");
    let second =
        apply_transition(&first, &JobEvent::RecordArrival { at: at(12) }).expect("arrive again");

    assert_eq!(second.arrived_at(), Some(at(10)));
    assert_eq!(second.status(), JobStatus::InProgress);
}

#[rstest]
fn cancel_is_allowed_from_any_open_status() {
    for job in [
        pending_job("job-1"),
        assigned_job("job-2", &staff("alice")),
        in_progress_job("job-3", &staff("alice")),
    ] {
        let cancelled = apply_transition(
            &job,
            &JobEvent::Cancel {
                reason: "customer rescheduled".to_owned(),
                at: at(8),
            },
        )
        .expect("cancel");
        assert_eq!(cancelled.status(), JobStatus::Cancelled);
        assert_eq!(cancelled.closure_reason(), Some("customer rescheduled"));
    }
}
