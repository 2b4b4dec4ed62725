//! In-memory integration tests for the job flow through the engine.

use crate::in_memory::helpers::{Rig, item, rig, staff};
use fieldtrack::{
    checkin::domain::CheckInError,
    engine::EngineError,
    job::{
        domain::{CompletionPayload, JobStatus},
        services::JobLifecycleError,
    },
    location::ports::LocationPermission,
    tracking::domain::SessionPhase,
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dispatched_job_runs_to_completion(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;
    let job_id = rig.dispatch("job-1").await?;
    let alice = staff("alice")?;
    let lifecycle = rig.engine.lifecycle();

    lifecycle.accept(&job_id, &alice).await?;
    rig.remote_job_where(&job_id, |job| job.status() == JobStatus::Accepted)
        .await?;

    rig.fix_at(6.0)?;
    let outcome = lifecycle.start(&job_id, &alice).await?;
    eyre::ensure!(outcome.check_in.is_some(), "check-in should be captured");
    eyre::ensure!(outcome.session.is_some(), "tracking should be open");
    rig.notified("Arrived at").await?;
    let arrived = rig.job(&job_id).await?;
    eyre::ensure!(arrived.arrived_at().is_some(), "arrival should be recorded");

    lifecycle
        .toggle_checklist_item(&job_id, &alice, &item("isolate")?, true)
        .await?;
    let completed = lifecycle
        .complete(
            &job_id,
            &alice,
            CompletionPayload::new()
                .with_notes("Fittings replaced")
                .with_photo_urls(["https://photos.example/lobby.jpg".to_owned()]),
        )
        .await?;

    assert_eq!(completed.status(), JobStatus::Completed);
    assert_eq!(completed.photo_urls().len(), 1);
    rig.remote_job_where(&job_id, |job| job.status() == JobStatus::Completed)
        .await?;
    assert_eq!(
        rig.engine.tracking().phase(&job_id).await?,
        SessionPhase::Closed
    );
    let check_ins = rig.engine.check_ins().check_ins_for(&job_id).await?;
    assert_eq!(check_ins.len(), 1);
    assert!(rig
        .staff_messages()
        .iter()
        .any(|message| message.starts_with("Checked in to")));
    rig.engine.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn denied_location_still_lets_work_start(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;
    let job_id = rig.dispatch("job-1").await?;
    let alice = staff("alice")?;
    rig.location.set_permission(LocationPermission::Denied);

    rig.engine.lifecycle().accept(&job_id, &alice).await?;
    let outcome = rig.engine.lifecycle().start(&job_id, &alice).await?;

    assert_eq!(outcome.job.status(), JobStatus::InProgress);
    assert!(outcome.job.location_unavailable());
    assert!(matches!(
        outcome.check_in_error,
        Some(CheckInError::PermissionDenied)
    ));
    assert!(outcome.session.is_none());
    assert!(rig.engine.check_ins().check_ins_for(&job_id).await?.is_empty());
    rig.engine.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn starting_an_unaccepted_job_is_refused(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;
    let job_id = rig.dispatch("job-1").await?;

    let result = rig
        .engine
        .lifecycle()
        .start(&job_id, &staff("alice")?)
        .await;

    assert!(matches!(result, Err(JobLifecycleError::Domain(_))));
    assert_eq!(rig.job(&job_id).await?.status(), JobStatus::Assigned);
    rig.engine.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn engine_requires_a_signed_in_staff_member(rig: Rig) {
    rig.identity.set(None);

    let result = rig.engine.init().await;

    assert!(matches!(result, Err(EngineError::NoActiveStaff)));
    assert!(!rig.engine.is_running().await);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn engine_refuses_a_second_init(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;

    let second = rig.engine.init().await;

    assert!(matches!(second, Err(EngineError::AlreadyRunning)));
    rig.engine.shutdown().await;
    assert!(!rig.engine.is_running().await);
    Ok(())
}
