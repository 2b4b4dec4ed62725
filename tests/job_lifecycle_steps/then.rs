//! Then steps for job lifecycle BDD scenarios.

use super::world::{JobLifecycleWorld, run_async};
use fieldtrack::{
    job::{
        domain::{JobDomainError, JobStatus, StaffId},
        services::JobLifecycleError,
    },
    tracking::domain::SessionPhase,
};
use rstest_bdd_macros::then;

#[then(r#"the job status is "{status}""#)]
fn job_status_is(world: &JobLifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = JobStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let job_id = world.job_id()?;
    let job = run_async(world.engine.lifecycle().job(&job_id))?
        .ok_or_else(|| eyre::eyre!("job {job_id} is not cached"))?;

    eyre::ensure!(
        job.status() == expected,
        "expected status {}, found {}",
        expected,
        job.status()
    );
    Ok(())
}

#[then("a check-in deadline is pending")]
fn deadline_is_pending(world: &JobLifecycleWorld) -> Result<(), eyre::Report> {
    let job_id = world.job_id()?;
    let pending = run_async(world.engine.escalation().pending_deadline(&job_id))?;
    eyre::ensure!(pending.is_some(), "expected a pending check-in deadline");
    Ok(())
}

#[then("the operation fails because the job is not assigned to them")]
fn fails_not_assigned(world: &JobLifecycleWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing operation result"))?;
    eyre::ensure!(
        matches!(
            result,
            Err(JobLifecycleError::Domain(
                JobDomainError::NotAssignedToStaff { .. }
            ))
        ),
        "expected NotAssignedToStaff error, got {result:?}"
    );
    Ok(())
}

#[then("the operation fails with incomplete requirements")]
fn fails_incomplete(world: &JobLifecycleWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing operation result"))?;
    eyre::ensure!(
        matches!(
            result,
            Err(JobLifecycleError::Domain(
                JobDomainError::IncompleteRequirements { .. }
            ))
        ),
        "expected IncompleteRequirements error, got {result:?}"
    );
    Ok(())
}

#[then("a check-in was captured")]
fn check_in_captured(world: &JobLifecycleWorld) -> Result<(), eyre::Report> {
    let outcome = world
        .last_start
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing start outcome"))?;
    eyre::ensure!(
        outcome.check_in.is_some(),
        "expected a check-in, got {:?}",
        outcome.check_in_error
    );
    Ok(())
}

#[then("a tracking session is open")]
fn tracking_is_open(world: &JobLifecycleWorld) -> Result<(), eyre::Report> {
    let job_id = world.job_id()?;
    let phase = run_async(world.engine.tracking().phase(&job_id))?;
    eyre::ensure!(phase == SessionPhase::Active, "expected active tracking, found {phase:?}");
    Ok(())
}

#[then("no tracking session is open")]
fn tracking_is_not_open(world: &JobLifecycleWorld) -> Result<(), eyre::Report> {
    let job_id = world.job_id()?;
    let phase = run_async(world.engine.tracking().phase(&job_id))?;
    eyre::ensure!(phase == SessionPhase::Idle, "expected no tracking, found {phase:?}");
    Ok(())
}

#[then("the job is flagged as location unavailable")]
fn flagged_location_unavailable(world: &JobLifecycleWorld) -> Result<(), eyre::Report> {
    let outcome = world
        .last_start
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing start outcome"))?;
    eyre::ensure!(
        outcome.job.location_unavailable(),
        "expected the job to be flagged location unavailable"
    );
    Ok(())
}

#[then(r#"{count:usize} escalation alert is raised for "{staff}""#)]
fn alerts_raised(
    world: &JobLifecycleWorld,
    count: usize,
    staff: String,
) -> Result<(), eyre::Report> {
    let staff_id = StaffId::new(staff)?;
    eyre::ensure!(
        world.fired_alerts.len() == count,
        "expected {count} alerts, found {}",
        world.fired_alerts.len()
    );
    eyre::ensure!(
        world
            .fired_alerts
            .iter()
            .all(|alert| alert.staff_id() == &staff_id),
        "alert raised for the wrong staff member"
    );
    eyre::ensure!(
        world.notifier.admin_alerts().len() == count,
        "administrators were not notified"
    );
    Ok(())
}
