//! When steps for job lifecycle BDD scenarios.

use super::world::{JobLifecycleWorld, run_async};
use chrono::Duration;
use eyre::WrapErr;
use fieldtrack::job::domain::{CompletionPayload, StaffId};
use rstest_bdd_macros::when;

#[when(r#""{staff}" accepts the job"#)]
fn staff_accepts(world: &mut JobLifecycleWorld, staff: String) -> Result<(), eyre::Report> {
    let job_id = world.job_id()?;
    let staff_id = StaffId::new(staff)?;
    world.last_result = Some(run_async(
        world.engine.lifecycle().accept(&job_id, &staff_id),
    ));
    Ok(())
}

#[when(r#""{staff}" starts the job"#)]
fn staff_starts(world: &mut JobLifecycleWorld, staff: String) -> Result<(), eyre::Report> {
    let job_id = world.job_id()?;
    let staff_id = StaffId::new(staff)?;
    let outcome = run_async(world.engine.lifecycle().start(&job_id, &staff_id))
        .wrap_err("start job")?;
    world.last_start = Some(outcome);
    Ok(())
}

#[when(r#""{staff}" completes the job"#)]
fn staff_completes(world: &mut JobLifecycleWorld, staff: String) -> Result<(), eyre::Report> {
    let job_id = world.job_id()?;
    let staff_id = StaffId::new(staff)?;
    world.last_result = Some(run_async(world.engine.lifecycle().complete(
        &job_id,
        &staff_id,
        CompletionPayload::new(),
    )));
    Ok(())
}

#[when("{minutes:i64} minutes pass without a check-in")]
fn minutes_pass(world: &mut JobLifecycleWorld, minutes: i64) -> Result<(), eyre::Report> {
    world.clock.advance(Duration::minutes(minutes));
    world.fired_alerts =
        run_async(world.engine.escalation().fire_due()).wrap_err("fire due deadlines")?;
    Ok(())
}
