//! Given steps for job lifecycle BDD scenarios.

use super::world::{JobLifecycleWorld, run_async};
use chrono::Duration;
use fieldtrack::{
    job::domain::{
        ChecklistItem, ChecklistItemId, Job, JobEvent, JobId, JobType, NewJob, Priority,
        ScheduleWindow, StaffId, apply_transition,
    },
    location::{adapters::ScriptedFix, domain::Coordinate, ports::LocationPermission},
};
use eyre::WrapErr;
use mockable::Clock;
use rstest_bdd_macros::given;

const SITE: (f64, f64) = (51.5007, -0.1246);
const METERS_PER_DEGREE: f64 = 111_195.0;

#[given(r#"a job "{job}" assigned to "{staff}""#)]
fn job_assigned_to(
    world: &mut JobLifecycleWorld,
    job: String,
    staff: String,
) -> Result<(), eyre::Report> {
    let staff_id = StaffId::new(staff)?;
    let now = world.clock.utc();
    let pending = Job::new(
        NewJob {
            id: JobId::new(job)?,
            title: "Deep clean of reception".to_owned(),
            job_type: JobType::Cleaning,
            priority: Priority::Medium,
            schedule: ScheduleWindow::new(now + Duration::minutes(30), now + Duration::hours(2))?,
            target: Coordinate::new(SITE.0, SITE.1)?,
            checklist: vec![
                ChecklistItem::new(ChecklistItemId::new("floors")?, "Mop floors", true),
                ChecklistItem::new(ChecklistItemId::new("bins")?, "Empty bins", false),
            ],
        },
        now,
    )?;
    let assigned = apply_transition(
        &pending,
        &JobEvent::Assign {
            staff_id: staff_id.clone(),
            at: now,
        },
    )?;
    run_async(world.engine.sync().write(&assigned)).wrap_err("store assigned job")?;
    world.sign_in(&staff_id);
    world.job_id = Some(assigned.id().clone());
    Ok(())
}

#[given(r#""{staff}" is {meters:f64} meters from the site"#)]
fn staff_is_near_site(
    world: &mut JobLifecycleWorld,
    staff: String,
    meters: f64,
) -> Result<(), eyre::Report> {
    world.sign_in(&StaffId::new(staff)?);
    let position = Coordinate::new(SITE.0 + meters / METERS_PER_DEGREE, SITE.1)?;
    world.location.push_fixes([ScriptedFix::At(position, 5.0)]);
    Ok(())
}

#[given("location permission is denied")]
fn location_permission_denied(world: &mut JobLifecycleWorld) {
    world.location.set_permission(LocationPermission::Denied);
}

#[given(r#""{staff}" has accepted the job"#)]
fn staff_has_accepted(world: &mut JobLifecycleWorld, staff: String) -> Result<(), eyre::Report> {
    let job_id = world.job_id()?;
    let staff_id = StaffId::new(staff)?;
    run_async(world.engine.lifecycle().accept(&job_id, &staff_id))
        .wrap_err("accept job in scenario setup")?;
    Ok(())
}

#[given(r#""{staff}" has started the job"#)]
fn staff_has_started(world: &mut JobLifecycleWorld, staff: String) -> Result<(), eyre::Report> {
    let job_id = world.job_id()?;
    let staff_id = StaffId::new(staff)?;
    let outcome = run_async(world.engine.lifecycle().start(&job_id, &staff_id))
        .wrap_err("start job in scenario setup")?;
    world.last_start = Some(outcome);
    Ok(())
}
