//! In-memory integration tests for missed-check-in escalation.

use std::sync::Arc;

use crate::in_memory::helpers::{Rig, at, rig, staff};
use fieldtrack::{collaborators::ManualClock, escalation::domain::AlertResolution};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missed_check_in_alerts_staff_and_admins(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;
    let job_id = rig.dispatch("job-1").await?;
    let alice = staff("alice")?;
    rig.engine.lifecycle().accept(&job_id, &alice).await?;

    rig.clock.set(at(13));
    let fired = rig.engine.escalation().fire_due().await?;

    assert_eq!(fired.len(), 1);
    let alert = fired.first().ok_or_else(|| eyre::eyre!("missing alert"))?;
    assert_eq!(alert.deadline(), at(12));
    assert_eq!(rig.notifier.admin_alerts().len(), 1);
    assert!(rig
        .staff_messages()
        .iter()
        .any(|message| message.starts_with("Check-in overdue")));

    rig.fix_at(4.0)?;
    rig.engine.lifecycle().start(&job_id, &alice).await?;
    let alerts = rig.engine.escalation().alerts_for(&job_id).await?;
    assert_eq!(alerts.len(), 1);
    assert!(alerts
        .iter()
        .all(|stored| stored.resolution() == AlertResolution::AutoResolvedByArrival));
    rig.engine.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn check_in_before_deadline_prevents_alert(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;
    let job_id = rig.dispatch("job-1").await?;
    let alice = staff("alice")?;
    rig.engine.lifecycle().accept(&job_id, &alice).await?;
    rig.fix_at(4.0)?;
    rig.engine.lifecycle().start(&job_id, &alice).await?;

    rig.clock.set(at(30));
    let fired = rig.engine.escalation().fire_due().await?;

    assert!(fired.is_empty());
    assert!(rig.notifier.admin_alerts().is_empty());
    rig.engine.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn administrator_acknowledges_alert(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;
    let job_id = rig.dispatch("job-1").await?;
    rig.engine.lifecycle().accept(&job_id, &staff("alice")?).await?;
    rig.clock.set(at(20));
    let fired = rig.engine.escalation().fire_due().await?;
    let alert = fired.first().ok_or_else(|| eyre::eyre!("missing alert"))?;

    let acknowledged = rig.engine.escalation().acknowledge(alert.id()).await?;

    assert_eq!(
        acknowledged.resolution(),
        AlertResolution::ManuallyAcknowledged
    );
    assert_eq!(acknowledged.resolved_at(), Some(at(20)));
    rig.engine.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deadline_missed_while_suspended_fires_on_restart(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;
    let job_id = rig.dispatch("job-1").await?;
    rig.engine.lifecycle().accept(&job_id, &staff("alice")?).await?;
    rig.engine.shutdown().await;

    let restarted = Rig::with_cache(Arc::clone(&rig.cache), ManualClock::new(at(15)));
    let report = restarted.engine.init().await?;

    assert_eq!(report.deadlines_fired, 1);
    assert_eq!(report.deadlines_rearmed, 0);
    let alerts = restarted.engine.escalation().alerts_for(&job_id).await?;
    assert_eq!(alerts.len(), 1);
    assert!(alerts.iter().all(|alert| alert.is_unresolved()));
    assert_eq!(restarted.notifier.admin_alerts().len(), 1);
    restarted.engine.shutdown().await;
    Ok(())
}
