//! In-memory integration tests for offline-first synchronisation.

use std::time::Duration;

use crate::in_memory::helpers::{Rig, WAIT, assigned_job, at, remote_job, rig, staff};
use fieldtrack::{
    job::domain::{JobEvent, JobId, JobStatus, apply_transition},
    sync::{
        domain::{Collection, RemoteDocument},
        services::SyncEvent,
    },
};
use rstest::rstest;
use serde_json::json;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn offline_accept_uploads_after_reconnect(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;
    let job_id = rig.dispatch("job-1").await?;
    rig.remote.set_online(false);

    let accepted = rig.engine.lifecycle().accept(&job_id, &staff("alice")?).await?;

    assert_eq!(accepted.status(), JobStatus::Accepted);
    assert_eq!(rig.job(&job_id).await?.status(), JobStatus::Accepted);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!rig.engine.sync().pending_entries().await?.is_empty());

    rig.remote.set_online(true);
    rig.engine.sync().connectivity_restored();

    rig.remote_job_where(&job_id, |job| job.status() == JobStatus::Accepted)
        .await?;
    rig.engine.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refused_write_rolls_back_and_is_reported(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;
    let job_id = rig.dispatch("job-1").await?;
    let mut events = rig.engine.sync().subscribe_events();
    rig.remote
        .reject_next_put(Collection::Jobs, job_id.as_str(), "job was reassigned");

    rig.engine.lifecycle().accept(&job_id, &staff("alice")?).await?;

    let rejection = tokio::time::timeout(WAIT, async {
        loop {
            if let Ok(SyncEvent::WriteRejected {
                reason,
                rolled_back,
                ..
            }) = events.recv().await
            {
                return (reason, rolled_back);
            }
        }
    })
    .await?;
    assert_eq!(rejection, ("job was reassigned".to_owned(), true));
    rig.job_where(&job_id, |job| job.status() == JobStatus::Assigned)
        .await?;
    rig.notified("Change to").await?;
    rig.engine.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn later_remote_cancellation_replaces_local_state(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;
    let job_id = rig.dispatch("job-1").await?;
    let alice = staff("alice")?;
    rig.engine.lifecycle().accept(&job_id, &alice).await?;
    rig.remote_job_where(&job_id, |job| job.status() == JobStatus::Accepted)
        .await?;

    let cancelled = apply_transition(
        &assigned_job("job-1", &alice)?,
        &JobEvent::Cancel {
            reason: "customer cancelled".to_owned(),
            at: at(40),
        },
    )?;
    rig.remote.push_external(remote_job(&cancelled, at(40))?);

    let cached = rig
        .job_where(&job_id, |job| job.status() == JobStatus::Cancelled)
        .await?;
    assert_eq!(cached.closure_reason(), Some("customer cancelled"));
    rig.engine.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_remote_job_is_quarantined(rig: Rig) -> eyre::Result<()> {
    rig.engine.init().await?;

    rig.remote.push_external(RemoteDocument {
        collection: Collection::Jobs,
        id: "job-x".to_owned(),
        written_at: at(1),
        origin: None,
        body: json!({"id": "job-x", "assigned_staff_id": "alice", "status": "teleported"}),
    });

    let quarantined = tokio::time::timeout(WAIT, async {
        loop {
            if let Ok(found) = rig.engine.sync().quarantined().await {
                if !found.is_empty() {
                    return found;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    assert_eq!(quarantined.len(), 1);
    let read = rig.engine.lifecycle().job(&JobId::new("job-x")?).await?;
    assert!(read.is_none());
    rig.engine.shutdown().await;
    Ok(())
}
