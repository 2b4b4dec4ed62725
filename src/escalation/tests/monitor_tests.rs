//! Tests for the missed-check-in monitor.

use std::sync::Arc;
use std::time::Duration;

use crate::checkin::domain::CheckIn;
use crate::collaborators::{
    ManualClock, NotificationDispatcher, RecordedNotification, RecordingNotificationDispatcher,
};
use crate::escalation::{
    domain::{AlertResolution, EscalationAlert, EscalationPolicy},
    services::{EscalationError, EscalationMonitor},
};
use crate::job::domain::{Job, JobEvent, StaffId, apply_transition};
use crate::location::domain::PositionReading;
use crate::sync::{
    adapters::{InMemoryCacheStore, InMemoryRemoteStore},
    services::{SyncEngine, SyncSettings},
};
use crate::test_support::{accepted_job, at, site, staff};
use mockall::mock;
use rstest::{fixture, rstest};

mock! {
    Dispatcher {}
    impl NotificationDispatcher for Dispatcher {
        fn notify(&self, staff_id: &StaffId, message: &str);
        fn notify_admins(&self, alert: &EscalationAlert);
    }
}

struct Harness {
    clock: ManualClock,
    sync: Arc<SyncEngine>,
    notifier: RecordingNotificationDispatcher,
    monitor: Arc<EscalationMonitor>,
}

impl Harness {
    fn new(
        notifier: Arc<dyn NotificationDispatcher>,
        recorder: RecordingNotificationDispatcher,
    ) -> Self {
        let clock = ManualClock::new(at(2));
        let sync = Arc::new(SyncEngine::new(
            Arc::new(InMemoryCacheStore::new()),
            Arc::new(InMemoryRemoteStore::new()),
            Arc::new(clock.clone()),
            SyncSettings::default(),
        ));
        let monitor = Arc::new(EscalationMonitor::new(
            Arc::clone(&sync),
            notifier,
            Arc::new(clock.clone()),
            EscalationPolicy::default(),
        ));
        Self {
            clock,
            sync,
            notifier: recorder,
            monitor,
        }
    }

    async fn accepted(&self, id: &str) -> Job {
        let job = accepted_job(id, &staff("alice"));
        self.sync.write(&job).await.expect("store job");
        job
    }
}

#[fixture]
fn harness() -> Harness {
    let recorder = RecordingNotificationDispatcher::new();
    Harness::new(Arc::new(recorder.clone()), recorder)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missed_deadline_fires_exactly_one_alert(harness: Harness) {
    let job = harness.accepted("job-1").await;
    let pending = harness
        .monitor
        .arm(&job)
        .await
        .expect("arm")
        .expect("deadline");
    assert_eq!(pending.deadline, at(12));

    harness.clock.set(at(11));
    assert!(harness.monitor.fire_due().await.expect("early").is_empty());

    harness.clock.set(at(12));
    let fired = harness.monitor.fire_due().await.expect("fire");
    let again = harness.monitor.fire_due().await.expect("fire again");

    assert_eq!(fired.len(), 1);
    assert!(again.is_empty());
    let alert = fired.first().expect("alert");
    assert_eq!(alert.fired_at(), at(12));
    assert_eq!(alert.deadline(), at(12));
    assert!(alert.is_unresolved());
    assert_eq!(
        harness.monitor.alerts_for(job.id()).await.expect("alerts").len(),
        1
    );
    assert_eq!(harness.notifier.admin_alerts(), vec![alert.clone()]);
    assert!(harness.notifier.sent().iter().any(|notification| matches!(
        notification,
        RecordedNotification::Staff { staff_id, .. } if staff_id == &staff("alice")
    )));
    assert!(
        harness
            .monitor
            .pending_deadline(job.id())
            .await
            .expect("lookup")
            .is_none()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deadline_is_stale_once_job_started(harness: Harness) {
    let job = harness.accepted("job-1").await;
    harness.monitor.arm(&job).await.expect("arm");
    let started = apply_transition(
        &job,
        &JobEvent::Start {
            staff_id: staff("alice"),
            location_unavailable: true,
            at: at(5),
        },
    )
    .expect("start");
    harness.sync.write(&started).await.expect("store");

    harness.clock.set(at(20));
    let fired = harness.monitor.fire_due().await.expect("fire");

    assert!(fired.is_empty());
    assert!(harness.notifier.sent().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deadline_is_stale_when_check_in_exists(harness: Harness) {
    let job = harness.accepted("job-1").await;
    harness.monitor.arm(&job).await.expect("arm");
    let reading = PositionReading::new(site(), 4.0, at(6)).expect("reading");
    let check_in = CheckIn::capture(job.id().clone(), staff("alice"), &reading, None, at(6));
    harness.sync.write(&check_in).await.expect("store check-in");

    harness.clock.set(at(20));

    assert!(harness.monitor.fire_due().await.expect("fire").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disarm_removes_the_deadline(harness: Harness) {
    let job = harness.accepted("job-1").await;
    harness.monitor.arm(&job).await.expect("arm");

    assert!(harness.monitor.disarm(job.id()).await.expect("disarm"));
    assert!(!harness.monitor.disarm(job.id()).await.expect("disarm again"));

    harness.clock.set(at(30));
    assert!(harness.monitor.fire_due().await.expect("fire").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn armed_timer_fires_without_polling(harness: Harness) {
    let job = harness.accepted("job-1").await;
    harness.clock.set(at(12));

    harness.monitor.arm(&job).await.expect("arm");
    let fired = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let alerts = harness.monitor.alerts_for(job.id()).await.expect("alerts");
            if !alerts.is_empty() {
                return alerts;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timer fired");

    assert_eq!(fired.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resume_fires_overdue_and_rearms_future_deadlines(harness: Harness) {
    let overdue = harness.accepted("job-1").await;
    harness.monitor.arm(&overdue).await.expect("arm overdue");
    harness.clock.set(at(5));
    let later = apply_transition(
        &crate::test_support::assigned_job("job-2", &staff("alice")),
        &JobEvent::Accept {
            staff_id: staff("alice"),
            at: at(5),
        },
    )
    .expect("accept later");
    harness.sync.write(&later).await.expect("store");
    harness.monitor.arm(&later).await.expect("arm later");
    harness.monitor.shutdown();

    let restarted = Arc::new(EscalationMonitor::new(
        Arc::clone(&harness.sync),
        Arc::new(harness.notifier.clone()),
        Arc::new(harness.clock.clone()),
        EscalationPolicy::default(),
    ));
    harness.clock.set(at(13));
    let report = restarted.resume().await.expect("resume");

    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.rearmed, 1);
    assert_eq!(
        report.fired.first().map(|alert| alert.job_id().clone()),
        Some(overdue.id().clone())
    );
    assert!(
        restarted
            .pending_deadline(later.id())
            .await
            .expect("lookup")
            .is_some()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn arrival_resolves_open_alerts(harness: Harness) {
    let job = harness.accepted("job-1").await;
    harness.monitor.arm(&job).await.expect("arm");
    harness.clock.set(at(12));
    harness.monitor.fire_due().await.expect("fire");

    harness.clock.set(at(13));
    let resolved = harness
        .monitor
        .resolve_for_job(job.id(), AlertResolution::AutoResolvedByArrival)
        .await
        .expect("resolve");

    assert_eq!(resolved.len(), 1);
    let alerts = harness.monitor.alerts_for(job.id()).await.expect("alerts");
    assert_eq!(alerts.len(), 1);
    let alert = alerts.first().expect("alert");
    assert_eq!(alert.resolution(), AlertResolution::AutoResolvedByArrival);
    assert_eq!(alert.resolved_at(), Some(at(13)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn acknowledge_marks_alert_and_is_idempotent(harness: Harness) {
    let job = harness.accepted("job-1").await;
    harness.monitor.arm(&job).await.expect("arm");
    harness.clock.set(at(12));
    let fired = harness.monitor.fire_due().await.expect("fire");
    let alert_id = fired.first().expect("alert").id();

    let acknowledged = harness.monitor.acknowledge(alert_id).await.expect("ack");
    let again = harness.monitor.acknowledge(alert_id).await.expect("ack again");

    assert_eq!(acknowledged.resolution(), AlertResolution::ManuallyAcknowledged);
    assert_eq!(again, acknowledged);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn acknowledging_unknown_alert_fails(harness: Harness) {
    let result = harness
        .monitor
        .acknowledge(crate::escalation::domain::AlertId::new())
        .await;

    assert!(matches!(result, Err(EscalationError::AlertNotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn escalation_notifies_staff_then_admins() {
    let mut dispatcher = MockDispatcher::new();
    let mut sequence = mockall::Sequence::new();
    dispatcher
        .expect_notify()
        .withf(|staff_id, message| staff_id.as_str() == "alice" && message.contains("job-1"))
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());
    dispatcher
        .expect_notify_admins()
        .withf(EscalationAlert::is_unresolved)
        .times(1)
        .in_sequence(&mut sequence)
        .return_const(());
    let harness = Harness::new(Arc::new(dispatcher), RecordingNotificationDispatcher::new());
    let job = harness.accepted("job-1").await;
    harness.monitor.arm(&job).await.expect("arm");

    harness.clock.set(at(12));
    harness.monitor.fire_due().await.expect("fire");
}
