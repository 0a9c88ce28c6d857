mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{FakeAuthority, GOOD_KEY, PRINTER_ID};
use jigprint_agent::agent::Agent;
use jigprint_agent::client::ClientError;
use jigprint_agent::config::AgentConfig;
use jigprint_agent::spool::Spool;
use jigprint_agent::{discovery, heartbeat, reconcile, trigger};
use jigprint_core::hot_folder::SENT_MARKER;
use jigprint_core::job_status::JobStatus;
use tokio_util::sync::CancellationToken;

const PDF: &[u8] = b"%PDF-1.7 composed";

async fn spool_in(dir: &tempfile::TempDir) -> Spool {
    let spool = Spool::new(dir.path().join("queue"));
    spool.prepare().await.unwrap();
    spool
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discovery_downloads_and_queues_locally() {
    let fake = FakeAuthority::default();
    fake.add_job(42, JobStatus::ReadyForPrint, Some(PDF));
    let client = fake.serve().await;
    let dir = tempfile::tempdir().unwrap();
    let spool = spool_in(&dir).await;

    let report = discovery::poll_once(&client, &spool).await.unwrap();
    assert_eq!(report.downloaded, 1);
    assert_eq!(fake.status(42), JobStatus::QueuedLocal);

    let job_dir = dir.path().join("queue").join("job_42");
    assert_eq!(
        std::fs::read(job_dir.join("JOB-42_Smith Wedding.pdf")).unwrap(),
        PDF
    );
    let meta: serde_json::Value =
        serde_json::from_slice(&std::fs::read(job_dir.join("job.json")).unwrap()).unwrap();
    assert_eq!(meta["id"], 42);
}

#[tokio::test]
async fn discovery_never_downloads_a_local_job_twice() {
    let fake = FakeAuthority::default();
    fake.add_job(42, JobStatus::ReadyForPrint, Some(PDF));
    let client = fake.serve().await;
    let dir = tempfile::tempdir().unwrap();
    let spool = spool_in(&dir).await;

    discovery::poll_once(&client, &spool).await.unwrap();
    // The authority lists it again, e.g. after a release.
    fake.set_status(42, JobStatus::ReadyForPrint);

    let report = discovery::poll_once(&client, &spool).await.unwrap();
    assert_eq!(report.downloaded, 0);
    assert_eq!(report.already_local, 1);
    assert_eq!(fake.with(|s| s.downloads), 1);
    // The undelivered local copy is queued again as is.
    assert_eq!(fake.status(42), JobStatus::QueuedLocal);
}

#[tokio::test]
async fn requeued_job_is_downloaded_and_delivered_again() {
    let fake = FakeAuthority::default();
    fake.add_job(42, JobStatus::ReadyForPrint, Some(PDF));
    let client = fake.serve().await;
    let dir = tempfile::tempdir().unwrap();
    let hot = dir.path().join("hot");
    fake.with(|s| s.hot_folder = Some(hot.clone()));
    let spool = spool_in(&dir).await;

    discovery::poll_once(&client, &spool).await.unwrap();
    fake.set_status(42, JobStatus::SentToPrinter);
    assert_eq!(trigger::check_once(&client, &spool).await.unwrap(), vec![42]);

    // Operator marks it failed, then re-queues it.
    fake.set_status(42, JobStatus::Failed);
    fake.set_status(42, JobStatus::ReadyForPrint);

    let report = discovery::poll_once(&client, &spool).await.unwrap();
    assert_eq!(report.downloaded, 1);
    assert_eq!(fake.with(|s| s.downloads), 2);
    assert_eq!(fake.status(42), JobStatus::QueuedLocal);
    assert!(!spool.is_delivered(42).await);

    fake.set_status(42, JobStatus::SentToPrinter);
    assert_eq!(trigger::check_once(&client, &spool).await.unwrap(), vec![42]);
    assert!(spool.is_delivered(42).await);
    assert_eq!(fake.with(|s| s.confirmations.len()), 2);
    assert_eq!(std::fs::read(hot.join("JOB-42_Smith Wedding.pdf")).unwrap(), PDF);
}

#[tokio::test]
async fn lost_mark_downloaded_response_is_released_and_retried() {
    let fake = FakeAuthority::default();
    fake.add_job(42, JobStatus::ReadyForPrint, Some(PDF));
    fake.with(|s| s.lose_mark_downloaded_response = true);
    let client = fake.serve().await;
    let dir = tempfile::tempdir().unwrap();
    let spool = spool_in(&dir).await;

    let report = discovery::poll_once(&client, &spool).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.released, 1);
    assert!(!spool.contains(42).await);
    assert_eq!(fake.status(42), JobStatus::ReadyForPrint);
    assert_eq!(fake.with(|s| s.releases.clone()), vec![42]);

    fake.with(|s| s.lose_mark_downloaded_response = false);
    let report = discovery::poll_once(&client, &spool).await.unwrap();
    assert_eq!(report.downloaded, 1);
    assert_eq!(fake.status(42), JobStatus::QueuedLocal);
    assert!(spool.is_complete(42).await);
}

#[tokio::test]
async fn failed_download_leaves_no_directory_and_retries() {
    let fake = FakeAuthority::default();
    fake.add_job(7, JobStatus::ReadyForPrint, None);
    let client = fake.serve().await;
    let dir = tempfile::tempdir().unwrap();
    let spool = spool_in(&dir).await;

    let report = discovery::poll_once(&client, &spool).await.unwrap();
    assert_eq!(report.failed, 1);
    assert!(!spool.contains(7).await);
    assert_eq!(fake.status(7), JobStatus::ReadyForPrint);

    fake.with(|s| s.artifacts.insert(7, PDF.to_vec()));
    let report = discovery::poll_once(&client, &spool).await.unwrap();
    assert_eq!(report.downloaded, 1);
    assert!(spool.is_complete(7).await);
}

// ---------------------------------------------------------------------------
// Print trigger
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_delivers_once_and_confirms() {
    let fake = FakeAuthority::default();
    fake.add_job(42, JobStatus::ReadyForPrint, Some(PDF));
    let client = fake.serve().await;
    let dir = tempfile::tempdir().unwrap();
    let hot = dir.path().join("hot").join("uv");
    fake.with(|s| s.hot_folder = Some(hot.clone()));
    let spool = spool_in(&dir).await;

    discovery::poll_once(&client, &spool).await.unwrap();
    assert!(trigger::check_once(&client, &spool).await.unwrap().is_empty());

    fake.set_status(42, JobStatus::SentToPrinter);
    assert_eq!(trigger::check_once(&client, &spool).await.unwrap(), vec![42]);

    assert_eq!(std::fs::read(hot.join("JOB-42_Smith Wedding.pdf")).unwrap(), PDF);
    assert!(spool.is_delivered(42).await);
    assert_eq!(spool.delivery(42).await.unwrap().copies, 2);
    let confirmations = fake.with(|s| s.confirmations.clone());
    assert_eq!(confirmations.len(), 1);
    assert_eq!(confirmations[0].0, 42);
    assert_eq!(confirmations[0].1.filename, "JOB-42_Smith Wedding.pdf");

    // Marker present: no second copy, no second confirmation.
    assert!(trigger::check_once(&client, &spool).await.unwrap().is_empty());
    assert_eq!(fake.with(|s| s.confirmations.len()), 1);
    let leftovers: Vec<_> = std::fs::read_dir(&hot).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

#[tokio::test]
async fn trigger_skips_scan_when_nothing_is_sent() {
    let fake = FakeAuthority::default();
    fake.add_job(1, JobStatus::ReadyForPrint, Some(PDF));
    let client = fake.serve().await;
    let dir = tempfile::tempdir().unwrap();
    let spool = spool_in(&dir).await;
    discovery::poll_once(&client, &spool).await.unwrap();

    trigger::check_once(&client, &spool).await.unwrap();
    assert_eq!(fake.with(|s| s.print_info_calls), 0);
}

#[tokio::test]
async fn trigger_only_delivers_jobs_that_were_sent() {
    let fake = FakeAuthority::default();
    fake.add_job(1, JobStatus::ReadyForPrint, Some(PDF));
    fake.add_job(2, JobStatus::ReadyForPrint, Some(PDF));
    let client = fake.serve().await;
    let dir = tempfile::tempdir().unwrap();
    let hot = dir.path().join("hot");
    fake.with(|s| s.hot_folder = Some(hot.clone()));
    let spool = spool_in(&dir).await;
    discovery::poll_once(&client, &spool).await.unwrap();

    fake.set_status(2, JobStatus::SentToPrinter);
    assert_eq!(trigger::check_once(&client, &spool).await.unwrap(), vec![2]);
    assert!(!spool.is_delivered(1).await);
    assert!(!dir.path().join("queue/job_1").join(SENT_MARKER).exists());
}

#[tokio::test]
async fn missing_hot_folder_mapping_is_not_delivered() {
    let fake = FakeAuthority::default();
    fake.add_job(9, JobStatus::ReadyForPrint, Some(PDF));
    let client = fake.serve().await;
    let dir = tempfile::tempdir().unwrap();
    let spool = spool_in(&dir).await;
    discovery::poll_once(&client, &spool).await.unwrap();

    fake.set_status(9, JobStatus::SentToPrinter);
    assert!(trigger::check_once(&client, &spool).await.unwrap().is_empty());
    assert!(!spool.is_delivered(9).await);
    assert_matches!(client.print_info(9).await, Err(ClientError::NotFound(_)));
}

#[tokio::test]
async fn print_info_before_send_is_not_ready() {
    let fake = FakeAuthority::default();
    fake.add_job(5, JobStatus::QueuedLocal, Some(PDF));
    let client = fake.serve().await;

    assert_matches!(client.print_info(5).await, Err(ClientError::NotReady(_)));
}

// ---------------------------------------------------------------------------
// Heartbeat and reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn heartbeat_reports_printer_identity() {
    let fake = FakeAuthority::default();
    let client = fake.serve().await;

    let ack = heartbeat::beat(&client, None).await.unwrap();
    assert_eq!(ack.printer_id, PRINTER_ID);
    assert_eq!(fake.with(|s| s.heartbeats), 1);
}

#[tokio::test]
async fn unknown_key_is_unauthorized() {
    let fake = FakeAuthority::default();
    fake.add_job(1, JobStatus::ReadyForPrint, Some(PDF));
    let url = fake.listen().await;
    let bad = fake.client(&url, "jp_wrong");

    assert_matches!(heartbeat::beat(&bad, None).await, Err(ClientError::Unauthorized));
    assert_matches!(bad.ready_jobs().await, Err(ClientError::Unauthorized));
    assert_eq!(fake.with(|s| s.heartbeats), 0);
}

#[tokio::test]
async fn reconcile_releases_jobs_missing_locally() {
    let fake = FakeAuthority::default();
    fake.add_job(1, JobStatus::ReadyForPrint, Some(PDF));
    fake.add_job(2, JobStatus::QueuedLocal, Some(PDF));
    let client = fake.serve().await;
    let dir = tempfile::tempdir().unwrap();
    let spool = spool_in(&dir).await;
    discovery::poll_once(&client, &spool).await.unwrap();

    let released = reconcile::reconcile(&client, &spool).await.unwrap();
    assert_eq!(released, vec![2]);
    assert_eq!(fake.status(1), JobStatus::QueuedLocal);
    assert_eq!(fake.status(2), JobStatus::ReadyForPrint);
}

// ---------------------------------------------------------------------------
// Whole agent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn agent_runs_until_cancelled_and_delivers() {
    let fake = FakeAuthority::default();
    fake.add_job(42, JobStatus::ReadyForPrint, Some(PDF));
    let url = fake.listen().await;
    let dir = tempfile::tempdir().unwrap();
    let hot = dir.path().join("hot");
    fake.with(|s| s.hot_folder = Some(hot.clone()));

    let config = AgentConfig {
        api_url: url,
        api_key: GOOD_KEY.to_string(),
        queue_dir: dir.path().join("queue"),
        poll_interval: Duration::from_millis(50),
        heartbeat_interval: Duration::from_millis(50),
        trigger_interval: Duration::from_millis(50),
        http_timeout: Duration::from_secs(5),
    };
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Agent::new(config).unwrap().run(cancel.clone()));

    let queued = wait_for(|| fake.status(42) == JobStatus::QueuedLocal).await;
    assert!(queued, "job was never downloaded");

    fake.set_status(42, JobStatus::SentToPrinter);
    let target = hot.join("JOB-42_Smith Wedding.pdf");
    let delivered = wait_for(|| target.exists()).await;
    assert!(delivered, "artifact never reached the hot folder");

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("agent did not stop")
        .unwrap();
    assert!(result.is_ok());
    assert!(fake.with(|s| s.heartbeats) >= 1);
}

async fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
