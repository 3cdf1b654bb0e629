use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tokio::time::sleep;

use super::*;
use crate::transport::scripted::ScriptedTransport;

const INTERVAL: Duration = Duration::from_millis(100);

fn counting_handler(count: &Arc<AtomicUsize>, fail: bool) -> ProbeHandler {
	let count = Arc::clone(count);
	probe_handler(move |_transport| {
		let count = Arc::clone(&count);
		async move {
			count.fetch_add(1, Ordering::SeqCst);
			if fail {
				Err(Error::NotAuthenticated("session expired".into()))
			} else {
				Ok(())
			}
		}
	})
}

fn supervisor(handler: ProbeHandler) -> (KeepAlive, Arc<ScriptedTransport>) {
	let inner = Arc::new(ScriptedTransport::new());
	let keep_alive = KeepAlive::new(Arc::clone(&inner) as Arc<dyn Transport>, INTERVAL, handler);
	(keep_alive, inner)
}

fn ping() -> Request {
	Request::without_params("ServiceInstance.CurrentTime")
}

#[tokio::test(start_paused = true)]
async fn test_no_probe_before_start() {
	let count = Arc::new(AtomicUsize::new(0));
	let (keep_alive, _) = supervisor(counting_handler(&count, false));

	sleep(INTERVAL * 5).await;

	assert_eq!(count.load(Ordering::SeqCst), 0);
	assert_eq!(keep_alive.phase(), KeepAlivePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_successful_probes_keep_running() {
	let count = Arc::new(AtomicUsize::new(0));
	let (keep_alive, _) = supervisor(counting_handler(&count, false));

	assert!(keep_alive.start());
	sleep(INTERVAL * 3 + INTERVAL / 2).await;
	let first = count.load(Ordering::SeqCst);
	assert_eq!(first, 3);

	sleep(INTERVAL * 2).await;
	let second = count.load(Ordering::SeqCst);
	assert!(second > first, "expected {second} > {first}");

	let status = keep_alive.status();
	assert_eq!(status.phase, KeepAlivePhase::Armed);
	assert_eq!(status.probes, second as u64);
	assert_eq!(status.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_stops_for_good() {
	let count = Arc::new(AtomicUsize::new(0));
	let (keep_alive, _) = supervisor(counting_handler(&count, true));

	keep_alive.start();
	sleep(INTERVAL + INTERVAL / 2).await;
	assert_eq!(count.load(Ordering::SeqCst), 1);

	sleep(INTERVAL * 5).await;
	assert_eq!(count.load(Ordering::SeqCst), 1, "handler must not be retried");

	let status = keep_alive.status();
	assert_eq!(status.phase, KeepAlivePhase::Stopped);
	assert_eq!(status.probes, 0);
	let last_error = status.last_error.unwrap();
	assert!(last_error.contains("session expired"), "got: {last_error}");
	assert!(!keep_alive.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_traffic_postpones_probe() {
	let count = Arc::new(AtomicUsize::new(0));
	let (keep_alive, inner) = supervisor(counting_handler(&count, false));
	inner.push_ok(json!(1));
	inner.push_ok(json!(2));

	keep_alive.start();
	sleep(INTERVAL * 6 / 10).await;
	keep_alive.send(ping()).await.unwrap();
	sleep(INTERVAL * 6 / 10).await;
	keep_alive.send(ping()).await.unwrap();

	// Last traffic at 120ms, so nothing fires before 220ms.
	sleep(INTERVAL * 9 / 10).await;
	assert_eq!(count.load(Ordering::SeqCst), 0);

	sleep(INTERVAL / 2).await;
	assert_eq!(count.load(Ordering::SeqCst), 1);
	assert_eq!(keep_alive.status().activity, 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_send_is_not_activity() {
	let count = Arc::new(AtomicUsize::new(0));
	let (keep_alive, inner) = supervisor(counting_handler(&count, false));
	inner.push_err(Error::transient("connection reset"));

	keep_alive.start();
	let err = keep_alive.send(ping()).await.unwrap_err();
	assert!(err.is_temporary());
	assert_eq!(keep_alive.status().activity, 0);
	assert_eq!(inner.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
	let count = Arc::new(AtomicUsize::new(0));
	let (keep_alive, _) = supervisor(counting_handler(&count, false));

	assert!(keep_alive.start());
	assert!(!keep_alive.start());
	sleep(INTERVAL * 3 + INTERVAL / 2).await;

	// A second timer task would double the probe count.
	assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_timer() {
	let count = Arc::new(AtomicUsize::new(0));
	let (keep_alive, _) = supervisor(counting_handler(&count, false));

	keep_alive.start();
	sleep(INTERVAL / 2).await;
	keep_alive.shutdown();
	sleep(INTERVAL * 5).await;

	assert_eq!(count.load(Ordering::SeqCst), 0);
	assert_eq!(keep_alive.phase(), KeepAlivePhase::Stopped);
	assert!(!keep_alive.start(), "stopped is terminal");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_probe() {
	let count = Arc::new(AtomicUsize::new(0));
	let calls = Arc::clone(&count);
	let handler = probe_handler(move |_transport| {
		calls.fetch_add(1, Ordering::SeqCst);
		std::future::pending::<Result<()>>()
	});
	let (keep_alive, _) = supervisor(handler);

	keep_alive.start();
	sleep(INTERVAL + INTERVAL / 2).await;
	assert_eq!(keep_alive.phase(), KeepAlivePhase::Probing);

	keep_alive.shutdown();
	assert_eq!(keep_alive.phase(), KeepAlivePhase::Stopped);
	sleep(INTERVAL * 5).await;

	let status = keep_alive.status();
	assert_eq!(status.phase, KeepAlivePhase::Stopped);
	assert_eq!(status.probes, 0);
	assert_eq!(status.last_error, None);
	assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_probe_times_out() {
	let handler = probe_handler(|_transport| std::future::pending::<Result<()>>());
	let (keep_alive, _) = supervisor(handler);
	let keep_alive = keep_alive.with_probe_timeout(Duration::from_millis(50));

	keep_alive.start();
	sleep(INTERVAL + Duration::from_millis(80)).await;

	let status = keep_alive.status();
	assert_eq!(status.phase, KeepAlivePhase::Stopped);
	assert!(status.last_error.unwrap().contains("Timeout"));
}

#[tokio::test(start_paused = true)]
async fn test_probe_receives_wrapped_transport() {
	let (keep_alive, inner) = supervisor(probe_handler(|transport: Arc<dyn Transport>| async move {
		transport.send(ping()).await.map(|_| ())
	}));

	keep_alive.start();
	sleep(INTERVAL * 2 + INTERVAL / 2).await;

	assert_eq!(inner.calls(), 2);
	assert_eq!(inner.sent_methods(), vec!["ServiceInstance.CurrentTime"; 2]);
	// Probe traffic goes around the supervisor, so it is not counted as activity.
	assert_eq!(keep_alive.status().activity, 0);
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_timer() {
	let count = Arc::new(AtomicUsize::new(0));
	let (keep_alive, _) = supervisor(counting_handler(&count, false));

	keep_alive.start();
	drop(keep_alive);
	sleep(INTERVAL * 3).await;

	assert_eq!(count.load(Ordering::SeqCst), 0);
}
