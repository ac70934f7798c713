use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Timing and progress captured for one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub started_at_utc: DateTime<Utc>,
    pub wall_ms: u64,
    /// CPU time of the thread that started the monitor. `None` when the
    /// platform has no per-thread clock or the record was taken elsewhere.
    pub cpu_ms: Option<u64>,
    pub progress_done: u64,
    pub progress_total: u64,
    pub stop_requested: bool,
}

/// Returned by [`Monitor::check`] once a stop has been requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("run cancelled by stop request")
    }
}

impl std::error::Error for Cancelled {}

#[derive(Debug)]
struct Started {
    at_utc: DateTime<Utc>,
    instant: Instant,
    cpu: Option<Duration>,
    thread: ThreadId,
}

#[derive(Debug, Default)]
struct Shared {
    stop_requested: AtomicBool,
    running: AtomicBool,
    stop_transitions: AtomicU32,
    progress_done: AtomicU64,
    progress_total: AtomicU64,
    status: Mutex<String>,
    started: Mutex<Option<Started>>,
    record: Mutex<Option<PerformanceRecord>>,
}

/// Progress and cancellation channel between the controller and a running
/// module body.
///
/// Cloning yields another handle to the same state, so a watchdog thread can
/// hold one and call [`request_stop`](Self::request_stop) while the body runs.
/// Cancellation is cooperative: nothing interrupts the body.
#[derive(Clone, Debug, Default)]
pub struct Monitor {
    shared: Arc<Shared>,
}

// A panicking body must not make the monitor unusable for the controller.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset progress and take the start timestamps. A stop requested
    /// before `start` stays pending.
    pub fn start(&self) {
        let s = &self.shared;
        s.progress_done.store(0, Ordering::Relaxed);
        s.progress_total.store(0, Ordering::Relaxed);
        *lock(&s.record) = None;
        *lock(&s.started) = Some(Started {
            at_utc: Utc::now(),
            instant: Instant::now(),
            cpu: thread_cpu_time(),
            thread: thread::current().id(),
        });
        s.running.store(true, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once a stop was requested; bodies use it with `?`.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_stop_requested() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn set_progress(&self, done: u64, total: u64) {
        self.shared.progress_total.store(total, Ordering::Relaxed);
        self.shared.progress_done.store(done, Ordering::Relaxed);
    }

    /// (done, total)
    pub fn progress(&self) -> (u64, u64) {
        (
            self.shared.progress_done.load(Ordering::Relaxed),
            self.shared.progress_total.load(Ordering::Relaxed),
        )
    }

    pub fn set_status(&self, status: impl Into<String>) {
        *lock(&self.shared.status) = status.into();
    }

    pub fn status(&self) -> String {
        lock(&self.shared.status).clone()
    }

    /// Stop the monitor from outside the body: signals the body through
    /// [`check`](Self::check) and marks the monitor stopped. A run stopped
    /// this way ends cancelled. Idempotent and safe after completion.
    /// Returns true only for the call that performed the transition.
    pub fn stop(&self) -> bool {
        self.request_stop();
        self.transition()
    }

    fn transition(&self) -> bool {
        let was_running = self.shared.running.swap(false, Ordering::SeqCst);
        if was_running {
            self.shared.stop_transitions.fetch_add(1, Ordering::SeqCst);
        }
        was_running
    }

    /// Number of running -> stopped transitions since creation.
    pub fn stop_count(&self) -> u32 {
        self.shared.stop_transitions.load(Ordering::SeqCst)
    }

    /// Mark the monitor stopped (if still running) and freeze the
    /// performance record. Unlike [`stop`](Self::stop) this is the normal end
    /// of a run and does not count as a stop request.
    pub fn finish(&self) -> PerformanceRecord {
        self.conclude().0
    }

    /// `finish`, also reporting whether this call ended the run (false when
    /// someone else stopped the monitor first).
    pub(crate) fn conclude(&self) -> (PerformanceRecord, bool) {
        let ended_here = self.transition();
        let record = self.snapshot();
        *lock(&self.shared.record) = Some(record.clone());
        (record, ended_here)
    }

    /// The frozen record after [`finish`](Self::finish), a live snapshot before.
    pub fn performance(&self) -> PerformanceRecord {
        if let Some(r) = lock(&self.shared.record).as_ref() {
            return r.clone();
        }
        self.snapshot()
    }

    fn snapshot(&self) -> PerformanceRecord {
        let (done, total) = self.progress();
        let started = lock(&self.shared.started);
        let (started_at_utc, wall_ms, cpu_ms) = match started.as_ref() {
            Some(st) => {
                let cpu_ms = if st.thread == thread::current().id() {
                    match (st.cpu, thread_cpu_time()) {
                        (Some(begin), Some(now)) => Some(millis(now.saturating_sub(begin))),
                        _ => None,
                    }
                } else {
                    None
                };
                (st.at_utc, millis(st.instant.elapsed()), cpu_ms)
            }
            None => (Utc::now(), 0, None),
        };
        PerformanceRecord {
            started_at_utc,
            wall_ms,
            cpu_ms,
            progress_done: done,
            progress_total: total,
            stop_requested: self.is_stop_requested(),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(unix)]
fn thread_cpu_time() -> Option<Duration> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_THREAD_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        return None;
    }
    let secs = u64::try_from(ts.tv_sec).ok()?;
    let nanos = u32::try_from(ts.tv_nsec).ok()?;
    Some(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn thread_cpu_time() -> Option<Duration> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_idempotent_and_counted_once() {
        let m = Monitor::new();
        m.start();
        assert!(m.stop());
        assert!(!m.stop());
        assert!(!m.stop());
        assert_eq!(m.stop_count(), 1);
        assert!(!m.is_running());
    }

    #[test]
    fn stop_before_start_leaves_a_pending_request() {
        let m = Monitor::new();
        assert!(!m.stop());
        assert_eq!(m.stop_count(), 0);
        m.start();
        assert!(m.is_stop_requested());
        assert_eq!(m.check(), Err(Cancelled));
    }

    #[test]
    fn stop_signals_the_body() {
        let m = Monitor::new();
        m.start();
        let watchdog = m.clone();
        std::thread::spawn(move || watchdog.stop()).join().unwrap();
        assert_eq!(m.check(), Err(Cancelled));
        let (rec, ended_here) = m.conclude();
        assert!(!ended_here);
        assert!(rec.stop_requested);
        assert_eq!(m.stop_count(), 1);
    }

    #[test]
    fn request_stop_is_visible_through_clones() {
        let m = Monitor::new();
        m.start();
        let watchdog = m.clone();
        let h = std::thread::spawn(move || watchdog.request_stop());
        h.join().unwrap();
        assert!(m.is_stop_requested());
        assert_eq!(m.check(), Err(Cancelled));
    }

    #[test]
    fn finish_freezes_the_record() {
        let m = Monitor::new();
        m.start();
        m.set_progress(3, 4);
        m.set_status("working");
        let rec = m.finish();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(m.performance(), rec);
        assert_eq!((rec.progress_done, rec.progress_total), (3, 4));
        assert_eq!(m.status(), "working");
        assert!(!rec.stop_requested);
        #[cfg(target_os = "linux")]
        assert!(rec.cpu_ms.is_some());
    }

    #[test]
    fn restart_clears_record_and_progress() {
        let m = Monitor::new();
        m.start();
        m.set_progress(2, 2);
        let first = m.finish();
        m.start();
        assert!(m.is_running());
        assert_eq!(m.progress(), (0, 0));
        assert_eq!(first.progress_done, 2);
        assert_eq!(m.performance().progress_done, 0);
        assert_eq!(m.stop_count(), 1);
    }
}
