//! Last-write-wins preview sessions.
//!
//! Each session runs at most one preview at a time. Starting a new one
//! aborts the task of the previous one, and a task that completes after
//! being replaced is reported as stale instead of returning its result.
//! A caller that goes away (client disconnect) aborts its task and clears
//! its session entry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::task::AbortHandle;

/// Identifies a preview session: one connection, one client session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub connection_id: String,
    pub client_session: String,
}

impl SessionKey {
    pub fn new(connection_id: impl Into<String>, client_session: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            client_session: client_session.into(),
        }
    }
}

#[derive(Debug)]
struct InFlight {
    request: u64,
    abort: AbortHandle,
}

/// Outcome of a session task.
#[derive(Debug)]
pub enum SessionOutcome<T> {
    /// The task was the latest request and completed.
    Completed(T),
    /// A newer request replaced this one.
    Superseded,
    /// The task panicked.
    Failed(String),
}

/// Tracks the in-flight request of every preview session.
#[derive(Debug, Default)]
pub struct PreviewSessions {
    next_request: AtomicU64,
    in_flight: Mutex<HashMap<SessionKey, InFlight>>,
}

impl PreviewSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` as the latest request of `key`.
    pub async fn run<F>(&self, key: SessionKey, task: F) -> SessionOutcome<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let request = self.next_request.fetch_add(1, Ordering::Relaxed) + 1;

        let (handle, registration) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            let handle = tokio::spawn(task);
            let previous = in_flight.insert(
                key.clone(),
                InFlight {
                    request,
                    abort: handle.abort_handle(),
                },
            );
            if let Some(previous) = previous {
                tracing::debug!(
                    "Preview request {} supersedes {} for connection {}",
                    request,
                    previous.request,
                    key.connection_id
                );
                previous.abort.abort();
            }
            let registration = Registration {
                sessions: self,
                key,
                request,
                abort: handle.abort_handle(),
                finished: false,
            };
            (handle, registration)
        };

        let outcome = handle.await;

        if !registration.finish() {
            return SessionOutcome::Superseded;
        }

        match outcome {
            Ok(value) => SessionOutcome::Completed(value),
            Err(e) if e.is_cancelled() => SessionOutcome::Superseded,
            Err(e) => SessionOutcome::Failed(e.to_string()),
        }
    }

    /// Number of sessions with a request in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Remove the entry of `key` if it still belongs to `request`.
    fn release(&self, key: &SessionKey, request: u64) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        match in_flight.get(key) {
            Some(current) if current.request == request => {
                in_flight.remove(key);
                true
            }
            _ => false,
        }
    }
}

/// A request's claim on its session.
///
/// Dropped without [`Registration::finish`] (the caller was cancelled), it
/// aborts the task and releases the session entry.
struct Registration<'a> {
    sessions: &'a PreviewSessions,
    key: SessionKey,
    request: u64,
    abort: AbortHandle,
    finished: bool,
}

impl Registration<'_> {
    /// Release the session entry. Returns whether this was still the latest
    /// request of the session.
    fn finish(mut self) -> bool {
        self.finished = true;
        self.sessions.release(&self.key, self.request)
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.abort.abort();
        if self.sessions.release(&self.key, self.request) {
            tracing::debug!(
                "Preview request {} abandoned for connection {}",
                self.request,
                self.key.connection_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_request_completes() {
        let sessions = PreviewSessions::new();
        let outcome = sessions
            .run(SessionKey::new("c1", "s1"), async { 42 })
            .await;
        assert!(matches!(outcome, SessionOutcome::Completed(42)));
        assert_eq!(sessions.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_stale_request_is_never_surfaced() {
        let sessions = Arc::new(PreviewSessions::new());
        let stale_finished = Arc::new(AtomicBool::new(false));

        let first = {
            let sessions = sessions.clone();
            let stale_finished = stale_finished.clone();
            tokio::spawn(async move {
                sessions
                    .run(SessionKey::new("c1", "s1"), async move {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        stale_finished.store(true, Ordering::SeqCst);
                        "stale"
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = sessions
            .run(SessionKey::new("c1", "s1"), async { "fresh" })
            .await;

        assert!(matches!(second, SessionOutcome::Completed("fresh")));
        assert!(matches!(first.await.unwrap(), SessionOutcome::Superseded));

        // The stale task was aborted before it could finish
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!stale_finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let sessions = Arc::new(PreviewSessions::new());

        let other = {
            let sessions = sessions.clone();
            tokio::spawn(async move {
                sessions
                    .run(SessionKey::new("c1", "s1"), async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        1
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let outcome = sessions
            .run(SessionKey::new("c1", "s2"), async { 2 })
            .await;

        assert!(matches!(outcome, SessionOutcome::Completed(2)));
        assert!(matches!(other.await.unwrap(), SessionOutcome::Completed(1)));
    }

    #[tokio::test]
    async fn test_abandoned_request_is_cleaned_up() {
        let sessions = Arc::new(PreviewSessions::new());
        let task_finished = Arc::new(AtomicBool::new(false));

        let caller = {
            let sessions = sessions.clone();
            let task_finished = task_finished.clone();
            tokio::spawn(async move {
                sessions
                    .run(SessionKey::new("c1", "tab-42"), async move {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        task_finished.store(true, Ordering::SeqCst);
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sessions.in_flight(), 1);
        caller.abort();

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(sessions.in_flight(), 0);
        assert!(!task_finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_abandoned_stale_request_keeps_newer_entry() {
        let sessions = Arc::new(PreviewSessions::new());

        let first = {
            let sessions = sessions.clone();
            tokio::spawn(async move {
                sessions
                    .run(SessionKey::new("c1", "s1"), async {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = {
            let sessions = sessions.clone();
            tokio::spawn(async move {
                sessions
                    .run(SessionKey::new("c1", "s1"), async {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        "fresh"
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Dropping the replaced caller must not clear the newer entry.
        first.abort();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sessions.in_flight(), 1);

        assert!(matches!(second.await.unwrap(), SessionOutcome::Completed("fresh")));
        assert_eq!(sessions.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_fails() {
        let sessions = PreviewSessions::new();
        let outcome: SessionOutcome<()> = sessions
            .run(SessionKey::new("c1", "s1"), async { panic!("boom") })
            .await;
        assert!(matches!(outcome, SessionOutcome::Failed(_)));
    }
}
