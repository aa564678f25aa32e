//! Fire-and-forget fan-out to reporters and backends.
//!
//! Every push is spawned as its own background task, so one slow or failing
//! peer never delays the caller or the other peers. Failures are logged only.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use babylon_protocol::{LivePush, LogEntry, SessionView};

use crate::background::BackgroundTasks;
use crate::registry::{BackendRegistry, ReporterRegistry};
use crate::session::SessionEvents;
use crate::transport::Transport;

#[derive(Clone)]
pub struct Notifier {
    backends: Arc<BackendRegistry>,
    reporters: Arc<ReporterRegistry>,
    transport: Arc<dyn Transport>,
    tasks: BackgroundTasks,
}

enum Method {
    Post(Bytes),
    Delete,
}

impl Notifier {
    pub fn new(
        backends: Arc<BackendRegistry>,
        reporters: Arc<ReporterRegistry>,
        transport: Arc<dyn Transport>,
        tasks: BackgroundTasks,
    ) -> Self {
        Self {
            backends,
            reporters,
            transport,
            tasks,
        }
    }

    /// Push one entry to every live reporter.
    pub fn push_live(&self, session_id: Uuid, entry: &LogEntry) {
        let reporters = self.reporters.live();
        if reporters.is_empty() {
            return;
        }

        let push = LivePush {
            session: session_id.to_string(),
            message: entry.clone(),
        };
        let Some(body) = encode(&push) else { return };

        for reporter in reporters {
            self.send(reporter.endpoint("live"), Method::Post(body.clone()));
        }
    }

    /// Push the full session to every reporter, live or not.
    pub fn push_final_report(&self, view: &SessionView) {
        let reporters = self.reporters.list_all();
        if reporters.is_empty() {
            return;
        }
        let Some(body) = encode(view) else { return };

        for reporter in reporters {
            self.send(reporter.endpoint("report"), Method::Post(body.clone()));
        }
    }

    /// Tell every backend of both kinds that the session is over.
    pub fn notify_backends_of_session_end(&self, session_id: Uuid) {
        for (kind, backend) in self.backends.snapshot() {
            let url = backend.endpoint(kind, &format!("session/{session_id}"));
            self.send(url, Method::Delete);
        }
    }

    fn send(&self, url: String, method: Method) {
        let transport = Arc::clone(&self.transport);
        self.tasks.spawn(async move {
            let (verb, result) = match method {
                Method::Post(body) => ("POST", transport.post_json(&url, body).await),
                Method::Delete => ("DELETE", transport.delete(&url).await),
            };
            match result {
                Ok(response) if response.is_ok() => {
                    debug!(method = verb, url = %url, "Notification delivered");
                }
                Ok(response) => {
                    warn!(
                        method = verb,
                        url = %url,
                        status = response.status,
                        "Peer rejected notification"
                    );
                }
                Err(e) => {
                    warn!(method = verb, error = %e, "Notification failed");
                }
            }
        });
    }
}

impl SessionEvents for Notifier {
    fn log_appended(&self, session_id: Uuid, entry: &LogEntry) {
        self.push_live(session_id, entry);
    }

    fn session_ended(&self, view: &SessionView) {
        self.push_final_report(view);
        self.notify_backends_of_session_end(view.uuid);
    }
}

fn encode<T: Serialize>(value: &T) -> Option<Bytes> {
    match serde_json::to_vec(value) {
        Ok(body) => Some(Bytes::from(body)),
        Err(e) => {
            warn!(error = %e, "Failed to encode notification");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
