use rollcall_core::{AttendanceRecorder, Identity, Recognition, RecordOutcome};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("failed to spawn recorder thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("recorder thread exited")]
    ChannelClosed,
}

/// Messages sent from input tasks to the recorder thread.
enum RecorderRequest {
    Record {
        label: String,
        reply: oneshot::Sender<RecordOutcome>,
    },
    RecordFrame {
        faces: Vec<Recognition>,
        reply: oneshot::Sender<Vec<(Identity, RecordOutcome)>>,
    },
    ClearCache {
        reply: oneshot::Sender<usize>,
    },
}

/// Clone-safe handle to the recorder thread.
///
/// Every clone talks to the same recorder, so any number of camera feeds
/// can share one ledger without racing the check-then-append sequence.
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<RecorderRequest>,
}

impl RecorderHandle {
    /// Record a single sighting.
    pub async fn record(&self, label: impl Into<String>) -> Result<RecordOutcome, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(RecorderRequest::Record {
            label: label.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| ServiceError::ChannelClosed)
    }

    /// Record every loggable face in one recognized frame.
    pub async fn record_frame(
        &self,
        faces: Vec<Recognition>,
    ) -> Result<Vec<(Identity, RecordOutcome)>, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(RecorderRequest::RecordFrame { faces, reply }).await?;
        rx.await.map_err(|_| ServiceError::ChannelClosed)
    }

    /// Drop the recorder's cooldown cache. Returns how many entries it held.
    pub async fn clear_cache(&self) -> Result<usize, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(RecorderRequest::ClearCache { reply }).await?;
        rx.await.map_err(|_| ServiceError::ChannelClosed)
    }

    async fn send(&self, req: RecorderRequest) -> Result<(), ServiceError> {
        self.tx
            .send(req)
            .await
            .map_err(|_| ServiceError::ChannelClosed)
    }
}

/// Move `recorder` onto a dedicated OS thread and return a handle to it.
///
/// Ledger I/O is blocking, so it stays off the async runtime. The thread
/// exits once every handle has been dropped.
pub fn spawn_recorder(mut recorder: AttendanceRecorder) -> Result<RecorderHandle, ServiceError> {
    let (tx, mut rx) = mpsc::channel::<RecorderRequest>(32);

    std::thread::Builder::new()
        .name("rollcall-recorder".into())
        .spawn(move || {
            tracing::info!("recorder thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    RecorderRequest::Record { label, reply } => {
                        let _ = reply.send(recorder.record(&label));
                    }
                    RecorderRequest::RecordFrame { faces, reply } => {
                        let _ = reply.send(recorder.record_frame(&faces));
                    }
                    RecorderRequest::ClearCache { reply } => {
                        let held = recorder.cached_identities();
                        recorder.clear_cache();
                        let _ = reply.send(held);
                    }
                }
            }
            tracing::info!("recorder thread exiting");
        })
        .map_err(ServiceError::Spawn)?;

    Ok(RecorderHandle { tx })
}
