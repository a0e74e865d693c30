use crate::series_reader::{SeriesPayload, SeriesReadError, SeriesReader};
use crate::volume::Volume;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error)]
pub enum SeriesDecodeError {
    #[error(transparent)]
    Read(#[from] SeriesReadError),

    #[error("series decode task did not complete: {0}")]
    TaskFailed(String),

    #[error("series decoder is no longer running")]
    WorkerGone,
}

struct SeriesRequest {
    payload: SeriesPayload,
    reply: oneshot::Sender<Result<Volume, SeriesDecodeError>>,
}

type ReaderFn = fn(&SeriesPayload) -> Result<Volume, SeriesReadError>;

/// Background series decoder: an isolated task that consumes series
/// payloads over a channel and answers every request with exactly one
/// tagged reply.
///
/// A failing or panicking reader surfaces as an error reply; the caller
/// is never left waiting. Requests are handled one at a time in arrival
/// order, with no cancellation once a decode has started. The worker
/// exits when the last [`SeriesDecoder`] handle is dropped.
#[derive(Clone)]
pub struct SeriesDecoder {
    requests: mpsc::Sender<SeriesRequest>,
}

impl SeriesDecoder {
    /// Spawn the worker task on the current tokio runtime.
    pub fn spawn() -> Self {
        Self::spawn_with(SeriesReader::read)
    }

    fn spawn_with(reader: ReaderFn) -> Self {
        let (requests, inbox) = mpsc::channel(16);
        tokio::spawn(Self::run(inbox, reader));
        Self { requests }
    }

    /// Decode a series, suspending until the worker replies.
    pub async fn decode(&self, payload: SeriesPayload) -> Result<Volume, SeriesDecodeError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(SeriesRequest { payload, reply })
            .await
            .map_err(|_| SeriesDecodeError::WorkerGone)?;
        response.await.map_err(|_| SeriesDecodeError::WorkerGone)?
    }

    async fn run(mut inbox: mpsc::Receiver<SeriesRequest>, reader: ReaderFn) {
        while let Some(SeriesRequest { payload, reply }) = inbox.recv().await {
            let outcome = tokio::task::spawn_blocking(move || reader(&payload))
                .await
                .map_err(|err| SeriesDecodeError::TaskFailed(err.to_string()))
                .and_then(|read| read.map_err(SeriesDecodeError::from));

            if let Err(err) = &outcome {
                tracing::error!(error = %err, "series decode failed");
            }

            // the requester may have given up; a closed reply channel is fine
            let _ = reply.send(outcome);
        }
    }
}
