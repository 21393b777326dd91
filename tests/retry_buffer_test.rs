use bytes::Bytes;
use futures::future::join_all;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use syslog_appender::domain::AppenderError;
use syslog_appender::encoder::EncodedRecord;
use syslog_appender::reliability::{ConnectionState, DrainOutcome, RetryBuffer};
use syslog_appender::sender::{DeliveryContext, DeliverySession, TransmissionError};
use tempfile::TempDir;

/// Records every transmit; optionally refuses them.
#[derive(Default)]
struct RecordingSession {
    refuse: bool,
    attempts: AtomicUsize,
    transmitted: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSession {
    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }
}

impl DeliverySession for RecordingSession {
    async fn deliver(
        &self,
        _record: &EncodedRecord,
        _ctx: DeliveryContext<'_>,
    ) -> Result<(), AppenderError> {
        Ok(())
    }

    async fn transmit(&self, payload: &[u8]) -> Result<(), TransmissionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(TransmissionError::ConnectFailed(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            )));
        }
        self.transmitted.lock().push(payload.to_vec());
        Ok(())
    }
}

fn record(text: &str) -> EncodedRecord {
    EncodedRecord::from(Bytes::from(format!("<135>1 - - - - - - {text}\n")))
}

fn connected() -> ConnectionState {
    let state = ConnectionState::new();
    state.mark_connected();
    state
}

#[tokio::test]
async fn test_file_is_created_lazily_and_grows_by_concatenation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("buffer");
    let buffer = RetryBuffer::new(&path);

    assert!(!path.exists());

    buffer.append(&record("hello")).await.unwrap();
    assert!(path.exists());
    buffer.append(&record("world")).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        "<135>1 - - - - - - hello\n<135>1 - - - - - - world\n"
    );
}

#[tokio::test]
async fn test_draining_an_empty_buffer_opens_no_connection() {
    let temp_dir = TempDir::new().unwrap();
    let buffer = RetryBuffer::new(temp_dir.path().join("buffer"));
    let session = RecordingSession::default();

    let outcome = buffer.drain(&session, &connected()).await;

    assert_eq!(outcome, DrainOutcome::Idle);
    assert_eq!(session.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_drain_is_skipped_while_disconnected() {
    let temp_dir = TempDir::new().unwrap();
    let buffer = RetryBuffer::new(temp_dir.path().join("buffer"));
    buffer.append(&record("queued")).await.unwrap();
    let session = RecordingSession::default();

    let outcome = buffer.drain(&session, &ConnectionState::new()).await;

    assert_eq!(outcome, DrainOutcome::Idle);
    assert_eq!(session.attempts.load(Ordering::SeqCst), 0);
    assert!(!buffer.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_successful_drain_sends_backlog_as_one_unit_and_truncates() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("buffer");
    let buffer = RetryBuffer::new(&path);
    buffer.append(&record("hello")).await.unwrap();
    buffer.append(&record("world")).await.unwrap();
    let session = RecordingSession::default();
    let state = connected();

    let outcome = buffer.drain(&session, &state).await;

    assert!(outcome.is_drained());
    assert_eq!(
        *session.transmitted.lock(),
        vec![b"<135>1 - - - - - - hello\n<135>1 - - - - - - world\n".to_vec()]
    );
    assert!(state.is_connected());
    assert!(path.exists());
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
}

#[tokio::test]
async fn test_failed_drain_leaves_file_untouched_and_disconnects() {
    let temp_dir = TempDir::new().unwrap();
    let buffer = RetryBuffer::new(temp_dir.path().join("buffer"));
    buffer.append(&record("hello")).await.unwrap();
    let before = buffer.contents().await.unwrap();
    let session = RecordingSession::refusing();
    let state = connected();

    let outcome = buffer.drain(&session, &state).await;

    assert_eq!(outcome, DrainOutcome::Failed);
    assert_eq!(session.attempts.load(Ordering::SeqCst), 1);
    assert!(!state.is_connected());
    assert_eq!(buffer.contents().await.unwrap(), before);
}

#[tokio::test]
async fn test_concurrent_appends_never_interleave() {
    let temp_dir = TempDir::new().unwrap();
    let buffer = Arc::new(RetryBuffer::new(temp_dir.path().join("buffer")));

    let appends = (0..32).map(|i| {
        let buffer = buffer.clone();
        tokio::spawn(async move {
            let long_message = format!("record-{i:02}-{}", "x".repeat(512));
            buffer.append(&record(&long_message)).await
        })
    });
    for result in join_all(appends).await {
        result.unwrap().unwrap();
    }

    let contents = String::from_utf8(buffer.contents().await.unwrap()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 32);
    for line in lines {
        assert!(line.starts_with("<135>1 - - - - - - record-"));
        assert!(line.ends_with(&"x".repeat(512)));
    }
}

#[tokio::test]
async fn test_append_failure_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    // A directory where the file should be.
    let buffer = RetryBuffer::new(temp_dir.path());

    let err = buffer.append(&record("lost")).await.unwrap_err();
    assert!(err.to_string().contains("append"));
}
