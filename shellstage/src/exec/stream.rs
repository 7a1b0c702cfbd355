//! Incremental draining of a single output stream.

use crate::cancellation::CancellationToken;
use crate::errors::StreamReadError;
use crate::logging::StageLogger;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default size of each read, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Everything read from one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamCapture {
    /// The accumulated text.
    pub text: String,
    /// Number of non-empty reads.
    pub chunks: usize,
    /// The read failure that ended the drain early, if any.
    pub read_error: Option<StreamReadError>,
}

/// Reads a stream to exhaustion, logging each chunk as it arrives.
#[derive(Debug, Clone)]
pub struct StreamCollector {
    tag: String,
    chunk_size: usize,
    logger: Arc<dyn StageLogger>,
}

impl StreamCollector {
    /// Creates a collector that tags its log lines with `tag`.
    #[must_use]
    pub fn new(tag: impl Into<String>, logger: Arc<dyn StageLogger>) -> Self {
        Self {
            tag: tag.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            logger,
        }
    }

    /// Sets the read size. Zero is treated as one.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the log tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Drains `reader` until end-of-stream or a read error.
    pub async fn drain<R>(&self, reader: R) -> StreamCapture
    where
        R: AsyncRead + Unpin,
    {
        self.drain_until(reader, None).await
    }

    /// Drains `reader`, also stopping when `stop` is cancelled.
    ///
    /// Output read before a read error or a stop is always returned.
    pub async fn drain_until<R>(
        &self,
        mut reader: R,
        stop: Option<&CancellationToken>,
    ) -> StreamCapture
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = Vec::new();
        let mut chunk = vec![0u8; self.chunk_size];
        let mut capture = StreamCapture::default();

        loop {
            let read = match stop {
                Some(stop) => tokio::select! {
                    read = reader.read(&mut chunk) => read,
                    reason = stop.cancelled() => {
                        self.logger.debug(&format!(
                            "[command] {} drain stopped: {reason}",
                            self.tag
                        ));
                        break;
                    }
                },
                None => reader.read(&mut chunk).await,
            };

            match read {
                Ok(0) => break,
                Ok(n) => {
                    let bytes = &chunk[..n];
                    buffer.extend_from_slice(bytes);
                    capture.chunks += 1;
                    self.logger.info(&format!(
                        "[command] {} output: {}",
                        self.tag,
                        String::from_utf8_lossy(bytes)
                    ));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    let err = StreamReadError::new(&self.tag, buffer.len(), &e);
                    self.logger.error(&format!("ERROR: {err}"));
                    capture.read_error = Some(err);
                    break;
                }
            }
        }

        // Decode once so multibyte characters split across chunks survive.
        capture.text = String::from_utf8_lossy(&buffer).into_owned();
        capture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{CollectingLogger, LogLevel};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn collector(tag: &str) -> (StreamCollector, Arc<CollectingLogger>) {
        let logger = Arc::new(CollectingLogger::new());
        (StreamCollector::new(tag, logger.clone()), logger)
    }

    #[tokio::test]
    async fn test_single_chunk_logs_once() {
        let (collector, logger) = collector("exec");
        let reader = tokio_test::io::Builder::new().read(b"abc").build();

        let capture = collector.drain(reader).await;

        assert_eq!(capture.text, "abc");
        assert_eq!(capture.chunks, 1);
        assert!(capture.read_error.is_none());
        assert_eq!(logger.messages_at(LogLevel::Info), vec!["[command] exec output: abc"]);
    }

    #[tokio::test]
    async fn test_one_log_line_per_read() {
        let (collector, logger) = collector("only_if");
        let reader = tokio_test::io::Builder::new()
            .read(b"first ")
            .read(b"second")
            .build();

        let capture = collector.drain(reader).await;

        assert_eq!(capture.text, "first second");
        assert_eq!(capture.chunks, 2);
        assert_eq!(
            logger.messages_at(LogLevel::Info),
            vec!["[command] only_if output: first ", "[command] only_if output: second"]
        );
    }

    #[tokio::test]
    async fn test_chunk_size_bounds_each_read() {
        let (collector, logger) = collector("exec");
        let collector = collector.with_chunk_size(2);

        let capture = collector.drain(&b"abcde"[..]).await;

        assert_eq!(capture.text, "abcde");
        assert_eq!(capture.chunks, 3);
        assert_eq!(logger.len(), 3);
    }

    #[tokio::test]
    async fn test_read_error_keeps_partial_output() {
        let (collector, logger) = collector("exec");
        let reader = tokio_test::io::Builder::new()
            .read(b"abc")
            .read_error(std::io::Error::new(ErrorKind::BrokenPipe, "pipe went away"))
            .build();

        let capture = collector.drain(reader).await;

        assert_eq!(capture.text, "abc");
        let err = capture.read_error.unwrap();
        assert_eq!(err.bytes_read, 3);
        assert_eq!(err.tag, "exec");
        let errors = logger.messages_at(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("pipe went away"));
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        let (collector, _logger) = collector("exec");
        let collector = collector.with_chunk_size(1);

        let capture = collector.drain("héllo".as_bytes()).await;

        assert_eq!(capture.text, "héllo");
        assert_eq!(capture.chunks, 6);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let (collector, logger) = collector("exec");
        let capture = collector.drain(&b""[..]).await;
        assert_eq!(capture, StreamCapture::default());
        assert!(logger.is_empty());
    }

    #[tokio::test]
    async fn test_stop_returns_partial_output() {
        let (collector, _logger) = collector("exec");
        let (reader, mut writer) = tokio::io::duplex(64);
        writer.write_all(b"partial").await.unwrap();

        let stop = Arc::new(CancellationToken::new());
        let drain = {
            let stop = stop.clone();
            tokio::spawn(async move { collector.drain_until(reader, Some(&stop)).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.cancel("grace period elapsed");

        let capture = tokio::time::timeout(Duration::from_secs(2), drain)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(capture.text, "partial");
        assert!(capture.read_error.is_none());
        drop(writer);
    }
}
