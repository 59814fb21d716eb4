// ABOUTME: Stream multiplexer that copies several line streams into one labelled sink.
// ABOUTME: Each source is read concurrently; every line is written to the sink atomically.

use futures::future::join_all;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Labels are padded or truncated to this many characters.
pub const LABEL_WIDTH: usize = 10;

/// Which remote stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTag {
    Out,
    Err,
}

impl StreamTag {
    pub fn marker(&self) -> &'static str {
        match self {
            StreamTag::Out => "out >>",
            StreamTag::Err => "err >>",
        }
    }
}

/// One readable stream plus the label its lines are prefixed with.
pub struct Source<R> {
    label: String,
    tag: Option<StreamTag>,
    reader: R,
}

impl<R> Source<R> {
    pub fn new(label: impl Into<String>, reader: R) -> Self {
        Self {
            label: label.into(),
            tag: None,
            reader,
        }
    }

    /// A source whose lines also carry an `out >>` / `err >>` marker.
    pub fn tagged(label: impl Into<String>, tag: StreamTag, reader: R) -> Self {
        Self {
            label: label.into(),
            tag: Some(tag),
            reader,
        }
    }

    fn prefix(&self) -> String {
        let label = format!("{:<width$.width$}", self.label, width = LABEL_WIDTH);
        match self.tag {
            Some(tag) => format!("{label} {}", tag.marker()),
            None => label,
        }
    }
}

/// Shared output that accepts whole lines from concurrent writers.
///
/// One line is in flight at a time, so lines from different sources never
/// interleave mid-line.
pub struct LineSink<W> {
    inner: Mutex<W>,
}

impl<W: AsyncWrite + Unpin> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    /// Write `prefix`, a space, `line` and a line feed as a single unit.
    pub async fn write_line(&self, prefix: &str, line: &[u8]) -> io::Result<()> {
        let mut record = Vec::with_capacity(prefix.len() + line.len() + 2);
        record.extend_from_slice(prefix.as_bytes());
        record.push(b' ');
        record.extend_from_slice(line);
        record.push(b'\n');

        let mut writer = self.inner.lock().await;
        writer.write_all(&record).await?;
        writer.flush().await
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

/// Copy every source into `sink`, line by line, until all of them reach EOF.
///
/// Returns the number of lines written. Sources are drained even when one of
/// them fails; the first failure is reported afterwards.
pub async fn tee<R, W>(sources: Vec<Source<R>>, sink: &LineSink<W>) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let results = join_all(sources.into_iter().map(|source| copy_lines(source, sink))).await;

    let mut total = 0;
    let mut first_error = None;
    for result in results {
        match result {
            Ok(count) => total += count,
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => tracing::debug!("additional tee source error: {}", e),
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(total),
    }
}

async fn copy_lines<R, W>(source: Source<R>, sink: &LineSink<W>) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let prefix = source.prefix();
    let mut reader = BufReader::new(source.reader);
    let mut line = Vec::new();
    let mut count = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        sink.write_line(&prefix, &line).await?;
        count += 1;
    }

    tracing::debug!(label = %source.label, lines = count, "source drained");
    Ok(count)
}
