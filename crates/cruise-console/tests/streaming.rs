//! Console streaming tests
//!
//! Outcome mapping, ordering, and the release-exactly-once guarantee
//! across every exit path.

use cruise_console::prelude::*;
use cruise_console::{ConsoleBuffer, FileLogSource, InMemoryLogSource};
use cruise_test_utils::{init_tracing, CountingConsole, FailingSink};
use pretty_assertions::assert_eq;
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn job() -> JobIdentifier {
    JobIdentifier::new("build", 7, "test", 1, "unit")
}

#[tokio::test]
async fn test_streams_lines_in_order() {
    init_tracing();
    let console = CountingConsole::with_lines(["a", "b", "c"]);
    let released = console.release_counter();
    let mut sink = Vec::new();

    let outcome = ConsoleStreamer::default()
        .stream(console, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Done { lines: 3 });
    assert_eq!(String::from_utf8(sink).unwrap(), "a\nb\nc\n");
    assert_eq!(released.count(), 1);
}

#[tokio::test]
async fn test_build_log_scenario() {
    let console = CountingConsole::with_lines(["build started", "build passed"]);
    let mut sink = Vec::new();

    let outcome = ConsoleStreamer::default()
        .stream(console, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Done { lines: 2 });
    assert_eq!(sink, b"build started\nbuild passed\n");
    assert_eq!(outcome.status_code(), 200);
}

#[tokio::test]
async fn test_absent_log_is_not_found_without_output() {
    let console = CountingConsole::absent();
    let released = console.release_counter();
    let mut sink = Vec::new();

    let outcome = ConsoleStreamer::default()
        .stream(console, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::NotFound);
    assert_eq!(outcome.status_code(), 404);
    assert!(sink.is_empty());
    assert_eq!(released.count(), 1);
}

#[tokio::test]
async fn test_not_found_error_on_open_maps_to_not_found() {
    let console = CountingConsole::failing_open(io::ErrorKind::NotFound);
    let released = console.release_counter();
    let mut sink = Vec::new();

    let outcome = ConsoleStreamer::default()
        .stream(console, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::NotFound);
    assert_eq!(released.count(), 1);
}

#[tokio::test]
async fn test_other_open_error_propagates() {
    let console = CountingConsole::failing_open(io::ErrorKind::PermissionDenied);
    let released = console.release_counter();
    let mut sink = Vec::new();

    let err = ConsoleStreamer::default()
        .stream(console, &mut sink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::Open(_)));
    assert_eq!(err.io_error().kind(), io::ErrorKind::PermissionDenied);
    assert_eq!(released.count(), 1);
}

#[tokio::test]
async fn test_not_found_before_first_line_is_not_found() {
    let console = CountingConsole::with_lines(Vec::<Vec<u8>>::new()).then_fail(io::ErrorKind::NotFound);
    let mut sink = Vec::new();

    let outcome = ConsoleStreamer::default()
        .stream(console, &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::NotFound);
}

#[tokio::test]
async fn test_mid_stream_read_error_keeps_partial_output() {
    let console = CountingConsole::with_lines(["first"]).then_fail(io::ErrorKind::NotFound);
    let released = console.release_counter();
    let mut sink = Vec::new();

    let err = ConsoleStreamer::default()
        .stream(console, &mut sink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::Read { lines: 1, .. }));
    assert_eq!(sink, b"first\n");
    assert_eq!(released.count(), 1);
}

#[tokio::test]
async fn test_sink_failure_propagates() {
    let console = CountingConsole::with_lines(["one", "two", "three"]);
    let released = console.release_counter();
    let mut sink = FailingSink::after_writes(2);

    let err = ConsoleStreamer::default()
        .stream(console, &mut sink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::Write { lines: 2, .. }));
    assert_eq!(err.io_error().kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(sink.written(), b"one\ntwo\n");
    assert_eq!(released.count(), 1);
}

#[tokio::test]
async fn test_cancellation_while_waiting_releases_once() {
    let console = CountingConsole::with_lines(["partial"]).in_progress().then_stall();
    let released = console.release_counter();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let mut sink = Vec::new();
    let outcome = ConsoleStreamer::default()
        .stream(console, &mut sink, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Cancelled { lines: 1 });
    assert_eq!(sink, b"partial\n");
    assert_eq!(released.count(), 1);
}

#[tokio::test]
async fn test_dropping_stream_future_releases() {
    let console = CountingConsole::with_lines(["x"]).in_progress().then_stall();
    let released = console.release_counter();
    let mut sink = Vec::new();
    let cancel = CancellationToken::new();

    let streamer = ConsoleStreamer::default();
    let result = tokio::time::timeout(
        Duration::from_millis(20),
        streamer.stream(console, &mut sink, &cancel),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(released.count(), 1);
}

#[tokio::test]
async fn test_in_memory_log_streamed_to_concurrent_readers() {
    let source = Arc::new(InMemoryLogSource::new());
    let buffer: Arc<ConsoleBuffer> = source.create(job());
    buffer.append_line("build started");

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let source = Arc::clone(&source);
            tokio::spawn(async move {
                let mut sink = Vec::new();
                let outcome = ConsoleStreamer::default()
                    .stream_job(source.as_ref(), &job(), &mut sink, &CancellationToken::new())
                    .await
                    .unwrap();
                (outcome, sink)
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(10)).await;
    buffer.append_line("build passed");
    buffer.complete();

    for reader in readers {
        let (outcome, sink) = reader.await.unwrap();
        assert_eq!(outcome, StreamOutcome::Done { lines: 2 });
        assert_eq!(sink, b"build started\nbuild passed\n");
    }
    assert_eq!(buffer.open_handles(), 0);
}

#[tokio::test]
async fn test_unknown_job_in_memory_is_not_found() {
    let source = InMemoryLogSource::new();
    let mut sink = Vec::new();

    let outcome = ConsoleStreamer::default()
        .stream_job(&source, &job(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::NotFound);
}

#[tokio::test]
async fn test_file_source_streams_and_reports_missing() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileLogSource::new(dir.path());
    let streamer = ConsoleStreamer::default();

    let mut sink = Vec::new();
    let outcome = streamer
        .stream_job(&source, &job(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, StreamOutcome::NotFound);

    let path = source.console_path(&job());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "build started\nbuild passed\n").unwrap();

    let mut sink = Vec::new();
    let outcome = streamer
        .stream_job(&source, &job(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, StreamOutcome::Done { lines: 2 });
    assert_eq!(sink, b"build started\nbuild passed\n");
}

#[tokio::test]
async fn test_file_source_follows_in_progress_log() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileLogSource::new(dir.path()).with_poll_interval(Duration::from_millis(5));
    let path = source.console_path(&job());
    let job_dir = path.parent().unwrap().to_path_buf();
    std::fs::create_dir_all(&job_dir).unwrap();
    std::fs::write(&path, "compiling\n").unwrap();
    let marker = job_dir.join(cruise_console::file::IN_PROGRESS_MARKER);
    std::fs::write(&marker, "").unwrap();

    let writer_path = path.clone();
    let producer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let mut log = std::fs::OpenOptions::new()
            .append(true)
            .open(&writer_path)
            .unwrap();
        log.write_all(b"tests passed\n").unwrap();
        drop(log);
        std::fs::remove_file(&marker).unwrap();
    });

    let mut sink = Vec::new();
    let outcome = ConsoleStreamer::default()
        .stream_job(&source, &job(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();
    producer.await.unwrap();

    assert_eq!(outcome, StreamOutcome::Done { lines: 2 });
    assert_eq!(sink, b"compiling\ntests passed\n");
}

fn write_job_log(source: &FileLogSource, contents: &[u8]) -> std::path::PathBuf {
    let path = source.console_path(&job());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn test_file_source_passes_invalid_utf8_through() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileLogSource::new(dir.path());
    write_job_log(&source, b"ok\nbinary \xff\xfe here\nafter\n");

    let mut sink = Vec::new();
    let outcome = ConsoleStreamer::default()
        .stream_job(&source, &job(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Done { lines: 3 });
    assert_eq!(sink, b"ok\nbinary \xff\xfe here\nafter\n");
}

#[tokio::test]
async fn test_file_source_streams_latin1_log_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileLogSource::new(dir.path());
    write_job_log(&source, b"caf\xe9\nna\xefve\n");
    let streamer = ConsoleStreamer::new(StreamerConfig::new().with_charset("ISO-8859-1"));

    let mut sink = Vec::new();
    let outcome = streamer
        .stream_job(&source, &job(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(streamer.content_type(), "text/plain; charset=ISO-8859-1");
    assert_eq!(outcome, StreamOutcome::Done { lines: 2 });
    assert_eq!(sink, b"caf\xe9\nna\xefve\n");
}

#[tokio::test]
async fn test_file_source_joins_character_split_across_appends() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileLogSource::new(dir.path()).with_poll_interval(Duration::from_millis(5));
    let path = write_job_log(&source, "résumé ok\ncaf".as_bytes());
    let marker = path.with_file_name(cruise_console::file::IN_PROGRESS_MARKER);
    std::fs::write(&marker, "").unwrap();

    let writer_path = path.clone();
    let producer = tokio::spawn(async move {
        let mut log = std::fs::OpenOptions::new()
            .append(true)
            .open(&writer_path)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        log.write_all(b"\xc3").unwrap();
        log.flush().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        log.write_all(b"\xa9\n").unwrap();
        drop(log);
        std::fs::remove_file(&marker).unwrap();
    });

    let mut sink = Vec::new();
    let outcome = ConsoleStreamer::default()
        .stream_job(&source, &job(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();
    producer.await.unwrap();

    assert_eq!(outcome, StreamOutcome::Done { lines: 2 });
    assert_eq!(String::from_utf8(sink).unwrap(), "résumé ok\ncafé\n");
}

#[tokio::test]
async fn test_file_source_marker_before_log_streams() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileLogSource::new(dir.path()).with_poll_interval(Duration::from_millis(5));
    let path = source.console_path(&job());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let marker = path.with_file_name(cruise_console::file::IN_PROGRESS_MARKER);
    std::fs::write(&marker, "").unwrap();

    let writer_path = path.clone();
    let producer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        std::fs::write(&writer_path, "agent assigned\n").unwrap();
        std::fs::remove_file(&marker).unwrap();
    });

    let mut sink = Vec::new();
    let outcome = ConsoleStreamer::default()
        .stream_job(&source, &job(), &mut sink, &CancellationToken::new())
        .await
        .unwrap();
    producer.await.unwrap();

    assert_eq!(outcome, StreamOutcome::Done { lines: 1 });
    assert_eq!(outcome.status_code(), 200);
    assert_eq!(sink, b"agent assigned\n");
}
