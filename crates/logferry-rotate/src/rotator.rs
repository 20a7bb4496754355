//! Splits an endless log stream into one append-only file per UTC day.
//!
//! Days are counted as `unix_time / 86400`, so the boundary is UTC midnight.
//! A day file is opened lazily when the first bytes of that day arrive, and
//! the previous file is only closed once a chunk ends in a newline, so a
//! line started before midnight finishes in the file where it began.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::info;

use logferry_core::{constants, Result};

/// Wall-clock source, in whole seconds since the Unix epoch.
type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

struct DayFile {
    file: File,
    day: i64,
}

/// Copies its input stream into per-day files under a directory.
///
/// Filesystem errors are fatal: if the log store cannot be written there is
/// nowhere left to record anything, so the error propagates to the caller.
pub struct Rotator {
    dir: PathBuf,
    prefix: String,
    clock: Clock,
    current: Option<DayFile>,
}

impl Rotator {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self::with_clock(dir, prefix, Box::new(|| Utc::now().timestamp()))
    }

    fn with_clock(dir: impl Into<PathBuf>, prefix: impl Into<String>, clock: Clock) -> Self {
        Rotator {
            dir: dir.into(),
            prefix: prefix.into(),
            clock,
            current: None,
        }
    }

    /// Consumes the input until end of stream, appending everything to the
    /// store. Returns when the input closes or on the first write failure.
    pub async fn run(mut self, mut input: impl AsyncRead + Unpin) -> Result<()> {
        let mut buf = vec![0u8; constants::ROTATE_BUFFER_SIZE];
        loop {
            let n = input.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            self.append(&buf[..n])?;
        }
    }

    fn append(&mut self, chunk: &[u8]) -> Result<()> {
        let mut current = match self.current.take() {
            Some(current) => current,
            None => {
                let day = (self.clock)() / constants::SECS_PER_DAY;
                self.open_day(day)?
            }
        };
        current.file.write_all(chunk)?;
        current.file.flush()?;

        // Roll only at a line boundary. A chunk that ends mid-line keeps the
        // old file open past midnight until its newline arrives.
        let day_now = (self.clock)() / constants::SECS_PER_DAY;
        if !(day_now > current.day && chunk.ends_with(b"\n")) {
            self.current = Some(current);
        }
        Ok(())
    }

    fn open_day(&mut self, day: i64) -> Result<DayFile> {
        fs::create_dir_all(&self.dir)?;
        let name = constants::day_file_name(&self.prefix, &day_string(day));
        let path = self.dir.join(&name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Logging to {}", path.display());
        self.point_current(&name)?;
        Ok(DayFile { file, day })
    }

    /// Repoints `<prefix>.current` at the named day file.
    fn point_current(&self, name: &str) -> Result<()> {
        let link = self.dir.join(constants::current_link_name(&self.prefix));
        match fs::remove_file(&link) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(name, &link)?;
        #[cfg(not(unix))]
        fs::write(&link, name)?;
        Ok(())
    }
}

fn day_string(day: i64) -> String {
    match DateTime::<Utc>::from_timestamp(day * constants::SECS_PER_DAY, 0) {
        Some(date) => date.format(constants::DAY_FORMAT).to_string(),
        // Only reachable with a clock far outside chrono's range.
        None => format!("day-{}", day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    // 2016-02-27 00:00:00 UTC.
    const DAY_ONE: i64 = 16_858;
    const DAY_ONE_SECS: i64 = DAY_ONE * 86_400;

    struct FakeClock(Arc<AtomicI64>);

    impl FakeClock {
        fn new(secs: i64) -> (Self, Clock) {
            let shared = Arc::new(AtomicI64::new(secs));
            let handle = Arc::clone(&shared);
            (FakeClock(shared), Box::new(move || handle.load(Ordering::SeqCst)))
        }

        fn set(&self, secs: i64) {
            self.0.store(secs, Ordering::SeqCst);
        }
    }

    fn read_day(dir: &std::path::Path, date: &str) -> String {
        let path = dir.join(format!("ferry.{}", date));
        String::from_utf8(fs::read(path).unwrap()).unwrap()
    }

    async fn wait_for_content(dir: &std::path::Path, date: &str, needle: &str) {
        let path = dir.join(format!("ferry.{}", date));
        for _ in 0..500 {
            if let Ok(content) = fs::read(&path) {
                if String::from_utf8_lossy(&content).contains(needle) {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("day file {} never contained {:?}", date, needle);
    }

    #[test]
    fn test_day_string_formats_utc_date() {
        assert_eq!(day_string(DAY_ONE), "2016-02-27");
        assert_eq!(day_string(0), "1970-01-01");
    }

    #[tokio::test]
    async fn test_single_day_collects_all_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let (_clock, clock) = FakeClock::new(DAY_ONE_SECS + 3_600);
        let rotator = Rotator::with_clock(tmp.path(), "ferry", clock);

        let (mut tx, rx) = tokio::io::duplex(1024);
        let task = tokio::spawn(rotator.run(rx));
        tx.write_all(b"one\ntwo\n").await.unwrap();
        drop(tx);
        task.await.unwrap().unwrap();

        assert_eq!(read_day(tmp.path(), "2016-02-27"), "one\ntwo\n");
        let target = fs::read_link(tmp.path().join("ferry.current")).unwrap();
        assert_eq!(target, PathBuf::from("ferry.2016-02-27"));
    }

    #[tokio::test]
    async fn test_midnight_rotation_waits_for_line_boundary() {
        let tmp = tempfile::tempdir().unwrap();
        let (handle, clock) = FakeClock::new(DAY_ONE_SECS + 86_399);
        let rotator = Rotator::with_clock(tmp.path(), "ferry", clock);

        let (mut tx, rx) = tokio::io::duplex(1024);
        let task = tokio::spawn(rotator.run(rx));

        tx.write_all(b"before-midnight\n").await.unwrap();
        wait_for_content(tmp.path(), "2016-02-27", "before-midnight\n").await;

        // Midnight passes while a line is split across two chunks. Both
        // halves must land in the old day's file.
        handle.set(DAY_ONE_SECS + 86_401);
        tx.write_all(b"straddles").await.unwrap();
        wait_for_content(tmp.path(), "2016-02-27", "straddles").await;
        tx.write_all(b"-midnight\n").await.unwrap();
        wait_for_content(tmp.path(), "2016-02-27", "straddles-midnight\n").await;

        tx.write_all(b"new-day\n").await.unwrap();
        drop(tx);
        task.await.unwrap().unwrap();

        assert_eq!(
            read_day(tmp.path(), "2016-02-27"),
            "before-midnight\nstraddles-midnight\n"
        );
        assert_eq!(read_day(tmp.path(), "2016-02-28"), "new-day\n");
        let target = fs::read_link(tmp.path().join("ferry.current")).unwrap();
        assert_eq!(target, PathBuf::from("ferry.2016-02-28"));
    }

    #[tokio::test]
    async fn test_restart_appends_to_existing_day_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("ferry.2016-02-27"), b"earlier\n").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink("ferry.someother", tmp.path().join("ferry.current")).unwrap();

        let (_clock, clock) = FakeClock::new(DAY_ONE_SECS + 10);
        let rotator = Rotator::with_clock(tmp.path(), "ferry", clock);

        let (mut tx, rx) = tokio::io::duplex(1024);
        let task = tokio::spawn(rotator.run(rx));
        tx.write_all(b"later\n").await.unwrap();
        drop(tx);
        task.await.unwrap().unwrap();

        assert_eq!(read_day(tmp.path(), "2016-02-27"), "earlier\nlater\n");
        // The stale pointer from the previous run is replaced, not followed.
        let target = fs::read_link(tmp.path().join("ferry.current")).unwrap();
        assert_eq!(target, PathBuf::from("ferry.2016-02-27"));
    }

    #[tokio::test]
    async fn test_empty_input_creates_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let (_clock, clock) = FakeClock::new(DAY_ONE_SECS);
        let rotator = Rotator::with_clock(tmp.path(), "ferry", clock);

        let (tx, rx) = tokio::io::duplex(1024);
        drop(tx);
        rotator.run(rx).await.unwrap();

        assert!(!tmp.path().join("ferry.2016-02-27").exists());
        assert!(!tmp.path().join("ferry.current").exists());
    }

    #[tokio::test]
    async fn test_clock_moving_backward_does_not_rotate() {
        let tmp = tempfile::tempdir().unwrap();
        let (handle, clock) = FakeClock::new(DAY_ONE_SECS + 3_600);
        let rotator = Rotator::with_clock(tmp.path(), "ferry", clock);

        let (mut tx, rx) = tokio::io::duplex(1024);
        let task = tokio::spawn(rotator.run(rx));
        tx.write_all(b"first\n").await.unwrap();
        wait_for_content(tmp.path(), "2016-02-27", "first\n").await;

        handle.set(DAY_ONE_SECS - 3_600);
        tx.write_all(b"second\n").await.unwrap();
        drop(tx);
        task.await.unwrap().unwrap();

        assert_eq!(read_day(tmp.path(), "2016-02-27"), "first\nsecond\n");
        assert!(!tmp.path().join("ferry.2016-02-26").exists());
    }
}
