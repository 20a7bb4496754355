//! Constants and default values for logferry

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default logferry home directory name
pub const LOGFERRY_DIR: &str = ".logferry";

/// Default address file name (published by the collector, read by forwarders)
pub const ADDRESS_FILE: &str = "sink.addr";

/// Default backlog directory name
pub const BACKLOG_DIR: &str = "backlog";

/// Default log directory name (day files written by the rotator)
pub const LOGS_DIR: &str = "logs";

/// Default config file name
pub const CONFIG_FILE: &str = "logferry.toml";

/// Prefix of backlog spill files
pub const BACKLOG_FILE_PREFIX: &str = "logferry-backlog";

/// Default prefix for rotated day files and the current pointer
pub const DEFAULT_DAY_FILE_PREFIX: &str = "logferry";

/// Default collector listen port
pub const DEFAULT_LISTEN_PORT: u16 = 9440;

/// Chunk size for reads from the forwarder's local log source
pub const SOURCE_CHUNK_SIZE: usize = 4096;

/// Chunk size for backlog drain reads
pub const DRAIN_CHUNK_SIZE: usize = 4096;

/// Scratch buffer size for the peer hangup watcher
pub const WATCH_BUFFER_SIZE: usize = 1024;

/// Receive buffer capacity per collector connection
pub const RECV_BUFFER_SIZE: usize = 16384;

/// Longest undelimited segment the collector accepts before force-splitting
pub const MAX_LINE_LEN: usize = 8192;

/// Maximum length of a stream name (first-line label)
pub const MAX_NAME_LEN: usize = 16;

/// Default delay between reconnect attempts in seconds
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 10;

/// Default grace period for the final backlog drain after source EOF, in seconds
pub const DEFAULT_DRAIN_GRACE_SECS: u64 = 30;

/// Read buffer size for the rotator
pub const ROTATE_BUFFER_SIZE: usize = 8192;

/// Seconds per day; POSIX time has no leap seconds
pub const SECS_PER_DAY: i64 = 86400;

/// Timestamp prefix format for collector output lines (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Day-file suffix format (UTC)
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Suffix of the "current" pointer maintained next to day files
pub const CURRENT_SUFFIX: &str = "current";

/// Get the logferry home directory
pub fn logferry_home() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(LOGFERRY_DIR))
        .unwrap_or_else(|| PathBuf::from(LOGFERRY_DIR))
}

/// Get the default address file path
pub fn address_file() -> PathBuf {
    logferry_home().join(ADDRESS_FILE)
}

/// Get the default backlog directory
pub fn backlog_dir() -> PathBuf {
    logferry_home().join(BACKLOG_DIR)
}

/// Get the default log directory
pub fn logs_dir() -> PathBuf {
    logferry_home().join(LOGS_DIR)
}

/// Default collector listen address (all interfaces)
pub fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_LISTEN_PORT))
}

/// Build the unique backlog file name for one forwarder process
pub fn backlog_file_name(unix_time: i64, pid: u32) -> String {
    format!("{}.{}.{}", BACKLOG_FILE_PREFIX, unix_time, pid)
}

/// Build a day file name: `<prefix>.<YYYY-MM-DD>`
pub fn day_file_name(prefix: &str, date: &str) -> String {
    format!("{}.{}", prefix, date)
}

/// Build the current pointer name: `<prefix>.current`
pub fn current_link_name(prefix: &str) -> String {
    format!("{}.{}", prefix, CURRENT_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logferry_home() {
        let home = logferry_home();
        assert!(home.to_string_lossy().contains(".logferry"));
    }

    #[test]
    fn test_address_file() {
        let path = address_file();
        assert!(path.to_string_lossy().contains("sink.addr"));
    }

    #[test]
    fn test_backlog_file_name() {
        let name = backlog_file_name(1456531200, 4242);
        assert_eq!(name, "logferry-backlog.1456531200.4242");
    }

    #[test]
    fn test_day_file_names() {
        assert_eq!(day_file_name("logferry", "2016-02-27"), "logferry.2016-02-27");
        assert_eq!(current_link_name("logferry"), "logferry.current");
    }

    #[test]
    fn test_default_listen_addr() {
        let addr = default_listen_addr();
        assert_eq!(addr.port(), DEFAULT_LISTEN_PORT);
        assert!(addr.ip().is_unspecified());
    }
}
