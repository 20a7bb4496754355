//! Log forwarding for logferry
//!
//! One forwarder process ships a single local byte stream (typically the
//! combined stdout and stderr of a host's workers) to the cluster's log
//! collector. While the collector is unreachable the stream spills to an
//! append-only backlog file on disk and is replayed, in order, over the
//! next successful connection.

pub mod backlog;
pub mod dial;
pub mod forwarder;

pub use backlog::Backlog;
pub use dial::{Dialer, TcpDialer};
pub use forwarder::{Forwarder, ForwarderConfig};
