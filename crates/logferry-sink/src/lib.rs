//! Log collection for logferry
//!
//! The collector accepts one TCP connection per forwarder, frames each byte
//! stream into bounded display lines, labels every line with the stream's
//! name, and serializes everything onto a single timestamped output stream.

pub mod handler;
pub mod sink;

pub use handler::ClientHandler;
pub use sink::LogSink;
