//! Append-only spill file for undelivered log bytes
//!
//! Every chunk that cannot be written to the collector lands here. The file
//! survives forwarder restarts; its name embeds the creation time and pid so
//! concurrent forwarders sharing a directory never collide.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use logferry_core::{constants, Result};
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::{FileExt, OpenOptionsExt};

/// Append-only backlog file with an explicit read cursor
///
/// Bytes between the read cursor and the end of the file are exactly the
/// undelivered tail. The write side is always the end of the file.
pub struct Backlog {
    file: File,
    path: PathBuf,
    cursor: u64,
}

impl Backlog {
    /// Create a fresh backlog file under `dir`
    ///
    /// Creation fails if the file already exists rather than silently
    /// appending to another process's spill.
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let name = constants::backlog_file_name(chrono::Utc::now().timestamp(), std::process::id());
        let path = dir.join(name);
        let mut options = OpenOptions::new();
        options.read(true).append(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);
        let file = options.open(&path)?;
        debug!("Backlog file created at {}", path.display());
        Ok(Self {
            file,
            path,
            cursor: 0,
        })
    }

    /// Append a chunk at the end of the file
    pub fn append(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk)?;
        Ok(())
    }

    /// Byte count still waiting to be delivered
    ///
    /// Computed from file metadata rather than a tracked length: the file
    /// also receives this process's own diagnostics through the redirected
    /// standard streams, and those bytes must drain like everything else.
    pub fn remaining(&self) -> Result<u64> {
        let len = self.file.metadata()?.len();
        Ok(len.saturating_sub(self.cursor))
    }

    /// Read the next chunk at the cursor without consuming it
    pub fn read_chunk(&self, buf: &mut [u8]) -> Result<usize> {
        #[cfg(unix)]
        {
            let n = self.file.read_at(buf, self.cursor)?;
            Ok(n)
        }
        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = self.file.try_clone()?;
            file.seek(SeekFrom::Start(self.cursor))?;
            let n = file.read(buf)?;
            Ok(n)
        }
    }

    /// Advance the cursor past bytes confirmed written to the collector
    pub fn advance(&mut self, n: usize) {
        self.cursor += n as u64;
    }

    /// Truncate the file and rewind the cursor after a full drain
    ///
    /// If truncation fails the cursor stays where it is; the file keeps
    /// growing but drains still resume from the right offset.
    pub fn reset(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.cursor = 0;
        Ok(())
    }

    /// Delete the file after a clean final drain
    pub fn remove(&self) -> Result<()> {
        std::fs::remove_file(&self.path)?;
        Ok(())
    }

    /// Route this process's own stdout and stderr into the backlog file
    ///
    /// Diagnostics printed by the forwarder itself then travel to the
    /// collector like any other log data.
    #[cfg(unix)]
    pub fn capture_own_output(&self) -> Result<()> {
        use std::os::fd::AsRawFd;
        let fd = self.file.as_raw_fd();
        nix::unistd::dup2(fd, nix::libc::STDOUT_FILENO).map_err(std::io::Error::from)?;
        nix::unistd::dup2(fd, nix::libc::STDERR_FILENO).map_err(std::io::Error::from)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
