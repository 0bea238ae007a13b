use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;

use crate::common::types::{ComponentStatus, FileKind};

/// Non-following status query; a failure carries the errno.
pub trait Probe {
    fn stat_no_follow(&self, path: &str) -> Result<ComponentStatus, i32>;

    /// The UID permission checks are made against.
    fn effective_uid(&self) -> u32 {
        unsafe { libc::geteuid() }
    }
}

/// Maps a caller-supplied path into the absolute path the probe should see.
pub trait PathView {
    fn normalize(&self, path: &str) -> String;

    /// Follows a working-directory change; relative input is taken from the
    /// current directory.
    fn set_cwd(&mut self, cwd: &str);
}

/// Interruption check point serviced between component probes.
pub trait SignalCheck {
    fn handle_pending(&self);
}

fn map_io_error(err: &io::Error) -> i32 {
    if let Some(code) = err.raw_os_error() {
        return code;
    }
    match err.kind() {
        io::ErrorKind::NotFound => libc::ENOENT,
        io::ErrorKind::PermissionDenied => libc::EACCES,
        io::ErrorKind::InvalidInput => libc::EINVAL,
        _ => libc::EIO,
    }
}

pub fn kind_from_file_type(file_type: fs::FileType) -> FileKind {
    if file_type.is_symlink() {
        FileKind::Symlink
    } else if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_file() {
        FileKind::Regular
    } else {
        FileKind::Other
    }
}

/// `lstat(2)` against the live filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LstatProbe;

impl Probe for LstatProbe {
    fn stat_no_follow(&self, path: &str) -> Result<ComponentStatus, i32> {
        let meta = fs::symlink_metadata(path).map_err(|err| map_io_error(&err))?;
        Ok(ComponentStatus {
            kind: kind_from_file_type(meta.file_type()),
            mode: meta.mode() & 0o7777,
            uid: meta.uid(),
            gid: meta.gid(),
        })
    }
}

/// Session view of the filesystem: relative paths are taken from the
/// session's working directory, and `.`/`..` are folded lexically without
/// climbing above `/`.
///
/// A trailing separator is kept so the walker can still see that the caller
/// named a directory.
#[derive(Debug, Clone)]
pub struct SessionView {
    cwd: String,
}

/// Starts from the process working directory, or `/` when it cannot be read.
impl Default for SessionView {
    fn default() -> Self {
        let cwd = std::env::current_dir()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "/".to_string());
        Self::new(cwd)
    }
}

impl SessionView {
    pub fn new(cwd: impl Into<String>) -> Self {
        let cwd = cwd.into();
        let cwd = if cwd.starts_with('/') {
            cwd
        } else {
            format!("/{cwd}")
        };
        Self { cwd }
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }
}

impl PathView for SessionView {
    fn normalize(&self, path: &str) -> String {
        let joined = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", self.cwd, path)
        };
        let trailing = joined.len() > 1 && joined.ends_with('/');

        let mut parts: Vec<&str> = Vec::new();
        for part in joined.split('/') {
            match part {
                "" | "." => continue,
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }

        let mut normalized = String::with_capacity(joined.len());
        for part in &parts {
            normalized.push('/');
            normalized.push_str(part);
        }
        if normalized.is_empty() {
            return "/".to_string();
        }
        if trailing {
            normalized.push('/');
        }
        normalized
    }

    fn set_cwd(&mut self, cwd: &str) {
        let mut next = self.normalize(cwd);
        if next.len() > 1 && next.ends_with('/') {
            next.pop();
        }
        self.cwd = next;
    }
}

/// Check point with nothing to service.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignals;

impl SignalCheck for NoSignals {
    fn handle_pending(&self) {}
}
