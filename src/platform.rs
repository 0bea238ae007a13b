//! Platform limits, with a session snapshot taken before chroot.
//!
//! After the process chroots, a path handed to `pathconf(3)` no longer names
//! the directory the kernel will use, so limits captured beforehand win over
//! live queries until the session restarts.

use std::ffi::CString;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::common::error::{ExplainError, Result};

const UNPOPULATED: i64 = -1;

/// Path-dependent limits (`pathconf(3)` names).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PathLimit {
    NameMax,
    PathMax,
    NoTrunc,
}

impl PathLimit {
    pub fn name(&self) -> &'static str {
        match self {
            PathLimit::NameMax => "NAME_MAX",
            PathLimit::PathMax => "PATH_MAX",
            PathLimit::NoTrunc => "NO_TRUNC",
        }
    }

    fn raw(&self) -> libc::c_int {
        match self {
            PathLimit::NameMax => libc::_PC_NAME_MAX,
            PathLimit::PathMax => libc::_PC_PATH_MAX,
            PathLimit::NoTrunc => libc::_PC_NO_TRUNC,
        }
    }
}

/// Process-wide limits (`sysconf(3)` names).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SystemLimit {
    OpenMax,
    ChildMax,
    IovMax,
}

impl SystemLimit {
    pub fn name(&self) -> &'static str {
        match self {
            SystemLimit::OpenMax => "OPEN_MAX",
            SystemLimit::ChildMax => "CHILD_MAX",
            SystemLimit::IovMax => "IOV_MAX",
        }
    }

    fn raw(&self) -> libc::c_int {
        match self {
            SystemLimit::OpenMax => libc::_SC_OPEN_MAX,
            SystemLimit::ChildMax => libc::_SC_CHILD_MAX,
            SystemLimit::IovMax => libc::_SC_IOV_MAX,
        }
    }
}

/// Where live limit values come from.
pub trait LimitSource: Send + Sync {
    fn path_limit(&self, path: &str, limit: PathLimit) -> Result<i64>;
    fn system_limit(&self, limit: SystemLimit) -> Result<i64>;
}

/// Queries the running kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveLimits;

fn parent_candidate(current: &str) -> Option<&str> {
    if current == "/" || current == "." {
        return None;
    }
    match current.trim_end_matches('/').rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&current[..idx]),
        None => Some("."),
    }
}

/// The path itself, then each ancestor. A missing or over-long leaf still
/// lives on its parent's filesystem.
fn query_candidates(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(path), |current| parent_candidate(*current))
}

/// `pathconf` reports "no limit" as -1 without touching errno, so errno has
/// to be zeroed before the call for a failure to be told apart.
fn clear_errno() {
    #[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "redox"))]
    unsafe {
        *libc::__errno_location() = 0;
    }
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    unsafe {
        *libc::__error() = 0;
    }
    #[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
    unsafe {
        *libc::__errno() = 0;
    }
}

impl LimitSource for LiveLimits {
    fn path_limit(&self, path: &str, limit: PathLimit) -> Result<i64> {
        for candidate in query_candidates(path) {
            let c_path = CString::new(candidate).map_err(|_| ExplainError::InvalidArgument("path"))?;
            clear_errno();
            let value = unsafe { libc::pathconf(c_path.as_ptr(), limit.raw()) };
            if value >= 0 {
                return Ok(value as i64);
            }
            let err = std::io::Error::last_os_error();
            if matches!(err.raw_os_error(), None | Some(0)) {
                log::trace!(
                    target: "explain",
                    "pathconf({}, {}) has no limit",
                    candidate,
                    limit.name()
                );
                break;
            }
            log::trace!(
                target: "explain",
                "pathconf({}, {}) failed: {}",
                candidate,
                limit.name(),
                err
            );
            match err.raw_os_error() {
                Some(libc::ENOENT | libc::ENAMETOOLONG | libc::ENOTDIR | libc::EACCES | libc::ELOOP) => {
                    continue
                }
                _ => break,
            }
        }
        Err(ExplainError::Unsupported {
            limit: limit.name(),
        })
    }

    fn system_limit(&self, limit: SystemLimit) -> Result<i64> {
        let value = unsafe { libc::sysconf(limit.raw()) };
        if value < 0 {
            return Err(ExplainError::Unsupported {
                limit: limit.name(),
            });
        }
        Ok(value as i64)
    }
}

/// Limits cache shared by every explanation in a session.
///
/// Readers never lock: the snapshot is only written by
/// [`capture_pre_isolation`](Self::capture_pre_isolation) and
/// [`reset`](Self::reset), which the host serializes against request
/// processing.
pub struct PlatformLimits {
    source: Box<dyn LimitSource>,
    sess_name_max: AtomicI64,
    sess_no_trunc: AtomicI64,
    sess_path_max: AtomicI64,
    captured: AtomicBool,
}

impl Default for PlatformLimits {
    fn default() -> Self {
        Self::new(Box::new(LiveLimits))
    }
}

impl PlatformLimits {
    pub fn new(source: Box<dyn LimitSource>) -> Self {
        Self {
            source,
            sess_name_max: AtomicI64::new(UNPOPULATED),
            sess_no_trunc: AtomicI64::new(UNPOPULATED),
            sess_path_max: AtomicI64::new(UNPOPULATED),
            captured: AtomicBool::new(false),
        }
    }

    fn slot(&self, limit: PathLimit) -> &AtomicI64 {
        match limit {
            PathLimit::NameMax => &self.sess_name_max,
            PathLimit::PathMax => &self.sess_path_max,
            PathLimit::NoTrunc => &self.sess_no_trunc,
        }
    }

    fn lookup(&self, path: &str, limit: PathLimit) -> Result<i64> {
        if path.is_empty() {
            return Err(ExplainError::InvalidArgument("path"));
        }
        let cached = self.slot(limit).load(Ordering::Acquire);
        if cached > 0 {
            return Ok(cached);
        }
        self.source.path_limit(path, limit)
    }

    pub fn name_max(&self, path: &str) -> Result<u64> {
        self.lookup(path, PathLimit::NameMax).map(|v| v as u64)
    }

    pub fn path_max(&self, path: &str) -> Result<u64> {
        self.lookup(path, PathLimit::PathMax).map(|v| v as u64)
    }

    /// True when over-long names fail with `ENAMETOOLONG` instead of being
    /// silently truncated.
    pub fn no_truncation(&self, path: &str) -> Result<bool> {
        self.lookup(path, PathLimit::NoTrunc).map(|v| v > 0)
    }

    pub fn open_max(&self) -> Result<u64> {
        self.source
            .system_limit(SystemLimit::OpenMax)
            .map(|v| v as u64)
    }

    pub fn child_max(&self) -> Result<u64> {
        self.source
            .system_limit(SystemLimit::ChildMax)
            .map(|v| v as u64)
    }

    pub fn iov_max(&self) -> Result<u64> {
        self.source.system_limit(SystemLimit::IovMax).map(|v| v as u64)
    }

    /// Records the limits for `path` just before the process chroots into it.
    ///
    /// Only the first capture after construction or [`reset`](Self::reset)
    /// takes effect; returns whether this call captured. Limits the platform
    /// cannot report stay unpopulated and keep falling through to live
    /// queries.
    pub fn capture_pre_isolation(&self, path: &str) -> Result<bool> {
        if path.is_empty() {
            return Err(ExplainError::InvalidArgument("path"));
        }
        if self
            .captured
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!(
                target: "explain",
                "limits already captured for this session; ignoring chroot to '{}'",
                path
            );
            return Ok(false);
        }

        for limit in [PathLimit::NameMax, PathLimit::NoTrunc, PathLimit::PathMax] {
            let value = self.source.path_limit(path, limit).unwrap_or(UNPOPULATED);
            self.slot(limit).store(value, Ordering::Release);
            log::trace!(
                target: "explain",
                "captured {} = {} for '{}'",
                limit.name(),
                value,
                path
            );
        }
        Ok(true)
    }

    pub fn reset(&self) {
        self.sess_name_max.store(UNPOPULATED, Ordering::Release);
        self.sess_no_trunc.store(UNPOPULATED, Ordering::Release);
        self.sess_path_max.store(UNPOPULATED, Ordering::Release);
        self.captured.store(false, Ordering::Release);
    }

    pub fn is_captured(&self) -> bool {
        self.captured.load(Ordering::Acquire)
    }
}
