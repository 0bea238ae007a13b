//! Per-call explainers and the fixed table the host dispatches through.

pub mod chroot;
pub mod lstat;
pub mod open;
pub mod stat;
pub mod unlink;

use std::io;

use crate::common::error::{ExplainError, Result};
use crate::common::types::{ExpectedType, IntentFlags, Verbosity};
use crate::generic::describe_generic;
use crate::path::{explain_path_error, ExplainContext};

/// Errors raised while resolving a pathname, common to every path-taking call.
pub(crate) const PATH_RESOLUTION_ERRORS: [i32; 6] = [
    libc::EACCES,
    libc::ENOENT,
    libc::ELOOP,
    libc::ENAMETOOLONG,
    libc::ENOTDIR,
    libc::EPERM,
];

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Syscall {
    Chmod,
    Chown,
    Chroot,
    Close,
    Fchmod,
    Fchown,
    Lchown,
    Lstat,
    Mkdir,
    Open,
    Read,
    Rename,
    Rmdir,
    Stat,
    Unlink,
    Write,
}

impl Syscall {
    pub const ALL: [Syscall; 16] = [
        Syscall::Chmod,
        Syscall::Chown,
        Syscall::Chroot,
        Syscall::Close,
        Syscall::Fchmod,
        Syscall::Fchown,
        Syscall::Lchown,
        Syscall::Lstat,
        Syscall::Mkdir,
        Syscall::Open,
        Syscall::Read,
        Syscall::Rename,
        Syscall::Rmdir,
        Syscall::Stat,
        Syscall::Unlink,
        Syscall::Write,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Syscall::Chmod => "chmod(2)",
            Syscall::Chown => "chown(2)",
            Syscall::Chroot => "chroot(2)",
            Syscall::Close => "close(2)",
            Syscall::Fchmod => "fchmod(2)",
            Syscall::Fchown => "fchown(2)",
            Syscall::Lchown => "lchown(2)",
            Syscall::Lstat => "lstat(2)",
            Syscall::Mkdir => "mkdir(2)",
            Syscall::Open => "open(2)",
            Syscall::Read => "read(2)",
            Syscall::Rename => "rename(2)",
            Syscall::Rmdir => "rmdir(2)",
            Syscall::Stat => "stat(2)",
            Syscall::Unlink => "unlink(2)",
            Syscall::Write => "write(2)",
        }
    }
}

/// Positional arguments of the failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallArgs<'a> {
    Chmod { path: &'a str, mode: u32 },
    Chown { path: &'a str, uid: u32, gid: u32 },
    Chroot { path: &'a str },
    Close { fd: i32 },
    Fchmod { fd: i32, mode: u32 },
    Fchown { fd: i32, uid: u32, gid: u32 },
    Lchown { path: &'a str, uid: u32, gid: u32 },
    Lstat { path: &'a str },
    Mkdir { path: &'a str, mode: u32 },
    Open { path: &'a str, flags: i32, mode: u32 },
    Read { fd: i32, len: usize },
    Rename { from: &'a str, to: &'a str },
    Rmdir { path: &'a str },
    Stat { path: &'a str },
    Unlink { path: &'a str },
    Write { fd: i32, len: usize },
}

impl SyscallArgs<'_> {
    pub fn syscall(&self) -> Syscall {
        match self {
            SyscallArgs::Chmod { .. } => Syscall::Chmod,
            SyscallArgs::Chown { .. } => Syscall::Chown,
            SyscallArgs::Chroot { .. } => Syscall::Chroot,
            SyscallArgs::Close { .. } => Syscall::Close,
            SyscallArgs::Fchmod { .. } => Syscall::Fchmod,
            SyscallArgs::Fchown { .. } => Syscall::Fchown,
            SyscallArgs::Lchown { .. } => Syscall::Lchown,
            SyscallArgs::Lstat { .. } => Syscall::Lstat,
            SyscallArgs::Mkdir { .. } => Syscall::Mkdir,
            SyscallArgs::Open { .. } => Syscall::Open,
            SyscallArgs::Read { .. } => Syscall::Read,
            SyscallArgs::Rename { .. } => Syscall::Rename,
            SyscallArgs::Rmdir { .. } => Syscall::Rmdir,
            SyscallArgs::Stat { .. } => Syscall::Stat,
            SyscallArgs::Unlink { .. } => Syscall::Unlink,
            SyscallArgs::Write { .. } => Syscall::Write,
        }
    }
}

/// Outcome of explaining one failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub syscall: Syscall,
    /// Rendered arguments, e.g. `path = '/etc/passwd'`.
    pub args: String,
    /// `None` only when the errno was zero.
    pub diagnosis: Option<String>,
}

impl Explanation {
    pub fn render(&self, verbosity: Verbosity, xerrno: i32) -> String {
        let reason = match &self.diagnosis {
            Some(diagnosis) => diagnosis.clone(),
            None => io::Error::from_raw_os_error(xerrno).to_string(),
        };
        match verbosity {
            Verbosity::Minimal => reason,
            Verbosity::Terse => format!("{} failed: {}", self.syscall.name(), reason),
            Verbosity::Detailed => {
                format!("{} failed ({}): {}", self.syscall.name(), self.args, reason)
            }
        }
    }
}

pub type Explainer = fn(&ExplainContext<'_>, i32, &SyscallArgs<'_>) -> Result<Explanation>;

pub(crate) fn require_path(path: &str) -> Result<&str> {
    if path.is_empty() {
        return Err(ExplainError::InvalidArgument("path"));
    }
    Ok(path)
}

pub(crate) fn path_args(path: &str) -> String {
    format!("path = '{path}'")
}

pub(crate) fn mismatched_args(args: &SyscallArgs<'_>) -> ExplainError {
    log::debug!(
        target: "explain",
        "explainer received arguments for {}",
        args.syscall().name()
    );
    ExplainError::InvalidArgument("args")
}

/// Walks the path for resolution errors in `allowed`, otherwise (or when the
/// walk finds nothing) describes the errno generically.
pub(crate) fn explain_path_or_generic(
    ctx: &ExplainContext<'_>,
    xerrno: i32,
    syscall: Syscall,
    path: &str,
    allowed: &[i32],
    intent: IntentFlags,
    expected: ExpectedType,
) -> Result<Option<String>> {
    if allowed.contains(&xerrno) {
        if let Some(explained) = explain_path_error(ctx, xerrno, path, intent, expected)? {
            return Ok(Some(explained));
        }
    }
    describe_generic(xerrno, syscall.name())
}

/// For calls with no path argument, or whose explanations are not written.
fn decline(_ctx: &ExplainContext<'_>, _xerrno: i32, args: &SyscallArgs<'_>) -> Result<Explanation> {
    Err(ExplainError::NotImplemented {
        syscall: args.syscall().name(),
    })
}

pub fn explainer_for(syscall: Syscall) -> Explainer {
    match syscall {
        Syscall::Chroot => chroot::explain,
        Syscall::Lstat => lstat::explain,
        Syscall::Open => open::explain,
        Syscall::Stat => stat::explain,
        Syscall::Unlink => unlink::explain,
        Syscall::Chmod
        | Syscall::Chown
        | Syscall::Close
        | Syscall::Fchmod
        | Syscall::Fchown
        | Syscall::Lchown
        | Syscall::Mkdir
        | Syscall::Read
        | Syscall::Rename
        | Syscall::Rmdir
        | Syscall::Write => decline,
    }
}

/// One slot per supported call, installed into the host's registry.
#[derive(Clone, Copy)]
pub struct ExplanationTable {
    slots: [Explainer; Syscall::ALL.len()],
}

impl ExplanationTable {
    pub fn standard() -> Self {
        Self {
            slots: Syscall::ALL.map(explainer_for),
        }
    }

    pub fn get(&self, syscall: Syscall) -> Explainer {
        self.slots[syscall as usize]
    }

    pub fn explain(
        &self,
        ctx: &ExplainContext<'_>,
        xerrno: i32,
        args: &SyscallArgs<'_>,
    ) -> Result<Explanation> {
        (self.get(args.syscall()))(ctx, xerrno, args)
    }
}

impl std::fmt::Debug for ExplanationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplanationTable")
            .field("slots", &self.slots.len())
            .finish()
    }
}

/// Dispatches straight to the explainer for `args`.
pub fn explain(ctx: &ExplainContext<'_>, xerrno: i32, args: &SyscallArgs<'_>) -> Result<Explanation> {
    explainer_for(args.syscall())(ctx, xerrno, args)
}
