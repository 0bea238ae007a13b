use crate::common::error::Result;
use crate::common::types::{ExpectedType, FileKind, IntentFlags};
use crate::path::ExplainContext;
use crate::syscalls::{
    explain_path_or_generic, mismatched_args, path_args, require_path, Explanation, Syscall,
    SyscallArgs, PATH_RESOLUTION_ERRORS,
};

fn parent_of(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// EPERM and EISDIR both come from what the leaf is, not how it was reached.
fn explain_refused_leaf(ctx: &ExplainContext<'_>, path: &str) -> Option<String> {
    let normalized = ctx.view.normalize(path);
    let leaf = ctx.probe.stat_no_follow(&normalized).ok()?;
    if leaf.kind == FileKind::Directory {
        return Some(format!(
            "'{normalized}' is a directory, which unlink(2) does not remove"
        ));
    }

    let parent = parent_of(&normalized);
    let dir = ctx.probe.stat_no_follow(parent).ok()?;
    let sticky = dir.mode & libc::S_ISVTX as u32 != 0;
    let uid = ctx.probe.effective_uid();
    if sticky && uid != 0 && uid != dir.uid && uid != leaf.uid {
        return Some(format!(
            "directory '{}' has the sticky bit set and '{}' is owned by UID {}, so only that \
             user or the directory owner may remove it",
            parent, normalized, leaf.uid
        ));
    }
    None
}

pub fn explain_unlink_error(ctx: &ExplainContext<'_>, xerrno: i32, path: &str) -> Result<Explanation> {
    let path = require_path(path)?;
    let syscall = Syscall::Unlink;

    let refused = match xerrno {
        libc::EPERM | libc::EISDIR => explain_refused_leaf(ctx, path),
        _ => None,
    };
    let diagnosis = match refused {
        Some(explained) => Some(explained),
        None => explain_path_or_generic(
            ctx,
            xerrno,
            syscall,
            path,
            &PATH_RESOLUTION_ERRORS,
            IntentFlags::WANT_UNLINK | IntentFlags::MUST_EXIST,
            ExpectedType::Regular,
        )?,
    };

    Ok(Explanation {
        syscall,
        args: path_args(path),
        diagnosis,
    })
}

pub(crate) fn explain(ctx: &ExplainContext<'_>, xerrno: i32, args: &SyscallArgs<'_>) -> Result<Explanation> {
    match args {
        SyscallArgs::Unlink { path } => explain_unlink_error(ctx, xerrno, path),
        other => Err(mismatched_args(other)),
    }
}
