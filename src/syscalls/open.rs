use crate::common::error::Result;
use crate::common::types::{ExpectedType, FileKind, IntentFlags};
use crate::path::ExplainContext;
use crate::syscalls::{
    explain_path_or_generic, mismatched_args, require_path, Explanation, Syscall, SyscallArgs,
    PATH_RESOLUTION_ERRORS,
};

/// Optional flags rendered after the access mode, in this order.
const RENDERED_FLAGS: [(i32, &str); 5] = [
    (libc::O_APPEND, "O_APPEND"),
    (libc::O_CREAT, "O_CREAT"),
    (libc::O_EXCL, "O_EXCL"),
    (libc::O_NONBLOCK, "O_NONBLOCK"),
    (libc::O_TRUNC, "O_TRUNC"),
];

/// Renders open(2) flags as `O_WRONLY|O_CREAT|O_TRUNC`.
pub fn oflags_text(flags: i32) -> String {
    let access = match flags & libc::O_ACCMODE {
        libc::O_RDONLY => "O_RDONLY",
        libc::O_WRONLY => "O_WRONLY",
        _ => "O_RDWR",
    };

    let mut text = access.to_string();
    for (flag, name) in RENDERED_FLAGS {
        if flags & flag != 0 {
            text.push('|');
            text.push_str(name);
        }
    }
    text
}

pub fn mode_text(mode: u32) -> String {
    format!("{:03o}", mode)
}

/// Maps open(2) flags onto what the caller wanted from the path.
pub fn open_intent(flags: i32) -> IntentFlags {
    let mut intent = match flags & libc::O_ACCMODE {
        libc::O_RDONLY => IntentFlags::WANT_READ | IntentFlags::WANT_SEARCH,
        libc::O_WRONLY => IntentFlags::WANT_WRITE,
        _ => IntentFlags::WANT_READ | IntentFlags::WANT_WRITE,
    };

    if flags & libc::O_CREAT != 0 {
        intent |= IntentFlags::WANT_CREATE;
        if flags & libc::O_EXCL != 0 {
            intent |= IntentFlags::MUST_NOT_EXIST;
        }
    } else {
        intent |= IntentFlags::MUST_EXIST;
    }

    if flags & libc::O_TRUNC != 0 {
        intent |= IntentFlags::WANT_MODIFY;
    }
    intent
}

fn open_args(path: &str, flags: i32, mode: u32) -> String {
    format!(
        "flags = {}, mode = {}, path = '{}'",
        oflags_text(flags),
        mode_text(mode),
        path
    )
}

/// Errors only open(2) raises for a resolvable path.
fn explain_open_specific(
    ctx: &ExplainContext<'_>,
    xerrno: i32,
    path: &str,
    intent: IntentFlags,
) -> Option<String> {
    if !intent.wants_mutation() {
        return None;
    }
    let normalized = ctx.view.normalize(path);
    match xerrno {
        libc::EISDIR => match ctx.probe.stat_no_follow(&normalized) {
            Ok(status) if status.kind == FileKind::Directory => Some(format!(
                "'{normalized}' is a directory, which open(2) cannot open for writing"
            )),
            _ => None,
        },
        libc::EROFS => Some(format!(
            "'{normalized}' is on a read-only filesystem, so open(2) cannot write to or create it"
        )),
        _ => None,
    }
}

pub fn explain_open_error(
    ctx: &ExplainContext<'_>,
    xerrno: i32,
    path: &str,
    flags: i32,
    mode: u32,
) -> Result<Explanation> {
    let path = require_path(path)?;
    let syscall = Syscall::Open;
    let intent = open_intent(flags);

    let diagnosis = match explain_open_specific(ctx, xerrno, path, intent) {
        Some(explained) => Some(explained),
        None => explain_path_or_generic(
            ctx,
            xerrno,
            syscall,
            path,
            &PATH_RESOLUTION_ERRORS,
            intent,
            ExpectedType::Regular,
        )?,
    };

    Ok(Explanation {
        syscall,
        args: open_args(path, flags, mode),
        diagnosis,
    })
}

pub(crate) fn explain(ctx: &ExplainContext<'_>, xerrno: i32, args: &SyscallArgs<'_>) -> Result<Explanation> {
    match args {
        SyscallArgs::Open { path, flags, mode } => {
            explain_open_error(ctx, xerrno, path, *flags, *mode)
        }
        other => Err(mismatched_args(other)),
    }
}
