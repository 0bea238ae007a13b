use crate::common::error::Result;
use crate::common::types::{ExpectedType, IntentFlags};
use crate::path::ExplainContext;
use crate::syscalls::{
    explain_path_or_generic, mismatched_args, path_args, require_path, Explanation, Syscall,
    SyscallArgs, PATH_RESOLUTION_ERRORS,
};

fn describe_kernel_enomem(syscall: &str) -> String {
    format!("there was not enough kernel memory available for {syscall} to succeed")
}

pub fn explain_chroot_error(ctx: &ExplainContext<'_>, xerrno: i32, path: &str) -> Result<Explanation> {
    let path = require_path(path)?;
    let syscall = Syscall::Chroot;
    let intent = IntentFlags::WANT_SEARCH | IntentFlags::MUST_HAVE_MODE;

    let diagnosis = if xerrno == libc::ENOMEM {
        Some(describe_kernel_enomem(syscall.name()))
    } else {
        explain_path_or_generic(
            ctx,
            xerrno,
            syscall,
            path,
            &PATH_RESOLUTION_ERRORS,
            intent,
            ExpectedType::Directory,
        )?
    };

    Ok(Explanation {
        syscall,
        args: path_args(path),
        diagnosis,
    })
}

pub(crate) fn explain(ctx: &ExplainContext<'_>, xerrno: i32, args: &SyscallArgs<'_>) -> Result<Explanation> {
    match args {
        SyscallArgs::Chroot { path } => explain_chroot_error(ctx, xerrno, path),
        other => Err(mismatched_args(other)),
    }
}
