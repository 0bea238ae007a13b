use crate::common::error::Result;
use crate::common::types::{ExpectedType, IntentFlags};
use crate::path::ExplainContext;
use crate::syscalls::{
    explain_path_or_generic, mismatched_args, path_args, require_path, Explanation, Syscall,
    SyscallArgs, PATH_RESOLUTION_ERRORS,
};

/// lstat(2) does not follow the final link, so the leaf may be any type.
pub fn explain_lstat_error(ctx: &ExplainContext<'_>, xerrno: i32, path: &str) -> Result<Explanation> {
    let path = require_path(path)?;
    let syscall = Syscall::Lstat;
    let diagnosis = explain_path_or_generic(
        ctx,
        xerrno,
        syscall,
        path,
        &PATH_RESOLUTION_ERRORS,
        IntentFlags::WANT_SEARCH,
        ExpectedType::Unspecified,
    )?;

    Ok(Explanation {
        syscall,
        args: path_args(path),
        diagnosis,
    })
}

pub(crate) fn explain(ctx: &ExplainContext<'_>, xerrno: i32, args: &SyscallArgs<'_>) -> Result<Explanation> {
    match args {
        SyscallArgs::Lstat { path } => explain_lstat_error(ctx, xerrno, path),
        other => Err(mismatched_args(other)),
    }
}
