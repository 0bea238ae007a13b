use crate::common::error::Result;
use crate::common::types::{ExpectedType, IntentFlags};
use crate::path::ExplainContext;
use crate::syscalls::{
    explain_path_or_generic, mismatched_args, path_args, require_path, Explanation, Syscall,
    SyscallArgs, PATH_RESOLUTION_ERRORS,
};

pub fn explain_stat_error(ctx: &ExplainContext<'_>, xerrno: i32, path: &str) -> Result<Explanation> {
    let path = require_path(path)?;
    let syscall = Syscall::Stat;
    let diagnosis = explain_path_or_generic(
        ctx,
        xerrno,
        syscall,
        path,
        &PATH_RESOLUTION_ERRORS,
        IntentFlags::WANT_SEARCH,
        ExpectedType::Regular,
    )?;

    Ok(Explanation {
        syscall,
        args: path_args(path),
        diagnosis,
    })
}

pub(crate) fn explain(ctx: &ExplainContext<'_>, xerrno: i32, args: &SyscallArgs<'_>) -> Result<Explanation> {
    match args {
        SyscallArgs::Stat { path } => explain_stat_error(ctx, xerrno, path),
        other => Err(mismatched_args(other)),
    }
}
