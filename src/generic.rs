//! Descriptions for errno values that mean the same thing for every call.
//!
//! Call-specific explainers only land here when they have nothing better to
//! say. The open-file ceilings are deliberately left out of the EMFILE and
//! ENFILE text: an accurate number needs the pre-chroot snapshot, which this
//! module does not see.

use crate::common::error::{ExplainError, Result};

fn describe_eagain(syscall: &str) -> String {
    format!("the {syscall} system call was waiting to finish but was told not to wait")
}

fn describe_emfile() -> String {
    "the process already has the maximum number of file descriptors open".to_string()
}

fn describe_enfile() -> String {
    "the system limit on the total number of open files has been reached".to_string()
}

fn describe_eintr(syscall: &str) -> String {
    format!("the {syscall} system call was interrupted by a signal before it could finish")
}

fn describe_efault(syscall: &str) -> String {
    format!(
        "one of the {syscall} parameters is null, uninitialized, or points to \
         invalid/unreachable memory"
    )
}

fn describe_eio() -> String {
    "a low-level filesystem I/O error occurred, probably in hardware".to_string()
}

fn describe_enomem(syscall: &str) -> String {
    format!("there was not enough user-space memory available for {syscall} to succeed")
}

fn describe_eperm(syscall: &str) -> String {
    format!("the process does not have the appropriate privileges to use the {syscall} system call")
}

fn describe_unknown(syscall: &str) -> String {
    format!("the entropic gremlins have frobnicated the {syscall} system call")
}

/// Describes `xerrno` for the call named `syscall` (e.g. `"write(2)"`).
///
/// Returns `Ok(None)` when `xerrno` is zero, since that is not an error.
/// Every other value yields text; codes without a canned sentence get the
/// catch-all.
pub fn describe_generic(xerrno: i32, syscall: &str) -> Result<Option<String>> {
    if syscall.is_empty() {
        return Err(ExplainError::InvalidArgument("syscall"));
    }

    let explained = match xerrno {
        0 => return Ok(None),
        libc::EAGAIN => describe_eagain(syscall),
        #[allow(unreachable_patterns)]
        libc::EWOULDBLOCK => describe_eagain(syscall),
        libc::EMFILE => describe_emfile(),
        libc::ENFILE => describe_enfile(),
        libc::EINTR => describe_eintr(syscall),
        libc::EFAULT => describe_efault(syscall),
        libc::EIO => describe_eio(),
        libc::ENOMEM => describe_enomem(syscall),
        libc::EPERM => describe_eperm(syscall),
        _ => describe_unknown(syscall),
    };
    Ok(Some(explained))
}
