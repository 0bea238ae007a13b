use core::ffi::{c_char, c_void};

use crate::common::error::ExplainError;
use crate::common::types::*;
use crate::config::ExplainConfig;
use crate::generic::describe_generic;
use crate::logging::{self, ExplainLogCallback};
use crate::module::{ExplainModule, ModuleEvent};
use crate::path::explain_path_error;
use crate::probe::{NoSignals, SignalCheck};
use crate::syscalls::SyscallArgs;

/// Called between component checks so the host can service pending signals.
pub type ExplainSignalCallback = Option<extern "C" fn(user_data: *mut c_void)>;

pub struct ExplainHandle {
    module: ExplainModule,
}

struct CallbackSignals {
    callback: extern "C" fn(user_data: *mut c_void),
    user_data: *mut c_void,
}

impl SignalCheck for CallbackSignals {
    fn handle_pending(&self) {
        (self.callback)(self.user_data);
    }
}

fn status_of(err: &ExplainError) -> ExplainStatus {
    ExplainStatus::from(err)
}

/// Borrows a caller-owned string view as UTF-8.
///
/// # Safety
/// `view` must be null or point to a valid view whose bytes outlive `'a`.
unsafe fn read_view<'a>(view: *const ExplainStringView) -> Result<&'a str, ExplainStatus> {
    let Some(view) = view.as_ref() else {
        return Err(ExplainStatus::InvalidArgument);
    };
    if view.ptr.is_null() {
        return if view.len == 0 {
            Ok("")
        } else {
            Err(ExplainStatus::InvalidArgument)
        };
    }
    let bytes = std::slice::from_raw_parts(view.ptr as *const u8, view.len);
    std::str::from_utf8(bytes).map_err(|_| ExplainStatus::InvalidArgument)
}

/// Copies `value` into a NUL-terminated `malloc` buffer owned by the caller,
/// released with `explain_free_string`.
fn write_string(out: *mut ExplainStringView, value: &str) -> ExplainStatus {
    let Some(out) = (unsafe { out.as_mut() }) else {
        return ExplainStatus::InvalidArgument;
    };
    let buf = unsafe { libc::malloc(value.len() + 1) } as *mut u8;
    if buf.is_null() {
        return ExplainStatus::IoError;
    }
    unsafe {
        std::ptr::copy_nonoverlapping(value.as_ptr(), buf, value.len());
        *buf.add(value.len()) = 0;
    }
    *out = ExplainStringView {
        ptr: buf as *const c_char,
        len: value.len(),
    };
    ExplainStatus::Ok
}

fn clear_out(out: *mut ExplainStringView) {
    if let Some(out) = unsafe { out.as_mut() } {
        *out = ExplainStringView::empty();
    }
}

fn expected_from_i32(value: i32) -> Option<ExpectedType> {
    match value {
        0 => Some(ExpectedType::Unspecified),
        1 => Some(ExpectedType::Regular),
        2 => Some(ExpectedType::Directory),
        3 => Some(ExpectedType::Symlink),
        _ => None,
    }
}

fn log_level(level: i32) -> Option<ExplainLogLevel> {
    u8::try_from(level).ok().and_then(ExplainLogLevel::from_u8)
}

/// Runs one explainer and renders its result into `out`.
fn explain_into(
    handle: *mut ExplainHandle,
    xerrno: i32,
    args: SyscallArgs<'_>,
    out: *mut ExplainStringView,
) -> ExplainStatus {
    clear_out(out);
    let Some(h) = (unsafe { handle.as_ref() }) else {
        return ExplainStatus::InvalidArgument;
    };
    if xerrno == 0 {
        return ExplainStatus::NotAnError;
    }
    match h.module.describe(xerrno, &args) {
        Ok(text) => write_string(out, &text),
        Err(err) => status_of(&err),
    }
}

/// Creates a session. A null `config` selects the defaults; a config whose
/// `size` is smaller than this library's layout is rejected with null.
#[no_mangle]
pub extern "C" fn explain_create(config: *const ExplainFfiConfig) -> *mut ExplainHandle {
    let config = match unsafe { config.as_ref() } {
        None => ExplainConfig::default(),
        Some(raw) if (raw.size as usize) < std::mem::size_of::<ExplainFfiConfig>() => {
            log::debug!(target: "explain", "rejecting config of size {}", raw.size);
            return std::ptr::null_mut();
        }
        Some(raw) => ExplainConfig::from_ffi(raw),
    };

    let mut module = ExplainModule::new(config);
    if let Err(err) = module.handle_event(ModuleEvent::PostParse) {
        log::warn!(target: "explain", "{}", err);
    }
    Box::into_raw(Box::new(ExplainHandle { module }))
}

#[no_mangle]
pub extern "C" fn explain_destroy(handle: *mut ExplainHandle) {
    if handle.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(handle));
    }
}

/// Must be called just before the host chroots into `path`.
#[no_mangle]
pub extern "C" fn explain_event_chroot(
    handle: *mut ExplainHandle,
    path: *const ExplainStringView,
) -> ExplainStatus {
    let Some(h) = (unsafe { handle.as_mut() }) else {
        return ExplainStatus::InvalidArgument;
    };
    let path = match unsafe { read_view(path) } {
        Ok(path) => path,
        Err(status) => return status,
    };
    match h.module.handle_event(ModuleEvent::Chroot(path.to_string())) {
        Ok(()) => ExplainStatus::Ok,
        Err(err) => status_of(&err),
    }
}

/// Must be called after the host changes its working directory, so relative
/// paths resolve where the host sees them.
#[no_mangle]
pub extern "C" fn explain_event_chdir(
    handle: *mut ExplainHandle,
    path: *const ExplainStringView,
) -> ExplainStatus {
    let Some(h) = (unsafe { handle.as_mut() }) else {
        return ExplainStatus::InvalidArgument;
    };
    let path = match unsafe { read_view(path) } {
        Ok(path) => path,
        Err(status) => return status,
    };
    match h.module.handle_event(ModuleEvent::Chdir(path.to_string())) {
        Ok(()) => ExplainStatus::Ok,
        Err(err) => status_of(&err),
    }
}

/// Installs the host's pending-signal handler; a null callback removes it.
/// `user_data` is passed back untouched and must stay valid until replaced
/// or the handle is destroyed.
#[no_mangle]
pub extern "C" fn explain_set_signal_callback(
    handle: *mut ExplainHandle,
    callback: ExplainSignalCallback,
    user_data: *mut c_void,
) -> ExplainStatus {
    let Some(h) = (unsafe { handle.as_mut() }) else {
        return ExplainStatus::InvalidArgument;
    };
    match callback {
        Some(callback) => h
            .module
            .set_signals(Box::new(CallbackSignals { callback, user_data })),
        None => h.module.set_signals(Box::new(NoSignals)),
    }
    ExplainStatus::Ok
}

/// Drops cached limits and re-installs the explainers with the current
/// configuration.
#[no_mangle]
pub extern "C" fn explain_event_restart(handle: *mut ExplainHandle) -> ExplainStatus {
    let Some(h) = (unsafe { handle.as_mut() }) else {
        return ExplainStatus::InvalidArgument;
    };
    if let Err(err) = h.module.handle_event(ModuleEvent::Restart) {
        return status_of(&err);
    }
    match h.module.handle_event(ModuleEvent::PostParse) {
        Ok(()) => ExplainStatus::Ok,
        Err(err) => status_of(&err),
    }
}

#[no_mangle]
pub extern "C" fn explain_describe_generic(
    xerrno: i32,
    syscall: *const ExplainStringView,
    out: *mut ExplainStringView,
) -> ExplainStatus {
    clear_out(out);
    let syscall = match unsafe { read_view(syscall) } {
        Ok(syscall) => syscall,
        Err(status) => return status,
    };
    match describe_generic(xerrno, syscall) {
        Ok(Some(text)) => write_string(out, &text),
        Ok(None) => ExplainStatus::NotAnError,
        Err(err) => status_of(&err),
    }
}

/// Runs the path walker directly. `intent` is a set of `IntentFlags` bits and
/// `expected` is 0 (unspecified), 1 (regular), 2 (directory) or 3 (symlink).
#[no_mangle]
pub extern "C" fn explain_path(
    handle: *mut ExplainHandle,
    xerrno: i32,
    path: *const ExplainStringView,
    intent: u32,
    expected: i32,
    out: *mut ExplainStringView,
) -> ExplainStatus {
    clear_out(out);
    let Some(h) = (unsafe { handle.as_ref() }) else {
        return ExplainStatus::InvalidArgument;
    };
    let (Some(intent), Some(expected)) = (IntentFlags::from_bits(intent), expected_from_i32(expected)) else {
        return ExplainStatus::InvalidArgument;
    };
    let path = match unsafe { read_view(path) } {
        Ok(path) => path,
        Err(status) => return status,
    };
    if !h.module.is_enabled() {
        return ExplainStatus::Disabled;
    }
    match explain_path_error(&h.module.context(), xerrno, path, intent, expected) {
        Ok(Some(text)) => write_string(out, &text),
        Ok(None) => ExplainStatus::NoExplanation,
        Err(err) => status_of(&err),
    }
}

#[no_mangle]
pub extern "C" fn explain_open_error(
    handle: *mut ExplainHandle,
    xerrno: i32,
    path: *const ExplainStringView,
    flags: i32,
    mode: u32,
    out: *mut ExplainStringView,
) -> ExplainStatus {
    match unsafe { read_view(path) } {
        Ok(path) => explain_into(handle, xerrno, SyscallArgs::Open { path, flags, mode }, out),
        Err(status) => status,
    }
}

#[no_mangle]
pub extern "C" fn explain_chroot_error(
    handle: *mut ExplainHandle,
    xerrno: i32,
    path: *const ExplainStringView,
    out: *mut ExplainStringView,
) -> ExplainStatus {
    match unsafe { read_view(path) } {
        Ok(path) => explain_into(handle, xerrno, SyscallArgs::Chroot { path }, out),
        Err(status) => status,
    }
}

#[no_mangle]
pub extern "C" fn explain_lstat_error(
    handle: *mut ExplainHandle,
    xerrno: i32,
    path: *const ExplainStringView,
    out: *mut ExplainStringView,
) -> ExplainStatus {
    match unsafe { read_view(path) } {
        Ok(path) => explain_into(handle, xerrno, SyscallArgs::Lstat { path }, out),
        Err(status) => status,
    }
}

#[no_mangle]
pub extern "C" fn explain_stat_error(
    handle: *mut ExplainHandle,
    xerrno: i32,
    path: *const ExplainStringView,
    out: *mut ExplainStringView,
) -> ExplainStatus {
    match unsafe { read_view(path) } {
        Ok(path) => explain_into(handle, xerrno, SyscallArgs::Stat { path }, out),
        Err(status) => status,
    }
}

#[no_mangle]
pub extern "C" fn explain_unlink_error(
    handle: *mut ExplainHandle,
    xerrno: i32,
    path: *const ExplainStringView,
    out: *mut ExplainStringView,
) -> ExplainStatus {
    match unsafe { read_view(path) } {
        Ok(path) => explain_into(handle, xerrno, SyscallArgs::Unlink { path }, out),
        Err(status) => status,
    }
}

#[no_mangle]
pub extern "C" fn explain_free_string(value: ExplainStringView) {
    if value.ptr.is_null() {
        return;
    }
    unsafe {
        libc::free(value.ptr as *mut libc::c_void);
    }
}

#[no_mangle]
pub extern "C" fn explain_log_set_stderr(level: i32) -> ExplainStatus {
    match log_level(level) {
        Some(level) => logging::log_set_stderr(level),
        None => ExplainStatus::InvalidArgument,
    }
}

#[no_mangle]
pub extern "C" fn explain_log_set_callback(
    callback: ExplainLogCallback,
    user_data: *mut c_void,
    level: i32,
) -> ExplainStatus {
    match log_level(level) {
        Some(level) => logging::log_set_callback(callback, user_data, level),
        None => ExplainStatus::InvalidArgument,
    }
}

#[no_mangle]
pub extern "C" fn explain_log_set_level(level: i32) -> ExplainStatus {
    match log_level(level) {
        Some(level) => logging::log_set_level(level),
        None => ExplainStatus::InvalidArgument,
    }
}

#[no_mangle]
pub extern "C" fn explain_log_disable() -> ExplainStatus {
    logging::log_disable()
}
