use std::ffi::{c_char, c_void};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use fs_explain::*;

struct TestSession {
    handle: *mut ExplainHandle,
}

impl TestSession {
    fn new(flags: u32, verbosity: Verbosity) -> Self {
        let config = ExplainFfiConfig {
            size: std::mem::size_of::<ExplainFfiConfig>() as u32,
            flags,
            verbosity: verbosity as i32,
            reserved: [0; 4],
        };
        let handle = explain_create(&config);
        assert!(!handle.is_null());
        Self { handle }
    }
}

impl Drop for TestSession {
    fn drop(&mut self) {
        explain_destroy(self.handle);
    }
}

fn view(value: &str) -> ExplainStringView {
    ExplainStringView {
        ptr: value.as_ptr() as *const c_char,
        len: value.len(),
    }
}

/// Copies an owned result string and releases it.
fn take(out: ExplainStringView) -> String {
    assert!(!out.ptr.is_null());
    let bytes = unsafe { std::slice::from_raw_parts(out.ptr as *const u8, out.len) };
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(unsafe { *out.ptr.add(out.len) }, 0);
    explain_free_string(out);
    text
}

#[test]
fn stat_error_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_string_lossy().into_owned();
    let session = TestSession::new(0, Verbosity::Terse);
    let path = format!("{base}/missing/file");
    let mut out = ExplainStringView::empty();

    let status = explain_stat_error(session.handle, libc::ENOENT, &view(&path), &mut out);
    assert_eq!(status, ExplainStatus::Ok);
    assert_eq!(
        take(out),
        format!("stat(2) failed: directory '{base}/missing' does not exist")
    );
}

#[test]
fn open_error_detailed() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("incoming")).unwrap();
    let path = dir.path().join("incoming").to_string_lossy().into_owned();
    let session = TestSession::new(0, Verbosity::Detailed);
    let mut out = ExplainStringView::empty();

    let status = explain_open_error(session.handle, libc::EISDIR, &view(&path), libc::O_WRONLY, 0o600, &mut out);
    assert_eq!(status, ExplainStatus::Ok);
    assert_eq!(
        take(out),
        format!(
            "open(2) failed (flags = O_WRONLY, mode = 600, path = '{path}'): \
             '{path}' is a directory, which open(2) cannot open for writing"
        )
    );
}

#[test]
fn remaining_explainers_answer() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_string_lossy().into_owned();
    let session = TestSession::new(0, Verbosity::Minimal);
    let gone = format!("{base}/gone");

    let mut out = ExplainStringView::empty();
    assert_eq!(explain_lstat_error(session.handle, libc::ENOENT, &view(&gone), &mut out), ExplainStatus::Ok);
    assert_eq!(take(out), format!("file '{gone}' does not exist"));

    let mut out = ExplainStringView::empty();
    assert_eq!(explain_unlink_error(session.handle, libc::ENOENT, &view(&gone), &mut out), ExplainStatus::Ok);
    assert_eq!(take(out), format!("file '{gone}' does not exist"));

    let mut out = ExplainStringView::empty();
    assert_eq!(explain_chroot_error(session.handle, libc::ENOENT, &view(&gone), &mut out), ExplainStatus::Ok);
    assert_eq!(take(out), format!("directory '{gone}' does not exist"));
}

#[test]
fn direct_path_walk() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_string_lossy().into_owned();
    fs::write(dir.path().join("notes"), b"").unwrap();
    let session = TestSession::new(0, Verbosity::Terse);
    let mut out = ExplainStringView::empty();

    let path = format!("{base}/notes/x");
    let status = explain_path(
        session.handle,
        libc::ENOTDIR,
        &view(&path),
        IntentFlags::WANT_READ.bits(),
        1,
        &mut out,
    );
    assert_eq!(status, ExplainStatus::Ok);
    assert_eq!(take(out), format!("path '{base}/notes' does not refer to a directory"));

    let existing = format!("{base}/notes");
    let status = explain_path(session.handle, libc::EPERM, &view(&existing), 0, 1, &mut out);
    assert_eq!(status, ExplainStatus::NoExplanation);
    assert!(out.ptr.is_null());

    let status = explain_path(session.handle, libc::ENOENT, &view(&existing), 0, 9, &mut out);
    assert_eq!(status, ExplainStatus::InvalidArgument);
    let status = explain_path(session.handle, libc::ENOENT, &view(&existing), 1 << 30, 1, &mut out);
    assert_eq!(status, ExplainStatus::InvalidArgument);
}

#[test]
fn generic_describer() {
    let mut out = ExplainStringView::empty();
    let status = explain_describe_generic(libc::EAGAIN, &view("write(2)"), &mut out);
    assert_eq!(status, ExplainStatus::Ok);
    assert_eq!(
        take(out),
        "the write(2) system call was waiting to finish but was told not to wait"
    );

    let status = explain_describe_generic(0, &view("write(2)"), &mut out);
    assert_eq!(status, ExplainStatus::NotAnError);
    let status = explain_describe_generic(libc::EIO, &view(""), &mut out);
    assert_eq!(status, ExplainStatus::InvalidArgument);
    let status = explain_describe_generic(libc::EIO, std::ptr::null(), &mut out);
    assert_eq!(status, ExplainStatus::InvalidArgument);
}

#[test]
fn argument_validation() {
    let session = TestSession::new(0, Verbosity::Terse);
    let mut out = ExplainStringView::empty();

    assert_eq!(
        explain_stat_error(std::ptr::null_mut(), libc::ENOENT, &view("/x"), &mut out),
        ExplainStatus::InvalidArgument
    );
    assert_eq!(
        explain_stat_error(session.handle, libc::ENOENT, &view(""), &mut out),
        ExplainStatus::InvalidArgument
    );
    assert_eq!(
        explain_stat_error(session.handle, 0, &view("/x"), &mut out),
        ExplainStatus::NotAnError
    );
    let bad_utf8 = [0xffu8, 0xfe];
    let bad = ExplainStringView {
        ptr: bad_utf8.as_ptr() as *const c_char,
        len: bad_utf8.len(),
    };
    assert_eq!(
        explain_stat_error(session.handle, libc::ENOENT, &bad, &mut out),
        ExplainStatus::InvalidArgument
    );

    let short = ExplainFfiConfig {
        size: 4,
        flags: 0,
        verbosity: 1,
        reserved: [0; 4],
    };
    assert!(explain_create(&short).is_null());

    let defaults = explain_create(std::ptr::null());
    assert!(!defaults.is_null());
    explain_destroy(defaults);
    explain_destroy(std::ptr::null_mut());
    explain_free_string(ExplainStringView::empty());
}

#[test]
fn disabled_engine() {
    let session = TestSession::new(EXPLAIN_FLAG_DISABLE_ENGINE, Verbosity::Terse);
    let mut out = ExplainStringView::empty();
    assert_eq!(
        explain_stat_error(session.handle, libc::ENOENT, &view("/x"), &mut out),
        ExplainStatus::Disabled
    );
    assert_eq!(
        explain_path(session.handle, libc::ENOENT, &view("/x"), 0, 0, &mut out),
        ExplainStatus::Disabled
    );

    // Restart turns the engine back on.
    assert_eq!(explain_event_restart(session.handle), ExplainStatus::Ok);
    assert_eq!(
        explain_stat_error(session.handle, libc::ENOENT, &view("/definitely-not-here"), &mut out),
        ExplainStatus::Ok
    );
    assert_eq!(take(out), "stat(2) failed: file '/definitely-not-here' does not exist");
}

#[test]
fn chroot_event() {
    let dir = tempfile::tempdir().unwrap();
    let jail = dir.path().to_string_lossy().into_owned();
    let session = TestSession::new(0, Verbosity::Terse);

    assert_eq!(explain_event_chroot(session.handle, &view(&jail)), ExplainStatus::Ok);
    assert_eq!(explain_event_chroot(session.handle, &view(&jail)), ExplainStatus::Ok);
    assert_eq!(explain_event_chroot(session.handle, &view("")), ExplainStatus::InvalidArgument);
    assert_eq!(
        explain_event_chroot(std::ptr::null_mut(), &view(&jail)),
        ExplainStatus::InvalidArgument
    );
    assert_eq!(explain_event_restart(std::ptr::null_mut()), ExplainStatus::InvalidArgument);
}

#[test]
fn chdir_event_moves_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_string_lossy().into_owned();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let session = TestSession::new(0, Verbosity::Minimal);
    let mut out = ExplainStringView::empty();

    // Before any chdir, relative paths start in the process directory.
    assert_eq!(
        explain_lstat_error(session.handle, libc::ENOENT, &view("Cargo.toml"), &mut out),
        ExplainStatus::Ok
    );
    assert_eq!(take(out), "the entropic gremlins have frobnicated the lstat(2) system call");

    assert_eq!(explain_event_chdir(session.handle, &view(&base)), ExplainStatus::Ok);
    assert_eq!(
        explain_lstat_error(session.handle, libc::ENOENT, &view("sub/missing"), &mut out),
        ExplainStatus::Ok
    );
    assert_eq!(take(out), format!("file '{base}/sub/missing' does not exist"));

    assert_eq!(explain_event_chdir(session.handle, &view("")), ExplainStatus::InvalidArgument);
    assert_eq!(
        explain_event_chdir(std::ptr::null_mut(), &view(&base)),
        ExplainStatus::InvalidArgument
    );
}

extern "C" fn count_signal_checks(user_data: *mut c_void) {
    let counter = unsafe { &*(user_data as *const AtomicUsize) };
    counter.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn signal_callback_runs_during_walks() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_string_lossy().into_owned();
    let session = TestSession::new(0, Verbosity::Terse);
    let counter = AtomicUsize::new(0);
    let user_data = &counter as *const AtomicUsize as *mut c_void;

    assert_eq!(
        explain_set_signal_callback(session.handle, Some(count_signal_checks), user_data),
        ExplainStatus::Ok
    );
    let mut out = ExplainStringView::empty();
    let path = format!("{base}/missing/file");
    assert_eq!(explain_stat_error(session.handle, libc::ENOENT, &view(&path), &mut out), ExplainStatus::Ok);
    take(out);
    let seen = counter.load(Ordering::SeqCst);
    assert!(seen > 0);

    assert_eq!(explain_set_signal_callback(session.handle, None, std::ptr::null_mut()), ExplainStatus::Ok);
    assert_eq!(explain_stat_error(session.handle, libc::ENOENT, &view(&path), &mut out), ExplainStatus::Ok);
    take(out);
    assert_eq!(counter.load(Ordering::SeqCst), seen);

    assert_eq!(
        explain_set_signal_callback(std::ptr::null_mut(), Some(count_signal_checks), user_data),
        ExplainStatus::InvalidArgument
    );
}
