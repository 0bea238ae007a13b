use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};

use fs_explain::{
    ExplainConfig, ExplainError, ExplainModule, ExplanationTable, ModuleEvent, Syscall, SyscallArgs,
    Verbosity,
};

fn live_module() -> ExplainModule {
    let mut module = ExplainModule::new(ExplainConfig::default());
    module.handle_event(ModuleEvent::PostParse).unwrap();
    module
}

#[test]
fn open_renders_flags_and_mode() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_string_lossy().into_owned();
    let module = live_module();
    let path = format!("{base}/missing/new.txt");

    let explanation = module
        .explain(
            libc::ENOENT,
            &SyscallArgs::Open {
                path: &path,
                flags: libc::O_RDWR | libc::O_CREAT,
                mode: 0o644,
            },
        )
        .unwrap();
    assert_eq!(explanation.syscall, Syscall::Open);
    assert_eq!(
        explanation.args,
        format!("flags = O_RDWR|O_CREAT, mode = 644, path = '{path}'")
    );
    assert_eq!(
        explanation.render(Verbosity::Terse, libc::ENOENT),
        format!("open(2) failed: directory '{base}/missing' does not exist")
    );
}

#[test]
fn stat_reports_dangling_link_and_lstat_does_not() {
    let dir = tempfile::tempdir().unwrap();
    let link = dir.path().join("current");
    symlink(dir.path().join("nowhere"), &link).unwrap();
    let link = link.to_string_lossy().into_owned();
    let module = live_module();

    let stat = module.explain(libc::ENOENT, &SyscallArgs::Stat { path: &link }).unwrap();
    assert_eq!(
        stat.diagnosis,
        Some(format!("symbolic link '{link}' points to a target that does not exist"))
    );

    let lstat = module.explain(libc::ENOENT, &SyscallArgs::Lstat { path: &link }).unwrap();
    assert_eq!(
        lstat.diagnosis.as_deref(),
        Some("the entropic gremlins have frobnicated the lstat(2) system call")
    );
}

#[test]
fn chroot_into_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("jail.tar");
    fs::write(&file, b"").unwrap();
    let file = file.to_string_lossy().into_owned();
    let module = live_module();

    let explanation = module
        .explain(libc::ENOTDIR, &SyscallArgs::Chroot { path: &file })
        .unwrap();
    assert_eq!(
        explanation.diagnosis,
        Some(format!("path '{file}' does not refer to a directory"))
    );

    let enomem = module.explain(libc::ENOMEM, &SyscallArgs::Chroot { path: &file }).unwrap();
    assert_eq!(
        enomem.diagnosis.as_deref(),
        Some("there was not enough kernel memory available for chroot(2) to succeed")
    );
}

#[test]
fn unlink_of_directory_and_sticky_parent() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_string_lossy().into_owned();
    let module = live_module();

    fs::create_dir(dir.path().join("incoming")).unwrap();
    let explanation = module
        .explain(
            libc::EISDIR,
            &SyscallArgs::Unlink {
                path: &format!("{base}/incoming"),
            },
        )
        .unwrap();
    assert_eq!(
        explanation.diagnosis,
        Some(format!("'{base}/incoming' is a directory, which unlink(2) does not remove"))
    );

    let shared = dir.path().join("shared");
    fs::create_dir(&shared).unwrap();
    fs::write(shared.join("lock"), b"").unwrap();
    fs::set_permissions(&shared, fs::Permissions::from_mode(0o1777)).unwrap();
    let explanation = module
        .explain(
            libc::EPERM,
            &SyscallArgs::Unlink {
                path: &format!("{base}/shared/lock"),
            },
        )
        .unwrap();
    // The test process owns both the directory and the file, so the sticky
    // bit cannot be what refused it.
    assert_eq!(
        explanation.diagnosis.as_deref(),
        Some("the process does not have the appropriate privileges to use the unlink(2) system call")
    );
}

#[test]
fn relative_paths_follow_chdir() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().to_string_lossy().into_owned();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let mut module = live_module();

    module.handle_event(ModuleEvent::Chdir(base.clone())).unwrap();
    let explanation = module
        .explain(libc::ENOENT, &SyscallArgs::Stat { path: "sub/missing" })
        .unwrap();
    assert_eq!(
        explanation.diagnosis,
        Some(format!("file '{base}/sub/missing' does not exist"))
    );

    module.handle_event(ModuleEvent::Chdir("sub".to_string())).unwrap();
    let explanation = module
        .explain(libc::ENOENT, &SyscallArgs::Lstat { path: "../gone/x" })
        .unwrap();
    assert_eq!(
        explanation.diagnosis,
        Some(format!("directory '{base}/gone' does not exist"))
    );
}

#[test]
fn relative_paths_start_in_the_process_directory() {
    // Tests run from the package root, where the manifest exists.
    let module = live_module();
    let explanation = module
        .explain(libc::ENOENT, &SyscallArgs::Lstat { path: "Cargo.toml" })
        .unwrap();
    assert_eq!(
        explanation.diagnosis.as_deref(),
        Some("the entropic gremlins have frobnicated the lstat(2) system call")
    );

    let explanation = module
        .explain(libc::ENOENT, &SyscallArgs::Lstat { path: "no-such-dir/file" })
        .unwrap();
    let cwd = std::env::current_dir().unwrap().to_string_lossy().into_owned();
    assert_eq!(
        explanation.diagnosis,
        Some(format!("directory '{cwd}/no-such-dir' does not exist"))
    );
}

#[test]
fn standard_table_declines_unimplemented_calls() {
    let module = live_module();
    let table = ExplanationTable::standard();
    for args in [
        SyscallArgs::Mkdir { path: "/tmp/x", mode: 0o755 },
        SyscallArgs::Write { fd: 1, len: 4 },
    ] {
        assert!(matches!(
            table.explain(&module.context(), libc::EIO, &args),
            Err(ExplainError::NotImplemented { .. })
        ));
    }
}

#[test]
fn empty_path_is_invalid_for_every_explainer() {
    let module = live_module();
    for args in [
        SyscallArgs::Chroot { path: "" },
        SyscallArgs::Lstat { path: "" },
        SyscallArgs::Stat { path: "" },
        SyscallArgs::Unlink { path: "" },
        SyscallArgs::Open { path: "", flags: libc::O_RDONLY, mode: 0 },
    ] {
        assert!(matches!(
            module.explain(libc::ENOENT, &args),
            Err(ExplainError::InvalidArgument("path"))
        ));
    }
}
