use std::fs;
use std::os::unix::fs::{symlink, MetadataExt, PermissionsExt};
use std::path::Path;

use fs_explain::path::{explain_path_error, split_path};
use fs_explain::{ExpectedType, ExplainConfig, ExplainModule, IntentFlags, ModuleEvent};

fn live_module() -> ExplainModule {
    let mut module = ExplainModule::new(ExplainConfig::default());
    module.handle_event(ModuleEvent::PostParse).unwrap();
    module
}

fn as_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn walk(module: &ExplainModule, xerrno: i32, path: &str, intent: IntentFlags, expected: ExpectedType) -> Option<String> {
    explain_path_error(&module.context(), xerrno, path, intent, expected).expect("walk")
}

#[test]
fn split_matches_documented_shapes() {
    assert_eq!(split_path("/"), vec!["/"]);
    assert_eq!(split_path("/a/b/"), vec!["/", "a", "b", "."]);
}

#[test]
fn missing_intermediate_directory() {
    let dir = tempfile::tempdir().unwrap();
    let base = as_str(dir.path());
    let module = live_module();

    let explained = walk(
        &module,
        libc::ENOENT,
        &format!("{base}/missing/deeper/file.txt"),
        IntentFlags::WANT_READ,
        ExpectedType::Regular,
    );
    assert_eq!(explained, Some(format!("directory '{base}/missing' does not exist")));
}

#[test]
fn regular_file_in_directory_position() {
    let dir = tempfile::tempdir().unwrap();
    let base = as_str(dir.path());
    fs::write(dir.path().join("notes"), b"x").unwrap();
    let module = live_module();

    let explained = walk(
        &module,
        libc::ENOTDIR,
        &format!("{base}/notes/child"),
        IntentFlags::WANT_READ,
        ExpectedType::Regular,
    );
    assert_eq!(explained, Some(format!("path '{base}/notes' does not refer to a directory")));
}

#[test]
fn symlinked_directory_is_traversed() {
    let dir = tempfile::tempdir().unwrap();
    let base = as_str(dir.path());
    fs::create_dir(dir.path().join("real")).unwrap();
    symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();
    let module = live_module();

    let explained = walk(
        &module,
        libc::ENOENT,
        &format!("{base}/alias/gone.txt"),
        IntentFlags::WANT_READ,
        ExpectedType::Regular,
    );
    assert_eq!(explained, Some(format!("file '{base}/alias/gone.txt' does not exist")));
}

#[test]
fn existing_leaf_permission_evidence_comes_from_parent() {
    let dir = tempfile::tempdir().unwrap();
    let base = as_str(dir.path());
    let ftp = dir.path().join("ftp");
    fs::create_dir(&ftp).unwrap();
    fs::write(ftp.join("readme.txt"), b"hello").unwrap();
    fs::set_permissions(ftp.join("readme.txt"), fs::Permissions::from_mode(0o600)).unwrap();
    fs::set_permissions(&ftp, fs::Permissions::from_mode(0o750)).unwrap();
    let meta = fs::symlink_metadata(&ftp).unwrap();
    let module = live_module();

    let explained = walk(
        &module,
        libc::EACCES,
        &format!("{base}/ftp/readme.txt"),
        IntentFlags::WANT_READ,
        ExpectedType::Regular,
    )
    .expect("diagnosis");
    assert_eq!(
        explained,
        format!(
            "the user does not have permission to read file '{base}/ftp/readme.txt' \
             (containing directory '{base}/ftp' has mode 0750, owner UID {}, group GID {})",
            meta.uid(),
            meta.gid()
        )
    );
}

#[test]
fn whole_path_over_limit_skips_walk() {
    let module = live_module();
    let path_max = module.limits().path_max("/").expect("PATH_MAX") as usize;
    let long = format!("/{}", "a".repeat(path_max + 10));

    let explained = walk(&module, libc::ENAMETOOLONG, &long, IntentFlags::WANT_READ, ExpectedType::Regular)
        .expect("diagnosis");
    assert!(explained.ends_with(&format!("exceeds the system maximum path length ({} > max {})", long.len(), path_max)));
    assert!(!explained.contains("component"));
}

#[test]
fn long_component_names_the_component() {
    let module = live_module();
    if !module.limits().no_truncation("/").unwrap_or(false) {
        return;
    }
    let name_max = module.limits().name_max("/").expect("NAME_MAX") as usize;
    let name = "n".repeat(name_max + 1);

    let explained = walk(
        &module,
        libc::ENAMETOOLONG,
        &format!("/{name}"),
        IntentFlags::WANT_READ,
        ExpectedType::Regular,
    )
    .expect("diagnosis");
    assert_eq!(
        explained,
        format!(
            "path component '{name}' exceeds the system maximum name length ({} > max {name_max})",
            name.len()
        )
    );
}
