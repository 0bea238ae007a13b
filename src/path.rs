//! Path resolution errors (see path_resolution(7)).
//!
//! The walker re-probes every prefix of the failing path and reports the
//! first component that explains the errno. The filesystem may have changed
//! since the original call failed, so a diagnosis is best effort: when no
//! component accounts for the error the walker says nothing rather than
//! guess.

use crate::common::error::{ExplainError, Result};
use crate::common::types::{ComponentStatus, ExpectedType, FileKind, IntentFlags};
use crate::platform::PlatformLimits;
use crate::probe::{PathView, Probe, SignalCheck};

/// Everything one explanation needs from the session.
#[derive(Copy, Clone)]
pub struct ExplainContext<'a> {
    pub limits: &'a PlatformLimits,
    pub probe: &'a dyn Probe,
    pub view: &'a dyn PathView,
    pub signals: &'a dyn SignalCheck,
}

/// Splits an absolute, normalized path into components.
///
/// The first component is always `/`. A trailing separator becomes a final
/// `.` component, so the last element always names something checkable.
pub fn split_path(path: &str) -> Vec<String> {
    let mut components = vec!["/".to_string()];
    if path.len() <= 1 {
        return components;
    }

    let mut full_path = path.to_string();
    if full_path.ends_with('/') {
        full_path.push('.');
    }

    components.extend(
        full_path
            .trim_start_matches('/')
            .split('/')
            .filter(|part| !part.is_empty())
            .map(str::to_string),
    );
    components
}

fn join(prefix: &str, component: &str) -> String {
    if prefix.is_empty() {
        component.to_string()
    } else if prefix.ends_with('/') {
        format!("{prefix}{component}")
    } else {
        format!("{prefix}/{component}")
    }
}

fn describe_enametoolong_name(name: &str, name_max: u64) -> String {
    format!(
        "path component '{}' exceeds the system maximum name length ({} > max {})",
        name,
        name.len(),
        name_max
    )
}

fn describe_enametoolong_path(path: &str, path_max: u64) -> String {
    format!(
        "'{}' exceeds the system maximum path length ({} > max {})",
        path,
        path.len(),
        path_max
    )
}

fn describe_enoent_dir(path: &str) -> String {
    format!("directory '{path}' does not exist")
}

fn describe_enotdir(path: &str) -> String {
    format!("path '{path}' does not refer to a directory")
}

fn describe_not_searchable(dir: &str) -> String {
    format!("directory '{dir}' is not searchable by the user")
}

fn describe_not_writable(dir: &str) -> String {
    format!("containing directory '{dir}' is not writable by the user")
}

fn describe_eloop(path: &str) -> String {
    format!("too many symbolic links were encountered while resolving '{path}'")
}

fn describe_prefix_too_long(path: &str) -> String {
    format!("path '{path}' is too long to be resolved")
}

fn parent_or_root(parent: &str) -> &str {
    if parent.is_empty() {
        "/"
    } else {
        parent
    }
}

/// What the caller was trying to do to an existing leaf, for permission
/// phrasing. Creation never applies once the leaf exists.
fn intent_verb(intent: IntentFlags) -> &'static str {
    if intent.contains(IntentFlags::WANT_UNLINK) {
        "delete"
    } else if intent.intersects(IntentFlags::WANT_WRITE | IntentFlags::WANT_MODIFY) {
        "write to"
    } else if intent.contains(IntentFlags::WANT_READ) {
        "read"
    } else {
        "search"
    }
}

/// Probe failure on an intermediate component.
fn explain_intermediate_failure(path: &str, parent: &str, probe_errno: i32) -> Option<String> {
    match probe_errno {
        libc::ENOENT => Some(describe_enoent_dir(path)),
        libc::EACCES => Some(describe_not_searchable(parent_or_root(parent))),
        libc::ENOTDIR => Some(describe_enotdir(parent_or_root(parent))),
        libc::ELOOP => Some(describe_eloop(path)),
        libc::ENAMETOOLONG => Some(describe_prefix_too_long(path)),
        _ => None,
    }
}

/// Probe failure on the final component.
fn explain_final_failure(
    path: &str,
    parent: &str,
    probe_errno: i32,
    intent: IntentFlags,
    expected: ExpectedType,
) -> Option<String> {
    match probe_errno {
        libc::ENOENT => Some(format!("{} '{}' does not exist", expected.noun(), path)),
        libc::EACCES => {
            let parent = parent_or_root(parent);
            if intent.contains(IntentFlags::WANT_SEARCH) {
                Some(describe_not_searchable(parent))
            } else {
                Some(describe_not_writable(parent))
            }
        }
        libc::ENOTDIR => Some(describe_enotdir(parent_or_root(parent))),
        libc::ELOOP => Some(describe_eloop(path)),
        libc::ENAMETOOLONG => Some(describe_prefix_too_long(path)),
        _ => None,
    }
}

/// The leaf exists, yet the call was refused.
fn explain_final_eacces(
    ctx: &ExplainContext<'_>,
    path: &str,
    parent: &str,
    status: &ComponentStatus,
    intent: IntentFlags,
    expected: ExpectedType,
) -> String {
    let noun = if status.kind == FileKind::Directory {
        "directory"
    } else {
        expected.noun()
    };
    let verdict = format!(
        "the user does not have permission to {} {} '{}'",
        intent_verb(intent),
        noun,
        path
    );

    if parent.is_empty() {
        return verdict;
    }
    match ctx.probe.stat_no_follow(parent) {
        Ok(dir) => format!(
            "{} (containing directory '{}' has mode {:04o}, owner UID {}, group GID {})",
            verdict, parent, dir.mode, dir.uid, dir.gid
        ),
        Err(probe_errno) => {
            log::trace!(
                target: "explain",
                "re-probe of parent '{}' failed with errno {}",
                parent,
                probe_errno
            );
            verdict
        }
    }
}

fn explain_final_success(
    ctx: &ExplainContext<'_>,
    xerrno: i32,
    path: &str,
    parent: &str,
    status: &ComponentStatus,
    intent: IntentFlags,
    expected: ExpectedType,
) -> Option<String> {
    if xerrno == libc::EACCES {
        return Some(explain_final_eacces(ctx, path, parent, status, intent, expected));
    }

    if status.kind == FileKind::Symlink {
        // Whatever the link points at was not re-probed; only a vanished
        // target is safe to claim.
        if xerrno == libc::ENOENT && expected.follows_links() {
            return Some(format!(
                "symbolic link '{path}' points to a target that does not exist"
            ));
        }
        return None;
    }

    let wants_mode = intent.contains(IntentFlags::MUST_HAVE_MODE) || xerrno == libc::ENOTDIR;
    if wants_mode && expected != ExpectedType::Unspecified && !status.kind.matches(expected) {
        if expected == ExpectedType::Directory {
            return Some(describe_enotdir(path));
        }
        return Some(format!(
            "path '{}' is a {}, not a {}",
            path,
            status.kind.noun(),
            expected.noun()
        ));
    }
    None
}

/// Explains why resolving `full_path` failed with `xerrno`.
///
/// `Ok(None)` means no component accounts for the error and the caller
/// should fall back to a generic description.
pub fn explain_path_error(
    ctx: &ExplainContext<'_>,
    xerrno: i32,
    full_path: &str,
    intent: IntentFlags,
    expected: ExpectedType,
) -> Result<Option<String>> {
    if full_path.is_empty() {
        return Err(ExplainError::InvalidArgument("path"));
    }

    // A too-long path is a property of the whole string.
    if xerrno == libc::ENAMETOOLONG {
        if let Ok(path_max) = ctx.limits.path_max(full_path) {
            if full_path.len() as u64 > path_max {
                return Ok(Some(describe_enametoolong_path(full_path, path_max)));
            }
        }
    }

    let normalized = ctx.view.normalize(full_path);
    let components = split_path(&normalized);
    log::trace!(
        target: "explain",
        "walking '{}' ({} components) for errno {}",
        normalized,
        components.len(),
        xerrno
    );

    let (name_max, no_trunc) = if xerrno == libc::ENAMETOOLONG {
        (
            ctx.limits.name_max(full_path).ok(),
            ctx.limits.no_truncation(full_path).unwrap_or(false),
        )
    } else {
        (None, false)
    };

    let mut path = String::new();
    let last = components.len() - 1;
    for (idx, component) in components.iter().enumerate() {
        ctx.signals.handle_pending();

        // Truncating filesystems shorten long names instead of failing.
        if let Some(name_max) = name_max {
            if no_trunc && component.len() as u64 > name_max {
                return Ok(Some(describe_enametoolong_name(component, name_max)));
            }
        }

        let parent = path.clone();
        path = join(&path, component);
        let is_last = idx == last;

        let status = match ctx.probe.stat_no_follow(&path) {
            Ok(status) => status,
            Err(probe_errno) => {
                log::trace!(
                    target: "explain",
                    "probe of '{}' failed with errno {}",
                    path,
                    probe_errno
                );
                let explained = if is_last {
                    explain_final_failure(&path, &parent, probe_errno, intent, expected)
                } else {
                    explain_intermediate_failure(&path, &parent, probe_errno)
                };
                return Ok(explained);
            }
        };

        if !is_last {
            // Symlinks may lead to directories; only the kernel's own
            // resolution can tell, so they are let through.
            if !status.is_traversable() {
                return Ok(Some(describe_enotdir(&path)));
            }
            continue;
        }

        return Ok(explain_final_success(
            ctx, xerrno, &path, &parent, &status, intent, expected,
        ));
    }

    Ok(None)
}
