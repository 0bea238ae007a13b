use core::ffi::c_char;

use bitflags::bitflags;

#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExplainStatus {
    Ok = 0,
    NoExplanation = 1,
    NotAnError = 2,
    InvalidArgument = 3,
    Unsupported = 4,
    NotImplemented = 5,
    Disabled = 6,
    IoError = 7,
}

bitflags! {
    /// Why the caller wanted the path.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct IntentFlags: u32 {
        const WANT_READ = 0x0001;
        const WANT_WRITE = 0x0002;
        const WANT_SEARCH = 0x0004;
        const WANT_CREATE = 0x0008;
        const WANT_MODIFY = 0x0010;
        const WANT_UNLINK = 0x0020;
        const MUST_EXIST = 0x0040;
        const MUST_NOT_EXIST = 0x0080;
        const MUST_HAVE_MODE = 0x0100;
    }
}

impl IntentFlags {
    /// Any intent that changes the containing directory or the leaf.
    pub fn wants_mutation(&self) -> bool {
        self.intersects(
            IntentFlags::WANT_WRITE
                | IntentFlags::WANT_CREATE
                | IntentFlags::WANT_MODIFY
                | IntentFlags::WANT_UNLINK,
        )
    }
}

/// File type the final component is expected to resolve to.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ExpectedType {
    #[default]
    Unspecified,
    Regular,
    Directory,
    Symlink,
}

impl ExpectedType {
    pub fn noun(&self) -> &'static str {
        match self {
            ExpectedType::Directory => "directory",
            ExpectedType::Symlink => "symbolic link",
            ExpectedType::Regular | ExpectedType::Unspecified => "file",
        }
    }

    /// Whether the failing call resolves a trailing symlink.
    pub fn follows_links(&self) -> bool {
        matches!(self, ExpectedType::Regular | ExpectedType::Directory)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

impl FileKind {
    pub fn noun(&self) -> &'static str {
        match self {
            FileKind::Regular => "regular file",
            FileKind::Directory => "directory",
            FileKind::Symlink => "symbolic link",
            FileKind::Other => "special file",
        }
    }

    pub fn matches(&self, expected: ExpectedType) -> bool {
        match expected {
            ExpectedType::Unspecified => true,
            ExpectedType::Regular => *self == FileKind::Regular,
            ExpectedType::Directory => *self == FileKind::Directory,
            ExpectedType::Symlink => *self == FileKind::Symlink,
        }
    }
}

/// Result of a successful non-following status probe on one path prefix.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ComponentStatus {
    pub kind: FileKind,
    /// Permission bits only (`st_mode & 07777`).
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

impl ComponentStatus {
    pub fn is_traversable(&self) -> bool {
        matches!(self.kind, FileKind::Directory | FileKind::Symlink)
    }
}

#[repr(i32)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Verbosity {
    Minimal = 0,
    #[default]
    Terse = 1,
    Detailed = 2,
}

impl Verbosity {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Verbosity::Minimal),
            1 => Some(Verbosity::Terse),
            2 => Some(Verbosity::Detailed),
            _ => None,
        }
    }
}

#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExplainLogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ExplainStringView {
    pub ptr: *const c_char,
    pub len: usize,
}

impl ExplainStringView {
    pub const fn empty() -> Self {
        Self {
            ptr: std::ptr::null(),
            len: 0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ExplainLogRecord {
    pub level: ExplainLogLevel,
    pub target: ExplainStringView,
    pub message: ExplainStringView,
    pub file: ExplainStringView,
    pub line: u32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ExplainFfiConfig {
    pub size: u32,
    pub flags: u32,
    /// One of the `Verbosity` discriminants; anything else means the default.
    pub verbosity: i32,
    pub reserved: [u64; 4],
}

pub const EXPLAIN_FLAG_DISABLE_ENGINE: u32 = 1 << 0;
