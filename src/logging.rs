//! `log` backend for hosts that do not install their own logger.
//!
//! Records can go nowhere, to stderr, or to a C callback. The backend is
//! installed on first use; if the process already has a logger, only the
//! global max level is adjusted.

use crate::common::types::{ExplainLogLevel, ExplainLogRecord, ExplainStatus, ExplainStringView};

use core::ffi::{c_char, c_void};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};

pub type ExplainLogCallback = Option<extern "C" fn(record: *const ExplainLogRecord, user_data: *mut c_void)>;

#[derive(Copy, Clone)]
enum Sink {
    Disabled,
    Stderr,
    Callback {
        callback: extern "C" fn(*const ExplainLogRecord, *mut c_void),
        // Stored as an address so the sink stays `Send`.
        user_data: usize,
    },
}

pub struct ExplainLogger {
    level: AtomicU8,
    sink: Mutex<Sink>,
}

impl ExplainLogger {
    const fn new() -> Self {
        Self {
            level: AtomicU8::new(ExplainLogLevel::Off as u8),
            sink: Mutex::new(Sink::Disabled),
        }
    }

    fn set_level(&self, level: ExplainLogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
        log::set_max_level(level.into());
    }

    fn set_sink(&self, sink: Sink) {
        if let Ok(mut current) = self.sink.lock() {
            *current = sink;
        }
    }

    fn max_level(&self) -> LevelFilter {
        ExplainLogLevel::from_u8(self.level.load(Ordering::Relaxed))
            .map(LevelFilter::from)
            .unwrap_or(LevelFilter::Off)
    }
}

impl Log for ExplainLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Ok(sink) = self.sink.lock().map(|sink| *sink) else {
            return;
        };

        match sink {
            Sink::Disabled => {}
            Sink::Stderr => {
                eprintln!("[explain][{}] {}", record.level(), record.args());
            }
            Sink::Callback { callback, user_data } => {
                let message = record.args().to_string();
                let raw = ExplainLogRecord {
                    level: record.level().into(),
                    target: string_view(record.target()),
                    message: string_view(&message),
                    file: string_view(record.file().unwrap_or("")),
                    line: record.line().unwrap_or(0),
                };
                callback(&raw, user_data as *mut c_void);
            }
        }
    }

    fn flush(&self) {}
}

impl ExplainLogLevel {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ExplainLogLevel::Off),
            1 => Some(ExplainLogLevel::Error),
            2 => Some(ExplainLogLevel::Warn),
            3 => Some(ExplainLogLevel::Info),
            4 => Some(ExplainLogLevel::Debug),
            5 => Some(ExplainLogLevel::Trace),
            _ => None,
        }
    }
}

impl From<ExplainLogLevel> for LevelFilter {
    fn from(level: ExplainLogLevel) -> Self {
        match level {
            ExplainLogLevel::Off => LevelFilter::Off,
            ExplainLogLevel::Error => LevelFilter::Error,
            ExplainLogLevel::Warn => LevelFilter::Warn,
            ExplainLogLevel::Info => LevelFilter::Info,
            ExplainLogLevel::Debug => LevelFilter::Debug,
            ExplainLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl From<Level> for ExplainLogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => ExplainLogLevel::Error,
            Level::Warn => ExplainLogLevel::Warn,
            Level::Info => ExplainLogLevel::Info,
            Level::Debug => ExplainLogLevel::Debug,
            Level::Trace => ExplainLogLevel::Trace,
        }
    }
}

fn string_view(value: &str) -> ExplainStringView {
    ExplainStringView {
        ptr: value.as_ptr() as *const c_char,
        len: value.len(),
    }
}

static LOGGER: ExplainLogger = ExplainLogger::new();
static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Installs the backend once; false when another logger got there first.
fn install() -> bool {
    *INSTALLED.get_or_init(|| match log::set_logger(&LOGGER) {
        Ok(()) => {
            log::set_max_level(LevelFilter::Off);
            true
        }
        Err(_) => false,
    })
}

pub fn log_set_stderr(level: ExplainLogLevel) -> ExplainStatus {
    if !install() {
        return ExplainStatus::IoError;
    }
    LOGGER.set_sink(Sink::Stderr);
    LOGGER.set_level(level);
    ExplainStatus::Ok
}

pub fn log_set_callback(
    callback: ExplainLogCallback,
    user_data: *mut c_void,
    level: ExplainLogLevel,
) -> ExplainStatus {
    let Some(callback) = callback else {
        return log_disable();
    };
    if !install() {
        return ExplainStatus::IoError;
    }
    LOGGER.set_sink(Sink::Callback {
        callback,
        user_data: user_data as usize,
    });
    LOGGER.set_level(level);
    ExplainStatus::Ok
}

pub fn log_set_level(level: ExplainLogLevel) -> ExplainStatus {
    if install() {
        LOGGER.set_level(level);
    } else {
        log::set_max_level(level.into());
    }
    ExplainStatus::Ok
}

pub fn log_disable() -> ExplainStatus {
    if install() {
        LOGGER.set_sink(Sink::Disabled);
        LOGGER.set_level(ExplainLogLevel::Off);
    } else {
        log::set_max_level(LevelFilter::Off);
    }
    ExplainStatus::Ok
}
