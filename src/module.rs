//! Session state and its lifecycle.
//!
//! An [`ExplainModule`] owns everything an explanation needs (configuration,
//! the limits cache and the probe collaborators) and installs the
//! per-call explainers into the host's registry. Lifecycle events arrive
//! serialized with request processing, which is what lets the limits cache
//! be written without locks.

use std::collections::HashMap;

use crate::common::error::{ExplainError, RegistryError, Result};
use crate::config::ExplainConfig;
use crate::path::ExplainContext;
use crate::platform::PlatformLimits;
use crate::probe::{LstatProbe, NoSignals, PathView, Probe, SessionView, SignalCheck};
use crate::syscalls::{Explanation, ExplanationTable, SyscallArgs};

/// Name the explainers are registered under.
pub const MODULE_NAME: &str = "fs-explain";

/// The host's extension point: one table of explainers per module.
pub trait ExplanationRegistry {
    fn register(&mut self, module: &str, table: ExplanationTable) -> std::result::Result<(), RegistryError>;
    fn unregister(&mut self, module: &str) -> std::result::Result<(), RegistryError>;
}

/// In-process registry for hosts without one of their own.
#[derive(Debug, Default)]
pub struct LocalRegistry {
    tables: HashMap<String, ExplanationTable>,
}

impl LocalRegistry {
    pub fn table(&self, module: &str) -> Option<&ExplanationTable> {
        self.tables.get(module)
    }
}

impl ExplanationRegistry for LocalRegistry {
    fn register(&mut self, module: &str, table: ExplanationTable) -> std::result::Result<(), RegistryError> {
        if self.tables.contains_key(module) {
            return Err(RegistryError::Rejected {
                module: module.to_string(),
                reason: "already registered".to_string(),
            });
        }
        self.tables.insert(module.to_string(), table);
        Ok(())
    }

    fn unregister(&mut self, module: &str) -> std::result::Result<(), RegistryError> {
        self.tables
            .remove(module)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotRegistered(module.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleEvent {
    /// Configuration has been read.
    PostParse,
    /// The session is about to chroot into the given path.
    Chroot(String),
    /// The session changed its working directory.
    Chdir(String),
    Restart,
    Shutdown,
    /// A module is being unloaded; only our own name matters.
    ModuleUnload(String),
}

pub struct ExplainModule {
    config: ExplainConfig,
    limits: PlatformLimits,
    probe: Box<dyn Probe>,
    view: Box<dyn PathView>,
    signals: Box<dyn SignalCheck>,
    registry: Box<dyn ExplanationRegistry>,
    table: ExplanationTable,
    registered: bool,
}

impl ExplainModule {
    /// A module over the live filesystem with an in-process registry.
    pub fn new(config: ExplainConfig) -> Self {
        Self {
            config,
            limits: PlatformLimits::default(),
            probe: Box::new(LstatProbe),
            view: Box::new(SessionView::default()),
            signals: Box::new(NoSignals),
            registry: Box::new(LocalRegistry::default()),
            table: ExplanationTable::standard(),
            registered: false,
        }
    }

    pub fn with_limits(mut self, limits: PlatformLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_probe(mut self, probe: Box<dyn Probe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_view(mut self, view: Box<dyn PathView>) -> Self {
        self.view = view;
        self
    }

    pub fn with_signals(mut self, signals: Box<dyn SignalCheck>) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_registry(mut self, registry: Box<dyn ExplanationRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Swaps the interruption check after construction.
    pub fn set_signals(&mut self, signals: Box<dyn SignalCheck>) {
        self.signals = signals;
    }

    pub fn config(&self) -> &ExplainConfig {
        &self.config
    }

    pub fn limits(&self) -> &PlatformLimits {
        &self.limits
    }

    pub fn apply_directive(&mut self, name: &str, args: &[&str]) -> Result<()> {
        self.config.apply_directive(name, args)?;
        Ok(())
    }

    /// Explanations are produced only while the engine is on and the
    /// explainers are installed.
    pub fn is_enabled(&self) -> bool {
        self.config.engine && self.registered
    }

    pub fn context(&self) -> ExplainContext<'_> {
        ExplainContext {
            limits: &self.limits,
            probe: self.probe.as_ref(),
            view: self.view.as_ref(),
            signals: self.signals.as_ref(),
        }
    }

    pub fn handle_event(&mut self, event: ModuleEvent) -> Result<()> {
        log::trace!(target: "explain", "handling {:?}", event);
        match event {
            ModuleEvent::PostParse => {
                self.install();
                Ok(())
            }
            ModuleEvent::Chroot(path) => {
                if self.limits.capture_pre_isolation(&path)? {
                    log::debug!(target: "explain", "captured limits before chroot to '{}'", path);
                }
                Ok(())
            }
            ModuleEvent::Chdir(path) => {
                if path.is_empty() {
                    return Err(ExplainError::InvalidArgument("path"));
                }
                self.view.set_cwd(&path);
                Ok(())
            }
            ModuleEvent::Restart => {
                self.uninstall();
                self.limits.reset();
                self.config.engine = true;
                Ok(())
            }
            ModuleEvent::Shutdown => {
                self.limits.reset();
                Ok(())
            }
            ModuleEvent::ModuleUnload(name) => {
                if name == MODULE_NAME {
                    self.limits.reset();
                    self.uninstall();
                }
                Ok(())
            }
        }
    }

    /// Explains a failed call with the session's explainers.
    pub fn explain(&self, xerrno: i32, args: &SyscallArgs<'_>) -> Result<Explanation> {
        if !self.is_enabled() {
            return Err(ExplainError::Disabled);
        }
        self.table.explain(&self.context(), xerrno, args)
    }

    /// Explains and renders at the configured verbosity.
    pub fn describe(&self, xerrno: i32, args: &SyscallArgs<'_>) -> Result<String> {
        let explanation = self.explain(xerrno, args)?;
        Ok(explanation.render(self.config.verbosity, xerrno))
    }

    fn install(&mut self) {
        if !self.config.engine || self.registered {
            return;
        }
        match self.registry.register(MODULE_NAME, self.table) {
            Ok(()) => self.registered = true,
            Err(err) => {
                log::warn!(target: "explain", "{}; disabling error explanations", err);
                self.config.engine = false;
            }
        }
    }

    fn uninstall(&mut self) {
        if !self.registered {
            return;
        }
        if let Err(err) = self.registry.unregister(MODULE_NAME) {
            log::debug!(target: "explain", "{}", err);
        }
        self.registered = false;
    }
}

impl Drop for ExplainModule {
    fn drop(&mut self) {
        self.uninstall();
    }
}
