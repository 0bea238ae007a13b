//! Session configuration and the directives that set it.

use crate::common::error::ConfigError;
use crate::common::types::{ExplainFfiConfig, Verbosity, EXPLAIN_FLAG_DISABLE_ENGINE};

pub const DIRECTIVE_ENGINE: &str = "ExplainEngine";
pub const DIRECTIVE_OPTIONS: &str = "ExplainOptions";
pub const DIRECTIVE_VERBOSITY: &str = "ExplainVerbosity";

/// Tuning switches set by `ExplainOptions`. No option names are defined yet,
/// so every name is rejected and the set stays empty.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ExplainOptions(u32);

impl ExplainOptions {
    const NAMED: [(&'static str, u32); 0] = [];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, bits)| Self(*bits))
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExplainConfig {
    pub engine: bool,
    pub verbosity: Verbosity,
    pub options: ExplainOptions,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            engine: true,
            verbosity: Verbosity::Terse,
            options: ExplainOptions::empty(),
        }
    }
}

fn parse_bool(directive: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Ok(true),
        "off" | "no" | "false" | "0" => Ok(false),
        _ => Err(ConfigError::ExpectedBoolean { directive }),
    }
}

fn parse_verbosity(value: &str) -> Result<Verbosity, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "minimal" => Ok(Verbosity::Minimal),
        "terse" => Ok(Verbosity::Terse),
        "detailed" => Ok(Verbosity::Detailed),
        _ => Err(ConfigError::UnknownVerbosity(value.to_string())),
    }
}

impl ExplainConfig {
    /// Applies one configuration directive. Directive names match without
    /// regard to case.
    ///
    /// A failed directive leaves the configuration unchanged.
    pub fn apply_directive(&mut self, name: &str, args: &[&str]) -> Result<(), ConfigError> {
        if name.eq_ignore_ascii_case(DIRECTIVE_ENGINE) {
            let [value] = args else {
                return Err(ConfigError::WrongArgCount {
                    directive: DIRECTIVE_ENGINE,
                });
            };
            self.engine = parse_bool(DIRECTIVE_ENGINE, value)?;
        } else if name.eq_ignore_ascii_case(DIRECTIVE_OPTIONS) {
            if args.is_empty() {
                return Err(ConfigError::WrongArgCount {
                    directive: DIRECTIVE_OPTIONS,
                });
            }
            let mut options = self.options;
            for arg in args {
                let option = ExplainOptions::from_name(arg)
                    .ok_or_else(|| ConfigError::UnknownOption(arg.to_string()))?;
                options.insert(option);
            }
            self.options = options;
        } else if name.eq_ignore_ascii_case(DIRECTIVE_VERBOSITY) {
            let [value] = args else {
                return Err(ConfigError::WrongArgCount {
                    directive: DIRECTIVE_VERBOSITY,
                });
            };
            self.verbosity = parse_verbosity(value)?;
        } else {
            return Err(ConfigError::UnknownDirective(name.to_string()));
        }

        log::debug!(target: "explain", "applied {} {}", name, args.join(" "));
        Ok(())
    }

    /// Reads the C ABI configuration, falling back to defaults for an
    /// out-of-range verbosity.
    pub fn from_ffi(config: &ExplainFfiConfig) -> Self {
        let mut out = Self::default();
        if config.flags & EXPLAIN_FLAG_DISABLE_ENGINE != 0 {
            out.engine = false;
        }
        match Verbosity::from_i32(config.verbosity) {
            Some(verbosity) => out.verbosity = verbosity,
            None => log::debug!(
                target: "explain",
                "ignoring unknown verbosity {}",
                config.verbosity
            ),
        }
        out
    }
}
