//! Compile-time configuration options.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unrecognized config variable: {0}")]
    UnknownKey(String),

    #[error("Unknown stack mode: '{0}'")]
    UnknownStackMode(String),

    #[error("Invalid value for {key}: {value}. Valid values are: {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid type for {key}. Type: {actual}. Expected Type: {expected}")]
    WrongKind {
        key: &'static str,
        actual: ConfigKind,
        expected: ConfigKind,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StackMode {
    Bpftrace,
    Perf,
    Raw,
}

impl FromStr for StackMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bpftrace" => Ok(StackMode::Bpftrace),
            "perf" => Ok(StackMode::Perf),
            "raw" => Ok(StackMode::Raw),
            other => Err(ConfigError::UnknownStackMode(other.to_string())),
        }
    }
}

impl Display for StackMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            StackMode::Bpftrace => "bpftrace",
            StackMode::Perf => "perf",
            StackMode::Raw => "raw",
        };
        write!(f, "{}", name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UserSymbolCacheType {
    PerPid,
    PerProgram,
    None,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolSource {
    Dwarf,
    SymbolTable,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MissingProbes {
    Ignore,
    Warn,
    Error,
}

/// Kind of value an option accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigKind {
    Int,
    Bool,
    String,
    StackMode,
    UserSymbolCacheType,
    SymbolSource,
    MissingProbes,
}

impl ConfigKind {
    /// Kinds whose values are written as strings in scripts.
    pub fn is_textual(self) -> bool {
        match self {
            ConfigKind::Int | ConfigKind::Bool => false,
            _ => true,
        }
    }
}

impl Display for ConfigKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigKind::Int => "int",
            ConfigKind::Bool => "bool",
            ConfigKind::String => "string",
            ConfigKind::StackMode => "stack_mode",
            ConfigKind::UserSymbolCacheType => "user symbol cache type",
            ConfigKind::SymbolSource => "symbol source",
            ConfigKind::MissingProbes => "missing probes",
        };
        write!(f, "{}", name)
    }
}

macro_rules! config_keys {
    ($($key:ident => ($name:literal, $kind:ident)),* $(,)?) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ConfigKey {
            $($key),*
        }

        impl ConfigKey {
            pub const ALL: &'static [ConfigKey] = &[$(ConfigKey::$key),*];

            pub fn name(self) -> &'static str {
                match self {
                    $(ConfigKey::$key => $name),*
                }
            }

            pub fn kind(self) -> ConfigKind {
                match self {
                    $(ConfigKey::$key => ConfigKind::$kind),*
                }
            }
        }
    };
}

config_keys! {
    MaxMapKeys => ("max_map_keys", Int),
    MaxStrlen => ("max_strlen", Int),
    MaxProbes => ("max_probes", Int),
    MaxBpfProgs => ("max_bpf_progs", Int),
    PerfRbPages => ("perf_rb_pages", Int),
    LogSize => ("log_size", Int),
    OnStackLimit => ("on_stack_limit", Int),
    MaxCatBytes => ("max_cat_bytes", Int),
    MaxTypeResIterations => ("max_type_res_iterations", Int),
    CppDemangle => ("cpp_demangle", Bool),
    LazySymbolication => ("lazy_symbolication", Bool),
    ProbeInline => ("probe_inline", Bool),
    PrintMapsOnExit => ("print_maps_on_exit", Bool),
    StrTruncTrailer => ("str_trunc_trailer", String),
    License => ("license", String),
    StackMode => ("stack_mode", StackMode),
    CacheUserSymbols => ("cache_user_symbols", UserSymbolCacheType),
    SymbolSource => ("symbol_source", SymbolSource),
    MissingProbes => ("missing_probes", MissingProbes),
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    /// Option names are case insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_lowercase();
        ConfigKey::ALL
            .iter()
            .copied()
            .find(|key| key.name() == name)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    Int(u64),
    Bool(bool),
    String(String),
    StackMode(StackMode),
    UserSymbolCacheType(UserSymbolCacheType),
    SymbolSource(SymbolSource),
    MissingProbes(MissingProbes),
}

impl ConfigValue {
    pub fn kind(&self) -> ConfigKind {
        match self {
            ConfigValue::Int(_) => ConfigKind::Int,
            ConfigValue::Bool(_) => ConfigKind::Bool,
            ConfigValue::String(_) => ConfigKind::String,
            ConfigValue::StackMode(_) => ConfigKind::StackMode,
            ConfigValue::UserSymbolCacheType(_) => ConfigKind::UserSymbolCacheType,
            ConfigValue::SymbolSource(_) => ConfigKind::SymbolSource,
            ConfigValue::MissingProbes(_) => ConfigKind::MissingProbes,
        }
    }

    /// Parses the textual form of a value for `key`.
    pub fn parse(key: ConfigKey, raw: &str) -> Result<ConfigValue, ConfigError> {
        let invalid = |expected| ConfigError::InvalidValue {
            key: key.name(),
            value: raw.to_string(),
            expected,
        };

        let value = match key.kind() {
            ConfigKind::Int => ConfigValue::Int(raw.parse().map_err(|_| invalid("integers"))?),
            ConfigKind::Bool => match raw {
                "1" | "true" => ConfigValue::Bool(true),
                "0" | "false" => ConfigValue::Bool(false),
                _ => return Err(invalid("0, 1, true, false")),
            },
            ConfigKind::String => ConfigValue::String(raw.to_string()),
            ConfigKind::StackMode => ConfigValue::StackMode(raw.parse()?),
            ConfigKind::UserSymbolCacheType => ConfigValue::UserSymbolCacheType(match raw {
                "PER_PID" => UserSymbolCacheType::PerPid,
                "PER_PROGRAM" => UserSymbolCacheType::PerProgram,
                "NONE" => UserSymbolCacheType::None,
                _ => return Err(invalid("PER_PID, PER_PROGRAM, NONE")),
            }),
            ConfigKind::SymbolSource => ConfigValue::SymbolSource(match raw {
                "dwarf" => SymbolSource::Dwarf,
                "symbol_table" => SymbolSource::SymbolTable,
                _ => return Err(invalid("dwarf, symbol_table")),
            }),
            ConfigKind::MissingProbes => ConfigValue::MissingProbes(match raw {
                "ignore" => MissingProbes::Ignore,
                "warn" => MissingProbes::Warn,
                "error" => MissingProbes::Error,
                _ => return Err(invalid("ignore, warn, error")),
            }),
        };
        Ok(value)
    }
}

/// Where the current value of an option comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    Cli,
    Script,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    values: BTreeMap<ConfigKey, (ConfigValue, ConfigSource)>,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = vec![
            (ConfigKey::MaxMapKeys, ConfigValue::Int(4096)),
            (ConfigKey::MaxStrlen, ConfigValue::Int(64)),
            (ConfigKey::MaxProbes, ConfigValue::Int(1024)),
            (ConfigKey::MaxBpfProgs, ConfigValue::Int(1024)),
            (ConfigKey::PerfRbPages, ConfigValue::Int(64)),
            (ConfigKey::LogSize, ConfigValue::Int(1_000_000)),
            (ConfigKey::OnStackLimit, ConfigValue::Int(32)),
            (ConfigKey::MaxCatBytes, ConfigValue::Int(10_240)),
            (ConfigKey::MaxTypeResIterations, ConfigValue::Int(0)),
            (ConfigKey::CppDemangle, ConfigValue::Bool(true)),
            (ConfigKey::LazySymbolication, ConfigValue::Bool(false)),
            (ConfigKey::ProbeInline, ConfigValue::Bool(false)),
            (ConfigKey::PrintMapsOnExit, ConfigValue::Bool(true)),
            (ConfigKey::StrTruncTrailer, ConfigValue::String("..".to_string())),
            (ConfigKey::License, ConfigValue::String("GPL".to_string())),
            (ConfigKey::StackMode, ConfigValue::StackMode(StackMode::Bpftrace)),
            (
                ConfigKey::CacheUserSymbols,
                ConfigValue::UserSymbolCacheType(UserSymbolCacheType::PerProgram),
            ),
            (
                ConfigKey::SymbolSource,
                ConfigValue::SymbolSource(SymbolSource::Dwarf),
            ),
            (
                ConfigKey::MissingProbes,
                ConfigValue::MissingProbes(MissingProbes::Error),
            ),
        ];

        Config {
            values: defaults
                .into_iter()
                .map(|(key, value)| (key, (value, ConfigSource::Default)))
                .collect(),
        }
    }
}

impl Config {
    pub fn get(&self, key: ConfigKey) -> &ConfigValue {
        &self.values[&key].0
    }

    pub fn source(&self, key: ConfigKey) -> ConfigSource {
        self.values[&key].1
    }

    pub fn set(
        &mut self,
        key: ConfigKey,
        value: ConfigValue,
        source: ConfigSource,
    ) -> Result<(), ConfigError> {
        if value.kind() != key.kind() {
            return Err(ConfigError::WrongKind {
                key: key.name(),
                actual: value.kind(),
                expected: key.kind(),
            });
        }
        self.values.insert(key, (value, source));
        Ok(())
    }

    fn int(&self, key: ConfigKey) -> u64 {
        match self.get(key) {
            ConfigValue::Int(value) => *value,
            _ => 0,
        }
    }

    pub fn max_strlen(&self) -> u64 {
        self.int(ConfigKey::MaxStrlen)
    }

    pub fn max_map_keys(&self) -> u64 {
        self.int(ConfigKey::MaxMapKeys)
    }

    pub fn on_stack_limit(&self) -> u64 {
        self.int(ConfigKey::OnStackLimit)
    }

    pub fn stack_mode(&self) -> StackMode {
        match self.get(ConfigKey::StackMode) {
            ConfigValue::StackMode(mode) => *mode,
            _ => StackMode::Bpftrace,
        }
    }

    pub fn missing_probes(&self) -> MissingProbes {
        match self.get(ConfigKey::MissingProbes) {
            ConfigValue::MissingProbes(policy) => *policy,
            _ => MissingProbes::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive() {
        assert_eq!("MAX_STRLEN".parse::<ConfigKey>(), Ok(ConfigKey::MaxStrlen));
        assert_eq!(
            "max_nothing".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey("max_nothing".to_string()))
        );
    }

    #[test]
    fn every_key_has_a_default() {
        let config = Config::default();
        for key in ConfigKey::ALL {
            assert_eq!(config.get(*key).kind(), key.kind(), "{}", key.name());
            assert_eq!(config.source(*key), ConfigSource::Default);
        }
    }

    #[test]
    fn setting_checks_the_kind() {
        let mut config = Config::default();
        let error = config
            .set(
                ConfigKey::MaxStrlen,
                ConfigValue::String("x".to_string()),
                ConfigSource::Script,
            )
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid type for max_strlen. Type: string. Expected Type: int"
        );

        config
            .set(ConfigKey::MaxStrlen, ConfigValue::Int(128), ConfigSource::Script)
            .unwrap();
        assert_eq!(config.max_strlen(), 128);
        assert_eq!(config.source(ConfigKey::MaxStrlen), ConfigSource::Script);
    }

    #[test]
    fn parses_textual_values() {
        assert_eq!(
            ConfigValue::parse(ConfigKey::StackMode, "perf"),
            Ok(ConfigValue::StackMode(StackMode::Perf))
        );
        assert_eq!(
            ConfigValue::parse(ConfigKey::StackMode, "fancy").unwrap_err().to_string(),
            "Unknown stack mode: 'fancy'"
        );
        assert_eq!(
            ConfigValue::parse(ConfigKey::MissingProbes, "warn"),
            Ok(ConfigValue::MissingProbes(MissingProbes::Warn))
        );
        assert!(ConfigValue::parse(ConfigKey::CacheUserSymbols, "per_pid").is_err());
    }
}
