//! `graft.toml` configuration.
//!
//! Every field has a default, so an absent or empty file is valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "graft.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory generated units are written to.
    pub output_dir: PathBuf,
    /// First segment of every unit name.
    pub unit_prefix: String,
    /// Unit file extension, without the dot.
    pub unit_extension: String,
    /// Highest numeric suffix tried when unit names collide.
    pub max_unit_suffix: u32,
    /// Imports never copied into augmentations.
    pub ignored_imports: Vec<String>,
    /// Directory name searched for templates, walking up from the
    /// declaring file.
    pub templates_dir: String,
    pub template_extension: String,
    /// Also append log events to this file.
    pub log_file: Option<PathBuf>,
    pub sandbox: SandboxConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
            unit_prefix: "GraftGenerator".to_string(),
            unit_extension: "cs".to_string(),
            max_unit_suffix: 1000,
            ignored_imports: vec!["Graft.Defs".to_string()],
            templates_dir: "templates".to_string(),
            template_extension: "tpl".to_string(),
            log_file: None,
            sandbox: SandboxConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    /// Program and leading arguments used to run process members. Process
    /// members are rejected when empty.
    pub command: Vec<String>,
    pub work_dir: PathBuf,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            work_dir: PathBuf::from(".graft/sandbox"),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Load `explicit` if given, else `graft.toml` next to `anchor` when
    /// it exists, else defaults.
    pub fn discover(explicit: Option<&Path>, anchor: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let dir = anchor.parent().unwrap_or_else(|| Path::new("."));
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.unit_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("`unit_prefix` must not be empty".to_string()));
        }
        if self.unit_extension.trim().is_empty() || self.unit_extension.starts_with('.') {
            return Err(ConfigError::Invalid(
                "`unit_extension` must be a bare extension such as `cs`".to_string(),
            ));
        }
        if self.templates_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("`templates_dir` must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn sandbox_enabled(&self) -> bool {
        !self.sandbox.command.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("", Path::new("graft.toml")).expect("valid");
        assert_eq!(config, Config::default());
        assert_eq!(config.unit_prefix, "GraftGenerator");
        assert_eq!(config.max_unit_suffix, 1000);
        assert!(!config.sandbox_enabled());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = Config::from_toml(
            r#"
output_dir = "out"
ignored_imports = ["Graft.Defs", "Demo.Markers"]

[sandbox]
command = ["dotnet", "script"]
"#,
            Path::new("graft.toml"),
        )
        .expect("valid");
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.ignored_imports.len(), 2);
        assert_eq!(config.sandbox.command, ["dotnet", "script"]);
        assert_eq!(config.sandbox.work_dir, PathBuf::from(".graft/sandbox"));
        assert!(config.sandbox_enabled());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml("outptu_dir = \"x\"", Path::new("graft.toml"))
            .expect_err("typo must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn dotted_extension_is_invalid() {
        let err = Config::from_toml("unit_extension = \".cs\"", Path::new("graft.toml"))
            .expect_err("dot must fail");
        assert!(err.to_string().contains("unit_extension"));
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("decls.json");
        assert_eq!(
            Config::discover(None, &manifest).expect("defaults"),
            Config::default()
        );

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "unit_prefix = \"Gen\"").expect("write");
        assert_eq!(
            Config::discover(None, &manifest).expect("loads").unit_prefix,
            "Gen"
        );
    }
}
