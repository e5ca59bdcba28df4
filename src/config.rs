//! Configuration management for tupletree-codegen
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (tupletree.toml, .tupletree.toml, config/tupletree.toml)
//! - The user config directory
//! - Environment variables (TUPLETREE__SECTION__KEY)
//!
//! ## Example config file (tupletree.toml):
//! ```toml
//! [codegen]
//! output_dir = "generated"
//! targets = ["rust", "python"]
//! write_manifest = true
//!
//! [rust]
//! ordinal_base = 0
//!
//! [typescript]
//! file_stem = "model"
//! indent = 2
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::codegen::{Language, RenderProfile};
use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TupleTreeConfig {
    #[serde(default)]
    pub codegen: CodegenConfig,

    #[serde(default)]
    pub rust: TargetConfig,

    #[serde(default)]
    pub typescript: TargetConfig,

    #[serde(default)]
    pub python: TargetConfig,
}

/// Generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Directory generated files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Languages generated when none are given on the command line
    #[serde(default = "default_targets")]
    pub targets: Vec<Language>,

    /// Write `tupletree.manifest.json` next to the generated files
    #[serde(default = "default_true")]
    pub write_manifest: bool,
}

/// Per-language overrides of the default render profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TargetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal_base: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_stem: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<usize>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_targets() -> Vec<Language> {
    Language::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            targets: default_targets(),
            write_manifest: true,
        }
    }
}

impl TargetConfig {
    fn apply(&self, profile: &mut RenderProfile) {
        if let Some(base) = self.ordinal_base {
            profile.ordinal_base = base;
        }
        if let Some(stem) = &self.file_stem {
            profile.file_stem = Some(stem.clone());
        }
        if let Some(indent) = self.indent {
            profile.indent = indent;
        }
    }
}

impl TupleTreeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file at `config_path`
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["tupletree.toml", ".tupletree.toml", "config/tupletree.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "tupletree", "tupletree") {
            let xdg_config = config_dir.config_dir().join("tupletree.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TUPLETREE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn target(&self, language: Language) -> &TargetConfig {
        match language {
            Language::Rust => &self.rust,
            Language::TypeScript => &self.typescript,
            Language::Python => &self.python,
        }
    }

    /// Render profile for `language` with this configuration's overrides
    pub fn profile(&self, language: Language) -> RenderProfile {
        let mut profile = RenderProfile::for_language(language);
        self.target(language).apply(&mut profile);
        profile
    }

    /// Profiles for `languages`, or for the configured targets when empty
    pub fn profiles(&self, languages: &[Language]) -> Vec<RenderProfile> {
        let languages: &[Language] = if languages.is_empty() {
            &self.codegen.targets
        } else {
            languages
        };
        languages.iter().map(|language| self.profile(*language)).collect()
    }
}
