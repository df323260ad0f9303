use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use weft_ai::{OpenAiCompatVendor, VendorCapabilities, VendorRegistry};

const DEFAULT_WEFT_HOME_DIR_NAME: &str = ".weft";
const CONFIG_FILE_NAME: &str = "weft.toml";

/// `weft.toml` as written on disk. Every field is optional; an absent
/// file behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub default_vendor: Option<String>,
    pub default_model: Option<String>,
    pub patterns_dir: Option<PathBuf>,
    pub custom_patterns_dir: Option<PathBuf>,
    pub contexts_dir: Option<PathBuf>,
    pub strategies_dir: Option<PathBuf>,
    pub sessions_dir: Option<PathBuf>,
    #[serde(default)]
    pub vendors: Vec<VendorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VendorEntry {
    pub name: String,
    pub base_url: String,
    pub api_key_env: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default = "default_true")]
    pub streaming: bool,
    #[serde(default)]
    pub raw_only: bool,
    #[serde(default = "default_true")]
    pub thinking: bool,
}

fn default_true() -> bool {
    true
}

/// Fully resolved runtime configuration: the home directory, every
/// store path, and the loaded file contents.
#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub file: ConfigFile,
}

impl Config {
    pub fn load(conf_dir: Option<&Path>) -> Result<Self, String> {
        let home = resolve_weft_home_dir(conf_dir);
        let path = home.join(CONFIG_FILE_NAME);
        let content = if path.exists() {
            std::fs::read_to_string(&path)
                .map_err(|error| format!("read {} failed: {error}", path.display()))?
        } else {
            String::new()
        };
        let file: ConfigFile = toml::from_str(&content)
            .map_err(|error| format!("parse {} failed: {error}", path.display()))?;
        Ok(Self { home, file })
    }

    pub fn patterns_dir(&self) -> PathBuf {
        self.dir_or(&self.file.patterns_dir, "patterns")
    }

    pub fn custom_patterns_dir(&self) -> Option<PathBuf> {
        self.file.custom_patterns_dir.clone()
    }

    pub fn contexts_dir(&self) -> PathBuf {
        self.dir_or(&self.file.contexts_dir, "contexts")
    }

    pub fn strategies_dir(&self) -> PathBuf {
        self.dir_or(&self.file.strategies_dir, "strategies")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.dir_or(&self.file.sessions_dir, "sessions")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    fn dir_or(&self, override_path: &Option<PathBuf>, default: &str) -> PathBuf {
        override_path
            .clone()
            .unwrap_or_else(|| self.home.join(default))
    }

    /// Builds the vendor registry from the config file. Registration
    /// order follows file order, which decides model-hint ties.
    pub fn build_vendor_registry(&self) -> Arc<VendorRegistry> {
        let registry = Arc::new(VendorRegistry::new());
        for entry in &self.file.vendors {
            let vendor = OpenAiCompatVendor::new(&entry.name, &entry.base_url, &entry.api_key_env)
                .with_models(entry.models.clone())
                .with_capabilities(VendorCapabilities {
                    streaming: entry.streaming,
                    raw_mode: entry.raw_only,
                    thinking: entry.thinking,
                });
            registry.register(Arc::new(vendor));
        }
        if let (Some(vendor), Some(model)) =
            (&self.file.default_vendor, &self.file.default_model)
        {
            registry.set_default(vendor, model);
        }
        registry
    }
}

pub fn resolve_weft_home_dir(conf_dir: Option<&Path>) -> PathBuf {
    conf_dir
        .map(resolve_home_arg)
        .unwrap_or_else(default_weft_home_dir)
}

fn resolve_home_arg(path: &Path) -> PathBuf {
    let expanded = expand_path_with_home(path);
    if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(expanded)
    }
}

fn expand_path_with_home(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    if raw == "~" {
        return home_dir();
    }
    if let Some(suffix) = raw.strip_prefix("~/") {
        return home_dir().join(suffix);
    }
    path.to_path_buf()
}

fn default_weft_home_dir() -> PathBuf {
    home_dir().join(DEFAULT_WEFT_HOME_DIR_NAME)
}

fn home_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home);
    }
    if let Some(profile) = std::env::var_os("USERPROFILE") {
        return PathBuf::from(profile);
    }
    PathBuf::from(".")
}
