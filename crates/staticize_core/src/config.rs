use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "staticize.toml";

/// Full configuration surface of the migration assistant.
///
/// Every option has a documented default, so an absent config file yields a
/// usable (disabled) configuration. The struct is read-only after loading;
/// nothing in the crate mutates it.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MigrateConfig {
    /// Master switch. When false, `init` registers nothing and `run` is a no-op.
    pub enabled: bool,
    pub site: SiteSection,
    pub rules: RulesSection,
    pub index: IndexSection,
    pub posts: PostsSection,
    pub redirects: RedirectsSection,
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SiteSection {
    /// Canonical base URL of the site. Normalized to end with `/` wherever
    /// permalinks are built from it.
    pub url: String,
    /// Directory the host build writes the generated site into.
    pub output_dir: PathBuf,
    /// Directory holding the host's post source files.
    pub posts_dir: PathBuf,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            output_dir: PathBuf::from("_site"),
            posts_dir: PathBuf::from("_posts"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RulesSection {
    /// Whether to emit web-server rewrite rules after the site is built.
    pub generate: bool,
    pub file: PathBuf,
    /// Emit a rule serving the site root statically. Requires the generated
    /// site to provide its own index page.
    pub include_root: bool,
}

impl Default for RulesSection {
    fn default() -> Self {
        Self {
            generate: true,
            file: PathBuf::from("exceptionrewriterules.txt"),
            include_root: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct IndexSection {
    /// Whether to render the HTML index of not-yet-migrated nodes.
    pub generate: bool,
    pub file: PathBuf,
    /// Node types that appear in the index.
    pub node_types: Vec<String>,
    /// Location of the legacy Drupal site within the website, e.g. `/drupal/`.
    pub legacy_path: String,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            generate: true,
            file: PathBuf::from("drupalindex.html"),
            node_types: vec![
                "acidfree".to_string(),
                "blog".to_string(),
                "page".to_string(),
                "story".to_string(),
            ],
            legacy_path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PostsSection {
    /// Whether to convert Drupal nodes into static post files.
    pub convert: bool,
    /// Node types eligible for conversion.
    pub node_types: Vec<String>,
    /// Sequence number of the first converted post file.
    pub start_number: u32,
    /// Username of the primary author. Other usernames get guest-post titles.
    pub main_author: String,
}

impl Default for PostsSection {
    fn default() -> Self {
        Self {
            convert: false,
            node_types: vec!["blog".to_string(), "page".to_string(), "story".to_string()],
            start_number: 100,
            main_author: "admin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RedirectsSection {
    /// Whether to emit 301 redirects from legacy permalinks to new ones.
    pub generate: bool,
    pub file: PathBuf,
}

impl Default for RedirectsSection {
    fn default() -> Self {
        Self {
            generate: false,
            file: PathBuf::from("redirectrewriterules.txt"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DatabaseSection {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            user: String::new(),
            password: String::new(),
            database: "drupal".to_string(),
        }
    }
}

impl DatabaseSection {
    /// Resolve the database host: env DRUPAL_DB_HOST > config.
    pub fn host(&self) -> String {
        env_or("DRUPAL_DB_HOST", &self.host)
    }

    /// Resolve the database user: env DRUPAL_DB_USER > config.
    pub fn user(&self) -> String {
        env_or("DRUPAL_DB_USER", &self.user)
    }

    /// Resolve the database password: env DRUPAL_DB_PASSWORD > config.
    pub fn password(&self) -> String {
        env_or("DRUPAL_DB_PASSWORD", &self.password)
    }

    /// Resolve the database name: env DRUPAL_DB_NAME > config.
    pub fn database(&self) -> String {
        env_or("DRUPAL_DB_NAME", &self.database)
    }
}

fn env_or(var: &str, fallback: &str) -> String {
    if let Ok(value) = env::var(var) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    fallback.to_string()
}

impl MigrateConfig {
    /// An enabled configuration must know the site base URL; every permalink
    /// and redirect is derived from it.
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.site.url.trim().is_empty() {
            bail!("staticize is enabled but site.url is not configured");
        }
        Ok(())
    }
}

/// Load and parse a MigrateConfig from a TOML file. Returns the documented
/// defaults if the file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<MigrateConfig> {
    if !config_path.exists() {
        return Ok(MigrateConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: MigrateConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}
