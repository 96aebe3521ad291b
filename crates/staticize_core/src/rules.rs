use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::MigrateConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteRuleReport {
    pub rules_written: usize,
}

/// Emit one rewrite rule per top-level entry of the generated output
/// directory, so the web server serves those paths directly instead of
/// proxying them through to the legacy system. Directory rules match the name
/// with or without a trailing path; file rules match the exact name. The rule
/// file is fully regenerated on every call.
///
/// Meant to sit in a server config shaped like:
///
/// ```text
/// DirectoryIndex index.html
/// Include /path/to/site/exceptionrewriterules.txt
/// # Everything else is served by the legacy CMS
/// RewriteRule ^/?(.*)$ http://legacy.example.com/$1 [P,L]
/// ```
pub fn write_rewrite_rules(config: &MigrateConfig) -> Result<RewriteRuleReport> {
    let entries = list_output_entries(&config.site.output_dir)?;

    let mut out = String::new();
    if config.rules.include_root {
        out.push_str(&rule_line("", "$"));
    }
    for entry in entries.iter().filter(|entry| entry.is_dir) {
        out.push_str(&rule_line(&entry.name, "(/|$)"));
    }
    for entry in entries.iter().filter(|entry| !entry.is_dir) {
        out.push_str(&rule_line(&entry.name, "$"));
    }

    let rules_written = out.lines().count();
    fs::write(&config.rules.file, &out)
        .with_context(|| format!("failed to write {}", config.rules.file.display()))?;
    info!(rules = rules_written, file = %config.rules.file.display(), "wrote rewrite rules");
    Ok(RewriteRuleReport { rules_written })
}

fn rule_line(name: &str, ending: &str) -> String {
    format!("RewriteRule ^/{name}{ending} - [L]\n")
}

struct OutputEntry {
    name: String,
    is_dir: bool,
}

fn list_output_entries(output_dir: &Path) -> Result<Vec<OutputEntry>> {
    let mut entries = Vec::new();
    let listing = fs::read_dir(output_dir)
        .with_context(|| format!("failed to list output directory {}", output_dir.display()))?;
    for entry in listing {
        let entry = entry
            .with_context(|| format!("failed to list output directory {}", output_dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Dotfiles are never served.
        if name.starts_with('.') {
            continue;
        }
        let is_dir = entry
            .file_type()
            .with_context(|| format!("failed to inspect {}", entry.path().display()))?
            .is_dir();
        entries.push(OutputEntry { name, is_dir });
    }
    entries.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MigrateConfig;
    use tempfile::tempdir;

    fn config_with_output(temp: &tempfile::TempDir) -> MigrateConfig {
        let output_dir = temp.path().join("_site");
        fs::create_dir_all(&output_dir).expect("create output dir");
        let mut config = MigrateConfig::default();
        config.site.output_dir = output_dir;
        config.rules.file = temp.path().join("rules.txt");
        config
    }

    #[test]
    fn emits_root_then_directories_then_files() {
        let temp = tempdir().expect("tempdir");
        let config = config_with_output(&temp);
        fs::write(config.site.output_dir.join("index.html"), "x").expect("write file");
        fs::create_dir(config.site.output_dir.join("posts")).expect("create dir");

        let report = write_rewrite_rules(&config).expect("write rules");
        assert_eq!(report.rules_written, 3);
        let written = fs::read_to_string(&config.rules.file).expect("read rules");
        assert_eq!(
            written,
            "RewriteRule ^/$ - [L]\n\
             RewriteRule ^/posts(/|$) - [L]\n\
             RewriteRule ^/index.html$ - [L]\n"
        );
    }

    #[test]
    fn root_rule_is_omitted_when_disabled() {
        let temp = tempdir().expect("tempdir");
        let mut config = config_with_output(&temp);
        config.rules.include_root = false;
        fs::write(config.site.output_dir.join("index.html"), "x").expect("write file");

        write_rewrite_rules(&config).expect("write rules");
        let written = fs::read_to_string(&config.rules.file).expect("read rules");
        assert_eq!(written, "RewriteRule ^/index.html$ - [L]\n");
    }

    #[test]
    fn dotfiles_are_skipped() {
        let temp = tempdir().expect("tempdir");
        let config = config_with_output(&temp);
        fs::write(config.site.output_dir.join(".htaccess"), "x").expect("write dotfile");
        fs::write(config.site.output_dir.join("feed.xml"), "x").expect("write file");

        let report = write_rewrite_rules(&config).expect("write rules");
        assert_eq!(report.rules_written, 2);
        let written = fs::read_to_string(&config.rules.file).expect("read rules");
        assert!(!written.contains(".htaccess"));
    }

    #[test]
    fn rule_file_is_fully_regenerated() {
        let temp = tempdir().expect("tempdir");
        let config = config_with_output(&temp);
        fs::write(config.site.output_dir.join("a.html"), "x").expect("write file");
        write_rewrite_rules(&config).expect("first write");

        fs::remove_file(config.site.output_dir.join("a.html")).expect("remove file");
        fs::write(config.site.output_dir.join("b.html"), "x").expect("write file");
        write_rewrite_rules(&config).expect("second write");

        let written = fs::read_to_string(&config.rules.file).expect("read rules");
        assert!(!written.contains("a.html"));
        assert!(written.contains("b.html"));
    }

    #[test]
    fn entries_are_sorted_within_their_kind() {
        let temp = tempdir().expect("tempdir");
        let mut config = config_with_output(&temp);
        config.rules.include_root = false;
        for name in ["zeta", "alpha"] {
            fs::create_dir(config.site.output_dir.join(name)).expect("create dir");
        }
        for name in ["omega.html", "beta.html"] {
            fs::write(config.site.output_dir.join(name), "x").expect("write file");
        }

        write_rewrite_rules(&config).expect("write rules");
        let written = fs::read_to_string(&config.rules.file).expect("read rules");
        assert_eq!(
            written,
            "RewriteRule ^/alpha(/|$) - [L]\n\
             RewriteRule ^/zeta(/|$) - [L]\n\
             RewriteRule ^/beta.html$ - [L]\n\
             RewriteRule ^/omega.html$ - [L]\n"
        );
    }

    #[test]
    fn missing_output_directory_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let mut config = config_with_output(&temp);
        config.site.output_dir = temp.path().join("absent");
        let error = write_rewrite_rules(&config).expect_err("must fail");
        assert!(error.to_string().contains("failed to list"));
    }
}
