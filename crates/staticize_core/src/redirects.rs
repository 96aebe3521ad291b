use std::fs;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::config::MigrateConfig;
use crate::site::Site;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectReport {
    pub redirects_written: usize,
}

/// Emit one permanent-redirect rule per published post that was converted
/// from legacy content, mapping its old permalink to its new location.
///
/// A permalink that does not live under the site base URL is a configuration
/// or data inconsistency: the run aborts before anything is written, so a
/// half-generated redirect file never replaces a good one. Posts without a
/// legacy permalink are simply not migrated content and produce no rule.
pub fn write_permalink_redirects(config: &MigrateConfig, site: &Site) -> Result<RedirectReport> {
    let base = site.url();
    let mut out = String::new();
    let mut redirects_written = 0usize;

    for post in &site.posts {
        let Some(legacy) = post.legacy_permalink.as_deref() else {
            continue;
        };
        let Some(new_path) = post.permalink.strip_prefix(base) else {
            bail!("bad permalink: {}", post.permalink);
        };
        let Some(legacy_path) = legacy.strip_prefix(base) else {
            bail!("bad legacy permalink: {legacy}");
        };
        let legacy_path = legacy_path.trim_end_matches('/');
        out.push_str(&format!(
            "RewriteRule ^{legacy_path}(/|$) /{new_path} [R=301,L]\n"
        ));
        redirects_written += 1;
    }

    fs::write(&config.redirects.file, &out)
        .with_context(|| format!("failed to write {}", config.redirects.file.display()))?;
    info!(redirects = redirects_written, file = %config.redirects.file.display(), "wrote permalink redirects");
    Ok(RedirectReport { redirects_written })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::PublishedPost;
    use tempfile::tempdir;

    fn post(permalink: &str, legacy: Option<&str>) -> PublishedPost {
        PublishedPost {
            permalink: permalink.to_string(),
            legacy_permalink: legacy.map(str::to_string),
        }
    }

    fn config_in(temp: &tempfile::TempDir) -> MigrateConfig {
        let mut config = MigrateConfig::default();
        config.redirects.file = temp.path().join("redirects.txt");
        config
    }

    #[test]
    fn maps_legacy_path_to_new_path() {
        let temp = tempdir().expect("tempdir");
        let config = config_in(&temp);
        let site = Site::new(
            "http://example.com/",
            vec![post(
                "http://example.com/2020/posts/new-title/",
                Some("http://example.com/node/42/"),
            )],
        );

        let report = write_permalink_redirects(&config, &site).expect("write redirects");
        assert_eq!(report.redirects_written, 1);
        let written = fs::read_to_string(&config.redirects.file).expect("read redirects");
        assert_eq!(
            written,
            "RewriteRule ^node/42(/|$) /2020/posts/new-title/ [R=301,L]\n"
        );
    }

    #[test]
    fn posts_without_legacy_permalink_are_skipped() {
        let temp = tempdir().expect("tempdir");
        let config = config_in(&temp);
        let site = Site::new(
            "http://example.com/",
            vec![
                post("http://example.com/fresh-post/", None),
                post(
                    "http://example.com/migrated/",
                    Some("http://example.com/node/7"),
                ),
            ],
        );

        let report = write_permalink_redirects(&config, &site).expect("write redirects");
        assert_eq!(report.redirects_written, 1);
        let written = fs::read_to_string(&config.redirects.file).expect("read redirects");
        assert_eq!(written, "RewriteRule ^node/7(/|$) /migrated/ [R=301,L]\n");
    }

    #[test]
    fn foreign_permalink_aborts_before_writing() {
        let temp = tempdir().expect("tempdir");
        let config = config_in(&temp);
        let site = Site::new(
            "http://example.com/",
            vec![post(
                "http://elsewhere.example.org/post/",
                Some("http://example.com/node/42/"),
            )],
        );

        let error = write_permalink_redirects(&config, &site).expect_err("must fail");
        assert!(error.to_string().contains("bad permalink"));
        assert!(!config.redirects.file.exists());
    }

    #[test]
    fn foreign_legacy_permalink_aborts_before_writing() {
        let temp = tempdir().expect("tempdir");
        let config = config_in(&temp);
        let site = Site::new(
            "http://example.com/",
            vec![post(
                "http://example.com/migrated/",
                Some("http://old.example.org/node/42/"),
            )],
        );

        let error = write_permalink_redirects(&config, &site).expect_err("must fail");
        assert!(error.to_string().contains("bad legacy permalink"));
        assert!(!config.redirects.file.exists());
    }

    #[test]
    fn empty_site_writes_an_empty_file() {
        let temp = tempdir().expect("tempdir");
        let config = config_in(&temp);
        let site = Site::new("http://example.com/", Vec::new());

        let report = write_permalink_redirects(&config, &site).expect("write redirects");
        assert_eq!(report.redirects_written, 0);
        assert_eq!(
            fs::read_to_string(&config.redirects.file).expect("read redirects"),
            ""
        );
    }
}
