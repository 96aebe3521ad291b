//! Migration assistant that lets a legacy Drupal site and a static blog
//! coexist. It reads published nodes from the Drupal database, renders an
//! HTML index of pages that have not been migrated yet, optionally converts
//! nodes into static post files, and emits web-server rewrite rules so
//! already-migrated URLs are served statically instead of falling through to
//! Drupal. Permanent redirects from old permalinks to new ones round it out.
//!
//! The host build pipeline drives two entry points: [`init`] at startup,
//! which registers the rewrite-rule emitter into the post-build hook list,
//! and [`run`] once per build, which fetches, transforms, and emits
//! redirects. Everything is sequential, recomputed from scratch each run,
//! and every output file is fully overwritten.

pub mod config;
pub mod db;
pub mod hooks;
pub mod node;
pub mod redirects;
pub mod rules;
pub mod site;
pub mod transform;

use anyhow::Result;

pub use config::{DEFAULT_CONFIG_FILENAME, MigrateConfig, load_config};
pub use db::{MysqlSource, NodeSource};
pub use hooks::{PostBuildHooks, init};
pub use redirects::RedirectReport;
pub use rules::RewriteRuleReport;
pub use site::{PublishedPost, Site, load_site};
pub use transform::TransformReport;

/// What one build-time invocation produced. `None` means the corresponding
/// step was not requested by the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub transform: Option<TransformReport>,
    pub redirects: Option<RedirectReport>,
}

/// Execute all requested migration actions for one build. The rewrite-rule
/// emitter is not part of this pass; it runs from the post-build hook so it
/// can observe the freshly built output directory.
pub fn run(
    config: &MigrateConfig,
    site: &Site,
    source: &mut dyn NodeSource,
) -> Result<RunReport> {
    if !config.enabled {
        return Ok(RunReport::default());
    }
    let transform = if config.index.generate || config.posts.convert {
        Some(transform::transform_nodes(config, site, source)?)
    } else {
        None
    };
    let redirects = if config.redirects.generate {
        Some(redirects::write_permalink_redirects(config, site)?)
    } else {
        None
    };
    Ok(RunReport {
        transform,
        redirects,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::node::RawNode;

    struct EmptySource;

    impl NodeSource for EmptySource {
        fn fetch_nodes(&mut self) -> Result<Vec<RawNode>> {
            Ok(Vec::new())
        }

        fn fetch_tags(&mut self, _nid: u64) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn disabled_config_does_nothing() {
        let config = MigrateConfig::default();
        let site = Site::new("http://example.com/", Vec::new());
        let report = run(&config, &site, &mut EmptySource).expect("run");
        assert_eq!(report, RunReport::default());
    }

    #[test]
    fn enabled_run_performs_requested_steps() {
        let temp = tempdir().expect("tempdir");
        let mut config = MigrateConfig::default();
        config.enabled = true;
        config.site.url = "http://example.com/".to_string();
        config.index.file = temp.path().join("drupalindex.html");
        config.redirects.generate = true;
        config.redirects.file = temp.path().join("redirects.txt");

        let site = Site::new("http://example.com/", Vec::new());
        let report = run(&config, &site, &mut EmptySource).expect("run");
        assert_eq!(
            report.transform,
            Some(TransformReport {
                index_links: 0,
                posts_written: 0,
            })
        );
        assert_eq!(
            report.redirects,
            Some(RedirectReport {
                redirects_written: 0,
            })
        );
        assert!(config.index.file.exists());
        assert!(config.redirects.file.exists());
    }

    #[test]
    fn transform_is_skipped_when_neither_index_nor_posts_requested() {
        let temp = tempdir().expect("tempdir");
        let mut config = MigrateConfig::default();
        config.enabled = true;
        config.site.url = "http://example.com/".to_string();
        config.index.generate = false;
        config.index.file = temp.path().join("drupalindex.html");

        let site = Site::new("http://example.com/", Vec::new());
        let report = run(&config, &site, &mut EmptySource).expect("run");
        assert_eq!(report.transform, None);
        assert!(!config.index.file.exists());
    }
}
