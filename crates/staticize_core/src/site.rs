use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::warn;
use walkdir::WalkDir;

use crate::config::MigrateConfig;

/// One post the host currently publishes. `legacy_permalink` is present only
/// on posts that were converted from legacy content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub permalink: String,
    pub legacy_permalink: Option<String>,
}

/// The host site as this component sees it: the canonical base URL and the
/// posts it currently publishes.
#[derive(Debug, Clone, Default)]
pub struct Site {
    url: String,
    pub posts: Vec<PublishedPost>,
}

impl Site {
    /// The base URL is normalized to end with `/` so slug and path math can
    /// concatenate without checks.
    pub fn new(url: impl Into<String>, posts: Vec<PublishedPost>) -> Self {
        let mut url = url.into();
        if !url.is_empty() && !url.ends_with('/') {
            url.push('/');
        }
        Self { url, posts }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Slugs of all currently published posts, in the same shape as node
    /// slugs: base URL stripped, no surrounding slashes. Posts whose
    /// permalink lives outside the site are ignored here.
    pub fn published_slugs(&self) -> HashSet<String> {
        self.posts
            .iter()
            .filter_map(|post| post.permalink.strip_prefix(&self.url))
            .map(|path| path.trim_matches('/').to_string())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct FrontMatter {
    permalink: Option<String>,
    drupalpermalink: Option<String>,
}

/// Build the host-site view by scanning the posts directory. Each post file
/// is expected to start with a `---` front-matter block; files without one,
/// or without a `permalink` field, are not part of the published set.
pub fn load_site(config: &MigrateConfig) -> Result<Site> {
    if config.site.url.trim().is_empty() {
        bail!("site.url is not configured");
    }
    let mut posts = Vec::new();
    let posts_dir = &config.site.posts_dir;
    if posts_dir.exists() {
        for entry in WalkDir::new(posts_dir).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("failed to scan posts under {}", posts_dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(post) = read_published_post(entry.path())? {
                posts.push(post);
            }
        }
    }
    Ok(Site::new(config.site.url.clone(), posts))
}

fn read_published_post(path: &Path) -> Result<Option<PublishedPost>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let Some(block) = front_matter_block(&content) else {
        return Ok(None);
    };
    let front_matter: FrontMatter = match serde_yaml::from_str(block) {
        Ok(front_matter) => front_matter,
        Err(error) => {
            warn!(path = %path.display(), %error, "skipping post with unparsable front matter");
            return Ok(None);
        }
    };
    let Some(permalink) = front_matter.permalink else {
        return Ok(None);
    };
    Ok(Some(PublishedPost {
        permalink,
        legacy_permalink: front_matter.drupalpermalink,
    }))
}

/// The YAML between a leading `---` line and the next `---` line.
fn front_matter_block(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---\n")?;
    let end = rest.find("\n---")?;
    Some(&rest[..end + 1])
}
