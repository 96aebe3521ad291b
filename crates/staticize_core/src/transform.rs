use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

use anyhow::{Context, Result, anyhow};
use chrono::DateTime;
use tracing::info;

use crate::config::MigrateConfig;
use crate::db::NodeSource;
use crate::node::{NodeKey, RawNode, decode_text, permalink_for, slug_for};
use crate::site::Site;

/// Submission date shown in the index, e.g. `January 02, 2020 at 03:04 AM`.
const INDEX_DATE_FORMAT: &str = "%B %d, %Y at %I:%M %p";
/// Front-matter date, e.g. `2020/01/02 03:04:05`.
const POST_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub index_links: usize,
    pub posts_written: usize,
}

/// Single pass over the fetched nodes: dedup by (type, id) with the newest
/// occurrence winning, decode text columns, then append index entries and
/// write converted post files for the configured node types.
///
/// A node whose title or alias fails to decode is skipped but still counts
/// as seen, so a later (older) occurrence of the same node cannot resurface.
pub fn transform_nodes(
    config: &MigrateConfig,
    site: &Site,
    source: &mut dyn NodeSource,
) -> Result<TransformReport> {
    let nodes = source.fetch_nodes()?;
    let published = site.published_slugs();
    let mut seen: HashSet<NodeKey> = HashSet::new();
    let mut report = TransformReport::default();

    let mut index_file = if config.index.generate {
        let file = File::create(&config.index.file)
            .with_context(|| format!("failed to create {}", config.index.file.display()))?;
        let mut file = BufWriter::new(file);
        file.write_all(b"<ul>\n")
            .with_context(|| format!("failed to write {}", config.index.file.display()))?;
        Some(file)
    } else {
        None
    };

    for node in &nodes {
        if !seen.insert(node.key()) {
            continue;
        }

        let Some(title) = decode_text(&node.title) else {
            continue;
        };
        let alias = match node.alias.as_deref() {
            Some(bytes) => match decode_text(bytes) {
                Some(alias) => Some(alias),
                None => continue,
            },
            None => None,
        };
        let slug = slug_for(&node.key(), alias.as_deref());
        let permalink = permalink_for(site.url(), &slug);

        if let Some(file) = index_file.as_mut()
            && config.index.node_types.contains(&node.node_type)
            && !published.contains(&slug)
        {
            let submitted = format_created(node.created, INDEX_DATE_FORMAT)?;
            writeln!(
                file,
                "<li><a href=\"{}{}\">{}</a> <span class=\"submitted\">{}</span></li>",
                config.index.legacy_path, slug, title, submitted
            )
            .with_context(|| format!("failed to write {}", config.index.file.display()))?;
            report.index_links += 1;
        }

        if config.posts.convert && config.posts.node_types.contains(&node.node_type) {
            let sequence = config.posts.start_number as usize + report.posts_written;
            write_post(config, source, node, &slug, &permalink, &title, sequence)?;
            report.posts_written += 1;
        }
    }

    if let Some(mut file) = index_file {
        file.write_all(b"</ul>")
            .and_then(|_| file.flush())
            .with_context(|| format!("failed to write {}", config.index.file.display()))?;
        info!(links = report.index_links, file = %config.index.file.display(), "wrote index of unconverted nodes");
    }
    if config.posts.convert {
        info!(posts = report.posts_written, "wrote converted posts");
    }
    Ok(report)
}

fn write_post(
    config: &MigrateConfig,
    source: &mut dyn NodeSource,
    node: &RawNode,
    slug: &str,
    permalink: &str,
    title: &str,
    sequence: usize,
) -> Result<()> {
    let mut tags = source.fetch_tags(node.nid)?;
    let mut title = title.to_string();
    if node.author != config.posts.main_author {
        title = format!("Guest post by {}: {title}", node.author);
        tags.push(node.author.clone());
    }
    tags.sort();

    let path = config
        .site
        .posts_dir
        .join(format!("{sequence:03} - {slug}.markdown"));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let date = format_created(node.created, POST_DATE_FORMAT)?;
    let body = String::from_utf8_lossy(&node.body).replace("\r\n", "\n");
    let contents = format!(
        "---\n\
         categories: {}\n\
         date: {}\n\
         title: '{}'\n\
         drupalpermalink: {}\n\
         drupalslug: {}\n\
         ---\n\
         {}\n",
        tags.join(", "),
        date,
        title.replace('\'', "''"),
        permalink,
        slug,
        body
    );
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Creation timestamps are rendered in UTC.
fn format_created(created: i64, pattern: &str) -> Result<String> {
    let timestamp = DateTime::from_timestamp(created, 0)
        .ok_or_else(|| anyhow!("node creation timestamp {created} is out of range"))?;
    Ok(timestamp.format(pattern).to_string())
}
