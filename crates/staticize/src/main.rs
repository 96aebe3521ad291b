use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use staticize_core::node::RawNode;
use staticize_core::{
    DEFAULT_CONFIG_FILENAME, MigrateConfig, MysqlSource, NodeSource, PostBuildHooks, load_config,
    load_site, redirects, rules,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "staticize",
    version,
    about = "Overlay a static blog onto a legacy Drupal site, one page at a time"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,
    #[arg(short, long, global = true, help = "Enable debug output")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Fetch nodes, build the index and posts, then emit rule files")]
    Run,
    #[command(about = "Emit rewrite rules for the current output directory only")]
    Rules,
    #[command(about = "Emit permalink redirect rules only")]
    Redirects,
    #[command(about = "Show the resolved configuration")]
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let config = load_config(&cli.config)?;
    config.validate()?;

    match cli.command {
        Commands::Run => run_migration(&config),
        Commands::Rules => run_rules(&config),
        Commands::Redirects => run_redirects(&config),
        Commands::Status => run_status(&cli.config, &config),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

fn run_migration(config: &MigrateConfig) -> Result<()> {
    if !config.enabled {
        println!("staticize is disabled; nothing to do");
        return Ok(());
    }

    let mut hooks = PostBuildHooks::new();
    staticize_core::init(config, &mut hooks);

    let site = load_site(config)?;
    let report = if config.index.generate || config.posts.convert {
        let mut source = MysqlSource::connect(&config.database)?;
        staticize_core::run(config, &site, &mut source)?
    } else {
        // Redirect emission works from the site model alone.
        staticize_core::run(config, &site, &mut NoDatabase)?
    };

    // The host would run its hooks after its own build; standalone, this is
    // that point.
    hooks.run()?;

    println!("migration run");
    println!("published_posts: {}", site.posts.len());
    if let Some(transform) = &report.transform {
        println!("index_links: {}", transform.index_links);
        println!("posts_written: {}", transform.posts_written);
    }
    if let Some(redirects) = &report.redirects {
        println!("redirects_written: {}", redirects.redirects_written);
    }
    println!("post_build_hooks: {}", hooks.len());
    Ok(())
}

fn run_rules(config: &MigrateConfig) -> Result<()> {
    let report = rules::write_rewrite_rules(config)?;
    println!("rewrite rules");
    println!("output_dir: {}", config.site.output_dir.display());
    println!("file: {}", config.rules.file.display());
    println!("rules_written: {}", report.rules_written);
    Ok(())
}

fn run_redirects(config: &MigrateConfig) -> Result<()> {
    let site = load_site(config)?;
    let report = redirects::write_permalink_redirects(config, &site)?;
    println!("permalink redirects");
    println!("published_posts: {}", site.posts.len());
    println!("file: {}", config.redirects.file.display());
    println!("redirects_written: {}", report.redirects_written);
    Ok(())
}

fn run_status(config_path: &Path, config: &MigrateConfig) -> Result<()> {
    println!("staticize status");
    println!("config: {}", config_path.display());
    println!("enabled: {}", format_flag(config.enabled));
    println!("site_url: {}", display_or(&config.site.url, "<unset>"));
    println!("output_dir: {}", config.site.output_dir.display());
    println!("posts_dir: {}", config.site.posts_dir.display());
    println!("rules.generate: {}", format_flag(config.rules.generate));
    println!("rules.include_root: {}", format_flag(config.rules.include_root));
    println!("rules.file: {}", config.rules.file.display());
    println!("index.generate: {}", format_flag(config.index.generate));
    println!("index.file: {}", config.index.file.display());
    println!("index.node_types: {}", config.index.node_types.join(", "));
    println!("index.legacy_path: {}", config.index.legacy_path);
    println!("posts.convert: {}", format_flag(config.posts.convert));
    println!("posts.node_types: {}", config.posts.node_types.join(", "));
    println!("posts.start_number: {}", config.posts.start_number);
    println!("posts.main_author: {}", config.posts.main_author);
    println!("redirects.generate: {}", format_flag(config.redirects.generate));
    println!("redirects.file: {}", config.redirects.file.display());
    println!("database.host: {}", config.database.host());
    println!("database.user: {}", display_or(&config.database.user(), "<unset>"));
    println!("database.name: {}", config.database.database());
    Ok(())
}

/// Placeholder source for runs that never touch the database.
struct NoDatabase;

impl NodeSource for NoDatabase {
    fn fetch_nodes(&mut self) -> Result<Vec<RawNode>> {
        bail!("no database connection was opened for this run");
    }

    fn fetch_tags(&mut self, _nid: u64) -> Result<Vec<String>> {
        bail!("no database connection was opened for this run");
    }
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
