use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use perma_embed::{batch, EmbedRewriter, RewriteMode};
use perma_media::{MediaFetcher, SystemCommandRunner};
use perma_net::{ArchiveMirror, HttpTransport, UreqTransport};
use perma_platforms::{adapters, match_url, PlatformContext};
use perma_resolver::{ThreadResolver, TraversalPath};
use perma_store::{CacheStore, FsCacheStore, RunMemo};
use tracing::Level;

use crate::cli::*;
use crate::settings::Settings;

pub fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_env(|key| std::env::var(key).ok());
    if let Some(root) = cli.root {
        settings.store.root = root;
    }
    let rewriter = build(&settings);

    match cli.command {
        Command::Rewrite(args) => cmd_rewrite(&rewriter, &settings, args),
        Command::Resolve(args) => cmd_resolve(&rewriter, args),
        Command::Render(args) => cmd_render(&rewriter, args),
    }
}

/// Wire one run's collaborators: a single transport, cache and memo shared
/// by every adapter and the resolver.
fn build(settings: &Settings) -> EmbedRewriter {
    let transport: Arc<dyn HttpTransport> = Arc::new(UreqTransport::new(&settings.net));
    let archive = ArchiveMirror::from_config(&settings.net);
    let store: Arc<dyn CacheStore> = Arc::new(FsCacheStore::from_config(&settings.store));

    let ctx = PlatformContext::new(
        Arc::clone(&store),
        Arc::new(RunMemo::new()),
        Arc::clone(&transport),
        archive.clone(),
    );
    let media = MediaFetcher::new(transport, archive, Arc::new(SystemCommandRunner));
    let resolver = ThreadResolver::new(store, media, settings.resolver.clone());

    EmbedRewriter::new(Arc::new(resolver), adapters(&ctx, &settings.platforms))
}

fn cmd_rewrite(rewriter: &EmbedRewriter, settings: &Settings, args: RewriteArgs) -> anyhow::Result<()> {
    let mode = if args.all_links {
        RewriteMode::AllLinks
    } else {
        settings.embed.mode()
    };
    let report = batch::run(rewriter, &args.patterns, mode)?;

    let mark = if report.failed_links == 0 && report.errors == 0 {
        "✓".green().bold()
    } else {
        "!".yellow().bold()
    };
    println!(
        "{mark} {} files, {} rewritten, {} links captioned",
        report.files.to_string().bold(),
        report.rewritten.to_string().bold(),
        report.replacements.to_string().bold(),
    );
    if report.failed_links > 0 {
        println!("  {} links could not be resolved", report.failed_links.to_string().yellow());
    }
    if report.errors > 0 {
        println!("  {} documents could not be processed", report.errors.to_string().red());
    }
    Ok(())
}

fn cmd_resolve(rewriter: &EmbedRewriter, args: ResolveArgs) -> anyhow::Result<()> {
    let Some((adapter, reference)) = match_url(rewriter.adapters(), &args.url) else {
        bail!("no platform recognises {}", args.url);
    };
    let resolver = rewriter.resolver();
    let fetch_media = resolver.config().fetch_media && !args.no_media;
    let retrieved = resolver
        .resolve_with(adapter.as_ref(), &reference, fetch_media, &TraversalPath::new())
        .with_context(|| format!("resolving {reference}"))?;

    eprintln!(
        "{} {} {} via {}",
        "✓".green().bold(),
        adapter.noun(),
        retrieved.reference.to_string().cyan(),
        retrieved.strategy.yellow()
    );
    println!("{}", retrieved.record.to_pretty_json()?);
    Ok(())
}

fn cmd_render(rewriter: &EmbedRewriter, args: RenderArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let out = rewriter.render_inline(&text);
    print!("{}", out.text);
    if out.failed > 0 {
        eprintln!(
            "{} {} embeds could not be loaded",
            "!".yellow().bold(),
            out.failed.to_string().yellow()
        );
    }
    Ok(())
}
