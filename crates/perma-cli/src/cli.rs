use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "perma",
    about = "Keep permanent local copies of the social posts a site embeds",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the `posts/` cache (overrides the settings file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// More logging; repeat for more
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Caption post links in markdown files, fetching the posts
    Rewrite(RewriteArgs),
    /// Fetch one post and everything it references; print it as JSON
    Resolve(ResolveArgs),
    /// Print a markdown file with post links replaced by HTML embeds
    Render(RenderArgs),
}

#[derive(Args)]
pub struct RewriteArgs {
    /// Glob patterns, e.g. `content/**/*.md`
    #[arg(required = true)]
    pub patterns: Vec<String>,

    /// Recaption every recognised link, not only `![](url)`
    #[arg(long)]
    pub all_links: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Post URL
    pub url: String,

    /// Skip avatars, images and video
    #[arg(long)]
    pub no_media: bool,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Markdown file
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "perma", "rewrite", "a/*.md", "b/**/*.md", "--all-links", "-vv", "--root", "/srv",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.root, Some(PathBuf::from("/srv")));
        match cli.command {
            Command::Rewrite(args) => {
                assert_eq!(args.patterns, vec!["a/*.md", "b/**/*.md"]);
                assert!(args.all_links);
            }
            _ => panic!("expected rewrite"),
        }
    }

    #[test]
    fn rewrite_needs_a_pattern() {
        assert!(Cli::try_parse_from(["perma", "rewrite"]).is_err());
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["perma", "-q", "-v", "render", "x.md"]).is_err());
    }
}
