use clap::Parser;

mod cli;
mod commands;
mod settings;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    commands::init_tracing(cli.verbose, cli.quiet);
    commands::run_command(cli)
}
