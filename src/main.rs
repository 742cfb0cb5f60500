use clap::Parser;
use miette::Result;
use tally::cli::commands;
use tally::cli::{Cli, Commands};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let global = &cli.global;
    match cli.command {
        Commands::Load(args) => commands::load::run(args, global),
        Commands::List(args) => commands::list::run(args, global),
        Commands::Show(args) => commands::show::run(args, global),
        Commands::Select(args) => commands::select::run(args, global),
        Commands::Count(args) => commands::count::run(args, global),
        Commands::Clear(args) => commands::clear::run(args, global),
        Commands::Reset(args) => commands::reset::run(args, global),
        Commands::Summary => commands::summary::run(global),
        Commands::Div(args) => commands::div::run(args, global),
        Commands::Users => commands::users::run(global),
        Commands::Export(args) => commands::export::run(args, global),
        Commands::Report(args) => commands::report::run(args, global),
        Commands::Header(args) => commands::header::run(args, global),
        Commands::Sync(cmd) => commands::sync::run(cmd, global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}

/// Log to stderr: warn by default, -v info, -vv debug; RUST_LOG wins
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
