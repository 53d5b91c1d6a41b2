use clap::Parser;
use miette::Result;
use ilt::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior so piping to `head` or `grep -q`
    // terminates quietly instead of panicking on a broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
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
    let global = cli.global;
    ilt::logging::init(global.verbose, global.quiet);

    match cli.command {
        Commands::Init(args) => ilt::cli::commands::init::run(args),
        Commands::Part(cmd) => ilt::cli::commands::part::run(cmd, &global),
        Commands::Lot(cmd) => ilt::cli::commands::lot::run(cmd, &global),
        Commands::Meas(cmd) => ilt::cli::commands::meas::run(cmd, &global),
        Commands::Dashboard(args) => ilt::cli::commands::dashboard::run(args, &global),
        Commands::Completions(args) => ilt::cli::commands::completions::run(args),
    }
}
