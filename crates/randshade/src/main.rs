mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Run(args)) => run::run(&cli.pattern, args),
        Some(Command::Generate(args)) => run::generate(&cli.pattern, &args),
        Some(Command::Export(args)) => run::export(&cli.pattern, args),
        None => run::run(&cli.pattern, cli.run),
    }
}
