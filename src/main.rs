use clap::Parser;
use arbor::cli::commands::Cli;
use arbor::cli::handlers::{self, Context};
use arbor::logging;

fn main() {
    let cli = Cli::parse();

    let ctx = match Context::from_cli(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| ctx.config.logging.level.clone());
    if let Err(e) = logging::init_logging(&level, &ctx.log_dir()) {
        eprintln!("warning: logging disabled: {}", e);
    }

    let result = handlers::dispatch(cli.command, &ctx);
    if let Err(e) = &result {
        log::error!("event=command_failed error={}", e);
    }
    logging::flush_logs();
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
