use clap::Parser;
use taskmill::app;
use taskmill::commands::cli;
use taskmill::logging;
use taskmill_core::error;
use taskmill_core::report::log;

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            log::fatal(e.to_string());
            exit_code_for_error(&e)
        }
    };

    logging::flush();
    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let args = cli::Args::parse();
    let cfg = taskmill_core::config::load_config(args.config.as_deref())?;
    if let Some(path) = logging::init_tracing(&cfg.settings.log)? {
        log::debug(format!("logging to {}", path.display()));
    }
    log::debug(format!("config loaded from {}", cfg.source.display()));

    app::run_app(&args, cfg).await
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // Config, plan and setup errors all abort before any task runs.
    match e {
        error::CliError::Config(_)
        | error::CliError::Plan(_)
        | error::CliError::Logging(_)
        | error::CliError::Io(_) => 1,
    }
}
