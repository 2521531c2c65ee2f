use clap::Parser;
use pollroom::cli::{self, Cli, Command, ConfigCommand};
use pollroom::{config, logging, server};

fn main() {
    let args = Cli::parse();

    let result = match args.command.unwrap_or(Command::Start) {
        Command::Start => start(),
        Command::Config(ConfigCommand::Show) => cli::handle_config_show(),
        Command::Config(ConfigCommand::Path) => {
            cli::handle_config_path();
            Ok(())
        }
        Command::Config(ConfigCommand::Validate) => cli::handle_config_validate(),
        Command::Status { port, host } => runtime().and_then(|rt| {
            rt.block_on(cli::handle_status(&host, port))
        }),
        Command::Version => {
            cli::handle_version();
            Ok(())
        }
    };

    if let Err(error) = result {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}

fn start() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config()?;
    logging::init_logging(&config.logging);

    let issues = config::validate_config(&config);
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("  {}: {}", issue.path, issue.message);
        }
        return Err("invalid configuration".into());
    }

    let rt = runtime()?;
    rt.block_on(server::run(&config))?;
    Ok(())
}

fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
