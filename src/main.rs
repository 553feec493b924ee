use clap::Parser;
use color_eyre::Result;
use hdfview::{browser, config, server, AppConfig, Args, ConfigManager, Server, APP_NAME};
use log::{info, warn};

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let path = match &args.config {
            Some(file) => config::write_default_config_to(file, args.force)?,
            None => ConfigManager::new(APP_NAME)?.write_default_config(args.force)?,
        };
        println!("Configuration written to {}", path.display());
        return Ok(Some(()));
    }
    Ok(None)
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(file) => AppConfig::load_from(file)?,
        None => AppConfig::load(APP_NAME)?,
    };
    config.apply_args(args);
    config.validate()?;
    Ok(config)
}

/// Block the main thread until Ctrl-C.
fn wait_for_shutdown() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(tokio::signal::ctrl_c())?;
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(args.debug);

    if handle_early_exit_flags(&args)?.is_some() {
        return Ok(());
    }

    let config = load_config(&args)?;
    let http = server::bind(&config)?;
    let initial_path = args.path.as_ref().map(|p| p.display().to_string());
    let server = Server::new(http, &config, initial_path);
    let url = server.url()?;

    // never joined: the process exits with the main thread
    std::thread::Builder::new()
        .name("http".to_string())
        .spawn(move || server.run())?;

    println!("hdfview running at {}", url);
    println!("Press Ctrl+C to stop");

    if config.server.open_browser {
        if let Err(e) = browser::open(&url) {
            warn!("could not open a browser: {}", e);
        }
    }

    wait_for_shutdown()?;
    info!("interrupt received");
    println!("Shutting down...");
    Ok(())
}
