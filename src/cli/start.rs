use crate::api::Endpoint;
use crate::cli::{actions::Action, commands, config::Config, dispatch, globals::GlobalArgs};
use crate::transfer::Limits;
use anyhow::{Context, Result};
use colored::Colorize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// # Errors
/// Will return an error if the config directory cannot be created
pub fn get_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().map_or_else(|| PathBuf::from("/tmp"), |h| h);

    let config_path = Path::new(&home_dir).join(".config").join("blobup");
    fs::create_dir_all(&config_path)
        .context(format!("unable to create: {}", &config_path.display()))?;

    Ok(config_path)
}

/// # Errors
/// Will return an error if the config file is not found
pub fn start() -> Result<(Endpoint, Action, GlobalArgs)> {
    let config_path = get_config_path()?;

    // start the command line interface
    let cmd = commands::new(&config_path);

    // get the matches
    let matches = cmd.get_matches();

    let verbosity_level = match matches
        .get_one::<u8>("verbose")
        .map_or(0, |&v| if v > 1 { 4 } else { v })
    {
        0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };

    env_logger::Builder::new()
        .filter_level(verbosity_level)
        .init();

    log::info!("config path: {}", config_path.display());

    // load the config file
    let config_file: PathBuf = matches
        .get_one::<PathBuf>("config")
        .map_or_else(|| config_path.join("config.yml"), Clone::clone);

    let config = Config::new(config_file)?;

    log::debug!("config: {config:#?}");

    // HOST: get it from the config file
    let host_name = matches
        .get_one::<String>("host")
        .map_or("default", String::as_str);

    let host = config.get_host(host_name).with_context(|| {
        format!(
            "check the config file under {}, for more information try {}",
            config_path.display(),
            "--help".green()
        )
    })?;

    // transfer thresholds, with an optional part-size override
    let mut limits = host.limits();

    if let Some(buffer) = matches.get_one::<usize>("buffer") {
        limits = Limits::new(limits.single_part_limit, *buffer as u64);
    }

    log::info!(
        "single-part limit: {}, chunk size: {}",
        limits.single_part_limit,
        limits.chunk_size
    );

    // define global args
    let mut globals = GlobalArgs::new();
    globals.limits = limits;

    // define retries
    let retries: usize = matches.get_one::<usize>("retries").map_or(3, |n| *n);
    globals.set_retries(retries);

    globals.quiet = matches.get_one::<bool>("quiet").copied().unwrap_or(false);

    // AUTH
    let endpoint = Endpoint::new(&host.endpoint, host.access_token.clone())?;

    // create the action
    let action = dispatch::dispatch(&matches)?;

    log::debug!("globals: {globals:#?}, action: {action:#?}");

    Ok((endpoint, action, globals))
}
