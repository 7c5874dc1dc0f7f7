pub mod cmd_import;
pub mod cmd_put;

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::ValueParser,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[must_use]
pub fn validator_is_num() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<usize, String> {
        s.parse::<usize>()
            .map_err(|_| String::from("Not a valid number"))
    })
}

#[must_use]
pub fn validator_is_file() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<PathBuf, String> {
        if let Ok(metadata) = fs::metadata(s) {
            if metadata.is_file() {
                return Ok(PathBuf::from(s));
            }
        }

        Err(format!("Invalid file path or file does not exist: '{s}'"))
    })
}

#[must_use]
pub fn validator_is_url() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<String, String> {
        url::Url::parse(s)
            .map(|_| s.to_string())
            .map_err(|e| format!("Invalid URL '{s}': {e}"))
    })
}

#[must_use]
pub fn new(config_path: &Path) -> Command {
    // default config file path (~/.config/blobup/config.yml)
    let config_file_path = config_path.join("config.yml");

    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("blobup")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resumable multipart uploads of media files, from disk or remote URLs")
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .help("Path to the config file")
                .default_value(config_file_path.into_os_string())
                .value_parser(clap::value_parser!(PathBuf))
                .value_name("FILE"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .global(true)
                .help("Config host to use")
                .default_value("default")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("buffer")
                .short('b')
                .long("buffer")
                .global(true)
                .help("Part size in bytes, minimum 5 MB")
                .value_parser(validator_is_num())
                .value_name("BYTES"),
        )
        .arg(
            Arg::new("retries")
                .short('r')
                .long("retries")
                .global(true)
                .help("Max attempts per network call")
                .default_value("3")
                .value_parser(validator_is_num())
                .value_name("N"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .help("Do not show progress bars")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .help("Verbosity level")
                .action(ArgAction::Count),
        )
        .subcommand(cmd_put::command())
        .subcommand(cmd_import::command())
}
