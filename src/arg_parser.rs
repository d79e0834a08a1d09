use std::path::PathBuf;

use argparse::{ArgumentParser, Print, Store, StoreOption};

use crate::{error_log::DEFAULT_ERROR_LOG, power_limits::POWER_LIMITS_URL};

pub struct ArgsOptions {
    pub url: String,
    pub config_file_path: Option<PathBuf>,
    pub error_log_path: PathBuf,
}

impl ArgsOptions {
    pub fn parse() -> Self {
        let mut options = ArgsOptions::default();

        {
            let mut parser = ArgumentParser::new();
            parser.set_description(
                "Apply the configured power limit to every detected Nvidia GPU",
            );

            // Remote configuration URL
            parser.refer(&mut options.url).add_option(
                &["-u", "--url"],
                Store,
                "The URL of the power limits Json document",
            );

            // Local configuration, takes precedence over the URL
            parser.refer(&mut options.config_file_path).add_option(
                &["-f", "--file"],
                StoreOption,
                "Read the power limits from a local Json file instead",
            );

            parser.refer(&mut options.error_log_path).add_option(
                &["-l", "--error-log"],
                Store,
                "The file errors are appended to",
            );

            // Show the program version
            parser.add_option(
                &["-V", "--version"],
                Print(env!("CARGO_PKG_VERSION").to_string()),
                "Show the program version",
            );

            parser.parse_args_or_exit();
        }

        options
    }
}

impl Default for ArgsOptions {
    fn default() -> Self {
        Self {
            url: POWER_LIMITS_URL.to_string(),
            config_file_path: None,
            error_log_path: PathBuf::from(DEFAULT_ERROR_LOG),
        }
    }
}
