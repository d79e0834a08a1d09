use anyhow::Result;
use gpu_power_limit::{
    app, arg_parser::ArgsOptions, command::ShellRunner, error_log::ErrorLog,
    logger,
};

// Everything runs one step after the other, a single thread is enough
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    logger::init_logging();

    // Parse the command line arguments
    let args_options = ArgsOptions::parse();

    let error_log = ErrorLog::new(args_options.error_log_path.clone());

    // Fatal errors are already in the error log at this point
    app::run(&args_options, &ShellRunner, &error_log).await?;

    Ok(())
}
