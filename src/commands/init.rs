use crate::commands::common::{Common, CommonArgs};
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::IntoAppError;
use repo_pulse::Result;
use repo_pulse::config::Config;
use std::fs;

#[derive(Parser, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Also write a default configuration file to this path
    #[arg(long, value_name = "PATH")]
    pub write_config: Option<Utf8PathBuf>,
}

/// Create the data directory tree the pipeline writes into, and optionally
/// a starter configuration file.
pub fn init_workspace(args: &InitArgs) -> Result<()> {
    if let Some(output) = &args.write_config {
        let config = Config::default();
        config.save(output)?;
        println!("Generated default configuration file: {output}");
    }

    let common = Common::new(&args.common)?;
    let config = &common.config;

    let dirs = [
        config.paths.log.as_std_path().to_path_buf(),
        config.raw_root(),
        config.paths.processed_data.as_std_path().to_path_buf(),
        config.paths.final_data.as_std_path().to_path_buf(),
    ];

    for dir in &dirs {
        fs::create_dir_all(dir).into_app_err_with(|| format!("unable to create '{}'", dir.display()))?;
        println!("Created directory: {}", dir.display());
    }

    Ok(())
}
