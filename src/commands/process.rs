use crate::commands::common::{Common, CommonArgs};
use clap::Parser;
use ohno::bail;
use repo_pulse::Result;
use repo_pulse::aggregate::FeatureAggregator;
use repo_pulse::fetch::repos_root;

#[derive(Parser, Debug)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn process_data(args: &ProcessArgs) -> Result<()> {
    let common = Common::new(&args.common)?;
    let config = &common.config;

    let raw_root = repos_root(&config.raw_root())?;

    let aggregator = FeatureAggregator::new(
        raw_root,
        config.paths.processed_data.as_std_path().to_path_buf(),
        config.paths.final_data.as_std_path().join(&config.files.final_file),
        config.features.clone(),
    );

    let failures = aggregator.combine_all()?;
    if failures > 0 {
        bail!("{failures} repositories could not be processed");
    }

    println!("Processed raw data into '{}'", config.paths.processed_data);
    Ok(())
}
