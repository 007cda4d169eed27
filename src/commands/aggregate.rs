use crate::commands::common::{Common, CommonArgs};
use clap::Parser;
use repo_pulse::Result;
use repo_pulse::aggregate::FeatureAggregator;
use repo_pulse::fetch::repos_root;

#[derive(Parser, Debug)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn aggregate_data(args: &AggregateArgs) -> Result<()> {
    let common = Common::new(&args.common)?;
    let config = &common.config;

    let raw_root = repos_root(&config.raw_root())?;

    let aggregator = FeatureAggregator::new(
        raw_root,
        config.paths.processed_data.as_std_path().to_path_buf(),
        config.paths.final_data.as_std_path().join(&config.files.final_file),
        config.features.clone(),
    );

    let _ = aggregator.aggregate_generic_metadata()?;
    let final_path = aggregator.compute_age()?;

    println!("Wrote final repository table: {}", final_path.display());
    Ok(())
}
