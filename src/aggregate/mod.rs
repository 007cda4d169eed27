mod aggregator;

pub use aggregator::{ALL_FEATURE_FILE, FeatureAggregator, GENERIC_FILE, GenericRepoRecord, age_in_weeks};
