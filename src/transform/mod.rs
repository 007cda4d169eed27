mod daily_series;
mod series_result;
mod transformer;

pub use daily_series::DailySeries;
pub use series_result::SeriesResult;
pub use transformer::Transformer;
