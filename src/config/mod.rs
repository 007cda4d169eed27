mod config;

pub use config::{Config, Features, Files, Params, Paths, Repos};
