pub mod analysis;
pub mod audio;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod error;
pub mod separate;
pub mod session;
pub mod slice;
pub mod store;

pub use analysis::{AnalysisOptions, Analyzer, FeatureType};
pub use config::Config;
pub use error::{Error, Result};
pub use separate::Separator;
pub use session::Session;
pub use store::SampleBank;
