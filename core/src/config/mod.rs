mod load;
mod types;
mod validate;

pub use load::{candidate_paths, load_config, load_from_path, locate, parse_config, ConfigFormat};
pub use types::{
    ConfigFile, LogConfig, Phase, QualityGateConfig, RunConfig, RunSettings, SharedOutput,
    TaskDefinition, TaskEntry, CONFIG_VERSION,
};
pub use validate::validate;
pub(crate) use validate::normalize_output;
