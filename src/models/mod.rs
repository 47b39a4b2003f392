pub mod artifact;
pub mod loaders;
pub mod model_config;
pub mod work_unit;

pub use artifact::{ConversionOutcome, OutcomeKind, StructuredArtifact, DECLARATIVE_BASE_MARKERS};
pub use loaders::{require_images, scan_folder};
pub use model_config::{ModelConfig, SettingsForm};
pub use work_unit::{ProcessingMode, WorkUnit};
