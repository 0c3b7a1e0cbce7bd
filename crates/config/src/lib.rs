// Configuration loading

pub mod presets;
pub mod settings;

pub use presets::{preset, preset_names, Preset};
pub use settings::Settings;
