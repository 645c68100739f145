pub mod audio_adapter;
pub mod backends;
pub mod clock;
pub mod composition;
pub mod copy_adapter;
pub mod credentials;
mod http_support;
pub mod image_adapter;
pub mod image_backends;
pub mod orchestrator;
pub mod pathing;
pub mod settings_layer;
pub mod video_adapter;

pub use backends::build_orchestrator;
pub use orchestrator::{AssetOrchestrator, BatchMode, OrchestratorBuilder};
