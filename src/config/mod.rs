pub mod settings;

pub use settings::{AppConfig, ChallengeConfig, IdentityConfig, PracticeConfig, ServerConfig};
