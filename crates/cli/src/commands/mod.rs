pub mod build;
pub mod health;
pub mod mirror;
pub mod recommend;

pub use build::BuildCommand;
pub use health::HealthCommand;
pub use mirror::MirrorCommand;
pub use recommend::RecommendCommand;
