pub mod config;
pub mod distance;
pub mod engine;
pub mod errors;
pub mod keyindex;
pub mod model;
pub mod normalize;
pub mod prompts;
pub mod providers;
pub mod storage;
