//! CLI command implementations.
//!
//! - **synthesize**: run the synthesis pipeline over an analysis output root
//! - **init**: write a default `.archsynth.toml`

pub mod init;
pub mod synthesize;

pub use init::init_config;
pub use synthesize::{handle_synthesize, SynthesizeConfig, SynthesizeOutcome};
