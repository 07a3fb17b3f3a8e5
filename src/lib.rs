//! # collabmap
//!
//! NWO project collaboration map builder.
//!
//! ## Modules
//!
//! - [`nwo`] - NWOpen project API client
//! - [`ror`] - ROR registry client for names and coordinates
//! - [`names`] - Static organisation-name lookup table
//! - [`identity`] - Member record → institution key resolution
//! - [`aggregate`] - Institution project index and pairwise collaboration counts
//! - [`output`] - Output document assembly
//! - [`pipeline`] - End-to-end run
//! - [`config`] - Presets and overrides
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use collabmap::{config::RunConfig, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let outcome = pipeline::run(&RunConfig::open_science()).await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod identity;
pub mod names;
pub mod nwo;
pub mod output;
pub mod pipeline;
pub mod ror;

pub use error::{CollabError, Result};
