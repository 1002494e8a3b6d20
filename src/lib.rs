#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # bgswap
//!
//! Background replacement for resale listing photos, with a forensic check
//! that the product itself was not altered.
//!
//! Each image runs through three stages:
//!
//! 1. **Mask generation**: a remote model returns a two-tone mask (subject black)
//! 2. **Background replacement**: a generative model inpaints the background and,
//!    depending on the strategy, extends the canvas to a portrait framing
//! 3. **QA validation**: a global SSIM over the subject pixels decides whether
//!    the subject survived; the verdict is recorded in a [`ForensicLog`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgswap::{PipelineConfig, PipelineController, PipelineInput, ProcessOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = PipelineConfig::builder()
//!     .output_dir("listing-output")
//!     .concurrency(3)
//!     .build()?;
//! let controller = PipelineController::from_config(config)?;
//!
//! let input = PipelineInput::from_path("sneakers.jpg").await?;
//! let result = controller.process_image(&input, ProcessOptions::default()).await;
//! if result.is_safe() {
//!     println!("publish {:?}", result.artifacts.edited);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Validating an existing edit
//!
//! The QA validator can be used on its own:
//!
//! ```rust,no_run
//! use bgswap::{forensic::UpstreamTimings, QaValidator};
//!
//! # fn example(original: &[u8], edited: &[u8], mask: &[u8]) {
//! let outcome = QaValidator::default().validate(
//!     original,
//!     edited,
//!     mask,
//!     "listing-42",
//!     &UpstreamTimings::default(),
//! );
//! println!("{} (ssim {:.4})", outcome.forensic_log.qa_output.qa_status,
//!     outcome.forensic_log.qa_output.ssim_score);
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): the `bgswap` binary, progress bars and subscriber setup
//! - `tracing-json`: JSON log output
//! - `tracing-files`: log output to a file
//! - `webp-support`: WebP decoding

pub mod canvas;
pub mod config;
pub mod error;
pub mod forensic;
pub mod pipeline;
pub mod prompt;
pub mod qa;
pub mod remote;
pub mod replacers;
pub mod store;
pub mod tracing_config;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

pub use canvas::CanvasPlan;
pub use config::{
    CostModel, OutpaintConfig, PipelineConfig, PipelineConfigBuilder, QaConfig, RemoteConfig,
    ReplacementStrategy,
};
pub use error::{PipelineError, Result};
pub use forensic::{ForensicLog, QaOutput, QaStatus, SubjectIntegrity};
pub use pipeline::{chunk_plan, BatchSummary, PipelineController};
pub use prompt::PromptBuilder;
pub use qa::{structural_similarity, QaOutcome, QaValidator, SubjectExtractor};
pub use remote::{
    BackgroundReplacer, GenerationRequest, GenerativeModel, MaskGenerator, MaskOutput,
    RemoteStage, Replacement, TimedModel,
};
pub use replacers::{build_replacer, DefaultReplacerFactory, ReplacerFactory};
pub use store::ArtifactStore;
pub use tracing_config::{TracingConfig, TracingFormat, TracingOutput};
pub use types::{ArtifactPaths, PipelineInput, PipelineResult, ProcessOptions, ProjectContext};
