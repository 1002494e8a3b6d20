//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliStrategy};
use crate::config::{PipelineConfig, PipelineConfigBuilder, ReplacementStrategy};
use anyhow::{Context, Result};

impl From<CliStrategy> for ReplacementStrategy {
    fn from(strategy: CliStrategy) -> Self {
        match strategy {
            CliStrategy::Inpaint => Self::Inpaint,
            CliStrategy::FixedOutpaint => Self::FixedOutpaint,
            CliStrategy::AdaptiveOutpaint => Self::AdaptiveOutpaint,
            CliStrategy::StyleReference => Self::StyleReference,
        }
    }
}

/// Convert CLI arguments to a `PipelineConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Load the optional config file, then apply flag overrides
    pub(crate) fn from_cli(cli: &Cli) -> Result<PipelineConfig> {
        let base = match &cli.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        let mut remote = base.remote.clone();
        if let Some(var) = &cli.api_key_env {
            remote.api_key_env = Some(var.clone());
        }

        let mut builder = PipelineConfigBuilder::from_config(base).remote(remote);
        if let Some(output) = &cli.output {
            builder = builder.output_dir(output);
        }
        if let Some(strategy) = cli.strategy {
            builder = builder.strategy(strategy.into());
        }
        if let Some(reference) = &cli.style_reference {
            builder = builder.style_reference(reference);
        }
        if let Some(concurrency) = cli.concurrency {
            builder = builder.concurrency(concurrency);
        }
        if let Some(timeout) = cli.timeout {
            builder = builder.timeout_secs(timeout);
        }
        if let Some(threshold) = cli.ssim_threshold {
            builder = builder.ssim_threshold(threshold);
        }

        Ok(builder.build()?)
    }

    /// Reject flag combinations clap cannot express
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.style_reference.is_some()
            && cli
                .strategy
                .is_some_and(|s| s != CliStrategy::StyleReference)
        {
            anyhow::bail!("--style-reference only applies to the style-reference strategy");
        }
        if let Some(path) = &cli.style_reference {
            if !path.is_file() {
                anyhow::bail!("Style reference image not found: {}", path.display());
            }
        }
        Ok(())
    }
}
