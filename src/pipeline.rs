//! Pipeline controller
//!
//! Sequences the three stages for one image (mask generation, background
//! replacement, QA validation), persists artifacts, accounts time and cost,
//! and runs batches in fixed-size concurrent chunks. The controller is the
//! only place where faults become a [`PipelineResult`].

use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
    forensic::{
        ForensicLog, QaStatus, UpstreamTimings, STAGE_BACKGROUND_REPLACEMENT,
        STAGE_MASK_GENERATION, STAGE_QA_VALIDATION,
    },
    qa::QaValidator,
    remote::{
        http::{HttpGenerativeModel, HttpMaskGenerator},
        BackgroundReplacer, GenerativeModel, MaskGenerator, MaskOutput, RemoteStage, Replacement,
    },
    replacers::build_replacer,
    store::ArtifactStore,
    types::{
        input_name, ArtifactPaths, PipelineInput, PipelineResult, ProcessOptions, ProjectContext,
    },
};
use futures::{future::join_all, FutureExt};
use instant::Instant;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

/// Split `total` items into chunk sizes of at most `concurrency`
///
/// A concurrency of zero is treated as one.
#[must_use]
pub fn chunk_plan(total: usize, concurrency: usize) -> Vec<usize> {
    let size = concurrency.max(1);
    (0..total)
        .step_by(size)
        .map(|start| size.min(total - start))
        .collect()
}

/// Aggregate counts over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub qa_passed: usize,
    pub qa_failed: usize,
    pub qa_skipped: usize,
    /// Completed runs whose log clears the publishing gate
    pub safe: usize,
    pub total_cost_usd: f64,
    pub total_time_ms: u64,
}

impl BatchSummary {
    #[must_use]
    pub fn from_results(results: &[PipelineResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            if result.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            match result.qa_status() {
                Some(QaStatus::Pass) => summary.qa_passed += 1,
                Some(QaStatus::Fail) => summary.qa_failed += 1,
                Some(QaStatus::Skipped) => summary.qa_skipped += 1,
                None => {},
            }
            if result.is_safe() {
                summary.safe += 1;
            }
            summary.total_cost_usd += result.cost_estimate_usd;
            summary.total_time_ms += result.total_time_ms;
        }
        summary
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    #[must_use]
    pub fn all_safe(&self) -> bool {
        self.safe == self.total
    }
}

/// Orchestrates the per-image pipeline
pub struct PipelineController {
    config: PipelineConfig,
    mask_generator: Arc<dyn MaskGenerator>,
    replacer: Arc<dyn BackgroundReplacer>,
    validator: QaValidator,
    store: ArtifactStore,
}

impl PipelineController {
    /// Create a controller around already constructed collaborators
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn new(
        config: PipelineConfig,
        mask_generator: Arc<dyn MaskGenerator>,
        replacer: Arc<dyn BackgroundReplacer>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            strategy = %replacer.strategy(),
            mask_generator = mask_generator.name(),
            output_dir = %config.output_dir.display(),
            "Pipeline controller initialized"
        );
        Ok(Self {
            validator: QaValidator::new(config.qa),
            store: ArtifactStore::new(config.output_dir.clone()),
            config,
            mask_generator,
            replacer,
        })
    }

    /// Create a controller with HTTP collaborators and the configured strategy
    ///
    /// # Errors
    /// - Invalid configuration
    /// - HTTP client construction failure or missing API key variable
    /// - Style reference image cannot be read
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let mask_generator: Arc<dyn MaskGenerator> =
            Arc::new(HttpMaskGenerator::new(&config.remote)?);
        let model: Arc<dyn GenerativeModel> = Arc::new(HttpGenerativeModel::new(&config.remote)?);
        let replacer = build_replacer(&config, model)?;
        Self::new(config, mask_generator, replacer)
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Declared cost of one complete run
    #[must_use]
    pub fn cost_per_image(&self, options: ProcessOptions) -> f64 {
        let cost = &self.config.cost;
        let mut total = RemoteStage::MaskGeneration.unit_cost(cost);
        total += self.replacement_cost();
        if !options.skip_qa {
            total += RemoteStage::QaValidation.unit_cost(cost);
        }
        total
    }

    /// Stage-2 cap: one remote timeout per declared call
    ///
    /// Built-in strategies also bound each call on its own; the cap keeps a
    /// custom replacer from stalling a chunk indefinitely.
    fn replacement_budget(&self) -> Duration {
        let calls = self.replacer.remote_stages().len().max(1) as u32;
        self.config.remote.timeout() * calls
    }

    fn replacement_cost(&self) -> f64 {
        self.replacer
            .remote_stages()
            .into_iter()
            .map(|stage| stage.unit_cost(&self.config.cost))
            .sum()
    }

    /// Run the full pipeline for one image
    ///
    /// Never fails: any stage fault yields `success = false` with the error text.
    /// The QA verdict does not affect `success`.
    #[instrument(skip_all, fields(input = %input.name, skip_qa = options.skip_qa))]
    pub async fn process_image(
        &self,
        input: &PipelineInput,
        options: ProcessOptions,
    ) -> PipelineResult {
        let start = Instant::now();
        let mut run = RunState::new(input);
        info!(run_id = %run.result.run_id, image_id = %run.result.image_id, "Starting pipeline run");

        match self.run_stages(input, options, &mut run).await {
            Ok(()) => run.result.success = true,
            Err(e) => {
                error!(error = %e, "Pipeline run aborted");
                run.result.error = Some(e.to_string());
            },
        }

        run.result.cost_estimate_usd = run.cost;
        run.result.total_time_ms = start.elapsed().as_millis() as u64;
        info!(
            success = run.result.success,
            total_time_ms = run.result.total_time_ms,
            cost_usd = run.result.cost_estimate_usd,
            "Pipeline run finished"
        );
        run.result
    }

    async fn run_stages(
        &self,
        input: &PipelineInput,
        options: ProcessOptions,
        run: &mut RunState,
    ) -> Result<()> {
        let mask = self
            .generate_mask(input, run)
            .instrument(info_span!("mask_generation"))
            .await?;
        let replacement = self
            .replace_background(input, &mask, run)
            .instrument(info_span!("background_replacement"))
            .await?;

        let upstream = UpstreamTimings {
            mask_generation_ms: mask.timing_ms,
            replacement_ms: replacement.timing_ms,
            model: replacement.model.clone(),
            prompt: replacement.prompt_used.clone(),
        };

        let forensic_log = if options.skip_qa {
            info!("QA validation skipped on request");
            ForensicLog::skipped(&run.result.image_id, &upstream)
        } else {
            self.validate(input, &mask, &replacement, upstream, run)
                .instrument(info_span!("qa_validation"))
                .await?
        };
        run.result.forensic_log = Some(forensic_log);
        Ok(())
    }

    async fn generate_mask(&self, input: &PipelineInput, run: &mut RunState) -> Result<MaskOutput> {
        run.cost += RemoteStage::MaskGeneration.unit_cost(&self.config.cost);
        let mask = self
            .call_remote(
                STAGE_MASK_GENERATION,
                self.config.remote.timeout(),
                self.mask_generator.generate(&input.bytes, &input.context),
            )
            .await?;
        if mask.mask.is_empty() {
            return Err(PipelineError::remote_call(
                STAGE_MASK_GENERATION,
                "mask generator returned an empty mask",
            ));
        }
        info!(timing_ms = mask.timing_ms, "Stage 1 complete");

        run.result.artifacts.mask = self
            .persist(
                "mask",
                self.store
                    .write_mask(&run.result.run_id, &run.base, mask.mask.clone()),
            )
            .await;
        Ok(mask)
    }

    async fn replace_background(
        &self,
        input: &PipelineInput,
        mask: &MaskOutput,
        run: &mut RunState,
    ) -> Result<Replacement> {
        run.cost += self.replacement_cost();
        let replacement = self
            .call_remote(
                STAGE_BACKGROUND_REPLACEMENT,
                self.replacement_budget(),
                self.replacer.replace(&input.bytes, &mask.mask, &input.context),
            )
            .await?;
        if replacement.edited.is_empty() {
            return Err(PipelineError::remote_call(
                STAGE_BACKGROUND_REPLACEMENT,
                "replacer returned an empty image",
            ));
        }
        info!(
            timing_ms = replacement.timing_ms,
            model = %replacement.model,
            extended = replacement.pre_extension.is_some(),
            "Stage 2 complete"
        );

        run.result.artifacts.edited = self
            .persist(
                "edited image",
                self.store
                    .write_edited(&run.result.run_id, &run.base, replacement.edited.clone()),
            )
            .await;
        Ok(replacement)
    }

    async fn validate(
        &self,
        input: &PipelineInput,
        mask: &MaskOutput,
        replacement: &Replacement,
        upstream: UpstreamTimings,
        run: &mut RunState,
    ) -> Result<ForensicLog> {
        run.cost += RemoteStage::QaValidation.unit_cost(&self.config.cost);

        let validator = self.validator;
        let original = input.bytes.clone();
        let candidate = replacement.qa_candidate().to_vec();
        let mask_bytes = mask.mask.clone();
        let image_id = run.result.image_id.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            validator.validate(&original, &candidate, &mask_bytes, &image_id, &upstream)
        })
        .await
        .map_err(|e| {
            PipelineError::internal(format!("{} task failed: {}", STAGE_QA_VALIDATION, e))
        })?;

        if let Some(err) = &outcome.error {
            warn!(error = %err, "QA validation reported an error");
        }
        info!(
            qa_status = %outcome.forensic_log.qa_output.qa_status,
            ssim = outcome.forensic_log.qa_output.ssim_score,
            "Stage 3 complete"
        );

        run.result.artifacts.forensic_log = self
            .persist(
                "forensic log",
                self.store
                    .write_forensic_log(&run.result.run_id, &run.base, &outcome.forensic_log),
            )
            .await;
        Ok(outcome.forensic_log)
    }

    /// Apply `timeout` and attribute any failure to `stage`
    ///
    /// A remote error raised by an inner call keeps its message, prefixed by
    /// the call that failed.
    async fn call_remote<T, F>(&self, stage: &str, timeout: Duration, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(PipelineError::RemoteCall { stage: failed, message })) => {
                if failed == stage {
                    Err(PipelineError::remote_call(failed, message))
                } else {
                    Err(PipelineError::remote_call(stage, format!("{}: {}", failed, message)))
                }
            },
            Ok(Err(e)) => Err(PipelineError::remote_call(stage, e.to_string())),
            Err(_) => Err(PipelineError::remote_call(
                stage,
                format!("timed out after {}s", timeout.as_secs()),
            )),
        }
    }

    /// Best-effort write: failures are logged and leave no path
    async fn persist<F>(&self, what: &str, write: F) -> Option<PathBuf>
    where
        F: Future<Output = Result<PathBuf>>,
    {
        match write.await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Failed to persist {}", what);
                None
            },
        }
    }

    /// Run a batch in chunks of `concurrency`; results keep input order
    pub async fn process_batch(
        &self,
        inputs: &[PipelineInput],
        options: ProcessOptions,
        concurrency: usize,
    ) -> Vec<PipelineResult> {
        self.process_batch_with_progress(inputs, options, concurrency, |_, _| {})
            .await
    }

    /// Like [`Self::process_batch`], calling `on_chunk(done, total)` after each chunk
    ///
    /// Every image in a chunk runs concurrently; the next chunk starts only
    /// once all of them resolved. A panic inside one image's run becomes a
    /// failed result for that image.
    #[instrument(skip_all, fields(images = inputs.len(), concurrency = concurrency))]
    pub async fn process_batch_with_progress<P>(
        &self,
        inputs: &[PipelineInput],
        options: ProcessOptions,
        concurrency: usize,
        mut on_chunk: P,
    ) -> Vec<PipelineResult>
    where
        P: FnMut(usize, usize),
    {
        let mut results = Vec::with_capacity(inputs.len());

        for (index, chunk) in inputs.chunks(concurrency.max(1)).enumerate() {
            info!(chunk = index + 1, size = chunk.len(), "Processing chunk");
            results.extend(self.run_chunk(chunk, options).await);
            on_chunk(results.len(), inputs.len());
        }

        log_batch_summary(&results);
        results
    }

    /// Run a batch of image files, reading each chunk's files just before it starts
    ///
    /// At most `concurrency` images are held in memory at once. A file that
    /// cannot be read becomes a failed result in its input position.
    #[instrument(skip_all, fields(images = paths.len(), concurrency = concurrency))]
    pub async fn process_files_with_progress<P>(
        &self,
        paths: &[PathBuf],
        context: &ProjectContext,
        options: ProcessOptions,
        concurrency: usize,
        mut on_chunk: P,
    ) -> Vec<PipelineResult>
    where
        P: FnMut(usize, usize),
    {
        let mut results = Vec::with_capacity(paths.len());

        for (index, chunk) in paths.chunks(concurrency.max(1)).enumerate() {
            info!(chunk = index + 1, size = chunk.len(), "Loading and processing chunk");
            let mut loaded = Vec::with_capacity(chunk.len());
            let mut unreadable = Vec::with_capacity(chunk.len());
            for path in chunk {
                match PipelineInput::from_path(path).await {
                    Ok(input) => {
                        loaded.push(input.with_context(context.clone()));
                        unreadable.push(None);
                    },
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to read input");
                        let placeholder = PipelineInput::new(input_name(path), Vec::new());
                        let failed = RunState::new(&placeholder).into_failed(e.to_string());
                        unreadable.push(Some(failed));
                    },
                }
            }

            let mut runs = self.run_chunk(&loaded, options).await.into_iter();
            results.extend(
                unreadable
                    .into_iter()
                    .filter_map(|failed| failed.or_else(|| runs.next())),
            );
            on_chunk(results.len(), paths.len());
        }

        log_batch_summary(&results);
        results
    }

    /// Run one chunk concurrently, isolating panics per image
    async fn run_chunk(
        &self,
        chunk: &[PipelineInput],
        options: ProcessOptions,
    ) -> Vec<PipelineResult> {
        let runs = chunk.iter().map(|input| {
            AssertUnwindSafe(self.process_image(input, options))
                .catch_unwind()
                .map(move |outcome| {
                    outcome.unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        error!(input = %input.name, panic = %message, "Pipeline run panicked");
                        RunState::new(input).into_failed(format!("Pipeline run panicked: {}", message))
                    })
                })
        });
        join_all(runs).await
    }
}

fn log_batch_summary(results: &[PipelineResult]) {
    let summary = BatchSummary::from_results(results);
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        qa_passed = summary.qa_passed,
        qa_failed = summary.qa_failed,
        qa_skipped = summary.qa_skipped,
        "Batch finished"
    );
}

/// Mutable state of one image's run
struct RunState {
    base: String,
    cost: f64,
    result: PipelineResult,
}

impl RunState {
    fn new(input: &PipelineInput) -> Self {
        let run_id = Uuid::new_v4().simple().to_string();
        Self {
            base: input.base_name(),
            cost: 0.0,
            result: PipelineResult {
                success: false,
                image_id: Uuid::new_v4().to_string(),
                run_id: run_id.chars().take(12).collect(),
                input_name: input.name.clone(),
                artifacts: ArtifactPaths::default(),
                forensic_log: None,
                total_time_ms: 0,
                cost_estimate_usd: 0.0,
                error: None,
            },
        }
    }

    fn into_failed(mut self, error: String) -> PipelineResult {
        self.result.error = Some(error);
        self.result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::test_utils::{
        centre_mask, product_photo, FakeGenerativeModel, FakeMaskGenerator,
    };
    use crate::replacers::InpaintReplacer;
    use async_trait::async_trait;
    use tempfile::TempDir;

    fn controller(
        temp_dir: &TempDir,
        generator: FakeMaskGenerator,
        model: FakeGenerativeModel,
    ) -> PipelineController {
        let config = PipelineConfig::builder()
            .output_dir(temp_dir.path())
            .build()
            .unwrap();
        PipelineController::new(
            config,
            Arc::new(generator),
            Arc::new(InpaintReplacer::new(Arc::new(model))),
        )
        .unwrap()
    }

    #[test]
    fn test_chunk_plan() {
        assert_eq!(chunk_plan(7, 3), vec![3, 3, 1]);
        assert_eq!(chunk_plan(6, 3), vec![3, 3]);
        assert_eq!(chunk_plan(2, 0), vec![1, 1]);
        assert!(chunk_plan(0, 3).is_empty());
    }

    #[tokio::test]
    async fn test_successful_run_persists_all_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let controller = controller(
            &temp_dir,
            FakeMaskGenerator::new(centre_mask(64, 48)),
            FakeGenerativeModel::echo(),
        );
        let input = PipelineInput::new("jacket.png", product_photo(64, 48));

        let result = controller.process_image(&input, ProcessOptions::default()).await;

        assert!(result.success, "{:?}", result.error);
        assert!(result.is_safe());
        assert_eq!(result.qa_status(), Some(QaStatus::Pass));
        for path in [
            result.artifacts.mask.as_ref(),
            result.artifacts.edited.as_ref(),
            result.artifacts.forensic_log.as_ref(),
        ] {
            let path = path.unwrap();
            assert!(path.exists());
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with(&format!("{}_jacket_", result.run_id)));
        }
        let log = ForensicLog::load(result.artifacts.forensic_log.as_ref().unwrap()).unwrap();
        assert_eq!(Some(log), result.forensic_log);
        assert!((result.cost_estimate_usd - 0.032).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_replacement_failure_keeps_mask_only() {
        let temp_dir = TempDir::new().unwrap();
        let controller = controller(
            &temp_dir,
            FakeMaskGenerator::new(centre_mask(32, 32)),
            FakeGenerativeModel::new_failing(),
        );
        let input = PipelineInput::new("bag.png", product_photo(32, 32));

        let result = controller.process_image(&input, ProcessOptions::default()).await;

        assert!(!result.success);
        assert!(result.artifacts.mask.is_some());
        assert!(result.artifacts.edited.is_none());
        assert!(result.forensic_log.is_none());
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains(STAGE_BACKGROUND_REPLACEMENT));
    }

    #[tokio::test]
    async fn test_empty_mask_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let controller = controller(
            &temp_dir,
            FakeMaskGenerator::new(Vec::new()),
            FakeGenerativeModel::echo(),
        );
        let input = PipelineInput::new("x.png", product_photo(8, 8));

        let result = controller.process_image(&input, ProcessOptions::default()).await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains(STAGE_MASK_GENERATION));
        assert!(result.artifacts.mask.is_none());
    }

    #[tokio::test]
    async fn test_replacement_error_keeps_inner_message() {
        let temp_dir = TempDir::new().unwrap();
        let controller = controller(
            &temp_dir,
            FakeMaskGenerator::new(centre_mask(16, 16)),
            FakeGenerativeModel::new_failing(),
        );
        let input = PipelineInput::new("hat.png", product_photo(16, 16));

        let result = controller.process_image(&input, ProcessOptions::default()).await;

        assert_eq!(
            result.error.as_deref(),
            Some("Remote call failed during background_replacement: inpaint: simulated outage")
        );
    }

    #[tokio::test]
    async fn test_mask_failure_stops_before_replacement() {
        let temp_dir = TempDir::new().unwrap();
        let generator = FakeMaskGenerator::new_failing();
        let model = FakeGenerativeModel::echo();
        let controller = controller(&temp_dir, generator.clone(), model.clone());
        let input = PipelineInput::new("scarf.png", product_photo(16, 16));

        let result = controller.process_image(&input, ProcessOptions::default()).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Remote call failed during mask_generation: simulated outage")
        );
        assert_eq!(generator.get_call_history().len(), 1);
        assert!(model.get_call_history().is_empty());
        assert!(result.artifacts.mask.is_none());
        // Only the attempted stage is charged.
        assert!((result.cost_estimate_usd - 0.002).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_mask_generator_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let generator =
            FakeMaskGenerator::new(centre_mask(16, 16)).with_delay(Duration::from_secs(120));
        let model = FakeGenerativeModel::echo();
        let controller = controller(&temp_dir, generator.clone(), model.clone());
        let input = PipelineInput::new("belt.png", product_photo(16, 16));

        let result = controller.process_image(&input, ProcessOptions::default()).await;

        assert_eq!(
            result.error.as_deref(),
            Some("Remote call failed during mask_generation: timed out after 90s")
        );
        assert_eq!(
            generator.get_call_history(),
            vec![format!("generate({} bytes)", input.bytes.len())]
        );
        assert!(model.get_call_history().is_empty());
    }

    struct PanickingGenerator;

    #[async_trait]
    impl MaskGenerator for PanickingGenerator {
        async fn generate(&self, _image: &[u8], _context: &ProjectContext) -> Result<MaskOutput> {
            panic!("generator exploded");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_panicking_run_becomes_failed_result() {
        let temp_dir = TempDir::new().unwrap();
        let config = PipelineConfig::builder()
            .output_dir(temp_dir.path())
            .build()
            .unwrap();
        let controller = PipelineController::new(
            config,
            Arc::new(PanickingGenerator),
            Arc::new(InpaintReplacer::new(Arc::new(FakeGenerativeModel::echo()))),
        )
        .unwrap();
        let inputs = vec![PipelineInput::new("a.png", product_photo(8, 8))];

        let results = controller
            .process_batch(&inputs, ProcessOptions::default(), 3)
            .await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("generator exploded"));
        assert_eq!(results[0].input_name, "a.png");
    }

    #[test]
    fn test_batch_summary_counts() {
        let ok = |status: Option<QaStatus>| {
            let mut log = ForensicLog::skipped("id", &UpstreamTimings::default());
            if let Some(status) = status {
                log.qa_output.qa_status = status;
                log.vinted_safe = status != QaStatus::Fail;
            }
            PipelineResult {
                success: true,
                image_id: "id".to_string(),
                run_id: "run".to_string(),
                input_name: "in".to_string(),
                artifacts: ArtifactPaths::default(),
                forensic_log: Some(log),
                total_time_ms: 10,
                cost_estimate_usd: 0.5,
                error: None,
            }
        };
        let mut failed = ok(None);
        failed.success = false;
        failed.forensic_log = None;

        let results = vec![
            ok(Some(QaStatus::Pass)),
            ok(Some(QaStatus::Fail)),
            ok(None),
            failed,
        ];
        let summary = BatchSummary::from_results(&results);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.qa_passed, 1);
        assert_eq!(summary.qa_failed, 1);
        assert_eq!(summary.qa_skipped, 1);
        assert_eq!(summary.safe, 2);
        assert!((summary.total_cost_usd - 2.0).abs() < 1e-12);
        assert_eq!(summary.total_time_ms, 40);
        assert!(!summary.all_succeeded());
        assert!(!summary.all_safe());
    }
}
