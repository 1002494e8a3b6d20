//! Integration tests for complete pipeline runs
//!
//! Remote collaborators are replaced by in-process fakes; artifacts are
//! written to temporary directories.

mod common;

use bgswap::{
    forensic::{STAGE_MASK_GENERATION, STAGE_QA_VALIDATION},
    BatchSummary, ForensicLog, PipelineConfig, PipelineController, PipelineInput, ProcessOptions,
    ProjectContext, QaStatus, ReplacementStrategy,
};
use common::{centre_mask, encode_png, product_photo, EchoModel, EventLog, RecordingMaskGenerator};
use image::DynamicImage;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const WIDTH: u32 = 60;
const HEIGHT: u32 = 40;

fn input(id: &str) -> PipelineInput {
    PipelineInput::new(
        format!("{}.png", id),
        encode_png(&DynamicImage::ImageRgb8(product_photo(WIDTH, HEIGHT))),
    )
    .with_context(ProjectContext {
        project_id: Some(id.to_string()),
        ..ProjectContext::default()
    })
}

fn mask_bytes() -> Vec<u8> {
    encode_png(&DynamicImage::ImageLuma8(centre_mask(WIDTH, HEIGHT)))
}

fn controller(
    temp_dir: &TempDir,
    strategy: ReplacementStrategy,
    generator: RecordingMaskGenerator,
    model: EchoModel,
    timeout_secs: u64,
) -> PipelineController {
    let config = PipelineConfig::builder()
        .output_dir(temp_dir.path())
        .strategy(strategy)
        .timeout_secs(timeout_secs)
        .build()
        .expect("valid config");
    let replacer = bgswap::build_replacer(&config, Arc::new(model)).expect("replacer");
    PipelineController::new(config, Arc::new(generator), replacer).expect("controller")
}

fn events() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn test_adaptive_outpaint_run_compares_pre_extension() {
    let temp_dir = TempDir::new().unwrap();
    let model = EchoModel::default();
    let controller = controller(
        &temp_dir,
        ReplacementStrategy::AdaptiveOutpaint,
        RecordingMaskGenerator::new(mask_bytes(), events()),
        model.clone(),
        90,
    );

    let result = controller
        .process_image(&input("sneaker"), ProcessOptions::default())
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(model.calls(), vec!["inpaint", "outpaint"]);

    // The edited artifact is the extended canvas; QA saw the unextended edit.
    let edited = image::open(result.artifacts.edited.as_ref().unwrap()).unwrap();
    assert!(edited.height() > HEIGHT);
    let log = result.forensic_log.as_ref().unwrap();
    assert_eq!(log.qa_output.qa_status, QaStatus::Pass);
    assert_eq!(log.qa_output.ssim_score, 1.0);
    assert!(log.agents_executed.contains(&STAGE_QA_VALIDATION.to_string()));

    // mask + inpaint + outpaint + qa
    assert!((result.cost_estimate_usd - 0.062).abs() < 1e-12);
    assert_eq!(
        result.cost_estimate_usd,
        controller.cost_per_image(ProcessOptions::default())
    );
}

#[tokio::test]
async fn test_mask_failure_aborts_without_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let model = EchoModel::default();
    let controller = controller(
        &temp_dir,
        ReplacementStrategy::Inpaint,
        RecordingMaskGenerator::new(mask_bytes(), events()).failing_for("broken"),
        model.clone(),
        90,
    );

    let result = controller
        .process_image(&input("broken"), ProcessOptions::default())
        .await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains(STAGE_MASK_GENERATION));
    assert!(result.forensic_log.is_none());
    assert!(result.artifacts.mask.is_none());
    assert!(result.artifacts.edited.is_none());
    assert!(result.artifacts.forensic_log.is_none());
    assert!(model.calls().is_empty());
    assert!(!temp_dir.path().join("edited").exists());
    assert!(!temp_dir.path().join("logs").exists());
}

#[tokio::test]
async fn test_skip_qa_attaches_stub_log() {
    let temp_dir = TempDir::new().unwrap();
    let controller = controller(
        &temp_dir,
        ReplacementStrategy::Inpaint,
        RecordingMaskGenerator::new(mask_bytes(), events()),
        EchoModel::default(),
        90,
    );

    let result = controller
        .process_image(&input("quick"), ProcessOptions { skip_qa: true })
        .await;

    assert!(result.success);
    let log = result.forensic_log.as_ref().unwrap();
    assert_eq!(log.qa_output.qa_status, QaStatus::Skipped);
    assert_eq!(log.qa_output.ssim_score, 1.0);
    assert!(log.vinted_safe);
    assert!(!log.agents_executed.contains(&STAGE_QA_VALIDATION.to_string()));
    assert!(log.audit_trail.iter().any(|line| line.contains("skipped")));
    // The stub is not persisted.
    assert!(result.artifacts.forensic_log.is_none());
    assert!(result.artifacts.edited.is_some());
}

#[tokio::test]
async fn test_batch_runs_in_chunks_and_isolates_failures() {
    let temp_dir = TempDir::new().unwrap();
    let log = events();
    let controller = controller(
        &temp_dir,
        ReplacementStrategy::Inpaint,
        RecordingMaskGenerator::new(mask_bytes(), log.clone()).failing_for("img4"),
        EchoModel::default(),
        90,
    );
    let inputs: Vec<_> = (0..7).map(|i| input(&format!("img{}", i))).collect();

    let mut chunk_marks = Vec::new();
    let results = controller
        .process_batch_with_progress(&inputs, ProcessOptions::default(), 3, |done, total| {
            chunk_marks.push((done, total));
        })
        .await;

    assert_eq!(chunk_marks, vec![(3, 7), (6, 7), (7, 7)]);
    assert_eq!(bgswap::chunk_plan(7, 3), vec![3, 3, 1]);

    // Input order is preserved.
    let names: Vec<_> = results.iter().map(|r| r.input_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["img0.png", "img1.png", "img2.png", "img3.png", "img4.png", "img5.png", "img6.png"]
    );

    // Only the failing image failed.
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.success, i != 4, "image {}: {:?}", i, result.error);
    }

    // Chunk N+1 starts only after every image in chunk N resolved.
    let events = log.lock().unwrap().clone();
    let position = |event: &str| events.iter().position(|e| e == event).unwrap();
    for (earlier, later) in [(0..3, 3..6), (3..6, 6..7)] {
        let last_end = earlier.map(|i| position(&format!("end:img{}", i))).max().unwrap();
        let first_start = later
            .map(|i| position(&format!("start:img{}", i)))
            .min()
            .unwrap();
        assert!(last_end < first_start, "events: {:?}", events);
    }
    // Images inside a chunk overlap.
    assert!(position("start:img2") < position("end:img0"));

    let summary = BatchSummary::from_results(&results);
    assert_eq!(summary.succeeded, 6);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.qa_passed, 6);
}

#[tokio::test(start_paused = true)]
async fn test_remote_timeout_is_a_stage_failure() {
    let temp_dir = TempDir::new().unwrap();
    let controller = controller(
        &temp_dir,
        ReplacementStrategy::Inpaint,
        RecordingMaskGenerator::new(mask_bytes(), events()).with_delay(Duration::from_secs(600)),
        EchoModel::default(),
        1,
    );

    let result = controller
        .process_image(&input("slow"), ProcessOptions::default())
        .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains(STAGE_MASK_GENERATION), "{}", error);
    assert!(error.contains("timed out"), "{}", error);
}

#[tokio::test(start_paused = true)]
async fn test_each_model_call_gets_the_full_timeout() {
    let temp_dir = TempDir::new().unwrap();
    let model = EchoModel::default()
        .with_delays(Duration::from_secs(50), Duration::from_secs(50));
    let controller = controller(
        &temp_dir,
        ReplacementStrategy::AdaptiveOutpaint,
        RecordingMaskGenerator::new(mask_bytes(), events()),
        model.clone(),
        90,
    );

    let result = controller
        .process_image(&input("boots"), ProcessOptions::default())
        .await;

    // 100 s across two calls, each inside its own 90 s budget.
    assert!(result.success, "{:?}", result.error);
    assert_eq!(model.calls(), vec!["inpaint", "outpaint"]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_outpaint_call_times_out() {
    let temp_dir = TempDir::new().unwrap();
    let model = EchoModel::default()
        .with_delays(Duration::from_secs(10), Duration::from_secs(100));
    let controller = controller(
        &temp_dir,
        ReplacementStrategy::AdaptiveOutpaint,
        RecordingMaskGenerator::new(mask_bytes(), events()),
        model,
        90,
    );

    let result = controller
        .process_image(&input("parka"), ProcessOptions::default())
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Remote call failed during background_replacement: outpaint: timed out after 90s")
    );
    assert!(result.artifacts.mask.is_some());
    assert!(result.artifacts.edited.is_none());
}

#[tokio::test]
async fn test_file_batch_reads_each_chunk_lazily() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = TempDir::new().unwrap();
    let photo = encode_png(&DynamicImage::ImageRgb8(product_photo(WIDTH, HEIGHT)));
    let paths: Vec<_> = ["a.png", "b.png", "c.png", "missing.png"]
        .iter()
        .map(|name| input_dir.path().join(name))
        .collect();
    std::fs::write(&paths[0], &photo).unwrap();
    std::fs::write(&paths[1], &photo).unwrap();

    let controller = controller(
        &temp_dir,
        ReplacementStrategy::Inpaint,
        RecordingMaskGenerator::new(mask_bytes(), events()),
        EchoModel::default(),
        90,
    );

    // c.png only appears once the first chunk is done.
    let mut chunk_marks = Vec::new();
    let results = controller
        .process_files_with_progress(
            &paths,
            &ProjectContext::default(),
            ProcessOptions::default(),
            2,
            |done, total| {
                chunk_marks.push((done, total));
                if done == 2 {
                    std::fs::write(&paths[2], &photo).unwrap();
                }
            },
        )
        .await;

    assert_eq!(chunk_marks, vec![(2, 4), (4, 4)]);
    let names: Vec<_> = results.iter().map(|r| r.input_name.as_str()).collect();
    assert_eq!(names, vec!["a.png", "b.png", "c.png", "missing.png"]);
    for result in &results[..3] {
        assert!(result.success, "{}: {:?}", result.input_name, result.error);
    }
    let missing = &results[3];
    assert!(!missing.success);
    assert!(missing.error.as_deref().unwrap().contains("read input image"));
    assert!(missing.artifacts.mask.is_none());
}

#[tokio::test]
async fn test_persisted_log_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let controller = controller(
        &temp_dir,
        ReplacementStrategy::Inpaint,
        RecordingMaskGenerator::new(mask_bytes(), events()),
        EchoModel::default(),
        90,
    );

    let result = controller
        .process_image(&input("coat"), ProcessOptions::default())
        .await;

    let path = result.artifacts.forensic_log.as_ref().unwrap();
    let json = std::fs::read_to_string(path).unwrap();
    for field in ["\"agent1_output\"", "\"agent2_output\"", "\"vinted_safe\"", "\"qa_output\""] {
        assert!(json.contains(field), "missing {}", field);
    }
    let loaded = ForensicLog::from_json(&json).unwrap();
    assert_eq!(Some(&loaded), result.forensic_log.as_ref());
    assert!(loaded.timestamp_start <= loaded.timestamp_end);
    assert!(loaded.original_hash.starts_with("sha256:"));
}
