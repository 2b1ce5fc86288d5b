//! Integration tests for job creation, processing and completion

use futures::future::join_all;
use serde_json::json;
use std::sync::atomic::Ordering;
use tokio_test::{assert_err, assert_ok};

use vjobs::core::{JobManager, MemoryJobStore};
use vjobs::error::VjobsError;
use vjobs::models::{JobStatus, JobType, JobUpdate, SENTINEL_STYLE};

mod common;

use common::{client, registry, standard_registry, FakeImageBackend, FakeLanguageModel, FakeTaskProvider, Step};

#[tokio::test]
async fn test_create_then_get_is_pending_with_exact_input() {
    let manager = JobManager::new(MemoryJobStore::shared());
    let inputs = [
        (JobType::Styles, json!({"trackName": "Midnight Dreams", "trackArtist": "Nova"})),
        (JobType::TrackInfo, json!({"trackName": "Midnight Dreams", "style": "Neon Grid Pulse"})),
        (JobType::Image, json!({"prompt": "aurora ribbons", "regenerate": false})),
        (JobType::Video, json!({"imageUrl": "https://images.test/1.png", "prompt": "zoom", "bpm": 128})),
    ];

    for (job_type, input) in inputs {
        let id = assert_ok!(manager.create(job_type, input.clone()).await);
        let job = assert_ok!(manager.get(&id).await);
        assert_eq!(job.job_type, job_type);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.input_data, input);
        assert!(job.output_data.is_none());
        assert!(job.completed_at.is_none());
    }
}

#[tokio::test]
async fn test_missing_input_rejected_before_creation() {
    let manager = JobManager::new(MemoryJobStore::shared());

    let err = assert_err!(manager.create(JobType::TrackInfo, json!({"trackName": "x"})).await);
    assert!(matches!(err, VjobsError::InvalidInput(_)));
    assert_eq!(manager.summary().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_styles_job_for_midnight_dreams() {
    let client = client(standard_registry(FakeTaskProvider::new("rw_123", vec![Step::Running])));

    let mut observed = Vec::new();
    let output = client
        .get_styles(None, "Midnight Dreams", |job| observed.push(job.clone()))
        .await
        .unwrap();

    assert_eq!(output.styles.len(), 5);
    assert_eq!(output.styles[4], SENTINEL_STYLE);

    let job = observed.last().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_data.as_ref().unwrap()["styles"][4], "Rainbow Vomit");
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn test_sentinel_is_always_fifth() {
    let replies = [
        r#"["A", "B", "C", "D"]"#,
        r#"["Rainbow Vomit", "A", "B", "C", "D"]"#,
        r#"["A", "B", "rainbow vomit", "C", "D", "E", "F"]"#,
        "Here are some ideas:\n```json\n[\"A\", \"B\", \"C\", \"D\"]\n```",
    ];

    for reply in replies {
        let llm = FakeLanguageModel::new(move |_| Ok(reply.to_string()));
        let client = client(registry(
            llm,
            FakeImageBackend::new("gpt-image-1", false),
            FakeImageBackend::new("dall-e-3", false),
            FakeTaskProvider::new("rw_1", vec![Step::Running]),
        ));

        for track in ["Midnight Dreams", "Sunrise", "Déjà Vu"] {
            let output = client.get_styles(Some("Nova"), track, |_| {}).await.unwrap();
            assert_eq!(output.styles.len(), 5);
            assert_eq!(output.styles[4], SENTINEL_STYLE, "reply {:?}", reply);
            assert!(!output.styles[..4].iter().any(|s| s.eq_ignore_ascii_case(SENTINEL_STYLE)));
        }
    }
}

#[tokio::test]
async fn test_track_info_job() {
    let client = client(standard_registry(FakeTaskProvider::new("rw_1", vec![Step::Running])));

    let output = client
        .get_track_info("Midnight Dreams", "Neon Grid Pulse", |_| {})
        .await
        .unwrap();

    assert_eq!(output.bpm, 128);
    assert_eq!(output.phases.len(), 5);
}

#[tokio::test]
async fn test_image_fallback_records_model_used() {
    let primary = FakeImageBackend::new("gpt-image-1", true);
    let fallback = FakeImageBackend::new("dall-e-3", false);
    let client = client(registry(
        FakeLanguageModel::standard(),
        primary.clone(),
        fallback.clone(),
        FakeTaskProvider::new("rw_1", vec![Step::Running]),
    ));

    let output = client.generate_image("aurora ribbons", false, |_| {}).await.unwrap();

    assert_eq!(output.model_used, "dall-e-3");
    assert_eq!(output.image_url, "https://images.test/dall-e-3.png");
    assert_eq!(output.revised_prompt, "dall-e-3 revised");
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_generator_failure_surfaces_recorded_message() {
    let client = client(registry(
        FakeLanguageModel::standard(),
        FakeImageBackend::new("gpt-image-1", true),
        FakeImageBackend::new("dall-e-3", true),
        FakeTaskProvider::new("rw_1", vec![Step::Running]),
    ));

    let id = client
        .submit(JobType::Image, json!({"prompt": "aurora ribbons"}))
        .await
        .unwrap();
    let err = client.poll_job(&id, |_| {}).await.unwrap_err();

    let job = client.manager().get(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.completed_at.is_some());
    let message = job.error_message.unwrap();
    assert!(message.starts_with("Both gpt-image-1 and dall-e-3 failed."));
    assert_eq!(err.to_string(), message);
}

#[tokio::test]
async fn test_poll_job_reports_every_fetch() {
    let client = client(standard_registry(FakeTaskProvider::new("rw_1", vec![Step::Running])));

    let id = client
        .submit(JobType::TrackInfo, json!({"trackName": "Midnight Dreams", "style": "Neon"}))
        .await
        .unwrap();

    let mut statuses = Vec::new();
    let job = client.poll_job(&id, |job| statuses.push(job.status)).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(statuses.last(), Some(&JobStatus::Completed));
    assert!(statuses
        .iter()
        .all(|s| *s == JobStatus::Completed || !s.is_terminal()));
}

#[tokio::test]
async fn test_status_is_monotonic_after_completion() {
    let llm = FakeLanguageModel::standard();
    let client = client(registry(
        llm.clone(),
        FakeImageBackend::new("gpt-image-1", false),
        FakeImageBackend::new("dall-e-3", false),
        FakeTaskProvider::new("rw_1", vec![Step::Running]),
    ));

    let id = client
        .submit(JobType::Styles, json!({"trackName": "Midnight Dreams"}))
        .await
        .unwrap();
    let done = client.poll_job(&id, |_| {}).await.unwrap();
    let calls = llm.calls.load(Ordering::SeqCst);

    // Reprocessing and stray updates must not move the job
    let again = client.processor().process(&id).await.unwrap();
    assert_eq!(again, done);
    assert_eq!(llm.calls.load(Ordering::SeqCst), calls);

    let err = client
        .manager()
        .update(&id, JobUpdate::status(JobStatus::Processing))
        .await
        .unwrap_err();
    assert!(matches!(err, VjobsError::InvalidTransition { .. }));

    let err = client
        .manager()
        .update(&id, JobUpdate::failed("late failure"))
        .await
        .unwrap_err();
    assert!(matches!(err, VjobsError::InvalidTransition { .. }));

    for _ in 0..3 {
        let job = client.manager().get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed_at, done.completed_at);
    }
}

#[tokio::test]
async fn test_duplicate_dispatch_settles_once() {
    let client = client(standard_registry(FakeTaskProvider::new("rw_1", vec![Step::Running])));
    let id = client
        .manager()
        .create(JobType::Styles, json!({"trackName": "Midnight Dreams"}))
        .await
        .unwrap();

    let results = join_all((0..5).map(|_| client.processor().process(&id))).await;
    for result in results {
        assert!(result.is_ok());
    }

    let job = client.manager().get(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.completed_at.is_some());
    assert!(job.error_message.is_none());
}

#[tokio::test]
async fn test_duplicate_video_dispatch_keeps_one_task() {
    let provider = FakeTaskProvider::new("rw_1", vec![Step::Running]);
    let client = client(standard_registry(provider.clone()));
    let id = client
        .manager()
        .create(JobType::Video, json!({"imageUrl": "https://img/1.png", "prompt": "aurora"}))
        .await
        .unwrap();

    let results = join_all((0..5).map(|_| client.processor().process(&id))).await;
    for result in results {
        assert_ok!(result);
    }
    client.processor().process(&id).await.unwrap();

    assert_eq!(provider.submitted.lock().unwrap().len(), 1);
    let job = client.manager().get(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.task_id(), Some("rw_1"));
}

#[tokio::test]
async fn test_completed_at_iff_terminal() {
    let client = client(standard_registry(FakeTaskProvider::new("rw_1", vec![Step::Running])));

    let id = client
        .submit(JobType::Image, json!({"prompt": "aurora", "regenerate": true}))
        .await
        .unwrap();
    client
        .poll_job(&id, |job| {
            assert_eq!(job.completed_at.is_some(), job.status.is_terminal());
        })
        .await
        .unwrap();

    let summary = client.manager().summary().await.unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.completed, 1);
}
