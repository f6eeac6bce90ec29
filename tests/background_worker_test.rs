/// Background job processing tests
///
/// Tests cover:
/// - Dispatch of the three translation job types
/// - Priority-based job ordering
/// - Retry logic and non-retryable failures
/// - Hard time limit
/// - Worker lifecycle (start/stop)
mod utils;

use lunafrost_lib::modules::jobs::{
    Job, JobRepository, JobStatus, PRIORITY_HIGH, PRIORITY_LOW, PRIORITY_NORMAL,
};
use lunafrost_lib::modules::novel::TranslationStatus;
use lunafrost_lib::modules::translation::TranslateChapterOptions;
use lunafrost_lib::shared::JobQueueConfig;
use lunafrost_lib::AppError;
use std::sync::Arc;
use tokio_test::assert_ok;
use std::time::Duration;
use uuid::Uuid;
use utils::factories::{episode_chapter, NovelFactory, READER};
use utils::helpers::{self, TestServices};

async fn seed_chapters(services: &TestServices, count: i64) -> Vec<i32> {
    services
        .novel_service
        .create_novel(READER, &NovelFactory::minimal("orv").build())
        .await
        .unwrap();

    let mut ids = Vec::new();
    for episode in 1..=count {
        let result = services
            .novel_service
            .add_chapter(READER, "orv", episode_chapter(episode))
            .await
            .unwrap();
        ids.push(result.chapter_id);
    }
    ids
}

async fn job_status(services: &TestServices, job_id: Uuid) -> JobStatus {
    services
        .job_repository
        .get_by_id(job_id)
        .await
        .unwrap()
        .unwrap()
        .status
}

fn chapter_job(chapter_id: i32, priority: i32) -> Job {
    Job::translate_chapter(
        READER,
        "orv",
        chapter_id,
        TranslateChapterOptions::default(),
        priority,
    )
    .unwrap()
}

// ================================================================================================
// JOB PROCESSING TESTS
// ================================================================================================

#[tokio::test]
async fn worker_translates_chapter_job() {
    let services = helpers::build_test_services(helpers::with_translator(
        helpers::echo_translator(),
    ));
    let chapter_id = seed_chapters(&services, 1).await[0];

    let record = assert_ok!(
        services
            .background_worker
            .enqueue(chapter_job(chapter_id, PRIORITY_NORMAL))
            .await
    );
    assert_eq!(record.status, JobStatus::Pending);

    assert_eq!(helpers::drain_queue(&services.background_worker).await, 1);

    let job = services
        .job_repository
        .get_by_id(record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 1);
    assert!(job.completed_at.is_some());

    let chapter = services
        .novel_service
        .get_chapter(READER, chapter_id)
        .await
        .unwrap();
    assert_eq!(chapter.translation_status, TranslationStatus::Completed);
    assert_eq!(
        chapter.translation_task_id.as_deref(),
        Some(record.id.to_string().as_str())
    );

    let history = services
        .job_repository
        .get_jobs_for_chapter(chapter_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn worker_translates_titles() {
    let services = helpers::build_test_services(helpers::with_translator(
        helpers::echo_translator(),
    ));
    let chapter_id = seed_chapters(&services, 1).await[0];

    services
        .background_worker
        .enqueue(Job::translate_chapter_title(READER, chapter_id, PRIORITY_NORMAL).unwrap())
        .await
        .unwrap();
    services
        .background_worker
        .enqueue(Job::translate_novel_title(READER, "orv", PRIORITY_LOW).unwrap())
        .await
        .unwrap();

    assert_eq!(helpers::drain_queue(&services.background_worker).await, 2);

    let stats = services.background_worker.get_statistics().await.unwrap();
    assert_eq!(stats.completed_jobs, 2);
    assert_eq!(stats.jobs_failed, 0);

    let chapter = services
        .novel_service
        .get_chapter(READER, chapter_id)
        .await
        .unwrap();
    assert_eq!(chapter.translated_title.as_deref(), Some("EN: 1화"));

    let novels = services.novel_service.list_novels(READER).await.unwrap();
    assert_eq!(
        novels[0].translated_title.as_deref(),
        Some("EN: 전지적 독자 시점")
    );
}

#[tokio::test]
async fn high_priority_jobs_run_first() {
    let services = helpers::build_test_services(helpers::with_translator(
        helpers::echo_translator(),
    ));
    let ids = seed_chapters(&services, 3).await;

    let low = services
        .background_worker
        .enqueue(chapter_job(ids[0], PRIORITY_LOW))
        .await
        .unwrap();
    let normal = services
        .background_worker
        .enqueue(chapter_job(ids[1], PRIORITY_NORMAL))
        .await
        .unwrap();
    let high = services
        .background_worker
        .enqueue(chapter_job(ids[2], PRIORITY_HIGH))
        .await
        .unwrap();

    let pending = services.job_repository.get_pending_jobs().await.unwrap();
    let order: Vec<_> = pending.iter().map(|j| j.id).collect();
    assert_eq!(order, vec![high.id, normal.id, low.id]);

    assert!(services.background_worker.process_next_job().await.unwrap());
    assert_eq!(job_status(&services, high.id).await, JobStatus::Completed);
    assert_eq!(job_status(&services, normal.id).await, JobStatus::Pending);
    assert_eq!(job_status(&services, low.id).await, JobStatus::Pending);
}

// ================================================================================================
// RETRY TESTS
// ================================================================================================

#[tokio::test]
async fn retryable_failure_is_retried_until_attempts_run_out() {
    let services = helpers::build_test_services(helpers::with_translator(
        helpers::failing_translator(|| AppError::ApiError("OpenAI API Error: 502 - bad gateway".to_string())),
    ));
    let chapter_id = seed_chapters(&services, 1).await[0];
    let record = services
        .background_worker
        .enqueue(chapter_job(chapter_id, PRIORITY_NORMAL))
        .await
        .unwrap();
    assert_eq!(record.max_attempts, 3);

    assert!(services.background_worker.process_next_job().await.unwrap());
    let job = services
        .job_repository
        .get_by_id(record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 1);
    assert!(job.error.as_deref().unwrap().contains("bad gateway"));

    assert_eq!(helpers::drain_queue(&services.background_worker).await, 2);
    let job = services
        .job_repository
        .get_by_id(record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 3);

    let chapter = services
        .novel_service
        .get_chapter(READER, chapter_id)
        .await
        .unwrap();
    assert_eq!(chapter.translation_status, TranslationStatus::Failed);

    let stats = services.background_worker.get_statistics().await.unwrap();
    assert_eq!(stats.jobs_processed, 3);
    assert_eq!(stats.jobs_failed, 3);
    assert_eq!(stats.failed_jobs, 1);
}

#[tokio::test]
async fn missing_chapter_fails_without_retry() {
    let services = helpers::build_test_services(helpers::with_translator(
        helpers::echo_translator(),
    ));
    seed_chapters(&services, 1).await;
    let record = services
        .background_worker
        .enqueue(chapter_job(4242, PRIORITY_NORMAL))
        .await
        .unwrap();

    assert_eq!(helpers::drain_queue(&services.background_worker).await, 1);

    let job = services
        .job_repository
        .get_by_id(record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 1);
}

#[tokio::test]
async fn malformed_payload_fails_without_retry() {
    let services = helpers::build_test_services(None);
    let mut job = Job::translate_chapter_title(READER, 1, PRIORITY_NORMAL).unwrap();
    job.payload = serde_json::json!({ "user_id": READER });
    let record = services.background_worker.enqueue(job).await.unwrap();

    assert_eq!(helpers::drain_queue(&services.background_worker).await, 1);

    let job = services
        .job_repository
        .get_by_id(record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("payload"));
}

// ================================================================================================
// TIME LIMIT TESTS
// ================================================================================================

#[tokio::test]
async fn timed_out_chapter_job_marks_chapter_failed() {
    let config = JobQueueConfig {
        task_time_limit: Duration::from_millis(200),
        task_soft_time_limit: Duration::from_millis(100),
        max_attempts: 1,
        ..helpers::test_queue_config()
    };
    let services = helpers::build_test_services_with_config(
        helpers::with_translator(helpers::StalledTranslator),
        config,
    );
    let chapter_id = seed_chapters(&services, 1).await[0];
    let record = services
        .background_worker
        .enqueue(chapter_job(chapter_id, PRIORITY_NORMAL))
        .await
        .unwrap();

    assert!(services.background_worker.process_next_job().await.unwrap());

    let job = services
        .job_repository
        .get_by_id(record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("time limit"));

    let chapter = services
        .novel_service
        .get_chapter(READER, chapter_id)
        .await
        .unwrap();
    assert_eq!(chapter.translation_status, TranslationStatus::Failed);
}

// ================================================================================================
// LIFECYCLE TESTS
// ================================================================================================

#[tokio::test]
async fn running_worker_drains_queue_and_stops() {
    let services = helpers::build_test_services(helpers::with_translator(
        helpers::echo_translator(),
    ));
    let ids = seed_chapters(&services, 3).await;
    for id in &ids {
        services
            .background_worker
            .enqueue(chapter_job(*id, PRIORITY_NORMAL))
            .await
            .unwrap();
    }

    let worker = Arc::clone(&services.background_worker);
    let handle = tokio::spawn(Arc::clone(&worker).run());

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let stats = worker.get_statistics().await.unwrap();
            if stats.completed_jobs == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "worker should drain the queue");

    worker.stop().await;
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker should stop")
        .unwrap();
    assert!(!worker.get_statistics().await.unwrap().is_running);
}

#[tokio::test]
async fn cancelled_job_is_not_processed() {
    let services = helpers::build_test_services(helpers::with_translator(
        helpers::echo_translator(),
    ));
    let chapter_id = seed_chapters(&services, 1).await[0];
    let record = services
        .background_worker
        .enqueue(chapter_job(chapter_id, PRIORITY_NORMAL))
        .await
        .unwrap();

    assert!(services.job_repository.cancel(record.id).await.unwrap());
    assert!(!services.background_worker.process_next_job().await.unwrap());

    let chapter = services
        .novel_service
        .get_chapter(READER, chapter_id)
        .await
        .unwrap();
    assert_eq!(chapter.translation_status, TranslationStatus::Pending);
}
