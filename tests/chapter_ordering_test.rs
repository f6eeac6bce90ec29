/// Ordered chapter import tests
///
/// Tests cover:
/// - Idempotent import by source url
/// - Dense, unique positions
/// - Episode-id and chapter-number placement
/// - Explicit positions
/// - Concurrent imports into one novel
mod utils;

use futures::future::join_all;
use lunafrost_lib::modules::novel::{NewChapter, NovelService};
use std::sync::Arc;
use utils::factories::{episode_chapter, numbered_chapter, NovelFactory, READER};
use utils::helpers;

async fn novel_with(service: &NovelService, slug: &str, chapters: Vec<NewChapter>) {
    service
        .create_novel(READER, &NovelFactory::minimal(slug).build())
        .await
        .unwrap();
    for chapter in chapters {
        service.add_chapter(READER, slug, chapter).await.unwrap();
    }
}

async fn slugs_in_order(service: &NovelService, slug: &str) -> Vec<String> {
    service
        .list_chapters(READER, slug)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.slug)
        .collect()
}

async fn positions(service: &NovelService, slug: &str) -> Vec<i32> {
    service
        .list_chapters(READER, slug)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.position)
        .collect()
}

// ================================================================================================
// IDEMPOTENCE
// ================================================================================================

#[tokio::test]
async fn importing_same_source_url_twice_is_skipped() {
    let services = helpers::build_test_services(None);
    let service = &services.novel_service;
    novel_with(service, "orv", vec![]).await;

    let first = service
        .add_chapter(READER, "orv", episode_chapter(100))
        .await
        .unwrap();
    let second = service
        .add_chapter(READER, "orv", episode_chapter(100))
        .await
        .unwrap();

    assert!(!first.already_exists);
    assert!(second.already_exists);
    assert!(second.success);
    assert_eq!(first.chapter_id, second.chapter_id);
    assert_eq!(first.chapter_position, second.chapter_position);
    assert_eq!(service.list_chapters(READER, "orv").await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_source_urls_import_as_separate_chapters() {
    let services = helpers::build_test_services(None);
    let service = &services.novel_service;
    novel_with(service, "orv", vec![]).await;

    let first = service
        .add_chapter(READER, "orv", NewChapter::new("a").with_source_url(""))
        .await
        .unwrap();
    let second = service
        .add_chapter(READER, "orv", NewChapter::new("b").with_source_url(""))
        .await
        .unwrap();

    assert!(!first.already_exists);
    assert!(!second.already_exists);
    assert_ne!(first.chapter_id, second.chapter_id);
    assert_eq!(slugs_in_order(service, "orv").await, vec!["a", "b"]);
}

// ================================================================================================
// DENSITY
// ================================================================================================

#[tokio::test]
async fn positions_stay_dense_after_mixed_inserts() {
    let services = helpers::build_test_services(None);
    let service = &services.novel_service;
    novel_with(
        service,
        "orv",
        vec![
            episode_chapter(40),
            episode_chapter(10),
            episode_chapter(30),
            episode_chapter(20),
            episode_chapter(50),
        ],
    )
    .await;

    assert_eq!(positions(service, "orv").await, vec![0, 1, 2, 3, 4]);
    assert_eq!(
        slugs_in_order(service, "orv").await,
        vec!["episode-10", "episode-20", "episode-30", "episode-40", "episode-50"]
    );

    let diagnosis = service.diagnose_chapter_order(READER, "orv").await.unwrap();
    assert!(diagnosis.report.is_consistent());
}

// ================================================================================================
// PLACEMENT
// ================================================================================================

#[tokio::test]
async fn episode_id_inserts_between_neighbours_and_shifts_tail() {
    let services = helpers::build_test_services(None);
    let service = &services.novel_service;
    novel_with(
        service,
        "orv",
        vec![episode_chapter(10), episode_chapter(30), episode_chapter(50)],
    )
    .await;

    let before = service.list_chapters(READER, "orv").await.unwrap();
    let result = service
        .add_chapter(READER, "orv", episode_chapter(25))
        .await
        .unwrap();

    assert_eq!(result.chapter_position, 1);
    let after = service.list_chapters(READER, "orv").await.unwrap();
    assert_eq!(after[0].id, before[0].id);
    assert_eq!(after[2].id, before[1].id);
    assert_eq!(after[3].id, before[2].id);
    assert_eq!(positions(service, "orv").await, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn decimal_chapter_number_lands_between_integers() {
    let services = helpers::build_test_services(None);
    let service = &services.novel_service;
    novel_with(
        service,
        "bonus",
        vec![
            numbered_chapter("one", "1"),
            numbered_chapter("two", "2"),
            numbered_chapter("extra", "BONUS"),
        ],
    )
    .await;

    let result = service
        .add_chapter(READER, "bonus", numbered_chapter("one-half", "1.5"))
        .await
        .unwrap();

    assert_eq!(result.chapter_position, 1);
    assert_eq!(
        slugs_in_order(service, "bonus").await,
        vec!["one", "one-half", "two", "extra"]
    );
}

#[tokio::test]
async fn numbered_chapter_goes_before_bonus_tail() {
    let services = helpers::build_test_services(None);
    let service = &services.novel_service;
    novel_with(
        service,
        "bonus",
        vec![
            numbered_chapter("one", "1"),
            numbered_chapter("two", "2"),
            numbered_chapter("extra", "BONUS"),
        ],
    )
    .await;

    let result = service
        .add_chapter(READER, "bonus", numbered_chapter("five", "5"))
        .await
        .unwrap();

    assert_eq!(result.chapter_position, 2);
    assert_eq!(
        slugs_in_order(service, "bonus").await,
        vec!["one", "two", "five", "extra"]
    );
}

#[tokio::test]
async fn later_episode_appends_without_moving_others() {
    let services = helpers::build_test_services(None);
    let service = &services.novel_service;
    novel_with(service, "orv", vec![episode_chapter(10), episode_chapter(20)]).await;
    let before = service.list_chapters(READER, "orv").await.unwrap();

    let result = service
        .add_chapter(READER, "orv", episode_chapter(30))
        .await
        .unwrap();

    assert_eq!(result.chapter_position, 2);
    let after = service.list_chapters(READER, "orv").await.unwrap();
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(old.id, new.id);
        assert_eq!(old.position, new.position);
    }
}

#[tokio::test]
async fn explicit_position_zero_bypasses_ranking() {
    let services = helpers::build_test_services(None);
    let service = &services.novel_service;
    novel_with(
        service,
        "orv",
        vec![episode_chapter(10), episode_chapter(20), episode_chapter(30)],
    )
    .await;

    let result = service
        .add_chapter(READER, "orv", episode_chapter(99).at_position(0))
        .await
        .unwrap();

    assert_eq!(result.chapter_position, 0);
    assert_eq!(
        slugs_in_order(service, "orv").await,
        vec!["episode-99", "episode-10", "episode-20", "episode-30"]
    );
    assert_eq!(positions(service, "orv").await, vec![0, 1, 2, 3]);
}

// ================================================================================================
// CONCURRENCY
// ================================================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_imports_never_collide() {
    let services = helpers::build_test_services(None);
    let service = Arc::clone(&services.novel_service);
    novel_with(&service, "orv", vec![]).await;

    let episodes: Vec<i64> = vec![17, 3, 11, 19, 5, 13, 1, 7, 15, 9, 2, 20, 8, 14, 6, 18, 4, 12, 10, 16];
    let tasks = episodes.iter().map(|&episode| {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .add_chapter(READER, "orv", episode_chapter(episode))
                .await
        })
    });

    for result in join_all(tasks).await {
        assert!(!result.unwrap().unwrap().already_exists);
    }

    let chapters = service.list_chapters(READER, "orv").await.unwrap();
    let positions: Vec<i32> = chapters.iter().map(|c| c.position).collect();
    let order: Vec<Option<i64>> = chapters.iter().map(|c| c.episode_id()).collect();

    assert_eq!(positions, (0..20).collect::<Vec<_>>());
    assert_eq!(order, (1..=20).map(Some).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_import_once() {
    let services = helpers::build_test_services(None);
    let service = Arc::clone(&services.novel_service);
    novel_with(&service, "orv", vec![]).await;

    let tasks = (0..8).map(|_| {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .add_chapter(READER, "orv", episode_chapter(42))
                .await
        })
    });

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| !r.already_exists).count(), 1);
    assert!(results.iter().all(|r| r.chapter_id == results[0].chapter_id));
    assert_eq!(service.list_chapters(READER, "orv").await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_novels_import_independently() {
    let services = helpers::build_test_services(None);
    let service = Arc::clone(&services.novel_service);
    novel_with(&service, "first", vec![]).await;
    novel_with(&service, "second", vec![]).await;

    let tasks = (1..=10).flat_map(|episode| {
        ["first", "second"].into_iter().map(move |slug| (slug, episode))
    });
    let handles = tasks.map(|(slug, episode)| {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .add_chapter(READER, slug, episode_chapter(episode))
                .await
        })
    });
    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    for slug in ["first", "second"] {
        assert_eq!(positions(&service, slug).await, (0..10).collect::<Vec<_>>());
    }
}
