use std::sync::Arc;

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use tokio::task;

use super::models::{
    ChapterChangeset, ChapterRow, NewChapterRow, NewNovelRow, NovelChangeset, NovelRow,
};
use crate::modules::novel::domain::{
    entities::{Chapter, ChapterChanges, NewChapter, NewNovel, Novel, NovelChanges},
    repositories::{ChapterStore, NovelRepository},
    services::{add_chapter_atomic, remove_chapter_atomic, verify_order, ChapterInsertOutcome, OrderReport},
};
use crate::schema::{chapters, novels, translation_token_usage};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::TimedOperation;
use crate::shared::Database;
use crate::log_debug;

/// [`ChapterStore`] over an open Postgres transaction.
///
/// Every statement is sent immediately, so each `update_positions` call is
/// checked against `idx_chapters_novel_position` before the next one runs.
pub struct PgChapterStore<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> PgChapterStore<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }
}

impl ChapterStore for PgChapterStore<'_> {
    fn lock_novel_for_update(
        &mut self,
        user_id: &str,
        novel_slug: &str,
    ) -> AppResult<Option<Novel>> {
        let row = novels::table
            .filter(novels::user_id.eq(user_id))
            .filter(novels::slug.eq(novel_slug))
            .select(NovelRow::as_select())
            .for_update()
            .first::<NovelRow>(self.conn)
            .optional()?;
        Ok(row.map(Novel::from))
    }

    fn find_chapter_by_source_url(
        &mut self,
        novel_id: i32,
        source_url: &str,
    ) -> AppResult<Option<Chapter>> {
        let row = chapters::table
            .filter(chapters::novel_id.eq(novel_id))
            .filter(chapters::source_url.eq(source_url))
            .select(ChapterRow::as_select())
            .first::<ChapterRow>(self.conn)
            .optional()?;
        Ok(row.map(Chapter::from))
    }

    fn list_chapters_by_position(&mut self, novel_id: i32) -> AppResult<Vec<Chapter>> {
        let rows = chapters::table
            .filter(chapters::novel_id.eq(novel_id))
            .order(chapters::position.asc())
            .select(ChapterRow::as_select())
            .load::<ChapterRow>(self.conn)?;
        Ok(rows.into_iter().map(Chapter::from).collect())
    }

    fn update_positions(&mut self, novel_id: i32, moves: &[(i32, i32)]) -> AppResult<()> {
        for &(chapter_id, position) in moves {
            diesel::update(
                chapters::table
                    .filter(chapters::id.eq(chapter_id))
                    .filter(chapters::novel_id.eq(novel_id)),
            )
            .set(chapters::position.eq(position))
            .execute(self.conn)?;
        }
        Ok(())
    }

    fn insert_chapter(
        &mut self,
        novel_id: i32,
        chapter: &NewChapter,
        position: i32,
    ) -> AppResult<Chapter> {
        let row = diesel::insert_into(chapters::table)
            .values(&NewChapterRow::from_domain(novel_id, chapter, position))
            .returning(ChapterRow::as_returning())
            .get_result::<ChapterRow>(self.conn)?;
        Ok(row.into())
    }

    fn delete_chapter(&mut self, novel_id: i32, chapter_id: i32) -> AppResult<bool> {
        diesel::delete(
            translation_token_usage::table.filter(translation_token_usage::chapter_id.eq(chapter_id)),
        )
        .execute(self.conn)?;

        let deleted = diesel::delete(
            chapters::table
                .filter(chapters::id.eq(chapter_id))
                .filter(chapters::novel_id.eq(novel_id)),
        )
        .execute(self.conn)?;
        Ok(deleted > 0)
    }
}

pub struct NovelRepositoryImpl {
    db: Arc<Database>,
}

impl NovelRepositoryImpl {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn find_novel_row(
        conn: &mut PgConnection,
        user_id: &str,
        novel_slug: &str,
    ) -> AppResult<Option<NovelRow>> {
        Ok(novels::table
            .filter(novels::user_id.eq(user_id))
            .filter(novels::slug.eq(novel_slug))
            .select(NovelRow::as_select())
            .first::<NovelRow>(conn)
            .optional()?)
    }

    fn require_novel_row(
        conn: &mut PgConnection,
        user_id: &str,
        novel_slug: &str,
    ) -> AppResult<NovelRow> {
        Self::find_novel_row(conn, user_id, novel_slug)?
            .ok_or_else(|| AppError::NotFound(format!("Novel '{}' not found", novel_slug)))
    }

    /// Chapter row together with the slug of its novel, scoped to the owner
    fn find_owned_chapter(
        conn: &mut PgConnection,
        user_id: &str,
        chapter_id: i32,
    ) -> AppResult<Option<(ChapterRow, String)>> {
        Ok(chapters::table
            .inner_join(novels::table)
            .filter(chapters::id.eq(chapter_id))
            .filter(novels::user_id.eq(user_id))
            .select((ChapterRow::as_select(), novels::slug))
            .first::<(ChapterRow, String)>(conn)
            .optional()?)
    }
}

#[async_trait]
impl NovelRepository for NovelRepositoryImpl {
    async fn create_novel(&self, user_id: &str, novel: &NewNovel) -> AppResult<Novel> {
        let db = Arc::clone(&self.db);
        let row = NewNovelRow::from_domain(user_id, novel);

        let saved = task::spawn_blocking(move || -> AppResult<NovelRow> {
            let mut conn = db.get_connection()?;
            conn.transaction::<_, AppError, _>(|conn| {
                if Self::find_novel_row(conn, &row.user_id, &row.slug)?.is_some() {
                    return Err(AppError::ValidationError(format!(
                        "Novel with slug '{}' already exists",
                        row.slug
                    )));
                }

                Ok(diesel::insert_into(novels::table)
                    .values(&row)
                    .returning(NovelRow::as_returning())
                    .get_result::<NovelRow>(conn)?)
            })
        })
        .await??;

        log_debug!("Created novel '{}' for {}", saved.slug, saved.user_id);
        Ok(saved.into())
    }

    async fn get_novel(&self, user_id: &str, novel_slug: &str) -> AppResult<Option<Novel>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let novel_slug = novel_slug.to_string();

        let row = task::spawn_blocking(move || -> AppResult<Option<NovelRow>> {
            let mut conn = db.get_connection()?;
            Self::find_novel_row(&mut conn, &user_id, &novel_slug)
        })
        .await??;

        Ok(row.map(Novel::from))
    }

    async fn list_user_novels(&self, user_id: &str) -> AppResult<Vec<Novel>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        let rows = task::spawn_blocking(move || -> AppResult<Vec<NovelRow>> {
            let mut conn = db.get_connection()?;
            Ok(novels::table
                .filter(novels::user_id.eq(&user_id))
                .order((novels::created_at.desc(), novels::id.desc()))
                .select(NovelRow::as_select())
                .load::<NovelRow>(&mut conn)?)
        })
        .await??;

        Ok(rows.into_iter().map(Novel::from).collect())
    }

    async fn update_novel(
        &self,
        user_id: &str,
        novel_slug: &str,
        changes: &NovelChanges,
    ) -> AppResult<Novel> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let novel_slug = novel_slug.to_string();
        let changeset = NovelChangeset::from(changes);

        let row = task::spawn_blocking(move || -> AppResult<NovelRow> {
            let mut conn = db.get_connection()?;
            conn.transaction::<_, AppError, _>(|conn| {
                let current = Self::require_novel_row(conn, &user_id, &novel_slug)?;

                if let Some(new_slug) = changeset.slug.as_deref() {
                    if new_slug != current.slug
                        && Self::find_novel_row(conn, &user_id, new_slug)?.is_some()
                    {
                        return Err(AppError::ValidationError(format!(
                            "Novel with slug '{}' already exists",
                            new_slug
                        )));
                    }
                }

                Ok(diesel::update(novels::table.filter(novels::id.eq(current.id)))
                    .set(&changeset)
                    .returning(NovelRow::as_returning())
                    .get_result::<NovelRow>(conn)?)
            })
        })
        .await??;

        Ok(row.into())
    }

    async fn delete_novel(&self, user_id: &str, novel_slug: &str) -> AppResult<bool> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let novel_slug = novel_slug.to_string();

        task::spawn_blocking(move || -> AppResult<bool> {
            let mut conn = db.get_connection()?;
            conn.transaction::<_, AppError, _>(|conn| {
                let Some(novel) = Self::find_novel_row(conn, &user_id, &novel_slug)? else {
                    return Ok(false);
                };

                let chapter_ids = chapters::table
                    .filter(chapters::novel_id.eq(novel.id))
                    .select(chapters::id);

                let usage = diesel::delete(
                    translation_token_usage::table
                        .filter(translation_token_usage::chapter_id.eq_any(chapter_ids)),
                )
                .execute(conn)?;
                let chapter_count =
                    diesel::delete(chapters::table.filter(chapters::novel_id.eq(novel.id)))
                        .execute(conn)?;
                diesel::delete(novels::table.filter(novels::id.eq(novel.id))).execute(conn)?;

                log_debug!(
                    "Deleted novel '{}' with {} chapters and {} usage records",
                    novel.slug,
                    chapter_count,
                    usage
                );
                Ok(true)
            })
        })
        .await?
    }

    async fn find_novel_by_source_url(
        &self,
        user_id: &str,
        source_url: &str,
    ) -> AppResult<Option<Novel>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let source_url = source_url.to_string();

        let row = task::spawn_blocking(move || -> AppResult<Option<NovelRow>> {
            let mut conn = db.get_connection()?;
            Ok(novels::table
                .filter(novels::user_id.eq(&user_id))
                .filter(novels::source_url.eq(&source_url))
                .select(NovelRow::as_select())
                .first::<NovelRow>(&mut conn)
                .optional()?)
        })
        .await??;

        Ok(row.map(Novel::from))
    }

    async fn find_novel_by_title(&self, user_id: &str, title: &str) -> AppResult<Option<Novel>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let title = title.to_string();

        let row = task::spawn_blocking(move || -> AppResult<Option<NovelRow>> {
            let mut conn = db.get_connection()?;
            Ok(novels::table
                .filter(novels::user_id.eq(&user_id))
                .filter(
                    novels::title
                        .eq(&title)
                        .or(novels::original_title.eq(&title))
                        .or(novels::translated_title.eq(&title)),
                )
                .order(novels::id.asc())
                .select(NovelRow::as_select())
                .first::<NovelRow>(&mut conn)
                .optional()?)
        })
        .await??;

        Ok(row.map(Novel::from))
    }

    async fn get_next_chapter_position(&self, user_id: &str, novel_slug: &str) -> AppResult<i32> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let novel_slug = novel_slug.to_string();

        task::spawn_blocking(move || -> AppResult<i32> {
            let mut conn = db.get_connection()?;
            let novel = Self::require_novel_row(&mut conn, &user_id, &novel_slug)?;
            let max_position = chapters::table
                .filter(chapters::novel_id.eq(novel.id))
                .select(diesel::dsl::max(chapters::position))
                .first::<Option<i32>>(&mut conn)?;
            Ok(max_position.map_or(0, |p| p + 1))
        })
        .await?
    }

    async fn add_chapter_atomic(
        &self,
        user_id: &str,
        novel_slug: &str,
        chapter: &NewChapter,
    ) -> AppResult<ChapterInsertOutcome> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let novel_slug = novel_slug.to_string();
        let chapter = chapter.clone();

        task::spawn_blocking(move || -> AppResult<ChapterInsertOutcome> {
            let timer = TimedOperation::new("add_chapter_atomic");
            let mut conn = db.get_connection()?;
            let outcome = conn.transaction::<_, AppError, _>(|conn| {
                let mut store = PgChapterStore::new(conn);
                add_chapter_atomic(&mut store, &user_id, &novel_slug, &chapter)
            })?;
            timer.finish_with_info(if outcome.already_exists {
                "skipped"
            } else {
                "inserted"
            });
            Ok(outcome)
        })
        .await?
    }

    async fn list_chapters(&self, user_id: &str, novel_slug: &str) -> AppResult<Vec<Chapter>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let novel_slug = novel_slug.to_string();

        let rows = task::spawn_blocking(move || -> AppResult<Vec<ChapterRow>> {
            let mut conn = db.get_connection()?;
            let Some(novel) = Self::find_novel_row(&mut conn, &user_id, &novel_slug)? else {
                return Ok(Vec::new());
            };
            Ok(chapters::table
                .filter(chapters::novel_id.eq(novel.id))
                .order(chapters::position.asc())
                .select(ChapterRow::as_select())
                .load::<ChapterRow>(&mut conn)?)
        })
        .await??;

        Ok(rows.into_iter().map(Chapter::from).collect())
    }

    async fn get_chapter(&self, user_id: &str, chapter_id: i32) -> AppResult<Option<Chapter>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        let row = task::spawn_blocking(move || -> AppResult<Option<(ChapterRow, String)>> {
            let mut conn = db.get_connection()?;
            Self::find_owned_chapter(&mut conn, &user_id, chapter_id)
        })
        .await??;

        Ok(row.map(|(chapter, _)| chapter.into()))
    }

    async fn update_chapter(
        &self,
        user_id: &str,
        chapter_id: i32,
        changes: &ChapterChanges,
    ) -> AppResult<Chapter> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let changeset = ChapterChangeset::from(changes);

        let row = task::spawn_blocking(move || -> AppResult<ChapterRow> {
            let mut conn = db.get_connection()?;
            conn.transaction::<_, AppError, _>(|conn| {
                if Self::find_owned_chapter(conn, &user_id, chapter_id)?.is_none() {
                    return Err(AppError::NotFound(format!(
                        "Chapter {} not found",
                        chapter_id
                    )));
                }

                Ok(diesel::update(chapters::table.filter(chapters::id.eq(chapter_id)))
                    .set(&changeset)
                    .returning(ChapterRow::as_returning())
                    .get_result::<ChapterRow>(conn)?)
            })
        })
        .await??;

        Ok(row.into())
    }

    async fn delete_chapter(&self, user_id: &str, chapter_id: i32) -> AppResult<bool> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> AppResult<bool> {
            let mut conn = db.get_connection()?;
            conn.transaction::<_, AppError, _>(|conn| {
                let Some((_, novel_slug)) = Self::find_owned_chapter(conn, &user_id, chapter_id)?
                else {
                    return Ok(false);
                };
                let mut store = PgChapterStore::new(conn);
                remove_chapter_atomic(&mut store, &user_id, &novel_slug, chapter_id)
            })
        })
        .await?
    }

    async fn diagnose_chapter_order(
        &self,
        user_id: &str,
        novel_slug: &str,
    ) -> AppResult<OrderReport> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let novel_slug = novel_slug.to_string();

        task::spawn_blocking(move || -> AppResult<OrderReport> {
            let mut conn = db.get_connection()?;
            let novel = Self::require_novel_row(&mut conn, &user_id, &novel_slug)?;
            let chapters = PgChapterStore::new(&mut conn).list_chapters_by_position(novel.id)?;
            Ok(verify_order(&chapters))
        })
        .await?
    }
}
