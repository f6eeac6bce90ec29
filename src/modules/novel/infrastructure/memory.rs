/// In-process store with the same transactional behaviour as the Postgres
/// repository, for tests and local development.
///
/// A transaction takes the per-novel lock, works on a staged copy of that
/// novel's chapters and publishes position changes and inserts only on
/// commit. Dropping an uncommitted transaction discards the staged work.
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::OwnedMutexGuard;
use tokio::task;

use crate::modules::novel::domain::{
    entities::{Chapter, ChapterChanges, NewChapter, NewNovel, Novel, NovelChanges},
    repositories::{ChapterStore, NovelRepository},
    services::{add_chapter_atomic, remove_chapter_atomic, verify_order, ChapterInsertOutcome, OrderReport},
};
use crate::modules::translation::domain::TokenUsage;
use crate::shared::errors::{AppError, AppResult};
use crate::log_debug;

const POSITION_CONSTRAINT: &str = "idx_chapters_novel_position";
const SLUG_CONSTRAINT: &str = "idx_chapters_novel_slug";

/// Committed rows
#[derive(Debug, Default)]
pub struct MemoryTables {
    pub novels: BTreeMap<i32, Novel>,
    pub chapters: BTreeMap<i32, Chapter>,
    pub token_usage: Vec<TokenUsage>,
}

impl MemoryTables {
    fn find_novel(&self, user_id: &str, novel_slug: &str) -> Option<&Novel> {
        self.novels
            .values()
            .find(|n| n.user_id == user_id && n.slug == novel_slug)
    }

    fn chapters_of(&self, novel_id: i32) -> Vec<Chapter> {
        let mut rows: Vec<Chapter> = self
            .chapters
            .values()
            .filter(|c| c.novel_id == novel_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.position);
        rows
    }

    /// Chapter if its novel belongs to `user_id`
    pub fn owned_chapter(&self, user_id: &str, chapter_id: i32) -> Option<&Chapter> {
        self.chapters.get(&chapter_id).filter(|c| {
            self.novels
                .get(&c.novel_id)
                .map_or(false, |n| n.user_id == user_id)
        })
    }

    fn remove_chapter(&mut self, chapter_id: i32) {
        self.chapters.remove(&chapter_id);
        self.token_usage.retain(|u| u.chapter_id != chapter_id);
    }
}

pub struct MemoryDatabase {
    tables: Mutex<MemoryTables>,
    novel_locks: DashMap<i32, Arc<tokio::sync::Mutex<()>>>,
    next_novel_id: AtomicI32,
    next_chapter_id: AtomicI32,
    next_usage_id: AtomicI32,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self {
            tables: Mutex::new(MemoryTables::default()),
            novel_locks: DashMap::new(),
            next_novel_id: AtomicI32::new(1),
            next_chapter_id: AtomicI32::new(1),
            next_usage_id: AtomicI32::new(1),
        }
    }
}

impl MemoryDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn tables(&self) -> AppResult<MutexGuard<'_, MemoryTables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::InternalError("In-memory tables are poisoned".to_string()))
    }

    pub fn next_usage_id(&self) -> i32 {
        self.next_usage_id.fetch_add(1, Ordering::SeqCst)
    }

    fn novel_lock(&self, novel_id: i32) -> Arc<tokio::sync::Mutex<()>> {
        self.novel_locks
            .entry(novel_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Start a transaction; it rolls back unless [`MemoryTransaction::commit`] is called.
    ///
    /// Blocks the calling thread while another transaction holds the novel
    /// lock, so async callers must run it on the blocking pool.
    pub fn begin(&self) -> MemoryTransaction<'_> {
        MemoryTransaction {
            db: self,
            guard: None,
            novel_id: None,
            staged: Vec::new(),
            inserted: HashSet::new(),
            deleted: Vec::new(),
        }
    }

    /// Run `f` in a transaction, committing when it succeeds
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut MemoryTransaction<'_>) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut tx = self.begin();
        let value = f(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// One open transaction against a [`MemoryDatabase`]
pub struct MemoryTransaction<'a> {
    db: &'a MemoryDatabase,
    guard: Option<OwnedMutexGuard<()>>,
    novel_id: Option<i32>,
    staged: Vec<Chapter>,
    inserted: HashSet<i32>,
    deleted: Vec<i32>,
}

impl MemoryTransaction<'_> {
    fn locked_novel(&self, novel_id: i32) -> AppResult<()> {
        match self.novel_id {
            Some(id) if id == novel_id => Ok(()),
            _ => Err(AppError::InternalError(format!(
                "Novel {} is not locked by this transaction",
                novel_id
            ))),
        }
    }

    fn check_unique(&self) -> AppResult<()> {
        let mut positions = HashSet::new();
        let mut slugs = HashSet::new();
        for chapter in &self.staged {
            if !positions.insert(chapter.position) {
                return Err(unique_violation(POSITION_CONSTRAINT));
            }
            if !slugs.insert(chapter.slug.as_str()) {
                return Err(unique_violation(SLUG_CONSTRAINT));
            }
        }
        Ok(())
    }

    /// Publish staged changes and release the novel lock
    pub fn commit(self) -> AppResult<()> {
        if self.novel_id.is_none() {
            return Ok(());
        }

        let mut tables = self.db.tables()?;
        for chapter_id in &self.deleted {
            tables.remove_chapter(*chapter_id);
        }
        for chapter in &self.staged {
            if self.inserted.contains(&chapter.id) {
                tables.chapters.insert(chapter.id, chapter.clone());
            } else if let Some(row) = tables.chapters.get_mut(&chapter.id) {
                if row.position != chapter.position {
                    row.position = chapter.position;
                    row.updated_at = Utc::now();
                }
            }
        }
        Ok(())
    }
}

impl ChapterStore for MemoryTransaction<'_> {
    fn lock_novel_for_update(
        &mut self,
        user_id: &str,
        novel_slug: &str,
    ) -> AppResult<Option<Novel>> {
        let Some(novel_id) = self.db.tables()?.find_novel(user_id, novel_slug).map(|n| n.id) else {
            return Ok(None);
        };

        if self.novel_id == Some(novel_id) {
            return Ok(self.db.tables()?.novels.get(&novel_id).cloned());
        }
        if self.novel_id.is_some() {
            return Err(AppError::InternalError(
                "A transaction can lock only one novel".to_string(),
            ));
        }

        let guard = self.db.novel_lock(novel_id).blocking_lock_owned();

        // The novel may have been renamed or deleted while we waited.
        let tables = self.db.tables()?;
        let Some(novel) = tables
            .novels
            .get(&novel_id)
            .filter(|n| n.user_id == user_id && n.slug == novel_slug)
            .cloned()
        else {
            return Ok(None);
        };

        self.staged = tables.chapters_of(novel_id);
        self.novel_id = Some(novel_id);
        self.guard = Some(guard);
        Ok(Some(novel))
    }

    fn find_chapter_by_source_url(
        &mut self,
        novel_id: i32,
        source_url: &str,
    ) -> AppResult<Option<Chapter>> {
        self.locked_novel(novel_id)?;
        Ok(self
            .staged
            .iter()
            .find(|c| c.source_url.as_deref() == Some(source_url))
            .cloned())
    }

    fn list_chapters_by_position(&mut self, novel_id: i32) -> AppResult<Vec<Chapter>> {
        self.locked_novel(novel_id)?;
        let mut rows = self.staged.clone();
        rows.sort_by_key(|c| c.position);
        Ok(rows)
    }

    fn update_positions(&mut self, novel_id: i32, moves: &[(i32, i32)]) -> AppResult<()> {
        self.locked_novel(novel_id)?;
        for &(chapter_id, position) in moves {
            if let Some(chapter) = self.staged.iter_mut().find(|c| c.id == chapter_id) {
                chapter.position = position;
            }
        }
        self.check_unique()
    }

    fn insert_chapter(
        &mut self,
        novel_id: i32,
        chapter: &NewChapter,
        position: i32,
    ) -> AppResult<Chapter> {
        self.locked_novel(novel_id)?;
        let id = self.db.next_chapter_id.fetch_add(1, Ordering::SeqCst);
        let row = Chapter::from_new(id, novel_id, chapter, position);
        self.staged.push(row.clone());
        self.inserted.insert(id);
        self.check_unique()?;
        Ok(row)
    }

    fn delete_chapter(&mut self, novel_id: i32, chapter_id: i32) -> AppResult<bool> {
        self.locked_novel(novel_id)?;
        let before = self.staged.len();
        self.staged.retain(|c| c.id != chapter_id);
        if self.staged.len() == before {
            return Ok(false);
        }
        if !self.inserted.remove(&chapter_id) {
            self.deleted.push(chapter_id);
        }
        Ok(true)
    }
}

fn unique_violation(constraint: &str) -> AppError {
    AppError::DatabaseError(format!(
        "duplicate key value violates unique constraint \"{}\"",
        constraint
    ))
}

/// [`NovelRepository`] backed by a [`MemoryDatabase`]
#[derive(Clone)]
pub struct InMemoryNovelRepository {
    db: Arc<MemoryDatabase>,
}

impl InMemoryNovelRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> Arc<MemoryDatabase> {
        Arc::clone(&self.db)
    }
}

#[async_trait]
impl NovelRepository for InMemoryNovelRepository {
    async fn create_novel(&self, user_id: &str, novel: &NewNovel) -> AppResult<Novel> {
        let mut tables = self.db.tables()?;
        if tables.find_novel(user_id, &novel.slug).is_some() {
            return Err(AppError::ValidationError(format!(
                "Novel with slug '{}' already exists",
                novel.slug
            )));
        }

        let now = Utc::now();
        let row = Novel {
            id: self.db.next_novel_id.fetch_add(1, Ordering::SeqCst),
            user_id: user_id.to_string(),
            slug: novel.slug.clone(),
            title: novel.title.clone(),
            original_title: novel.original_title.clone(),
            translated_title: novel.translated_title.clone(),
            author: novel.author.clone(),
            translated_author: novel.translated_author.clone(),
            cover_url: novel.cover_url.clone(),
            tags: novel.tags.clone(),
            translated_tags: novel.translated_tags.clone(),
            synopsis: novel.synopsis.clone(),
            translated_synopsis: novel.translated_synopsis.clone(),
            glossary: novel.glossary.clone(),
            source_url: novel.source_url.clone(),
            custom_prompt_suffix: novel.custom_prompt_suffix.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.novels.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_novel(&self, user_id: &str, novel_slug: &str) -> AppResult<Option<Novel>> {
        Ok(self.db.tables()?.find_novel(user_id, novel_slug).cloned())
    }

    async fn list_user_novels(&self, user_id: &str) -> AppResult<Vec<Novel>> {
        let mut novels: Vec<Novel> = self
            .db
            .tables()?
            .novels
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        novels.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(novels)
    }

    async fn update_novel(
        &self,
        user_id: &str,
        novel_slug: &str,
        changes: &NovelChanges,
    ) -> AppResult<Novel> {
        let mut tables = self.db.tables()?;
        let novel_id = tables
            .find_novel(user_id, novel_slug)
            .map(|n| n.id)
            .ok_or_else(|| AppError::NotFound(format!("Novel '{}' not found", novel_slug)))?;

        if let Some(new_slug) = changes.slug.as_deref() {
            if new_slug != novel_slug && tables.find_novel(user_id, new_slug).is_some() {
                return Err(AppError::ValidationError(format!(
                    "Novel with slug '{}' already exists",
                    new_slug
                )));
            }
        }

        let novel = tables
            .novels
            .get_mut(&novel_id)
            .ok_or_else(|| AppError::NotFound(format!("Novel '{}' not found", novel_slug)))?;
        changes.apply_to(novel);
        Ok(novel.clone())
    }

    async fn delete_novel(&self, user_id: &str, novel_slug: &str) -> AppResult<bool> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();
        let novel_slug = novel_slug.to_string();

        task::spawn_blocking(move || -> AppResult<bool> {
            let Some(novel_id) = db.tables()?.find_novel(&user_id, &novel_slug).map(|n| n.id)
            else {
                return Ok(false);
            };

            let _guard = db.novel_lock(novel_id).blocking_lock_owned();
            let mut tables = db.tables()?;
            if tables.novels.remove(&novel_id).is_none() {
                return Ok(false);
            }

            let chapter_ids: Vec<i32> = tables
                .chapters
                .values()
                .filter(|c| c.novel_id == novel_id)
                .map(|c| c.id)
                .collect();
            for chapter_id in &chapter_ids {
                tables.remove_chapter(*chapter_id);
            }

            log_debug!(
                "Deleted novel '{}' with {} chapters",
                novel_slug,
                chapter_ids.len()
            );
            Ok(true)
        })
        .await?
    }

    async fn find_novel_by_source_url(
        &self,
        user_id: &str,
        source_url: &str,
    ) -> AppResult<Option<Novel>> {
        Ok(self
            .db
            .tables()?
            .novels
            .values()
            .find(|n| n.user_id == user_id && n.source_url.as_deref() == Some(source_url))
            .cloned())
    }

    async fn find_novel_by_title(&self, user_id: &str, title: &str) -> AppResult<Option<Novel>> {
        Ok(self
            .db
            .tables()?
            .novels
            .values()
            .find(|n| n.user_id == user_id && n.matches_title(title))
            .cloned())
    }

    async fn get_next_chapter_position(&self, user_id: &str, novel_slug: &str) -> AppResult<i32> {
        let tables = self.db.tables()?;
        let novel = tables
            .find_novel(user_id, novel_slug)
            .ok_or_else(|| AppError::NotFound(format!("Novel '{}' not found", novel_slug)))?;
        Ok(tables
            .chapters_of(novel.id)
            .last()
            .map_or(0, |c| c.position + 1))
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

        task::spawn_blocking(move || {
            db.transaction(|tx| add_chapter_atomic(tx, &user_id, &novel_slug, &chapter))
        })
        .await?
    }

    async fn list_chapters(&self, user_id: &str, novel_slug: &str) -> AppResult<Vec<Chapter>> {
        let tables = self.db.tables()?;
        Ok(tables
            .find_novel(user_id, novel_slug)
            .map(|n| tables.chapters_of(n.id))
            .unwrap_or_default())
    }

    async fn get_chapter(&self, user_id: &str, chapter_id: i32) -> AppResult<Option<Chapter>> {
        Ok(self.db.tables()?.owned_chapter(user_id, chapter_id).cloned())
    }

    async fn update_chapter(
        &self,
        user_id: &str,
        chapter_id: i32,
        changes: &ChapterChanges,
    ) -> AppResult<Chapter> {
        let mut tables = self.db.tables()?;
        if tables.owned_chapter(user_id, chapter_id).is_none() {
            return Err(AppError::NotFound(format!("Chapter {} not found", chapter_id)));
        }

        if let Some(slug) = changes.slug.as_deref() {
            let novel_id = tables.chapters[&chapter_id].novel_id;
            let taken = tables
                .chapters
                .values()
                .any(|c| c.novel_id == novel_id && c.id != chapter_id && c.slug == slug);
            if taken {
                return Err(unique_violation(SLUG_CONSTRAINT));
            }
        }

        let chapter = tables
            .chapters
            .get_mut(&chapter_id)
            .ok_or_else(|| AppError::NotFound(format!("Chapter {} not found", chapter_id)))?;
        changes.apply_to(chapter);
        Ok(chapter.clone())
    }

    async fn delete_chapter(&self, user_id: &str, chapter_id: i32) -> AppResult<bool> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> AppResult<bool> {
            let novel_slug = {
                let tables = db.tables()?;
                let Some(chapter) = tables.owned_chapter(&user_id, chapter_id) else {
                    return Ok(false);
                };
                match tables.novels.get(&chapter.novel_id) {
                    Some(novel) => novel.slug.clone(),
                    None => return Ok(false),
                }
            };

            db.transaction(|tx| remove_chapter_atomic(tx, &user_id, &novel_slug, chapter_id))
        })
        .await?
    }

    async fn diagnose_chapter_order(
        &self,
        user_id: &str,
        novel_slug: &str,
    ) -> AppResult<OrderReport> {
        let tables = self.db.tables()?;
        let novel = tables
            .find_novel(user_id, novel_slug)
            .ok_or_else(|| AppError::NotFound(format!("Novel '{}' not found", novel_slug)))?;
        Ok(verify_order(&tables.chapters_of(novel.id)))
    }
}
