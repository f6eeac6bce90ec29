/// Test data factories using builder pattern
use lunafrost_lib::modules::novel::{
    Glossary, GlossaryEntry, NewChapter, NewNovel, PronounHint,
};

pub const READER: &str = "reader-1";

pub struct NovelFactory {
    novel: NewNovel,
}

impl NovelFactory {
    pub fn minimal(slug: &str) -> Self {
        Self {
            novel: NewNovel::new(slug, "전지적 독자 시점"),
        }
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.novel = self.novel.with_author(author);
        self
    }

    pub fn with_hero_glossary(mut self) -> Self {
        let mut glossary = Glossary::new();
        glossary.insert(
            "1",
            GlossaryEntry {
                korean_name: "김독자".to_string(),
                english_name: "Kim Dokja".to_string(),
                gender: Some(PronounHint::Male),
            },
        );
        self.novel = self.novel.with_glossary(glossary);
        self
    }

    pub fn with_prompt_suffix(mut self, suffix: &str) -> Self {
        self.novel.custom_prompt_suffix = Some(suffix.to_string());
        self
    }

    pub fn build(self) -> NewNovel {
        self.novel
    }
}

/// Chapter imported from a viewer page with the given episode id
pub fn episode_chapter(episode_id: i64) -> NewChapter {
    NewChapter::new(format!("episode-{}", episode_id))
        .with_title(format!("{}화", episode_id))
        .with_content("그는 책을 펼쳤다.\n\n김독자는 웃었다.")
        .with_source_url(format!("https://novel.example.com/viewer/{}", episode_id))
}

/// Chapter without a source url, ordered by its label only
pub fn numbered_chapter(slug: &str, number: &str) -> NewChapter {
    NewChapter::new(slug)
        .with_title(format!("Chapter {}", number))
        .with_chapter_number(number)
        .with_content("본문")
}
