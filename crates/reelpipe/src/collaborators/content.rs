use async_trait::async_trait;
use chrono::Local;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::StageError;
use crate::job::Job;

/// Title, description and hashtags for one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedMetadata {
    pub title: String,
    pub description: String,
    pub hashtags: Vec<String>,
}

impl GeneratedMetadata {
    /// Hashtags in the single-string form stored on the job.
    pub fn hashtag_line(&self) -> String {
        self.hashtags.join(" ")
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, job: &Job) -> Result<GeneratedMetadata, StageError>;

    /// Text to show as captions on the clip.
    async fn caption_text(&self, job: &Job) -> Result<String, StageError>;
}

const TITLE_WORDS: usize = 10;
const TITLE_MAX_CHARS: usize = 90;

const TITLE_TEMPLATES: &[&str] = &[
    "Must Watch! Amazing Content",
    "You Won't Believe This!",
    "Incredible Moment Caught on Camera",
    "This Changed Everything",
    "The Best Thing You'll See Today",
];

const BASE_TAGS: &[&str] = &["#Shorts", "#Viral", "#Trending"];

const OPTIONAL_TAGS: &[&str] = &[
    "#Amazing",
    "#MustWatch",
    "#Incredible",
    "#Awesome",
    "#Epic",
    "#Unbelievable",
    "#Content",
    "#Video",
    "#Entertainment",
];

const CALL_TO_ACTION: &str =
    "Thanks for watching! Don't forget to like and subscribe for more content.";

/// Template-based generator. Uses the idea text when the job has one.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateContentGenerator;

impl TemplateContentGenerator {
    pub fn title(&self, job: &Job) -> String {
        match job.source_idea.as_deref() {
            Some(idea) => idea_title(idea),
            None => TITLE_TEMPLATES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(TITLE_TEMPLATES[0])
                .to_string(),
        }
    }

    pub fn description(&self, job: &Job) -> String {
        let mut description = String::new();
        if let Some(idea) = &job.source_idea {
            description.push_str(idea);
            description.push_str("\n\n");
        }
        description.push_str(CALL_TO_ACTION);
        description.push_str("\n\n");
        description.push_str(&BASE_TAGS.join(" "));
        description.push_str(&format!(
            "\n\nGenerated: {}",
            Local::now().format("%Y-%m-%d")
        ));
        description
    }

    /// The base tags followed by two or three random optional ones.
    pub fn hashtags(&self) -> Vec<String> {
        let mut rng = rand::thread_rng();
        let extra = rng.gen_range(2..=3);
        BASE_TAGS
            .iter()
            .chain(OPTIONAL_TAGS.choose_multiple(&mut rng, extra))
            .map(|tag| tag.to_string())
            .collect()
    }
}

fn idea_title(idea: &str) -> String {
    let title = idea
        .split_whitespace()
        .take(TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    if title.chars().count() > TITLE_MAX_CHARS {
        let cut: String = title.chars().take(TITLE_MAX_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        title
    }
}

#[async_trait]
impl ContentGenerator for TemplateContentGenerator {
    async fn generate(&self, job: &Job) -> Result<GeneratedMetadata, StageError> {
        Ok(GeneratedMetadata {
            title: self.title(job),
            description: self.description(job),
            hashtags: self.hashtags(),
        })
    }

    async fn caption_text(&self, job: &Job) -> Result<String, StageError> {
        Ok(match &job.source_idea {
            Some(idea) => {
                let head: String = idea.chars().take(50).collect();
                format!("Check out this amazing content! {}", head)
            }
            None => "Amazing content coming your way!".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;

    fn sample_job() -> Job {
        Job::sample(1, JobState::Metadata)
    }

    #[test]
    fn test_idea_title_takes_first_ten_words() {
        let title = idea_title("one two three four five six seven eight nine ten eleven twelve");
        assert_eq!(title, "one two three four five six seven eight nine ten");
    }

    #[test]
    fn test_idea_title_truncates_long_words() {
        let long_word = "x".repeat(120);
        let title = idea_title(&long_word);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_template_title_without_idea() {
        let title = TemplateContentGenerator.title(&sample_job());
        assert!(TITLE_TEMPLATES.contains(&title.as_str()));
    }

    #[test]
    fn test_hashtags_have_base_and_two_or_three_extra() {
        for _ in 0..20 {
            let tags = TemplateContentGenerator.hashtags();
            assert_eq!(&tags[..3], &["#Shorts", "#Viral", "#Trending"]);
            assert!(tags.len() == 5 || tags.len() == 6);
            let mut extras = tags[3..].to_vec();
            extras.sort();
            extras.dedup();
            assert_eq!(extras.len(), tags.len() - 3);
        }
    }

    #[tokio::test]
    async fn test_generate_uses_idea() {
        let mut job = sample_job();
        job.source_idea = Some("Quick recipe for busy people".to_string());

        let meta = TemplateContentGenerator.generate(&job).await.unwrap();
        assert_eq!(meta.title, "Quick recipe for busy people");
        assert!(meta.description.starts_with("Quick recipe for busy people\n\n"));
        assert!(meta.description.contains(CALL_TO_ACTION));
        assert!(meta.hashtag_line().starts_with("#Shorts #Viral #Trending"));

        let caption = TemplateContentGenerator.caption_text(&job).await.unwrap();
        assert_eq!(caption, "Check out this amazing content! Quick recipe for busy people");
    }
}
