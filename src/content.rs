use crate::config::{ContentConfig, ContentSourceType};
use crate::error::{ContentError, Result as AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One question/answer record. Ids are assigned in the data file and are
/// stable; ascending id order is the canonical "unlock next" sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

pub struct QuestionBankParser;

impl QuestionBankParser {
    #[tracing::instrument(skip(content), fields(content.length = content.len()))]
    pub fn parse(content: &str) -> Result<Vec<Question>, ContentError> {
        tracing::debug!("Parsing question bank JSON");

        let mut questions: Vec<Question> = serde_json::from_str(content)
            .map_err(|e| ContentError::Parse(format!("Failed to parse JSON: {}", e)))?;

        questions.sort_by_key(|q| q.id);
        Ok(questions)
    }
}

#[tracing::instrument(skip(config), fields(
    content.source_type = ?config.source_type,
    content.file_path = ?config.file_path,
    content.http_url = ?config.http_url
))]
async fn load_question_bank(config: &ContentConfig) -> Result<Vec<Question>, ContentError> {
    let raw_content = load_raw_content(config).await?;
    let questions = QuestionBankParser::parse(&raw_content)?;

    tracing::info!(questions.count = questions.len(), "Loaded question bank");

    Ok(questions)
}

#[tracing::instrument(skip(config))]
async fn load_raw_content(config: &ContentConfig) -> Result<String, ContentError> {
    match config.source_type {
        ContentSourceType::File => {
            let file_path = config.file_path.as_ref().ok_or_else(|| {
                ContentError::Config("File path required for file source".to_string())
            })?;
            tracing::debug!(file.path = %file_path, "Loading questions from file");
            tokio::fs::read_to_string(file_path)
                .await
                .map_err(|e| ContentError::FileRead {
                    path: file_path.clone(),
                    source: e,
                })
        }
        ContentSourceType::Http => {
            let url = config.http_url.as_ref().ok_or_else(|| {
                ContentError::Config("HTTP URL required for http source".to_string())
            })?;
            tracing::debug!(http.url = %url, "Fetching questions from URL");
            let response = reqwest::get(url).await.map_err(|e| ContentError::HttpFetch {
                url: url.clone(),
                source: e,
            })?;

            response.text().await.map_err(|e| ContentError::HttpFetch {
                url: url.clone(),
                source: e,
            })
        }
    }
}

/// Startup-loaded question bank with an admin-triggered refresh. Readers get
/// an `Arc` snapshot; a refresh swaps the whole bank.
pub struct QuestionBankCache {
    questions: RwLock<Arc<Vec<Question>>>,
    content_config: ContentConfig,
}

impl QuestionBankCache {
    #[tracing::instrument(skip(config), fields(
        content.source_type = ?config.source_type
    ))]
    pub async fn new(config: ContentConfig) -> AppResult<Self> {
        let initial = load_question_bank(&config).await.map_err(|err| {
            tracing::error!(error = %err, "Failed to load required question bank");
            err
        })?;

        tracing::info!(
            questions.count = initial.len(),
            "QuestionBankCache initialized successfully"
        );

        Ok(Self {
            questions: RwLock::new(Arc::new(initial)),
            content_config: config,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> AppResult<()> {
        tracing::info!("Refreshing cached question bank");
        let new_questions = load_question_bank(&self.content_config).await?;

        let mut guard = self.questions.write().await;
        *guard = Arc::new(new_questions);
        tracing::info!(questions.count = guard.len(), "Refreshed question bank");

        Ok(())
    }

    pub async fn questions(&self) -> Arc<Vec<Question>> {
        self.questions.read().await.clone()
    }
}

/// Questions eligible for the Learn and Games views: members of the unlocked
/// set, in ascending id order.
pub fn unlocked_questions(questions: &[Question], unlocked_ids: &BTreeSet<u32>) -> Vec<Question> {
    questions
        .iter()
        .filter(|q| unlocked_ids.contains(&q.id))
        .cloned()
        .collect()
}

/// The first locked question in id order, if any. Drives "unlock next".
pub fn next_locked_id(questions: &[Question], unlocked_ids: &BTreeSet<u32>) -> Option<u32> {
    questions
        .iter()
        .find(|q| !unlocked_ids.contains(&q.id))
        .map(|q| q.id)
}
