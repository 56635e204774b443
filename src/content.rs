// 🤖 Generated Content Boundary - Untrusted quiz batches
//
// The quiz bank may be populated by a generative-content service. Its
// output is untrusted input: every row is validated (exactly four options,
// answer index in range, non-negative reward) before anything is persisted,
// and one bad row rejects the whole batch with nothing written.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::model::Quiz;

/// One quiz as delivered by the content generator.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedQuiz {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "answerIndex")]
    pub answer_index: i64,
    pub reward: i64,
}

impl GeneratedQuiz {
    fn validate(&self) -> EngineResult<()> {
        if self.question.trim().is_empty() {
            return Err(EngineError::InvalidContent("empty question".to_string()));
        }
        if self.options.len() != 4 {
            return Err(EngineError::InvalidContent(format!(
                "expected 4 options, got {}",
                self.options.len()
            )));
        }
        if !(1..=4).contains(&self.answer_index) {
            return Err(EngineError::InvalidContent(format!(
                "answer index {} out of range 1-4",
                self.answer_index
            )));
        }
        if self.reward < 0 {
            return Err(EngineError::InvalidContent(format!(
                "negative reward {}",
                self.reward
            )));
        }
        Ok(())
    }
}

/// Parse a generator response body into candidate quizzes.
pub fn parse_batch(json: &str) -> Result<Vec<GeneratedQuiz>> {
    serde_json::from_str(json).context("Failed to parse generated quiz batch")
}

/// Validate a whole batch, then persist it for a session. Validation runs
/// over every row before the first insert, so a bad row leaves the bank
/// untouched.
pub fn import_generated(
    conn: &Connection,
    session_code: &str,
    batch: &[GeneratedQuiz],
) -> EngineResult<Vec<Quiz>> {
    for generated in batch {
        generated.validate()?;
    }

    let mut imported = Vec::with_capacity(batch.len());
    for generated in batch {
        let options: [String; 4] = generated
            .options
            .clone()
            .try_into()
            .map_err(|_| EngineError::InvalidContent("expected 4 options".to_string()))?;

        let quiz = Quiz {
            id: uuid::Uuid::new_v4().to_string(),
            session_code: session_code.to_string(),
            question: generated.question.clone(),
            options,
            answer: generated.answer_index,
            reward: generated.reward,
            usage_count: 0,
        };
        db::insert_quiz(conn, &quiz)
            .map_err(|e| EngineError::InvalidContent(e.to_string()))?;
        imported.push(quiz);
    }

    Ok(imported)
}
