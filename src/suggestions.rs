//! Example questions offered on an empty conversation.
//!
//! The full list is fetched once and cached in durable storage; every call
//! presents a fresh random sample of it.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::client::ChatBackend;
use crate::error::{Error, Result};
use crate::storage::{EXAMPLE_QUESTIONS_KEY, Storage};
use crate::types::SessionToken;

/// Returns up to `count` example questions in random order.
pub async fn example_questions<B>(
    backend: &B,
    token: Option<&SessionToken>,
    storage: &mut dyn Storage,
    count: usize,
) -> Result<Vec<String>>
where
    B: ChatBackend + ?Sized,
{
    let questions = load_questions(backend, token, storage).await?;
    Ok(sample_questions(questions, count, &mut rand::thread_rng()))
}

async fn load_questions<B>(
    backend: &B,
    token: Option<&SessionToken>,
    storage: &mut dyn Storage,
) -> Result<Vec<String>>
where
    B: ChatBackend + ?Sized,
{
    let Some(token) = token else {
        return Err(Error::not_ready("no session token for fetching examples"));
    };
    match storage.get(EXAMPLE_QUESTIONS_KEY) {
        Ok(Some(cached)) => match serde_json::from_str::<Vec<String>>(&cached) {
            Ok(questions) => return Ok(questions),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable example question cache");
            }
        },
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(error = %err, "could not read example question cache");
        }
    }

    let questions = backend.example_questions(token).await?;
    let encoded = serde_json::to_string(&questions)?;
    if let Err(err) = storage.set(EXAMPLE_QUESTIONS_KEY, &encoded) {
        tracing::warn!(error = %err, "could not cache example questions");
    }
    Ok(questions)
}

/// Shuffles `questions` and keeps the first `count`.
pub fn sample_questions<R: Rng + ?Sized>(
    mut questions: Vec<String>,
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    questions.shuffle(rng);
    questions.truncate(count);
    questions
}
