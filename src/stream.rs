//! Assembly of a streamed bot answer.
//!
//! The answer arrives as text chunks appended to a placeholder message that is
//! already in the conversation.  A chunk carrying a completion marker tells the
//! client which id the service assigned to the answer; the placeholder is
//! renumbered to match so later feedback refers to the service's id.

use std::time::Instant;

use futures::StreamExt;

use crate::chunks::{Fragment, split_chunk};
use crate::client::ChunkStream;
use crate::conversation::{Conversation, MessageUpdate};
use crate::error::Result;
use crate::ids::IdGenerator;
use crate::observability::{STREAM_CHUNKS, STREAM_DURATION};
use crate::render::Renderer;
use crate::types::MessageId;

/// What the caller should do with one piece of a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStep {
    /// Text was appended to the answer.
    Text(String),
    /// The service asked for the answer to be renumbered.
    Reassign(MessageId),
}

/// Pure state of one answer being streamed.
///
/// Tracks the accumulated text, the id the answer currently has, and whether a
/// completion marker has been seen.  It does not touch the conversation.
#[derive(Debug)]
pub struct ResponseAssembler {
    active_id: MessageId,
    text: String,
    marker_seen: bool,
    carry: String,
}

impl ResponseAssembler {
    /// Starts assembling the answer held by placeholder `id`.
    pub fn new(id: MessageId) -> Self {
        Self {
            active_id: id,
            text: String::new(),
            marker_seen: false,
            carry: String::new(),
        }
    }

    /// The id the answer currently has in the conversation.
    pub fn active_id(&self) -> MessageId {
        self.active_id
    }

    /// The text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns true once a completion marker has been processed.
    pub fn marker_seen(&self) -> bool {
        self.marker_seen
    }

    /// Feeds one decoded chunk.
    ///
    /// Only the first completion marker yields [`StreamStep::Reassign`]; later
    /// markers are dropped.  A marker split across chunks is held back until
    /// it is complete.
    pub fn push(&mut self, chunk: &str) -> Vec<StreamStep> {
        let joined;
        let chunk = if self.carry.is_empty() {
            chunk
        } else {
            joined = format!("{}{chunk}", std::mem::take(&mut self.carry));
            joined.as_str()
        };
        let mut steps = Vec::new();
        for fragment in split_chunk(chunk) {
            match fragment {
                Fragment::Text(text) => steps.push(self.append(text)),
                Fragment::Done(marker) => {
                    if self.marker_seen {
                        tracing::debug!(message_id = %marker.message_id, "ignoring extra completion marker");
                        continue;
                    }
                    self.marker_seen = true;
                    steps.push(StreamStep::Reassign(marker.message_id));
                }
                Fragment::Partial(partial) => {
                    self.carry = partial;
                }
            }
        }
        steps
    }

    fn append(&mut self, text: String) -> StreamStep {
        self.text.push_str(&text);
        StreamStep::Text(text)
    }

    /// Records that the answer now lives under `id`.
    pub fn rebind(&mut self, id: MessageId) {
        self.active_id = id;
    }

    /// Ends the stream.  A marker that never completed was answer text after
    /// all and is returned for appending.
    pub fn finish(&mut self) -> Option<StreamStep> {
        if self.carry.is_empty() {
            return None;
        }
        let partial = std::mem::take(&mut self.carry);
        tracing::debug!("stream ended inside a completion marker; keeping it as text");
        Some(self.append(partial))
    }
}

/// Drains `chunks` into the conversation.
///
/// Every chunk's text is written to the bot message before the next chunk is
/// requested, and forwarded to `renderer`.  The first completion marker
/// renumbers the message unless its id already belongs to another message.
/// On failure the text rendered so far stays in place and the error is
/// returned; `assembler` still reports the message's current id.
pub async fn read_response(
    conversation: &mut Conversation,
    ids: &mut IdGenerator,
    assembler: &mut ResponseAssembler,
    mut chunks: ChunkStream,
    renderer: &mut dyn Renderer,
) -> Result<MessageId> {
    let start = Instant::now();
    let result = drain(conversation, ids, assembler, &mut chunks, renderer).await;
    STREAM_DURATION.add(start.elapsed().as_secs_f64());
    result
}

async fn drain(
    conversation: &mut Conversation,
    ids: &mut IdGenerator,
    assembler: &mut ResponseAssembler,
    chunks: &mut ChunkStream,
    renderer: &mut dyn Renderer,
) -> Result<MessageId> {
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        STREAM_CHUNKS.click();
        for step in assembler.push(&chunk) {
            apply(conversation, ids, assembler, step, renderer)?;
        }
    }
    if let Some(step) = assembler.finish() {
        apply(conversation, ids, assembler, step, renderer)?;
    }
    Ok(assembler.active_id())
}

fn apply(
    conversation: &mut Conversation,
    ids: &mut IdGenerator,
    assembler: &mut ResponseAssembler,
    step: StreamStep,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    match step {
        StreamStep::Text(delta) => {
            conversation.update_by_id(
                assembler.active_id(),
                MessageUpdate::text(assembler.text()),
            )?;
            renderer.print_text(&delta);
        }
        StreamStep::Reassign(id) => {
            let from = assembler.active_id();
            match conversation.update_by_id(from, MessageUpdate::id(id)) {
                Ok(true) => {
                    tracing::debug!(%from, to = %id, "bot message renumbered");
                    ids.observe(id);
                    assembler.rebind(id);
                }
                Ok(false) => {
                    tracing::warn!(%from, "bot message vanished before renumbering");
                }
                Err(err) => {
                    tracing::warn!(%from, to = %id, error = %err, "skipping id reassignment");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::RecordingRenderer;
    use crate::types::Message;
    use futures::stream;

    fn chunks(items: Vec<Result<&str>>) -> ChunkStream {
        let items: Vec<Result<String>> = items
            .into_iter()
            .map(|item| item.map(str::to_string))
            .collect();
        Box::pin(stream::iter(items))
    }

    fn placeholder() -> (Conversation, IdGenerator, MessageId) {
        let mut conversation = Conversation::new();
        let mut ids = IdGenerator::new();
        let user = ids.next_id();
        conversation.append(Message::user(user, "Hello")).unwrap();
        let bot = ids.next_id();
        conversation.append(Message::bot(bot, "")).unwrap();
        (conversation, ids, bot)
    }

    #[test]
    fn assembler_accumulates_and_reassigns_once() {
        let mut assembler = ResponseAssembler::new(MessageId(1));
        assert_eq!(assembler.push("Hi"), vec![StreamStep::Text("Hi".to_string())]);
        assert_eq!(
            assembler.push(" there"),
            vec![StreamStep::Text(" there".to_string())]
        );
        assert_eq!(
            assembler.push(r#"{"done":true,"messageId":42}"#),
            vec![StreamStep::Reassign(MessageId(42))]
        );
        assert!(assembler.push(r#"{"done":true,"messageId":43}"#).is_empty());
        assert_eq!(assembler.text(), "Hi there");
        assert!(assembler.marker_seen());
        assert_eq!(assembler.finish(), None);
    }

    #[test]
    fn assembler_joins_split_marker() {
        let mut assembler = ResponseAssembler::new(MessageId(1));
        assert!(assembler.push(r#"{"done":true,"mess"#).is_empty());
        assert_eq!(
            assembler.push(r#"ageId":9}"#),
            vec![StreamStep::Reassign(MessageId(9))]
        );
        assert_eq!(assembler.finish(), None);
    }

    #[test]
    fn unfinished_marker_is_flushed_as_text() {
        let mut assembler = ResponseAssembler::new(MessageId(1));
        assert!(assembler.push(r#"{"done":true"#).is_empty());
        assert_eq!(
            assembler.finish(),
            Some(StreamStep::Text(r#"{"done":true"#.to_string()))
        );
        assert_eq!(assembler.text(), r#"{"done":true"#);
        assert!(!assembler.marker_seen());
    }

    #[tokio::test]
    async fn streamed_text_and_reassignment() {
        let (mut conversation, mut ids, bot) = placeholder();
        let mut assembler = ResponseAssembler::new(bot);
        let mut renderer = RecordingRenderer::default();

        let id = read_response(
            &mut conversation,
            &mut ids,
            &mut assembler,
            chunks(vec![Ok("Hi"), Ok(" there"), Ok(r#"{"done":true,"messageId":42}"#)]),
            &mut renderer,
        )
        .await
        .unwrap();

        assert_eq!(id, MessageId(42));
        assert!(conversation.get(bot).is_none());
        assert_eq!(conversation.get(MessageId(42)).unwrap().text, "Hi there");
        assert_eq!(renderer.text, "Hi there");
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn text_without_marker_keeps_placeholder_id() {
        let (mut conversation, mut ids, bot) = placeholder();
        let mut assembler = ResponseAssembler::new(bot);
        let mut renderer = RecordingRenderer::default();

        let id = read_response(
            &mut conversation,
            &mut ids,
            &mut assembler,
            chunks(vec![Ok("A"), Ok("B")]),
            &mut renderer,
        )
        .await
        .unwrap();

        assert_eq!(id, bot);
        assert_eq!(conversation.get(bot).unwrap().text, "AB");
    }

    #[tokio::test]
    async fn colliding_reassignment_is_skipped() {
        let (mut conversation, mut ids, bot) = placeholder();
        let user = conversation.messages()[0].id;
        let mut assembler = ResponseAssembler::new(bot);
        let mut renderer = RecordingRenderer::default();
        let marker = format!(r#"{{"done":true,"messageId":{user}}}"#);

        let id = read_response(
            &mut conversation,
            &mut ids,
            &mut assembler,
            chunks(vec![Ok("x"), Ok(marker.as_str())]),
            &mut renderer,
        )
        .await
        .unwrap();

        assert_eq!(id, bot);
        assert_eq!(conversation.get(bot).unwrap().text, "x");
        assert_eq!(conversation.get(user).unwrap().text, "Hello");
    }

    #[tokio::test]
    async fn reassigned_id_is_never_generated() {
        let (mut conversation, mut ids, bot) = placeholder();
        let mut assembler = ResponseAssembler::new(bot);
        let mut renderer = RecordingRenderer::default();
        let far = bot.get() + 1_000_000;
        let marker = format!(r#"{{"done":true,"messageId":{far}}}"#);

        read_response(
            &mut conversation,
            &mut ids,
            &mut assembler,
            chunks(vec![Ok(marker.as_str())]),
            &mut renderer,
        )
        .await
        .unwrap();

        assert!(ids.next_id().get() > far);
    }

    #[tokio::test]
    async fn failure_keeps_partial_text() {
        let (mut conversation, mut ids, bot) = placeholder();
        let mut assembler = ResponseAssembler::new(bot);
        let mut renderer = RecordingRenderer::default();

        let err = read_response(
            &mut conversation,
            &mut ids,
            &mut assembler,
            chunks(vec![
                Ok("partial"),
                Err(Error::streaming("connection reset", None)),
                Ok("never"),
            ]),
            &mut renderer,
        )
        .await
        .unwrap_err();

        assert!(err.is_streaming());
        assert_eq!(assembler.active_id(), bot);
        assert_eq!(conversation.get(bot).unwrap().text, "partial");
    }

    #[tokio::test]
    async fn sentinel_in_answer_text_is_kept() {
        let (mut conversation, mut ids, bot) = placeholder();
        let mut assembler = ResponseAssembler::new(bot);
        let mut renderer = RecordingRenderer::default();

        let id = read_response(
            &mut conversation,
            &mut ids,
            &mut assembler,
            chunks(vec![
                Ok("Send "),
                Ok(r#"{"done":true} when finished."#),
                Ok(r#" Or {"done":true"#),
            ]),
            &mut renderer,
        )
        .await
        .unwrap();

        let expected = r#"Send {"done":true} when finished. Or {"done":true"#;
        assert_eq!(id, bot);
        assert_eq!(conversation.get(bot).unwrap().text, expected);
        assert_eq!(renderer.text, expected);
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn truncated_marker_at_end_is_text() {
        let (mut conversation, mut ids, bot) = placeholder();
        let mut assembler = ResponseAssembler::new(bot);
        let mut renderer = RecordingRenderer::default();

        let id = read_response(
            &mut conversation,
            &mut ids,
            &mut assembler,
            chunks(vec![Ok("ok"), Ok(r#"{"done":true,"messageId""#)]),
            &mut renderer,
        )
        .await
        .unwrap();

        assert_eq!(id, bot);
        assert_eq!(
            conversation.get(bot).unwrap().text,
            r#"ok{"done":true,"messageId""#
        );
    }
}
