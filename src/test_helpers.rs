//! Shared fakes for unit tests

use crate::channels::EventSink;
use crate::error::{DeliveryError, GenerationError};
use crate::llm::{GenerationRequest, TextGenerator, TextStream};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Sink that records every delivered event, or always refuses
pub struct RecordingSink<T> {
    received: Mutex<Vec<T>>,
    failure: Option<DeliveryError>,
}

impl<T> Default for RecordingSink<T> {
    fn default() -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            failure: None,
        }
    }
}

impl<T: Clone> RecordingSink<T> {
    /// A sink whose every delivery fails with `error`
    pub fn failing(error: DeliveryError) -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    /// Events delivered so far, in order
    pub fn received(&self) -> Vec<T> {
        self.received.lock().unwrap().clone()
    }
}

impl<T: Clone + Send + Sync> EventSink<T> for RecordingSink<T> {
    fn deliver(&self, event: &T) -> Result<(), DeliveryError> {
        if let Some(error) = self.failure {
            return Err(error);
        }
        self.received.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// One scripted reply of a [`ScriptedGenerator`]
pub enum Scripted {
    Text(String),
    Chunks(Vec<String>),
    Fail(GenerationError),
}

/// Generator that replays queued responses and records prompts
///
/// Once the queue is empty the last `fallback` text is returned forever.
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<Scripted>>,
    fallback: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(responses: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            queue: Mutex::new(responses.into_iter().collect()),
            fallback: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue the given texts in order
    pub fn texts<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::new(texts.into_iter().map(|t| Scripted::Text(t.into())))
    }

    /// Always answer with `text`
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::new([])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next(&self, request: &GenerationRequest) -> Scripted {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        match self.queue.lock().unwrap().pop_front() {
            Some(scripted) => scripted,
            None => match &self.fallback {
                Some(text) => Scripted::Text(text.clone()),
                None => Scripted::Fail(GenerationError::Model("script exhausted".into())),
            },
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self.next(request) {
            Scripted::Text(text) => Ok(text),
            Scripted::Chunks(chunks) => Ok(chunks.concat()),
            Scripted::Fail(error) => Err(error),
        }
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<TextStream, GenerationError> {
        let chunks = match self.next(request) {
            Scripted::Text(text) => vec![text],
            Scripted::Chunks(chunks) => chunks,
            Scripted::Fail(error) => return Err(error),
        };
        Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
    }
}
