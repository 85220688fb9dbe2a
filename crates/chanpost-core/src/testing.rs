//! Fakes for the ports, shared by the unit tests.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatTarget, MessageId},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    ports::{ImageLookup, TextGenerator},
    Result,
};

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    html: Mutex<Vec<(ChatTarget, String)>>,
    photos: Mutex<Vec<(ChatTarget, String, String)>>,
    deleted: Mutex<Vec<MessageId>>,
    fail_photos: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FakeMessenger {
    pub fn failing_photos() -> Self {
        let m = Self::default();
        m.fail_photos.store(true, Ordering::SeqCst);
        m
    }

    pub fn failing_deletes() -> Self {
        let m = Self::default();
        m.fail_deletes.store(true, Ordering::SeqCst);
        m
    }

    fn alloc(&self) -> MessageId {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageId(*guard)
    }

    pub fn html(&self) -> Vec<(ChatTarget, String)> {
        self.html.lock().unwrap().clone()
    }

    pub fn last_html(&self) -> String {
        self.html()
            .last()
            .map(|(_, h)| h.clone())
            .unwrap_or_default()
    }

    pub fn photos(&self) -> Vec<(ChatTarget, String, String)> {
        self.photos.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities::default()
    }

    async fn send_html(&self, chat: &ChatTarget, html: &str) -> Result<MessageId> {
        self.html.lock().unwrap().push((chat.clone(), html.to_string()));
        Ok(self.alloc())
    }

    async fn send_photo(
        &self,
        chat: &ChatTarget,
        image_url: &str,
        caption: &str,
    ) -> Result<MessageId> {
        if self.fail_photos.load(Ordering::SeqCst) {
            return Err(Error::External("telegram error: bad request".to_string()));
        }
        self.photos
            .lock()
            .unwrap()
            .push((chat.clone(), image_url.to_string(), caption.to_string()));
        Ok(self.alloc())
    }

    async fn delete_message(&self, _chat: &ChatTarget, message_id: MessageId) -> Result<()> {
        self.deleted.lock().unwrap().push(message_id);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::External(
                "telegram error: message to delete not found".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct FakeText {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl FakeText {
    pub fn ok(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| Error::External("openrouter request error: 401".to_string()))
    }
}

pub struct FakeImages {
    result: std::result::Result<Option<String>, ()>,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn found(url: &str) -> Self {
        Self {
            result: Ok(Some(url.to_string())),
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            result: Ok(None),
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err(()),
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Answers only after `delay`.
    pub fn hanging(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::found("https://images.example/late.jpg")
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageLookup for FakeImages {
    async fn search(&self, keyword: &str) -> Result<Option<String>> {
        self.queries.lock().unwrap().push(keyword.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result
            .clone()
            .map_err(|_| Error::External("unsplash request error: timeout".to_string()))
    }
}
