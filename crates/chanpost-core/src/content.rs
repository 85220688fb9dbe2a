//! Post content: generated text plus a matching stock photo.

use std::{sync::Arc, time::Duration};

use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::{
    config::Config,
    errors::{with_timeout, Error},
    ports::{ImageLookup, TextGenerator},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedPost {
    pub text: String,
    pub image_url: String,
}

pub struct ContentSource {
    text: Arc<dyn TextGenerator>,
    images: Arc<dyn ImageLookup>,
    prompt: String,
    keywords: Vec<String>,
    default_image_url: String,
    timeout: Duration,
}

impl ContentSource {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageLookup>,
        prompt: impl Into<String>,
        keywords: Vec<String>,
        default_image_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            text,
            images,
            prompt: prompt.into(),
            keywords,
            default_image_url: default_image_url.into(),
            timeout,
        }
    }

    pub fn from_config(
        cfg: &Config,
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageLookup>,
    ) -> Self {
        Self::new(
            text,
            images,
            cfg.post_prompt.clone(),
            cfg.image_keywords.clone(),
            cfg.default_image_url.clone(),
            cfg.external_timeout,
        )
    }

    /// Generate text and pick an image.
    ///
    /// Text failures are returned; image failures fall back to the default image.
    pub async fn generate(&self) -> Result<GeneratedPost> {
        let text = self.generate_text().await?;
        let image_url = self.find_image().await;
        Ok(GeneratedPost { text, image_url })
    }

    async fn generate_text(&self) -> Result<String> {
        info!("generating post text");
        let text = with_timeout("text generation", self.timeout, self.text.complete(&self.prompt))
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::External(
                "text generation returned empty text".to_string(),
            ));
        }
        Ok(text.to_string())
    }

    async fn find_image(&self) -> String {
        let Some(keyword) = self.pick_keyword() else {
            return self.default_image_url.clone();
        };

        match with_timeout("image lookup", self.timeout, self.images.search(&keyword)).await {
            Ok(Some(url)) if !url.trim().is_empty() => url,
            Ok(_) => {
                warn!(keyword = %keyword, "image lookup found nothing, using default image");
                self.default_image_url.clone()
            }
            Err(e) => {
                warn!(keyword = %keyword, error = %e, "image lookup failed, using default image");
                self.default_image_url.clone()
            }
        }
    }

    fn pick_keyword(&self) -> Option<String> {
        self.keywords.choose(&mut rand::thread_rng()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeImages, FakeText};

    fn source(text: FakeText, images: FakeImages) -> (ContentSource, Arc<FakeImages>) {
        let images = Arc::new(images);
        let src = ContentSource::new(
            Arc::new(text),
            images.clone(),
            "prompt",
            vec!["tired".to_string(), "urban".to_string()],
            "https://placekitten.com/640/360",
            Duration::from_secs(1),
        );
        (src, images)
    }

    #[tokio::test]
    async fn returns_text_and_found_image() {
        let (src, images) = source(
            FakeText::ok("  живу как могу  "),
            FakeImages::found("https://images.example/regular.jpg"),
        );
        let post = src.generate().await.unwrap();
        assert_eq!(post.text, "живу как могу");
        assert_eq!(post.image_url, "https://images.example/regular.jpg");

        let queried = images.queries();
        assert_eq!(queried.len(), 1);
        assert!(["tired", "urban"].contains(&queried[0].as_str()));
    }

    #[tokio::test]
    async fn image_failure_falls_back_to_default() {
        for images in [FakeImages::failing(), FakeImages::empty()] {
            let (src, _) = source(FakeText::ok("text"), images);
            let post = src.generate().await.unwrap();
            assert_eq!(post.image_url, "https://placekitten.com/640/360");
        }
    }

    #[tokio::test]
    async fn text_failure_is_propagated() {
        let (src, images) = source(FakeText::failing(), FakeImages::found("https://x/y.jpg"));
        assert!(src.generate().await.is_err());
        assert!(images.queries().is_empty());
    }

    #[tokio::test]
    async fn each_generate_asks_for_text_once() {
        let text = Arc::new(FakeText::ok("text"));
        let src = ContentSource::new(
            text.clone(),
            Arc::new(FakeImages::found("https://x/y.jpg")),
            "prompt",
            vec!["life".to_string()],
            "https://placekitten.com/640/360",
            Duration::from_secs(1),
        );

        src.generate().await.unwrap();
        assert_eq!(text.calls(), 1);
        src.generate().await.unwrap();
        assert_eq!(text.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_image_lookup_falls_back_to_default() {
        let (src, images) = source(
            FakeText::ok("text"),
            FakeImages::hanging(Duration::from_secs(3600)),
        );
        let post = src.generate().await.unwrap();
        assert_eq!(post.image_url, "https://placekitten.com/640/360");
        assert_eq!(images.queries().len(), 1);
    }

    #[tokio::test]
    async fn blank_text_is_an_error() {
        let (src, _) = source(FakeText::ok("   "), FakeImages::found("https://x/y.jpg"));
        assert!(matches!(src.generate().await, Err(Error::External(_))));
    }
}
