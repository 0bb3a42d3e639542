use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::block::ContentBlock;
use super::rules::{parse_recognized, DECEASED};
use crate::error::ExtractError;
use crate::ocr::{ImageRecognizer, Region, Whitelist};

/// Where the deceased count comes from.
#[async_trait]
pub trait DeceasedStrategy: Send + Sync {
    async fn deceased(&self, block: &ContentBlock) -> Result<u64, ExtractError>;
}

/// "incluant N décès" in the block text.
pub struct TextPattern;

#[async_trait]
impl DeceasedStrategy for TextPattern {
    async fn deceased(&self, block: &ContentBlock) -> Result<u64, ExtractError> {
        DECEASED.apply(&block.text)
    }
}

/// The count is only rendered inside an image: recognize digits in a fixed
/// rectangle of it.
pub struct ImageRegion<R> {
    recognizer: R,
    region: Region,
    image_match: Option<String>,
}

impl<R: ImageRecognizer> ImageRegion<R> {
    pub fn new(recognizer: R, region: Region, image_match: Option<String>) -> Self {
        Self {
            recognizer,
            region,
            image_match,
        }
    }

    fn pick_image<'b>(&self, block: &'b ContentBlock) -> Option<&'b Url> {
        match &self.image_match {
            Some(needle) => block.images.iter().find(|u| u.as_str().contains(needle.as_str())),
            None => block.images.first(),
        }
    }
}

#[async_trait]
impl<R: ImageRecognizer> DeceasedStrategy for ImageRegion<R> {
    async fn deceased(&self, block: &ContentBlock) -> Result<u64, ExtractError> {
        let image = self
            .pick_image(block)
            .ok_or(ExtractError::DeceasedNotFound)?;

        let raw = self
            .recognizer
            .recognize(image, self.region, Whitelist::Digits)
            .await
            .map_err(|e| ExtractError::Recognition(format!("{:#}", e)))?;
        debug!("Recognized {:?} in {}", raw.trim(), image);

        parse_recognized(&raw).ok_or(ExtractError::DeceasedNotFound)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Returns canned text and remembers what it was asked for.
    pub(crate) struct StubRecognizer {
        pub reply: anyhow::Result<String>,
        pub calls: Mutex<Vec<(Url, Region, Whitelist)>>,
    }

    impl StubRecognizer {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(msg: &str) -> Self {
            Self {
                reply: Err(anyhow::anyhow!(msg.to_string())),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageRecognizer for StubRecognizer {
        async fn recognize(
            &self,
            image_url: &Url,
            region: Region,
            whitelist: Whitelist,
        ) -> anyhow::Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((image_url.clone(), region, whitelist));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    const REGION: Region = Region { top: 12, left: 40, width: 90, height: 24 };

    fn block_with_images(srcs: &[&str]) -> ContentBlock {
        ContentBlock {
            text: "4 500 cas COVID-19".to_string(),
            title: None,
            images: srcs.iter().map(|s| Url::parse(s).unwrap()).collect(),
        }
    }

    #[tokio::test]
    async fn text_pattern() {
        let block = ContentBlock {
            text: "4 500 cas COVID-19 incluant 91 décès".to_string(),
            ..Default::default()
        };
        assert_eq!(TextPattern.deceased(&block).await, Ok(91));
        assert_eq!(
            TextPattern.deceased(&ContentBlock::default()).await,
            Err(ExtractError::DeceasedNotFound)
        );
    }

    #[tokio::test]
    async fn image_region_recognizes_digits() {
        let strategy = ImageRegion::new(StubRecognizer::replying(" 1 2 0\n"), REGION, None);
        let block = block_with_images(&["https://x.fr/a.png", "https://x.fr/b.png"]);
        assert_eq!(strategy.deceased(&block).await, Ok(120));

        let calls = strategy.recognizer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_str(), "https://x.fr/a.png");
        assert_eq!(calls[0].1, REGION);
        assert_eq!(calls[0].2, Whitelist::Digits);
    }

    #[tokio::test]
    async fn image_region_picks_matching_image() {
        let strategy = ImageRegion::new(
            StubRecognizer::replying("7"),
            REGION,
            Some("deces".to_string()),
        );
        let block = block_with_images(&["https://x.fr/logo.png", "https://x.fr/deces.png"]);
        assert_eq!(strategy.deceased(&block).await, Ok(7));
        let calls = strategy.recognizer.calls.lock().unwrap();
        assert_eq!(calls[0].0.as_str(), "https://x.fr/deces.png");
    }

    #[tokio::test]
    async fn image_region_without_image() {
        let strategy = ImageRegion::new(StubRecognizer::replying("7"), REGION, None);
        let result = strategy.deceased(&block_with_images(&[])).await;
        assert_eq!(result, Err(ExtractError::DeceasedNotFound));
        assert!(strategy.recognizer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_region_without_digits() {
        let strategy = ImageRegion::new(StubRecognizer::replying("~~\n"), REGION, None);
        let block = block_with_images(&["https://x.fr/a.png"]);
        assert_eq!(strategy.deceased(&block).await, Err(ExtractError::DeceasedNotFound));
    }

    #[tokio::test]
    async fn recognizer_failure() {
        let strategy = ImageRegion::new(StubRecognizer::failing("tesseract missing"), REGION, None);
        let block = block_with_images(&["https://x.fr/a.png"]);
        assert!(matches!(
            strategy.deceased(&block).await,
            Err(ExtractError::Recognition(msg)) if msg.contains("tesseract missing")
        ));
    }
}
