use std::io::Cursor;
use std::process::Stdio;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use image::ImageFormat;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;
use url::Url;

/// Pixel rectangle of an image, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for Region {
    type Err = String;

    /// Parses `top,left,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid region {:?}: {}", s, e))?;
        match parts[..] {
            [top, left, width, height] if width > 0 && height > 0 => Ok(Region {
                top,
                left,
                width,
                height,
            }),
            [_, _, _, _] => Err(format!("region {:?} has an empty area", s)),
            _ => Err(format!("region {:?} must be top,left,width,height", s)),
        }
    }
}

/// Characters the engine may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whitelist {
    Digits,
}

impl Whitelist {
    fn chars(self) -> &'static str {
        match self {
            Whitelist::Digits => "0123456789",
        }
    }
}

#[async_trait]
pub trait ImageRecognizer: Send + Sync {
    /// Recognized text inside `region` of the image at `image_url`.
    async fn recognize(&self, image_url: &Url, region: Region, whitelist: Whitelist)
        -> Result<String>;
}

/// Downloads the image, crops it and pipes the crop through the `tesseract` CLI.
pub struct TesseractRecognizer {
    client: reqwest::Client,
    binary: String,
}

impl TesseractRecognizer {
    pub fn new(client: reqwest::Client, binary: impl Into<String>) -> Self {
        Self {
            client,
            binary: binary.into(),
        }
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch image {}", url))?;
        let status = response.status();
        if !status.is_success() {
            bail!("Image {} returned HTTP {}", url, status);
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageRecognizer for TesseractRecognizer {
    async fn recognize(
        &self,
        image_url: &Url,
        region: Region,
        whitelist: Whitelist,
    ) -> Result<String> {
        let bytes = self.download(image_url).await?;
        let png = crop_png(&bytes, region)?;
        debug!("Running {} on {:?} of {}", self.binary, region, image_url);

        // --psm 7: the crop holds a single line of text
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "--psm", "7", "-c"])
            .arg(format!("tessedit_char_whitelist={}", whitelist.chars()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.binary))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Decode `bytes`, cut out `region` and re-encode it as PNG.
pub fn crop_png(bytes: &[u8], region: Region) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("Failed to decode image")?;
    let fits_x = region.left.checked_add(region.width).is_some_and(|r| r <= img.width());
    let fits_y = region.top.checked_add(region.height).is_some_and(|b| b <= img.height());
    if !fits_x || !fits_y {
        bail!(
            "Region {:?} outside of {}x{} image",
            region,
            img.width(),
            img.height()
        );
    }

    let crop = img.crop_imm(region.left, region.top, region.width, region.height);
    let mut out = Cursor::new(Vec::new());
    crop.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}
