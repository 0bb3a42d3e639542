use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use url::Url;

use crate::ocr::Region;

pub const SOURCE_URL: &str = "https://www.santepubliquefrance.fr/maladies-et-traumatismes/maladies-et-infections-respiratoires/infection-a-coronavirus/articles/infection-au-nouveau-coronavirus-sars-cov-2-covid-19-france-et-monde";
pub const READ_ME: &str = "https://apify.com/drobnikj/covid-france";
pub const BLOCK_SELECTOR: &str = "#block-236243";

pub const DB_PATH: &str = "data/covid-france.sqlite";
pub const KV_STORE: &str = "COVID-19-FRANCE";
pub const HISTORY_DATASET: &str = "COVID-19-FRANCE-HISTORY";
pub const OUTPUT_DATASET: &str = "default";
pub const LATEST_KEY: &str = "LATEST";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeceasedMode {
    /// "incluant N décès" in the block text
    Text,
    /// OCR over a fixed rectangle of the block's image
    Image,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// SQLite database holding the key-value store and datasets
    #[arg(long, env = "COVID_FR_DB", default_value = DB_PATH, global = true)]
    pub db: PathBuf,
}

/// Options of the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Page to scrape
    #[arg(long, env = "COVID_FR_SOURCE_URL", default_value = SOURCE_URL)]
    pub url: String,
    /// CSS selector of the block holding the figures
    #[arg(long, env = "COVID_FR_BLOCK_SELECTOR", default_value = BLOCK_SELECTOR)]
    pub block: String,
    /// HTTP timeout in seconds
    #[arg(long, env = "COVID_FR_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
    /// Where the deceased count is read from
    #[arg(long, env = "COVID_FR_DECEASED_MODE", value_enum, default_value = "text")]
    pub deceased_mode: DeceasedMode,
    /// OCR rectangle as top,left,width,height (image mode)
    #[arg(long, env = "COVID_FR_OCR_REGION")]
    pub ocr_region: Option<Region>,
    /// Substring of the image src to recognize (image mode, default: first image)
    #[arg(long, env = "COVID_FR_OCR_IMAGE")]
    pub ocr_image: Option<String>,
    /// Tesseract executable
    #[arg(long, env = "COVID_FR_TESSERACT", default_value = "tesseract")]
    pub tesseract: String,
}

#[derive(Debug, Clone)]
pub enum DeceasedSettings {
    Text,
    Image {
        region: Region,
        image_match: Option<String>,
        tesseract: String,
    },
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source_url: Url,
    pub block_selector: String,
    pub timeout: Duration,
    pub deceased: DeceasedSettings,
}

impl Settings {
    pub fn from_args(args: RunArgs) -> Result<Self> {
        let source_url = Url::parse(&args.url)
            .with_context(|| format!("Invalid source URL: {}", args.url))?;

        if scraper::Selector::parse(&args.block).is_err() {
            bail!("Invalid block selector: {}", args.block);
        }

        let deceased = match args.deceased_mode {
            DeceasedMode::Text => DeceasedSettings::Text,
            DeceasedMode::Image => {
                let Some(region) = args.ocr_region else {
                    bail!("--ocr-region is required when --deceased-mode=image");
                };
                DeceasedSettings::Image {
                    region,
                    image_match: args.ocr_image,
                    tesseract: args.tesseract,
                }
            }
        };

        Ok(Settings {
            source_url,
            block_selector: args.block,
            timeout: Duration::from_secs(args.timeout_secs),
            deceased,
        })
    }
}
