pub mod block;
pub mod deceased;
pub mod rules;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::READ_ME;
use crate::error::ExtractError;
use crate::fetch::Page;
use crate::snapshot::{truncate_to_minute, Snapshot};
use deceased::DeceasedStrategy;

/// Page → Snapshot. All three fields must be found, otherwise the first
/// missing one is reported and nothing is built.
pub async fn extract<S>(
    page: &Page,
    block_selector: &str,
    strategy: &S,
    captured_at: DateTime<Utc>,
) -> Result<Snapshot, ExtractError>
where
    S: DeceasedStrategy + ?Sized,
{
    let block = block::locate(&page.markup, block_selector, &page.url);

    let infected = rules::INFECTED.apply(&block.text)?;
    let deceased = strategy.deceased(&block).await?;
    let source_updated_at = rules::UPDATED_AT.apply(block.title.as_deref().unwrap_or_default())?;

    debug!(
        "Extracted infected={} deceased={} updated={}",
        infected, deceased, source_updated_at
    );

    Ok(Snapshot {
        source_url: page.url.to_string(),
        captured_at: truncate_to_minute(captured_at),
        read_me: READ_ME.to_string(),
        infected,
        deceased,
        source_updated_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};
    use url::Url;

    use super::*;
    use crate::ocr::Region;
    use super::deceased::tests::StubRecognizer;
    use super::deceased::{ImageRegion, TextPattern};

    const BLOCK: &str = "#block-236243";

    fn fixture(name: &str) -> Page {
        let markup = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        Page {
            url: Url::parse("https://www.santepubliquefrance.fr/covid-19").unwrap(),
            markup,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 14, 16, 5, 42).unwrap()
    }

    #[tokio::test]
    async fn text_variant() {
        let page = fixture("spf_text");
        let s = extract(&page, BLOCK, &TextPattern, now()).await.unwrap();
        assert_eq!(s.infected, 4500);
        assert_eq!(s.deceased, 91);
        assert_eq!(s.source_updated_at.to_string(), "2020-03-14 15:00:00");
        assert_eq!(s.source_url, "https://www.santepubliquefrance.fr/covid-19");
        assert_eq!(s.read_me, READ_ME);
        assert_eq!(s.captured_at.second(), 0);
        assert_eq!(s.captured_at.minute(), 5);
    }

    #[tokio::test]
    async fn image_variant() {
        let page = fixture("spf_image");
        let strategy = ImageRegion::new(
            StubRecognizer::replying("1 0 0 3"),
            Region { top: 0, left: 0, width: 100, height: 30 },
            Some("deces".to_string()),
        );
        let s = extract(&page, BLOCK, &strategy, now()).await.unwrap();
        assert_eq!(s.infected, 12612);
        assert_eq!(s.deceased, 1003);
        assert_eq!(s.source_updated_at.to_string(), "2020-03-22 14:00:00");
    }

    #[tokio::test]
    async fn image_variant_text_strategy_fails() {
        let page = fixture("spf_image");
        let err = extract(&page, BLOCK, &TextPattern, now()).await.unwrap_err();
        assert_eq!(err, ExtractError::DeceasedNotFound);
    }

    #[tokio::test]
    async fn infected_missing() {
        let page = fixture("spf_no_infected");
        let err = extract(&page, BLOCK, &TextPattern, now()).await.unwrap_err();
        assert_eq!(err, ExtractError::InfectedNotFound);
    }

    #[tokio::test]
    async fn updated_at_missing() {
        let page = fixture("spf_no_date");
        let err = extract(&page, BLOCK, &TextPattern, now()).await.unwrap_err();
        assert_eq!(err, ExtractError::UpdatedAtNotFound);
    }

    #[tokio::test]
    async fn updated_at_only_from_first_title() {
        let page = Page {
            url: Url::parse("https://www.santepubliquefrance.fr/covid-19").unwrap(),
            markup: r#"<div id="block-236243">
                <h2 class="item__title">Chiffres clés</h2>
                <p>4 500 cas COVID-19 incluant 91 décès</p>
                <h2 class="item__title">Dans le monde au 1/3/2020 à 9h</h2>
            </div>"#
                .into(),
        };
        let err = extract(&page, BLOCK, &TextPattern, now()).await.unwrap_err();
        assert_eq!(err, ExtractError::UpdatedAtNotFound);
    }

    #[tokio::test]
    async fn block_missing() {
        let page = Page {
            url: Url::parse("https://example.org/").unwrap(),
            markup: "<p>4 500 cas COVID-19 incluant 91 décès, 14/3/2020 à 15h</p>".into(),
        };
        let err = extract(&page, BLOCK, &TextPattern, now()).await.unwrap_err();
        assert_eq!(err, ExtractError::InfectedNotFound);
    }
}
