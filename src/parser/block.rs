use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2.item__title").unwrap());
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());

/// The part of the page that carries the figures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentBlock {
    /// All text nodes of the block, concatenated as-is.
    pub text: String,
    /// Text of the first `h2.item__title`, which carries the update date.
    pub title: Option<String>,
    /// Image sources inside the block, resolved against the page URL.
    pub images: Vec<Url>,
}

/// Find the first element matching `selector` and flatten it.
///
/// A missing block yields an empty `ContentBlock`; the field rules then
/// report which value could not be found.
pub fn locate(markup: &str, selector: &str, base: &Url) -> ContentBlock {
    let Ok(sel) = Selector::parse(selector) else {
        warn!("Invalid block selector {:?}", selector);
        return ContentBlock::default();
    };

    let doc = Html::parse_document(markup);
    let Some(el) = doc.select(&sel).next() else {
        warn!("Block {} not found on {}", selector, base);
        return ContentBlock::default();
    };

    let text: String = el.text().collect();
    let title = el
        .select(&TITLE_SEL)
        .next()
        .map(|h| h.text().collect::<String>().trim().to_string());
    let images = el
        .select(&IMG_SEL)
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| base.join(src.trim()).ok())
        .collect();

    ContentBlock { text, title, images }
}

/// Text of a whole document, the "parsed text" view of a page.
pub fn document_text(markup: &str) -> String {
    Html::parse_document(markup).root_element().text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.example.fr/articles/covid").unwrap()
    }

    #[test]
    fn flattens_block() {
        let html = r#"<html><body>
            <div id="other"><p>10 cas COVID-19</p></div>
            <div id="block-1">
              <h2 class="item__title">Chiffres au 14/3/2020 à 15h</h2>
              <p><strong>4&nbsp;500</strong> cas COVID-19</p>
              <img src="/images/deces.png">
            </div>
        </body></html>"#;
        let block = locate(html, "#block-1", &base());
        assert!(block.text.contains("4\u{a0}500 cas COVID-19"));
        assert!(!block.text.contains("10 cas"));
        assert_eq!(block.title.as_deref(), Some("Chiffres au 14/3/2020 à 15h"));
        assert_eq!(block.images.len(), 1);
        assert_eq!(block.images[0].as_str(), "https://www.example.fr/images/deces.png");
    }

    #[test]
    fn missing_block_is_empty() {
        let block = locate("<p>nothing here</p>", "#block-1", &base());
        assert_eq!(block, ContentBlock::default());
    }

    #[test]
    fn invalid_selector_is_empty() {
        assert_eq!(locate("<p>x</p>", "##", &base()), ContentBlock::default());
    }

    #[test]
    fn whole_document_text() {
        let text = document_text("<html><body><p>a</p><p>b</p></body></html>");
        assert_eq!(text.trim(), "ab");
    }
}
