use crate::error::FetchError;
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;

/// A fetched page body and the URL it was requested from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub body: String,
}

impl Page {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    /// Parses the body into a navigable document
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Retrieves one page per call. No retries and no caching.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        (**self).fetch(url).await
    }
}

/// Rejects bodies that cannot hold a document
pub(crate) fn non_empty_body(url: &str, body: String) -> Result<Page, FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::Body {
            url: url.to_string(),
            reason: "empty body".to_string(),
        });
    }
    Ok(Page::new(url, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_document_parses_body() {
        let page = Page::new("https://shop.example/", "<html><body><p>hi</p></body></html>");
        let document = page.document();
        let selector = Selector::parse("p").unwrap();
        assert_eq!(document.select(&selector).count(), 1);
    }

    #[test]
    fn test_blank_body_rejected() {
        assert!(matches!(
            non_empty_body("u", " \n ".to_string()),
            Err(FetchError::Body { .. })
        ));
        assert!(non_empty_body("u", "<html></html>".to_string()).is_ok());
    }
}
