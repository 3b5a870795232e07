use crate::client::CatalogClient;
use crate::error::Result;
use crate::models::Video;

/// Videos whose categories contain `category`. An empty selection keeps
/// everything. Input order is preserved.
pub fn filter_by_category(videos: &[Video], category: &str) -> Vec<Video> {
    let category = category.trim();
    videos
        .iter()
        .filter(|video| category.is_empty() || video.content.categories.contains(category))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub category: String,
    pub keyword: String,
}

impl CatalogQuery {
    pub fn new(category: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            keyword: keyword.into(),
        }
    }

    pub fn has_keyword(&self) -> bool {
        !self.keyword.trim().is_empty()
    }
}

/// The public listing: categories and every visible video, as last loaded.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub categories: Vec<String>,
    pub videos: Vec<Video>,
}

impl Catalog {
    pub async fn load(client: &CatalogClient) -> Result<Self> {
        let mut catalog = Self::default();
        catalog.refresh(client).await?;
        Ok(catalog)
    }

    /// Reloads both lists. On failure the previous contents are kept.
    pub async fn refresh(&mut self, client: &CatalogClient) -> Result<()> {
        let categories = client.get_categories().await?;
        let videos = client.get_videos(false, None).await?;
        tracing::debug!(categories = categories.len(), videos = videos.len(), "catalog loaded");
        self.categories = categories;
        self.videos = videos;
        Ok(())
    }

    /// The subset to show for `query`. A blank keyword filters the loaded
    /// list locally; otherwise the service searches and the category filter
    /// runs again over its results.
    pub async fn displayed(&self, client: &CatalogClient, query: &CatalogQuery) -> Result<Vec<Video>> {
        if !query.has_keyword() {
            return Ok(filter_by_category(&self.videos, &query.category));
        }
        let results = client.search_videos(query.keyword.trim()).await?;
        Ok(filter_by_category(&results, &query.category))
    }
}
