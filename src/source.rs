use async_trait::async_trait;

/// Raw byte download for a remote asset.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fails on transport errors and non-success responses.
    async fn fetch_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

/// One raw, source-provided unit of content (one potential post).
///
/// Accessors are fallible because the source structure shifts without
/// notice; the extractor turns any error into a rejection.
pub trait Fragment: Send + Sync {
    /// Opaque source-assigned token such as an activity URN.
    fn token(&self) -> Option<String>;

    /// Primary text content, possibly empty.
    fn text(&self) -> anyhow::Result<String>;

    /// Candidate media URLs in document order.
    fn media_urls(&self) -> anyhow::Result<Vec<String>>;

    /// Relative or absolute date signal, possibly empty.
    fn date_text(&self) -> anyhow::Result<String>;
}

/// External page/session layer that yields candidate fragments.
#[async_trait]
pub trait PageSource: MediaFetcher {
    /// Setup phase: navigation and session-validity checks.
    async fn prepare(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Returns at most `limit` fragments in source order.
    async fn fetch_candidates(&self, limit: usize) -> anyhow::Result<Vec<Box<dyn Fragment>>>;
}
