//! Source registry: which sources a run queries.
//!
//! A run either uses the compiled-in [`static_map`] or asks a
//! [`ConfigProvider`] for the text of its latest configuration post and
//! validates it with [`parse_category_map`]. Resolution failures are returned
//! whole; deciding between aborting and falling back is the pipeline's job.

pub mod mastodon;
pub mod schema;
pub mod static_map;

pub use mastodon::MastodonProvider;
pub use schema::parse_category_map;
pub use static_map::static_map;

use tracing::{info, instrument};

use crate::error::ConfigResolutionError;
use crate::models::{CategoryMap, SourceMode};

/// A remote place that publishes the category map as a post.
pub trait ConfigProvider {
    /// Plain text of the most recent configuration post.
    async fn latest_post(&self) -> Result<String, ConfigResolutionError>;
}

/// Resolve the category map for `mode`.
#[instrument(level = "info", skip(provider))]
pub async fn resolve<P: ConfigProvider>(
    mode: SourceMode,
    provider: Option<&P>,
) -> Result<CategoryMap, ConfigResolutionError> {
    match mode {
        SourceMode::Static => Ok(static_map()),
        SourceMode::Dynamic => {
            let provider = provider.ok_or_else(|| {
                ConfigResolutionError::NotConfigured("no configuration provider".to_string())
            })?;
            let post = provider.latest_post().await?;
            let map = parse_category_map(&post)?;
            info!(categories = map.len(), "Resolved dynamic category map");
            Ok(map)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FixedPost;
    use super::*;

    #[tokio::test]
    async fn test_static_mode_ignores_provider() {
        let map = resolve(SourceMode::Static, Some(&FixedPost::default())).await.unwrap();
        assert_eq!(map, static_map());
    }

    #[tokio::test]
    async fn test_dynamic_mode_parses_post() {
        let provider = FixedPost::new(r#"{"general": ["https://a.example/rss"]}"#);
        let map = resolve(SourceMode::Dynamic, Some(&provider)).await.unwrap();
        assert_eq!(map.sources("general").len(), 1);
        assert!(map.sources("sports").is_empty());
    }

    #[tokio::test]
    async fn test_dynamic_failures_propagate() {
        let malformed = FixedPost::new("general: nope");
        assert!(matches!(
            resolve(SourceMode::Dynamic, Some(&malformed)).await,
            Err(ConfigResolutionError::Parse(_))
        ));
        assert!(matches!(
            resolve(SourceMode::Dynamic, Some(&FixedPost::default())).await,
            Err(ConfigResolutionError::NoPost)
        ));
        assert!(matches!(
            resolve::<FixedPost>(SourceMode::Dynamic, None).await,
            Err(ConfigResolutionError::NotConfigured(_))
        ));
    }
}
