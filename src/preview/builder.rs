//! Hover-card data assembly.
//!
//! A card needs two lookups per artist: their most recent posts and the
//! total count recorded on their tag. Both are fired concurrently and
//! the joined result is memoized per artist name with the same shared-
//! future scheme the result cache uses, so a card hovered from three
//! places at once still costs one pair of lookups.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{join, BoxFuture, FutureExt, Shared};

use crate::api::models::{Artist, Post};
use crate::api::ApiClient;
use crate::config::Settings;

type SharedPreview = Shared<BoxFuture<'static, Arc<ArtistPreview>>>;

/// Everything a hover card shows for one artist.
#[derive(Debug, Clone)]
pub struct ArtistPreview {
    pub artist: Artist,
    /// Total posts recorded on the artist's tag.
    pub post_count: i64,
    /// Most recent posts, newest first.
    pub posts: Vec<Post>,
}

/// Assembles and memoizes hover-card data.
pub struct PreviewBuilder {
    api: ApiClient,
    limit: usize,
    show_deleted: bool,
    cards: DashMap<String, SharedPreview>,
}

impl PreviewBuilder {
    pub fn new(api: ApiClient, settings: &Settings) -> Self {
        Self {
            api,
            limit: settings.preview_limit,
            show_deleted: settings.show_deleted,
            cards: DashMap::new(),
        }
    }

    /// The shared card data for `artist`, built on first request.
    pub async fn preview(&self, artist: &Artist) -> Arc<ArtistPreview> {
        self.card_future(artist).await
    }

    fn card_future(&self, artist: &Artist) -> SharedPreview {
        self.cards
            .entry(artist.name.clone())
            .or_insert_with(|| {
                let api = self.api.clone();
                let artist = artist.clone();
                let limit = self.limit;
                let show_deleted = self.show_deleted;
                async move {
                    let name = artist.name.clone();
                    let (posts, post_count) = join(
                        api.recent_posts(&name, limit, show_deleted),
                        api.tag_post_count(&name),
                    )
                    .await;
                    Arc::new(ArtistPreview {
                        artist,
                        post_count,
                        posts,
                    })
                }
                .boxed()
                .shared()
            })
            .clone()
    }

    pub fn cached_cards(&self) -> usize {
        self.cards.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::registry::NetworkRegistry;
    use crate::client::{ClientConfig, RateLimitedClient};

    fn api_for(server: &MockServer) -> ApiClient {
        let config = ClientConfig::default();
        let client = RateLimitedClient::new(Arc::new(NetworkRegistry::new(&config)), config);
        ApiClient::new(Url::parse(&server.uri()).unwrap(), 0, client)
    }

    fn artist() -> Artist {
        Artist {
            id: 7,
            name: "some_artist".to_string(),
            is_banned: false,
            other_names: vec![],
            urls: vec![],
        }
    }

    #[tokio::test]
    async fn test_preview_joins_posts_and_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts.json"))
            .and(query_param("tags", "status:any some_artist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "created_at": "2024-01-01T00:00:00Z",
                 "image_width": 800, "image_height": 600, "rating": "s"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tags.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"post_count": 123}])),
            )
            .mount(&server)
            .await;

        let builder = PreviewBuilder::new(api_for(&server), &Settings::default());
        let preview = builder.preview(&artist()).await;
        assert_eq!(preview.post_count, 123);
        assert_eq!(preview.posts.len(), 1);
        assert_eq!(preview.artist.name, "some_artist");
    }

    #[tokio::test]
    async fn test_concurrent_previews_share_one_build() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tags.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"post_count": 5}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let builder = Arc::new(PreviewBuilder::new(api_for(&server), &Settings::default()));
        let (a1, a2, a3) = (artist(), artist(), artist());
        let (a, b, c) = tokio::join!(
            builder.preview(&a1),
            builder.preview(&a2),
            builder.preview(&a3)
        );
        assert_eq!(a.post_count, 5);
        assert_eq!(b.post_count, 5);
        assert_eq!(c.post_count, 5);
        assert_eq!(builder.cached_cards(), 1);
    }
}
