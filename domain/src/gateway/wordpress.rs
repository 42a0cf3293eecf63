//! WordPress.com REST API (v1.1) client.

use async_trait::async_trait;
use entity::post::{Media, PostParams, PostType, Term};
use entity::profile::ApiType;
use entity::publish_result::{MediaUploadResult, PublishResult};
use entity::CategoryId;
use log::*;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};

use super::{
    error_fields, error_result, media_form, media_result, response_body, unparsable,
    value_to_string, BlogClient, Credentials, HttpClients,
};
use crate::error::{parse_error, Error};

pub struct WordPressComClient {
    /// `{api}/rest/v1.1/sites/{site}`
    site_url: String,
    /// The blog's own URL, for edit links.
    endpoint: String,
    credentials: Credentials,
    http: HttpClients,
}

impl WordPressComClient {
    pub fn new(
        api_url: &str,
        site: &str,
        endpoint: impl Into<String>,
        credentials: Credentials,
        http: HttpClients,
    ) -> Self {
        Self {
            site_url: format!("{}/rest/v1.1/sites/{}", api_url.trim_end_matches('/'), site),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credentials,
            http,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, Error> {
        let response = self
            .http
            .read
            .get(format!("{}/{}", self.site_url, path))
            .query(query)
            .header(AUTHORIZATION, self.credentials.header().await?)
            .send()
            .await?;
        let status = response.status();
        let body = response_body(response).await?;
        if !status.is_success() {
            let (code, message) = error_fields(status, &body);
            return Err(parse_error(&format!(
                "GET {} failed ({}: {})",
                path, code, message
            )));
        }
        Ok(body)
    }
}

/// Terms from a `{"found": n, "<key>": [...]}` listing.
fn terms(body: &Value, key: &str) -> Vec<Term> {
    if !body.get("found").is_some_and(Value::is_number) {
        return Vec::new();
    }
    body.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(term).collect())
        .unwrap_or_default()
}

fn term(value: &Value) -> Option<Term> {
    let id = value.get("ID").map(value_to_string)?;
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(Term {
        id,
        name: text("name"),
        slug: text("slug"),
        taxonomy: text("taxonomy"),
        description: text("description"),
        parent: value
            .get("parent")
            .filter(|p| !p.is_null() && p.as_i64() != Some(0))
            .map(value_to_string),
        count: value.get("post_count").and_then(Value::as_i64).unwrap_or(0),
    })
}

/// Category ids of a post response, where `categories` maps names to terms.
fn response_categories(body: &Value) -> Vec<CategoryId> {
    body.get("categories")
        .and_then(Value::as_object)
        .map(|categories| {
            categories
                .values()
                .filter_map(|category| category.get("ID").and_then(Value::as_i64))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl BlogClient for WordPressComClient {
    fn api_type(&self) -> ApiType {
        ApiType::WordpressCom
    }

    async fn publish(
        &self,
        title: &str,
        content: &str,
        params: &PostParams,
    ) -> Result<PublishResult, Error> {
        let url = match &params.post_id {
            Some(post_id) => {
                info!("Updating WordPress.com post {}", post_id);
                format!("{}/posts/{}", self.site_url, post_id)
            }
            None => {
                info!("Creating WordPress.com post");
                format!("{}/posts/new", self.site_url)
            }
        };
        let body = json!({
            "title": title,
            "content": content,
            "status": params.status.to_string(),
            "type": params.post_type.as_str(),
            "categories": params.categories,
            "tags": params.tags,
        });

        let response = self
            .http
            .write
            .post(url)
            .header(AUTHORIZATION, self.credentials.header().await?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let body = response_body(response).await?;
        debug!("WordPress.com publish response status {}", status);
        if !status.is_success() {
            return Ok(error_result(status, body));
        }

        let Some(returned_id) = body.get("ID").filter(|id| !id.is_null()).map(value_to_string)
        else {
            return Ok(unparsable(body));
        };
        let categories = if params.categories.is_empty() {
            response_categories(&body)
        } else {
            params.categories.clone()
        };
        Ok(PublishResult::Ok {
            post_id: params.post_id.clone().unwrap_or(returned_id),
            categories: Some(categories),
            response: body,
        })
    }

    async fn get_categories(&self) -> Result<Vec<Term>, Error> {
        let body = self.get_json("categories", &[]).await?;
        Ok(terms(&body, "categories"))
    }

    async fn get_post_types(&self) -> Result<Vec<PostType>, Error> {
        let body = self.get_json("post-types", &[]).await?;
        if !body.get("found").is_some_and(Value::is_number) {
            return Ok(Vec::new());
        }
        Ok(body
            .get("post_types")
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .filter_map(|t| t.get("name").and_then(Value::as_str))
                    .map(|name| PostType(name.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_tag(&self, name: &str) -> Result<Term, Error> {
        let body = self
            .get_json("tags", &[("number", "1"), ("search", name)])
            .await?;
        if let Some(existing) = terms(&body, "tags").into_iter().next() {
            return Ok(existing);
        }

        debug!("Creating tag {}", name);
        let response = self
            .http
            .write
            .post(format!("{}/tags/new", self.site_url))
            .header(AUTHORIZATION, self.credentials.header().await?)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let status = response.status();
        let body = response_body(response).await?;
        if !status.is_success() {
            let (code, message) = error_fields(status, &body);
            return Err(parse_error(&format!(
                "Creating tag {} failed ({}: {})",
                name, code, message
            )));
        }
        term(&body).ok_or_else(|| parse_error("Tag response carries no ID"))
    }

    async fn upload_media(&self, media: &Media) -> Result<MediaUploadResult, Error> {
        debug!("Uploading {:?} to WordPress.com", media);
        let response = self
            .http
            .write
            .post(format!("{}/media/new", self.site_url))
            .header(AUTHORIZATION, self.credentials.header().await?)
            .multipart(media_form(media)?)
            .send()
            .await?;
        let status = response.status();
        let body = response_body(response).await?;
        Ok(media_result(status, &body))
    }

    fn edit_url(&self, post_id: &str) -> String {
        format!(
            "{}/wp-admin/post.php?action=edit&post={}",
            self.endpoint, post_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::tests_support::{credentials_for, http_clients};
    use entity::post::PostStatus;
    use mockito::{Matcher, Server};

    async fn client(server: &Server) -> WordPressComClient {
        WordPressComClient::new(
            &server.url(),
            "me.wordpress.com",
            "https://me.wordpress.com/",
            credentials_for(server, "wp").await,
            http_clients(),
        )
    }

    fn params() -> PostParams {
        PostParams {
            title: "Hello".to_string(),
            status: PostStatus::Publish,
            tags: vec!["12".to_string()],
            profile_name: "wp".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_returns_id_and_response_categories() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1.1/sites/me.wordpress.com/posts/new")
            .match_header("authorization", "Bearer access-token")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "title": "Hello",
                "status": "publish",
                "type": "post",
                "tags": ["12"],
            })))
            .with_status(200)
            .with_body(
                r#"{"ID":123,"categories":{"Uncategorized":{"ID":1,"name":"Uncategorized"}}}"#,
            )
            .create_async()
            .await;

        let result = client(&server)
            .await
            .publish("Hello", "<p>Hi</p>", &params())
            .await
            .unwrap();

        mock.assert_async().await;
        match result {
            PublishResult::Ok {
                post_id,
                categories,
                ..
            } => {
                assert_eq!(post_id, "123");
                assert_eq!(categories, Some(vec![1]));
            }
            other => panic!("expected ok, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_keeps_requested_id_and_categories() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1.1/sites/me.wordpress.com/posts/123")
            .with_status(200)
            .with_body(r#"{"ID":123,"categories":{}}"#)
            .create_async()
            .await;

        let params = PostParams {
            post_id: Some("123".to_string()),
            categories: vec![4, 5],
            ..params()
        };
        let result = client(&server)
            .await
            .publish("Hello", "<p>Hi</p>", &params)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.post_id(), Some("123"));
        if let PublishResult::Ok { categories, .. } = result {
            assert_eq!(categories, Some(vec![4, 5]));
        }
    }

    #[tokio::test]
    async fn test_response_without_id_is_unparsable() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/rest/v1.1/sites/me.wordpress.com/posts/new")
            .with_status(200)
            .with_body(r#"{"unexpected":true}"#)
            .create_async()
            .await;

        let result = client(&server)
            .await
            .publish("Hello", "<p>Hi</p>", &params())
            .await
            .unwrap();
        match result {
            PublishResult::Error { code, response, .. } => {
                assert_eq!(code, "ServerInternalError");
                assert_eq!(response.unwrap()["unexpected"], true);
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_categories_listing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/v1.1/sites/me.wordpress.com/categories")
            .with_status(200)
            .with_body(
                r#"{"found":2,"categories":[
                    {"ID":1,"name":"Uncategorized","slug":"uncategorized","post_count":3,"parent":0},
                    {"ID":7,"name":"Rust","slug":"rust","post_count":1,"parent":1}
                ]}"#,
            )
            .create_async()
            .await;

        let categories = client(&server).await.get_categories().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].id, "1");
        assert_eq!(categories[0].parent, None);
        assert_eq!(categories[1].parent.as_deref(), Some("1"));
        assert_eq!(categories[1].count, 1);
    }

    #[tokio::test]
    async fn test_post_types_listing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/v1.1/sites/me.wordpress.com/post-types")
            .with_status(200)
            .with_body(r#"{"found":2,"post_types":[{"name":"post"},{"name":"page"}]}"#)
            .create_async()
            .await;

        let types = client(&server).await.get_post_types().await.unwrap();
        assert_eq!(types, vec![PostType::post(), PostType("page".to_string())]);
    }

    #[tokio::test]
    async fn test_get_tag_creates_missing_tag() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/v1.1/sites/me.wordpress.com/tags")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("number".into(), "1".into()),
                Matcher::UrlEncoded("search".into(), "rust".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"found":0,"tags":[]}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/rest/v1.1/sites/me.wordpress.com/tags/new")
            .match_body(Matcher::Json(serde_json::json!({"name": "rust"})))
            .with_status(200)
            .with_body(r#"{"ID":55,"name":"rust","slug":"rust"}"#)
            .create_async()
            .await;

        let tag = client(&server).await.get_tag("rust").await.unwrap();
        create.assert_async().await;
        assert_eq!(tag.id, "55");
    }

    #[tokio::test]
    async fn test_resolve_tags_drops_failures() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/rest/v1.1/sites/me.wordpress.com/tags")
            .match_query(Matcher::UrlEncoded("search".into(), "ok".into()))
            .with_status(200)
            .with_body(r#"{"found":1,"tags":[{"ID":9,"name":"ok"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/rest/v1.1/sites/me.wordpress.com/tags")
            .match_query(Matcher::UrlEncoded("search".into(), "broken".into()))
            .with_status(500)
            .create_async()
            .await;

        let ids = client(&server)
            .await
            .resolve_tags(&["ok".to_string(), "broken".to_string()])
            .await;
        assert_eq!(ids, vec!["9".to_string()]);
    }

    #[tokio::test]
    async fn test_upload_media_posts_multipart() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1.1/sites/me.wordpress.com/media/new")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data; boundary=.*".to_string()),
            )
            .match_body(Matcher::Regex(r#"name="media\[\]"; filename="cat.png""#.to_string()))
            .with_status(200)
            .with_body(r#"{"media":[{"link":"https://me.files.wordpress.com/cat.png"}]}"#)
            .create_async()
            .await;

        let media = Media {
            mime_type: "image/png".to_string(),
            file_name: "cat.png".to_string(),
            content: b"fake png bytes".to_vec(),
        };
        let result = client(&server).await.upload_media(&media).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            MediaUploadResult::Ok {
                url: "https://me.files.wordpress.com/cat.png".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_edit_url() {
        let server = Server::new_async().await;
        assert_eq!(
            client(&server).await.edit_url("123"),
            "https://me.wordpress.com/wp-admin/post.php?action=edit&post=123"
        );
    }
}
