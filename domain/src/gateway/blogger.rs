//! Blogger v3 REST client.

use async_trait::async_trait;
use entity::post::{Media, PostParams, PostStatus, PostType, Term};
use entity::profile::ApiType;
use entity::publish_result::{MediaUploadResult, PublishResult};
use log::*;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};

use super::{
    error_result, media_form, media_result, response_body, unparsable, BlogClient, Credentials,
    HttpClients,
};
use crate::error::{parse_error, Error};

const EDIT_URL: &str = "https://www.blogger.com/blog/post/edit";

pub struct BloggerClient {
    /// Base URL of the `blogs` collection.
    api_url: String,
    blog_id: String,
    credentials: Credentials,
    http: HttpClients,
}

impl BloggerClient {
    pub fn new(
        api_url: impl Into<String>,
        blog_id: impl Into<String>,
        credentials: Credentials,
        http: HttpClients,
    ) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            blog_id: blog_id.into(),
            credentials,
            http,
        }
    }

    fn blog_url(&self) -> String {
        format!("{}/{}", self.api_url, self.blog_id)
    }
}

/// Look up the blog id of a blog URL.
pub async fn fetch_blog_id(
    http: &HttpClients,
    api_url: &str,
    credentials: &Credentials,
    blog_url: &str,
) -> Result<String, Error> {
    let url = format!("{}/byurl", api_url.trim_end_matches('/'));
    debug!("Looking up Blogger blog id for {}", blog_url);
    let response = http
        .read
        .get(url)
        .query(&[("url", blog_url)])
        .header(AUTHORIZATION, credentials.header().await?)
        .send()
        .await?;

    let status = response.status();
    let body = response_body(response).await?;
    if !status.is_success() {
        let (code, message) = super::error_fields(status, &body);
        warn!("Blog id lookup failed with {}: {}", code, message);
        return Err(parse_error(&format!(
            "Could not find a Blogger blog at {} ({}: {})",
            blog_url, code, message
        )));
    }
    body.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| parse_error("Blog lookup response carries no id"))
}

#[async_trait]
impl BlogClient for BloggerClient {
    fn api_type(&self) -> ApiType {
        ApiType::Blogger
    }

    async fn publish(
        &self,
        title: &str,
        content: &str,
        params: &PostParams,
    ) -> Result<PublishResult, Error> {
        let mut body = json!({
            "kind": "blogger#post",
            "blog": { "id": self.blog_id },
            "title": title,
            "content": content,
            "labels": params.labels,
        });

        let header = self.credentials.header().await?;
        let request = match &params.post_id {
            Some(post_id) => {
                body["id"] = Value::String(post_id.clone());
                info!("Updating Blogger post {}", post_id);
                self.http
                    .write
                    .put(format!("{}/posts/{}", self.blog_url(), post_id))
            }
            None => {
                info!("Creating Blogger post in blog {}", self.blog_id);
                self.http
                    .write
                    .post(format!("{}/posts", self.blog_url()))
                    .query(&[("isDraft", params.status == PostStatus::Draft)])
            }
        };
        let response = request.header(AUTHORIZATION, header).json(&body).send().await?;

        let status = response.status();
        let body = response_body(response).await?;
        debug!("Blogger publish response status {}", status);
        if !status.is_success() {
            return Ok(error_result(status, body));
        }

        let Some(post_id) = body.get("id").and_then(Value::as_str).map(str::to_string) else {
            return Ok(unparsable(body));
        };
        if let Some(requested) = &params.post_id {
            if requested != &post_id {
                error!(
                    "Blogger answered an update of {} with post {}",
                    requested, post_id
                );
                return Ok(unparsable(body));
            }
        }
        Ok(PublishResult::Ok {
            post_id,
            categories: None,
            response: body,
        })
    }

    async fn get_categories(&self) -> Result<Vec<Term>, Error> {
        Ok(Vec::new())
    }

    async fn get_post_types(&self) -> Result<Vec<PostType>, Error> {
        Ok(vec![PostType::post()])
    }

    async fn get_tag(&self, name: &str) -> Result<Term, Error> {
        Ok(Term {
            id: name.to_string(),
            name: name.to_string(),
            slug: String::new(),
            taxonomy: "label".to_string(),
            description: String::new(),
            parent: None,
            count: 0,
        })
    }

    async fn upload_media(&self, media: &Media) -> Result<MediaUploadResult, Error> {
        debug!("Uploading {:?} to Blogger", media);
        let response = self
            .http
            .write
            .post(format!("{}/media/new", self.blog_url()))
            .header(AUTHORIZATION, self.credentials.header().await?)
            .multipart(media_form(media)?)
            .send()
            .await?;
        let status = response.status();
        let body = response_body(response).await?;
        Ok(media_result(status, &body))
    }

    fn edit_url(&self, post_id: &str) -> String {
        format!("{}/{}/{}", EDIT_URL, self.blog_id, post_id)
    }

    /// Labels are plain names.
    async fn resolve_tags(&self, names: &[String]) -> Vec<String> {
        names.to_vec()
    }
}
