use std::collections::HashMap;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

const API_ROOT: &str = "https://api.tumblr.com/v2/blog";

/// Thin client for the blog API. Every call targets one blog and carries the
/// OAuth consumer key; pagination state lives in the pagers below.
pub struct Client {
    http: reqwest::Client,
    blog_identifier: String,
    api_key: String,
}

impl Client {
    pub fn new(blog_identifier: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            blog_identifier: blog_identifier.to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get(&self, endpoint: &str, params: &HashMap<String, String>) -> Result<Value> {
        let url = format!("{API_ROOT}/{}/{endpoint}", self.blog_identifier);
        debug!(%url, ?params, "API request");

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;

        let mut body: Value = response
            .json()
            .await
            .with_context(|| format!("{url} returned invalid JSON"))?;

        Ok(body["response"].take())
    }

    /// Total number of liked posts, fetched up front for progress totals.
    pub async fn liked_count(&self) -> Result<u64> {
        let response = self.get("likes", &HashMap::new()).await?;
        Ok(response["liked_count"].as_u64().unwrap_or(0))
    }

    /// Total number of authored posts.
    pub async fn total_posts(&self) -> Result<u64> {
        let response = self.get("posts", &HashMap::new()).await?;
        Ok(response["total_posts"].as_u64().unwrap_or(0))
    }

    pub fn likes(&self) -> LikesPager<'_> {
        LikesPager {
            client: self,
            params: HashMap::new(),
            done: false,
        }
    }

    pub fn posts(&self) -> PostsPager<'_> {
        PostsPager {
            client: self,
            offset: 0,
            done: false,
        }
    }
}

/// Pages through `/likes`. The API hands back the query parameters for the
/// next request in `_links.next`, so each page seeds the one after it.
pub struct LikesPager<'a> {
    client: &'a Client,
    params: HashMap<String, String>,
    done: bool,
}

impl LikesPager<'_> {
    /// Fetch the next page of liked posts; empty once the listing ends.
    pub async fn next_page(&mut self) -> Result<Vec<Value>> {
        if self.done {
            return Ok(Vec::new());
        }

        let response = self.client.get("likes", &self.params).await?;
        let posts = response["liked_posts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        if posts.is_empty() {
            self.done = true;
            return Ok(posts);
        }

        match next_page_params(&response) {
            Some(next) => self.params = next,
            None => self.done = true,
        }

        Ok(posts)
    }
}

/// Pages through `/posts` with plain offset pagination.
pub struct PostsPager<'a> {
    client: &'a Client,
    offset: u64,
    done: bool,
}

impl PostsPager<'_> {
    pub async fn next_page(&mut self) -> Result<Vec<Value>> {
        if self.done {
            return Ok(Vec::new());
        }

        let mut params = HashMap::new();
        params.insert("offset".to_string(), self.offset.to_string());

        let response = self.client.get("posts", &params).await?;
        let posts = response["posts"].as_array().cloned().unwrap_or_default();

        if posts.is_empty() {
            self.done = true;
        } else {
            self.offset += posts.len() as u64;
        }

        Ok(posts)
    }
}

fn next_page_params(response: &Value) -> Option<HashMap<String, String>> {
    let params = response.pointer("/_links/next/query_params")?.as_object()?;
    let mut out = HashMap::new();
    for (key, value) in params {
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        out.insert(key.clone(), value);
    }
    Some(out)
}
