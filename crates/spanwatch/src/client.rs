use anyhow::Context;
use reqwest::Url;
use serde::de::DeserializeOwned;
use spanwatch::http::ErrorResponse;

use crate::protocol::{ApiRequest, ApiResponse};

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn connect(addr: &str) -> anyhow::Result<Self> {
        let base = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{addr}")
        };
        let base = Url::parse(&base).with_context(|| format!("invalid server address {addr}"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    pub fn url_for(&self, req: &ApiRequest) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("server address cannot carry a path: {}", self.base))?
            .clear()
            .extend(req.segments());
        if let Some(range) = req.time_range() {
            url.query_pairs_mut().append_pair("time_range", range.as_str());
        }
        Ok(url)
    }

    pub async fn request(&self, req: ApiRequest) -> anyhow::Result<ApiResponse> {
        let url = self.url_for(&req)?;
        Ok(match req {
            ApiRequest::Services(_) => ApiResponse::Services(self.get(url).await?),
            ApiRequest::Service(..) => ApiResponse::Service(self.get(url).await?),
            ApiRequest::Dependencies(_) => ApiResponse::Dependencies(self.get(url).await?),
            ApiRequest::Graph(_) => ApiResponse::Graph(self.get(url).await?),
            ApiRequest::Traces(..) => ApiResponse::Traces(self.get(url).await?),
            ApiRequest::Trace(_) => ApiResponse::Trace(self.get(url).await?),
            ApiRequest::Status => ApiResponse::Status(self.get(url).await?),
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> anyhow::Result<T> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("connect spanwatch server {}", self.base))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => anyhow::bail!("{} ({}): {}", err.error, status.as_u16(), err.message),
                Err(_) => anyhow::bail!("request {url} failed with status {status}"),
            }
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("decode response from {url}"))
    }
}
