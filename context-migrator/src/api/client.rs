use std::{fmt::Display, time::Duration};

use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header::{HeaderMap, HeaderValue},
    Method, Url,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    api::{
        models::{
            ApprovalRequest, CodeReferenceStatistics, DependentFlagList, ExperimentList,
            FeatureFlag, FeatureFlagPage, RepositoryStatistic,
        },
        service::FlagService,
    },
    config::MigrationSettings,
};

const PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct LaunchDarklyClient {
    host: Url,
    api_key: String,
    project_key: String,
    env_key: String,
    client: Client,
}

#[derive(Error, Debug)]
pub enum ClientError {
    RequestError(reqwest::Error),
    // All invalid status codes
    ApiError(u16, Box<Url>, String),
    InvalidUrl(String),
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::RequestError(err) => write!(f, "Request error: {err}"),
            ClientError::InvalidUrl(msg) => {
                write!(f, "Failed to build URL: {msg}")
            }
            ClientError::ApiError(status, url, body) => {
                // We only parse api error on display to catch all errors even when the body is not JSON
                match serde_json::from_str::<ApiErrorResponse>(body) {
                    Ok(api_error) => {
                        write!(f, "API error: status='{status}' {api_error}")
                    }
                    Err(_) => write!(
                        f,
                        "API error: status='{status}' url='{url}' message='{body}'",
                    ),
                }
            }
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::RequestError(error)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiErrorResponse {
    code: String,
    message: String,
}

impl Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code='{}' message='{}'", self.code, self.message)
    }
}

impl LaunchDarklyClient {
    pub fn from_settings(settings: &MigrationSettings) -> anyhow::Result<Self> {
        Self::with_timeout(
            settings.host.clone(),
            settings.api_key.clone(),
            settings.project_key.clone(),
            settings.env_key.clone(),
            settings.request_timeout,
        )
    }

    pub fn new(
        host: Url,
        api_key: String,
        project_key: String,
        env_key: String,
        client: Client,
    ) -> Self {
        Self {
            host,
            api_key,
            project_key,
            env_key,
            client,
        }
    }

    pub fn with_timeout(
        host: Url,
        api_key: String,
        project_key: String,
        env_key: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(host, api_key, project_key, env_key, client))
    }

    pub fn send_get<F: FnOnce(RequestBuilder) -> RequestBuilder>(
        &self,
        url: Url,
        builder: F,
    ) -> Result<Response, ClientError> {
        self.send_request(Method::GET, url, builder)
    }

    pub fn send_post<F: FnOnce(RequestBuilder) -> RequestBuilder>(
        &self,
        url: Url,
        builder: F,
    ) -> Result<Response, ClientError> {
        self.send_request(Method::POST, url, builder)
    }

    pub fn send_request<F: FnOnce(RequestBuilder) -> RequestBuilder>(
        &self,
        method: Method,
        url: Url,
        builder: F,
    ) -> Result<Response, ClientError> {
        let request = builder(self.create_request(method, url));
        match request.send() {
            Ok(response) => {
                if response.status().is_success() {
                    Ok(response)
                } else {
                    let status = response.status().as_u16();
                    let box_url = Box::new(response.url().clone());
                    let body = response.text()?;
                    Err(ClientError::ApiError(status, box_url, body))
                }
            }
            Err(err) => Err(ClientError::from(err)),
        }
    }

    fn create_request(&self, method: Method, url: Url) -> RequestBuilder {
        let headers = self.build_headers();
        debug!("building request for {method} {url}");
        self.client.request(method, url).headers(headers)
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("User-Agent", HeaderValue::from_static("context-migrator"));
        // The beta API version exposes dependent flags and experiment status
        headers.insert("LD-API-Version", HeaderValue::from_static("beta"));
        if let Ok(mut auth) = HeaderValue::from_str(&self.api_key) {
            auth.set_sensitive(true);
            headers.insert("Authorization", auth);
        }
        headers
    }

    pub fn api_url(&self, path: &str) -> Result<Url, ClientError> {
        let host = self.host.as_str();
        self.host
            .join("api/v2/")
            .map_err(|e| ClientError::InvalidUrl(format!("{e} {host}api/v2")))?
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{e} {host}api/v2/{path}")))
    }

    fn list_flags_page(&self, offset: usize) -> Result<FeatureFlagPage, ClientError> {
        let url = self.api_url(&format!("flags/{}", self.project_key))?;
        let limit = PAGE_SIZE.to_string();
        let offset = offset.to_string();
        let response = self.send_get(url, |req| {
            req.query(&[
                ("env", self.env_key.as_str()),
                ("summary", "false"),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ])
        })?;
        Ok(response.json()?)
    }
}

impl FlagService for LaunchDarklyClient {
    fn list_flags(&self) -> Result<Vec<FeatureFlag>, ClientError> {
        let mut flags = Vec::new();
        loop {
            let page = self.list_flags_page(flags.len())?;
            let fetched = page.items.len();
            let has_next = page.has_next();
            flags.extend(page.items);
            debug!("fetched {fetched} flag(s), {} so far", flags.len());

            if fetched == 0 || !has_next {
                break;
            }
            if let Some(total) = page.total_count {
                if flags.len() >= total {
                    break;
                }
            }
        }
        Ok(flags)
    }

    fn dependent_flags(&self, flag_key: &str) -> Result<Vec<String>, ClientError> {
        let url = self.api_url(&format!(
            "flags/{}/{}/{}/dependent-flags",
            self.project_key, self.env_key, flag_key
        ))?;
        let list: DependentFlagList = self.send_get(url, |req| req)?.json()?;
        Ok(list.items.into_iter().map(|dep| dep.key).collect())
    }

    fn code_reference_statistics(
        &self,
        flag_key: &str,
    ) -> Result<Vec<RepositoryStatistic>, ClientError> {
        let url = self.api_url(&format!("code-refs/statistics/{}", self.project_key))?;
        let mut stats: CodeReferenceStatistics = self
            .send_get(url, |req| req.query(&[("flagKey", flag_key)]))?
            .json()?;
        Ok(stats.flags.remove(flag_key).unwrap_or_default())
    }

    fn running_experiments(&self, flag_key: &str) -> Result<u64, ClientError> {
        let url = self.api_url(&format!(
            "projects/{}/environments/{}/experiments",
            self.project_key, self.env_key
        ))?;
        let filter = format!("flagKey:{flag_key},status:running");
        let list: ExperimentList = self
            .send_get(url, |req| req.query(&[("filter", filter.as_str())]))?
            .json()?;
        Ok(list.running_count())
    }

    fn submit_approval_request(
        &self,
        flag_key: &str,
        request: &ApprovalRequest,
    ) -> Result<(), ClientError> {
        let url = self.api_url(&format!(
            "projects/{}/flags/{}/environments/{}/approval-requests",
            self.project_key, flag_key, self.env_key
        ))?;
        self.send_post(url, |req| req.json(request))?;
        Ok(())
    }
}
