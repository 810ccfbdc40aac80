use super::{RunnerApi, RunnerCommand, RunnerError};
use crate::model::{MonitorConfig, RemoteConfig, StatisticsBatch};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, Url};

const STATISTICS: &str = "statistics";
const CONFIG: &str = "config";
const CSV: &str = "csv";

/// HTTP client for one runner instance.
#[derive(Debug, Clone)]
pub struct RunnerClient {
    http: Client,
    base: Url,
    token: Option<String>,
}

/// Parse the runner base URL so that relative joins land below its path.
fn parse_base_url(raw: &str) -> Result<Url, RunnerError> {
    let invalid = |reason: String| RunnerError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let mut base = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", base.scheme())));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    Ok(base)
}

impl RunnerClient {
    pub fn new(cfg: &MonitorConfig) -> Result<Self, RunnerError> {
        let base = parse_base_url(&cfg.base_url)?;
        let http = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|source| RunnerError::Transport {
                endpoint: "client",
                source,
            })?;
        Ok(Self {
            http,
            base,
            token: cfg.token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, RunnerError> {
        self.base.join(path).map_err(|e| RunnerError::InvalidUrl {
            url: format!("{}{}", self.base, path),
            reason: e.to_string(),
        })
    }

    fn statistics_url(&self, since: &str) -> Result<Url, RunnerError> {
        let mut url = self.url(STATISTICS)?;
        url.query_pairs_mut().append_pair("since", since);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let rb = self.http.request(method, url);
        match self.token.as_deref() {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    async fn send_checked(
        &self,
        endpoint: &'static str,
        rb: RequestBuilder,
    ) -> Result<Response, RunnerError> {
        let resp = rb
            .send()
            .await
            .map_err(|source| RunnerError::Transport { endpoint, source })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RunnerError::Status { endpoint, status });
        }
        Ok(resp)
    }

    async fn body(&self, endpoint: &'static str, resp: Response) -> Result<Vec<u8>, RunnerError> {
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|source| RunnerError::Transport { endpoint, source })
    }

    /// `GET /config`
    pub async fn fetch_config(&self) -> Result<RemoteConfig, RunnerError> {
        let rb = self.request(Method::GET, self.url(CONFIG)?);
        let resp = self.send_checked("GET /config", rb).await?;
        let body = self.body("GET /config", resp).await?;
        serde_json::from_slice(&body).map_err(|e| RunnerError::Malformed {
            endpoint: "GET /config",
            reason: e.to_string(),
        })
    }

    /// `PUT /config` with a raw JSON document. The runner persists it as-is.
    pub async fn put_config(&self, raw: String) -> Result<(), RunnerError> {
        let rb = self
            .request(Method::PUT, self.url(CONFIG)?)
            .header(CONTENT_TYPE, "application/json")
            .body(raw);
        self.send_checked("PUT /config", rb).await?;
        Ok(())
    }

    /// `GET /csv`. The runner wraps the CSV text in a JSON string.
    pub async fn fetch_csv(&self) -> Result<String, RunnerError> {
        let rb = self.request(Method::GET, self.url(CSV)?);
        let resp = self.send_checked("GET /csv", rb).await?;
        let body = self.body("GET /csv", resp).await?;
        match serde_json::from_slice::<String>(&body) {
            Ok(text) => Ok(text),
            Err(_) => String::from_utf8(body).map_err(|e| RunnerError::Malformed {
                endpoint: "GET /csv",
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl RunnerApi for RunnerClient {
    async fn fetch_statistics(&self, since: &str) -> Result<StatisticsBatch, RunnerError> {
        const ENDPOINT: &str = "GET /statistics";
        let rb = self.request(Method::GET, self.statistics_url(since)?);
        let resp = self.send_checked(ENDPOINT, rb).await?;
        let body = self.body(ENDPOINT, resp).await?;
        StatisticsBatch::from_json(&body).map_err(|reason| RunnerError::Malformed {
            endpoint: ENDPOINT,
            reason,
        })
    }

    async fn send_command(&self, command: RunnerCommand) -> Result<(), RunnerError> {
        let rb = self.request(command.method(), self.url(command.path())?);
        self.send_checked(command.label(), rb).await?;
        Ok(())
    }
}
