// The one place we actually talk HTTP
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

const USER_AGENT_VALUE: &str = "ChainScout/0.1.0";

/// Anything that can go wrong between sending a GET and holding a decoded body.
///
/// `context` says which query or page was being fetched so the caller can log
/// it without threading the URL around.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{context}: request failed with status {status}: {body}")]
    Status {
        status: u16,
        context: String,
        body: String,
    },

    #[error("{context}: network error: {source}")]
    Network {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context}: malformed response: {source}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// A decoded JSON body along with the raw `Link` header, if any
#[derive(Debug, Clone)]
pub struct JsonResponse<T> {
    pub body: T,
    pub link: Option<String>,
}

/// Single-shot GET + JSON decode with an optional `token` authorization header.
///
/// No retries live here. A failed call is reported once and the caller decides
/// whether that kills a page, a query, or nothing at all.
pub struct HttpFetcher {
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpFetcher {
    pub fn new(token: Option<String>, accept: &'static str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static(accept));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|source| FetchError::Network {
                context: "building HTTP client".to_string(),
                source,
            })?;

        Ok(Self {
            client,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// GET `url` and decode the body.
    ///
    /// `204 No Content` decodes to `T::default()`: GitHub answers the
    /// contributors of an empty repository that way.
    pub async fn get_json<T: DeserializeOwned + Default>(
        &self,
        url: &str,
        context: &str,
    ) -> Result<JsonResponse<T>> {
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(ref token) = self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = request.send().await.map_err(|source| FetchError::Network {
            context: context.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                context: context.to_string(),
                body,
            });
        }

        let link = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if status == StatusCode::NO_CONTENT {
            return Ok(JsonResponse {
                body: T::default(),
                link,
            });
        }

        let text = response.text().await.map_err(|source| FetchError::Network {
            context: context.to_string(),
            source,
        })?;

        Ok(JsonResponse {
            body: decode(&text, context)?,
            link,
        })
    }
}

/// Parse a response body, tagging failures with the fetch context
pub fn decode<T: DeserializeOwned>(text: &str, context: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|source| FetchError::Parse {
        context: context.to_string(),
        source,
    })
}
