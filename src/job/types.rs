use crate::job::JobIdentity;
use crate::SchedulerError;
use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;

/// HTTP method metadata carried by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMethod {
    Get,
    Post,
}

impl FetchMethod {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            _ => None,
        }
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// What kind of resource a request points at
///
/// Form probes are synthesized from `<form>` elements during extraction and
/// carry placeholder parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Document,
    Form,
}

impl ResourceKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Form => "form",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "document" => Some(Self::Document),
            "form" => Some(Self::Form),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A structured crawl request: a URL plus fetch metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub method: FetchMethod,
    pub resource: ResourceKind,
}

impl PageRequest {
    /// Creates a plain document request for a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: FetchMethod::Get,
            resource: ResourceKind::Document,
        }
    }

    /// Creates a form-probe request for a URL
    pub fn form(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: FetchMethod::Get,
            resource: ResourceKind::Form,
        }
    }
}

/// The submission surface accepted by [`Scheduler::submit`]
///
/// A target carries either a bare URL or a structured [`PageRequest`];
/// submissions with neither are rejected.
///
/// [`Scheduler::submit`]: crate::crawler::Scheduler::submit
#[derive(Debug, Clone, Default)]
pub struct CrawlTarget {
    pub url: Option<String>,
    pub request: Option<PageRequest>,
}

impl CrawlTarget {
    /// Creates a target from a bare URL
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            request: None,
        }
    }

    /// Creates a target from a structured request
    pub fn request(request: PageRequest) -> Self {
        Self {
            url: None,
            request: Some(request),
        }
    }
}

/// A validated crawl job, immutable once created
///
/// Jobs are created from a [`CrawlTarget`] at submission time and consumed
/// exactly once by dispatch.
#[derive(Debug, Clone)]
pub struct CrawlJob {
    identity: JobIdentity,
    url: Url,
    method: FetchMethod,
    resource: ResourceKind,
}

impl CrawlJob {
    /// Validates a target and derives the job identity
    ///
    /// A bare URL takes precedence over a structured request when both are
    /// present. Fails with [`SchedulerError::InvalidJob`] when the target is
    /// empty, the URL does not parse, the scheme is not http(s), or the URL
    /// has no host.
    pub fn from_target(target: CrawlTarget) -> Result<Self, SchedulerError> {
        let request = match (target.url, target.request) {
            (Some(url), _) => PageRequest::new(url),
            (None, Some(request)) => request,
            (None, None) => {
                return Err(SchedulerError::InvalidJob(
                    "target carries neither a url nor a request".to_string(),
                ))
            }
        };

        let url = Url::parse(&request.url).map_err(|e| {
            SchedulerError::InvalidJob(format!("unparseable url '{}': {}", request.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SchedulerError::InvalidJob(format!(
                "unsupported scheme '{}' in '{}'",
                url.scheme(),
                url
            )));
        }

        if url.host_str().is_none() {
            return Err(SchedulerError::InvalidJob(format!("url '{}' has no host", url)));
        }

        let identity = JobIdentity::from_url(&url);

        Ok(Self {
            identity,
            url,
            method: request.method,
            resource: request.resource,
        })
    }

    pub fn identity(&self) -> &JobIdentity {
        &self.identity
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> FetchMethod {
        self.method
    }

    pub fn resource(&self) -> ResourceKind {
        self.resource
    }
}

/// What an execution unit captured from a successfully-driven page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCapture {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code of the final response
    pub status_code: u16,

    /// Page title, when the body was HTML and carried one
    pub title: Option<String>,

    /// Follow-up requests discovered on the page (links and form probes).
    /// Feeding these back into the queue is the caller's decision.
    pub discovered: Vec<PageRequest>,
}

/// Terminal outcome of one execution unit
///
/// Failures flow through the same completion channel as successes and count
/// toward the recycle threshold exactly like them; a failed crawl still
/// occupied a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success(PageCapture),
    Failure { error: String },
}

impl JobOutcome {
    /// Creates a failure outcome from an error description
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// A finished job as recorded by the completion cache
#[derive(Debug, Clone)]
pub struct FinishedRecord {
    pub identity: JobIdentity,
    pub outcome: JobOutcome,
    pub finished_at: DateTime<Utc>,
}
