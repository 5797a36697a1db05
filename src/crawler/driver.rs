//! Page drivers
//!
//! A driver performs the actual page work for one execution unit against the
//! shared runtime handle. Drivers are infallible by construction: anything
//! that goes wrong becomes a [`JobOutcome::Failure`], so the scheduler's
//! accounting always sees exactly one outcome per unit.

use crate::browser::RenderClient;
use crate::crawler::parser::extract_requests;
use crate::crawler::unit::{ExecutionUnit, UnitPhase};
use crate::job::{JobOutcome, PageCapture};
use async_trait::async_trait;
use url::Url;

/// The work performed for a single job against a runtime handle
#[async_trait]
pub trait PageDriver<H: Send + Sync>: Send + Sync + 'static {
    /// Drives the unit's job to a terminal outcome
    async fn drive(&self, handle: &H, unit: &ExecutionUnit) -> JobOutcome;
}

/// Default driver: fetch the page over HTTP and extract follow-up requests
///
/// Non-2xx statuses and transport errors become failure outcomes. Non-HTML
/// bodies are captured without extraction.
pub struct FetchDriver;

#[async_trait]
impl PageDriver<RenderClient> for FetchDriver {
    async fn drive(&self, handle: &RenderClient, unit: &ExecutionUnit) -> JobOutcome {
        let job = unit.job();
        unit.set_phase(UnitPhase::Fetching);

        let response = match handle.client().get(job.url().clone()).send().await {
            Ok(response) => response,
            Err(e) => return JobOutcome::failure(format!("request failed: {}", e)),
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return JobOutcome::failure(format!("http status {}", status.as_u16()));
        }

        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("text/html"))
            .unwrap_or(false);

        if !is_html {
            return JobOutcome::Success(PageCapture {
                final_url,
                status_code: status.as_u16(),
                title: None,
                discovered: vec![],
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return JobOutcome::failure(format!("failed to read body: {}", e)),
        };

        unit.set_phase(UnitPhase::Extracting);

        let base_url = Url::parse(&final_url).unwrap_or_else(|_| job.url().clone());
        let page = extract_requests(&body, &base_url);

        tracing::debug!(
            "Captured {} ({} follow-up requests)",
            final_url,
            page.requests.len()
        );

        JobOutcome::Success(PageCapture {
            final_url,
            status_code: status.as_u16(),
            title: page.title,
            discovered: page.requests,
        })
    }
}
