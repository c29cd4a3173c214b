//! Reference adapter over an embedded two-listing board
//!
//! Exercises the full adapter contract (throttle, navigate, extract, yield)
//! without touching the network.

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use jobharvest_core::application::{AdapterContext, JobStream, SiteAdapter};
use jobharvest_core::domain::NormalizedJob;
use jobharvest_core::error::{AppError, Result};
use jobharvest_core::port::RenderingSession;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub const DEMO_DOCUMENT: &str = r#"<html>
    <body>
        <ul id="jobs">
            <li data-id="demo-1" data-url="https://jobs.example/demo-1">
                <h2>Senior Platform Engineer</h2>
                <span class="company">Example Corp</span>
                <span class="location">Remote - North America</span>
            </li>
            <li data-id="demo-2" data-url="https://jobs.example/demo-2">
                <h2>Product Designer</h2>
                <span class="company">Example Corp</span>
                <span class="location">Austin, TX</span>
            </li>
        </ul>
    </body>
</html>"#;

const DEMO_DESCRIPTION: &str = "Demo listing generated for integration tests.";

#[derive(Debug, Default)]
pub struct DemoBoardAdapter;

impl DemoBoardAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SiteAdapter for DemoBoardAdapter {
    fn slug(&self) -> &str {
        "demo-board"
    }

    fn display_name(&self) -> &str {
        "Demo Job Board"
    }

    fn rate_limit_per_minute(&self) -> u32 {
        10
    }

    fn scrape<'a>(
        &'a self,
        ctx: &'a AdapterContext,
        session: &'a mut dyn RenderingSession,
    ) -> JobStream<'a> {
        stream::once(async move {
            ctx.throttle().await;
            session
                .goto(&format!("data:text/html,{}", DEMO_DOCUMENT))
                .await?;
            let markup = session.content().await?;
            let jobs = extract_listings(&markup)?;
            debug!(listings = jobs.len(), "Demo board parsed");
            Ok::<_, AppError>(stream::iter(jobs.into_iter().map(Ok::<_, AppError>)))
        })
        .try_flatten()
        .boxed()
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Internal(format!("bad selector {css}: {e}")))
}

fn text_of(item: &ElementRef<'_>, sel: &Selector) -> Option<String> {
    item.select(sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Parse every `#jobs li` listing into a normalized job
pub(crate) fn extract_listings(markup: &str) -> Result<Vec<NormalizedJob>> {
    let document = Html::parse_document(markup);
    let listing_sel = selector("#jobs li")?;
    let title_sel = selector("h2")?;
    let company_sel = selector(".company")?;
    let location_sel = selector(".location")?;
    let scraped_at = Utc::now();

    document
        .select(&listing_sel)
        .map(|item| {
            let attr = |name: &str| {
                item.value()
                    .attr(name)
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Adapter(format!("listing without {name}")))
            };
            let id = attr("data-id")?;
            let url = attr("data-url")?;
            let title = text_of(&item, &title_sel)
                .ok_or_else(|| AppError::Adapter(format!("listing {id} has no title")))?;
            let company = text_of(&item, &company_sel).unwrap_or_default();
            let location = text_of(&item, &location_sel);

            let mut job = NormalizedJob::new(id, title, company, DEMO_DESCRIPTION, url);
            job.remote = Some(location.as_deref().is_some_and(|l| l.contains("Remote")));
            job.location = location;
            job.employment_type = Some("full_time".to_string());
            job.scraped_at = scraped_at;
            job.metadata
                .insert("demo".to_string(), serde_json::Value::Bool(true));
            Ok(job)
        })
        .collect()
}
