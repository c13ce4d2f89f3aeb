//! Listing-page link discovery
//!
//! Fans out one task per listing page. Tasks share a semaphore so only `workers`
//! listing fetches are in flight at once, and report through an unbounded channel
//! that closes when the last task drops its sender.

use crate::config::SiteConfig;
use crate::crawler::fetcher::Fetcher;
use crate::document::{Document, DocumentError};
use crate::extract::text::collapse_whitespace;
use crate::record::Link;
use crate::HarvestError;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use url::Url;

/// Table rows holding one catalog entry each
const LISTING_ROWS: &str = "#drugs-table tr";

/// Parses one listing page into links
///
/// Rows without cells (the header) are skipped. The name is the first cell's text;
/// the URL is the first cell's anchor resolved against `base_url`, or empty when the
/// cell has no anchor.
pub fn parse_listing(document: &Document, base_url: &Url) -> Result<Vec<Link>, DocumentError> {
    let mut links = Vec::new();

    for row in document.select(LISTING_ROWS)? {
        let cells = row.select("td")?;
        let Some(first) = cells.first() else {
            continue;
        };

        let url = first
            .select("a")?
            .first()
            .and_then(|anchor| anchor.attr("href"))
            .and_then(|href| base_url.join(&href).ok())
            .map(|url| url.to_string())
            .unwrap_or_default();

        links.push(Link::new(collapse_whitespace(&first.text()), url));
    }

    Ok(links)
}

/// Builds the set of detail links from the paginated listing
pub struct LinkHarvester {
    fetcher: Arc<Fetcher>,
    site: SiteConfig,
    base_url: Url,
    permits: Arc<Semaphore>,
}

impl LinkHarvester {
    pub fn new(fetcher: Arc<Fetcher>, site: SiteConfig, workers: usize) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&site.base_url)?;
        Ok(Self {
            fetcher,
            site,
            base_url,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        })
    }

    /// Collects links from listing pages `0..page_count`
    ///
    /// A page whose fetch fails contributes no links; the harvest continues. Order
    /// across pages is whatever order the pages complete in.
    pub async fn collect_links(&self, page_count: u32) -> Vec<Link> {
        let (tx, mut rx) = mpsc::unbounded_channel::<(u32, Vec<Link>)>();

        for page in 0..page_count {
            let tx = tx.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&self.permits);
            let base_url = self.base_url.clone();
            let url = self.site.listing_url(page);

            tokio::spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };

                match fetch_listing_page(&fetcher, &url, &base_url).await {
                    Ok(links) => {
                        let _ = tx.send((page, links));
                    }
                    Err(e) => tracing::warn!("Skipping listing page {}: {}", page, e),
                }
            });
        }

        // The channel closes once every page task has dropped its sender
        drop(tx);

        let mut links = Vec::new();
        while let Some((page, page_links)) = rx.recv().await {
            tracing::info!(
                "Listing page {} yielded {} links ({} collected)",
                page,
                page_links.len(),
                links.len() + page_links.len()
            );
            links.extend(page_links);
        }

        links
    }
}

async fn fetch_listing_page(
    fetcher: &Fetcher,
    url: &str,
    base_url: &Url,
) -> Result<Vec<Link>, HarvestError> {
    let document = fetcher.fetch_document(url).await?;
    Ok(parse_listing(&document, base_url)?)
}
