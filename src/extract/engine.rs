//! Extraction engine
//!
//! Turns one detail document into a [`Record`] in two phases:
//!
//! 1. [`ExtractionEngine::extract`] walks the document's `<dl>` label/value pairs in
//!    document order and routes each through the handler registry, or assigns it with
//!    the default strategy. This phase is synchronous because the document cannot
//!    cross an `.await`.
//! 2. [`ExtractionEngine::resolve`] runs the fields whose handler needs a follow-up
//!    request, using values the first phase assigned (the record id).
//!
//! A failing field is logged and skipped; the rest of the record is still extracted.

use crate::config::{HarvestConfig, SiteConfig};
use crate::crawler::fetcher::Fetcher;
use crate::document::{Document, Node};
use crate::extract::attribute::{Attribute, Slot};
use crate::extract::handlers::{Handler, HandlerRegistry};
use crate::extract::interactions::{interactions_url, parse_interactions};
use crate::extract::text::{is_absent, normalize};
use crate::record::{Interaction, Link, Record};
use crate::{FieldError, FieldResult, HarvestError};
use std::sync::Arc;

/// Field labels and their values
const FIELD_LABELS: &str = "dl dt";

/// Banner marking an incompletely annotated entry
const STUB_NOTICE: &str = ".stub-notice";

/// Output of the synchronous phase
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: Record,

    /// Secondary fields seen in the document, in document order
    pub pending: Vec<Attribute>,
}

/// Label-driven record extraction
#[derive(Debug)]
pub struct ExtractionEngine {
    registry: HandlerRegistry,
    base_url: String,
    stub_notice: String,
    fetcher: Arc<Fetcher>,
    interaction_page_length: u32,
    max_interaction_pages: u32,
}

impl ExtractionEngine {
    pub fn new(
        registry: HandlerRegistry,
        site: &SiteConfig,
        harvest: &HarvestConfig,
        fetcher: Arc<Fetcher>,
    ) -> Self {
        Self {
            registry,
            base_url: site.base_url.clone(),
            stub_notice: normalize(&site.stub_notice),
            fetcher,
            interaction_page_length: harvest.interaction_page_length.max(1),
            max_interaction_pages: harvest.max_interaction_pages,
        }
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    /// Fetches, extracts and resolves the record behind `link`
    pub async fn process(&self, link: &Link) -> Result<Record, HarvestError> {
        if link.url.is_empty() {
            return Err(HarvestError::RecordFault {
                url: String::new(),
                message: format!("listing entry '{}' has no detail link", link.name),
            });
        }

        let extraction = {
            let document = self.fetcher.fetch_document(&link.url).await?;
            self.extract(&document, link)
        };

        Ok(self.resolve(extraction).await)
    }

    /// Walks the document's field list into a record
    pub fn extract(&self, document: &Document, link: &Link) -> Extraction {
        let mut record = Record {
            link: link.url.clone(),
            is_stub: self.is_stub(document),
            ..Default::default()
        };
        let mut pending = Vec::new();

        let labels = match document.select(FIELD_LABELS) {
            Ok(labels) => labels,
            Err(e) => {
                tracing::warn!("Cannot walk fields of {}: {}", link.url, e);
                return Extraction { record, pending };
            }
        };

        for label in labels {
            let label_text = label.text();

            let Some(value) = label.next_element() else {
                tracing::debug!("Label '{}' on {} has no value", label_text.trim(), link.url);
                continue;
            };

            let Some(attribute) = Attribute::from_label(&label_text) else {
                tracing::trace!("Ignoring unknown label '{}'", label_text.trim());
                continue;
            };

            if is_absent(&value.text()) {
                tracing::debug!("{} not available on {}", attribute.canonical(), link.url);
                continue;
            }

            if let Err(e) = self.route(attribute, value, &mut record, &mut pending) {
                tracing::warn!(
                    "Skipping field {} of {}: {}",
                    attribute.canonical(),
                    link.url,
                    e
                );
            }
        }

        Extraction { record, pending }
    }

    /// Runs the deferred secondary handlers
    ///
    /// A failed secondary field is logged and left empty.
    pub async fn resolve(&self, extraction: Extraction) -> Record {
        let Extraction {
            mut record,
            pending,
        } = extraction;

        for attribute in pending {
            let result = match attribute {
                Attribute::DrugInteractions => match self.fetch_interactions(&record.id).await {
                    Ok((interactions, total)) => {
                        record.drug_interactions = interactions;
                        record.interactions_total = total;
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                other => Err(FieldError::Handler {
                    field: other.field_name(),
                    message: "no secondary resolver".to_string(),
                }),
            };

            if let Err(e) = result {
                tracing::warn!(
                    "Skipping field {} of {}: {}",
                    attribute.canonical(),
                    record.link,
                    e
                );
            }
        }

        record
    }

    fn is_stub(&self, document: &Document) -> bool {
        let notices = match document.select(STUB_NOTICE) {
            Ok(notices) => notices,
            Err(e) => {
                tracing::warn!("Cannot read stub notice: {}", e);
                return false;
            }
        };

        notices.first().is_some_and(|notice| {
            let text: String = notice.children().iter().map(|child| child.text()).collect();
            normalize(&text) == self.stub_notice
        })
    }

    fn route(
        &self,
        attribute: Attribute,
        value: Node<'_>,
        record: &mut Record,
        pending: &mut Vec<Attribute>,
    ) -> FieldResult<()> {
        match self.registry.get(attribute) {
            Some(Handler::Inline(handler)) => {
                tracing::trace!("Handling {} with its registered handler", attribute.canonical());
                handler(value, attribute.slot(record), attribute)
            }
            Some(Handler::Secondary) => {
                pending.push(attribute);
                Ok(())
            }
            None => assign_default(attribute, value, attribute.slot(record)),
        }
    }

    /// Pages through the interactions endpoint for `id`
    async fn fetch_interactions(&self, id: &str) -> FieldResult<(Vec<Interaction>, u64)> {
        if id.is_empty() {
            return Err(FieldError::Handler {
                field: Attribute::DrugInteractions.field_name(),
                message: "record has no id to look interactions up by".to_string(),
            });
        }

        let length = self.interaction_page_length;
        let mut interactions = Vec::new();
        let mut total = 0;
        let mut start = 0u64;

        for _ in 0..self.max_interaction_pages {
            let url = interactions_url(
                &self.base_url,
                id,
                start,
                length,
                chrono::Utc::now().timestamp_millis(),
            );
            let body = self
                .fetcher
                .fetch_text(&url)
                .await
                .map_err(|source| FieldError::Secondary {
                    field: Attribute::DrugInteractions.field_name(),
                    source,
                })?;

            let page = parse_interactions(&body)?;
            total = page.records_total;
            interactions.extend(page.interactions);

            start += u64::from(length);
            if page.row_count == 0 || start >= total {
                break;
            }
        }

        tracing::debug!("{} has {} of {} interactions", id, interactions.len(), total);
        Ok((interactions, total))
    }
}

/// Assigns the value text to a scalar destination
fn assign_default(attribute: Attribute, value: Node<'_>, slot: Slot<'_>) -> FieldResult<()> {
    match slot {
        Slot::Scalar(destination) => {
            *destination = attribute.transform().apply(&value.text());
            Ok(())
        }
        other => Err(FieldError::Mismatch {
            field: attribute.field_name(),
            slot: other.kind(),
        }),
    }
}
