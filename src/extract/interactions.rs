//! Drug-interaction JSON endpoint
//!
//! The endpoint pages a server-side table. Each row is `[anchor_html, description]`
//! where the anchor links to the other drug's detail page.

use crate::extract::text::collapse_whitespace;
use crate::record::Interaction;
use crate::{FieldError, FieldResult};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static DRUG_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href="/drugs/([^"]+)">([^<]+)</a>"#).expect("hardcoded regex pattern is valid")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InteractionPayload {
    #[serde(default)]
    records_total: u64,
    #[serde(default)]
    records_filtered: u64,
    #[serde(default)]
    data: Vec<Vec<String>>,
}

/// One decoded page of the interactions table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionPage {
    pub records_total: u64,
    pub records_filtered: u64,
    /// Rows the payload carried, including ones without a recognizable anchor
    pub row_count: usize,
    pub interactions: Vec<Interaction>,
}

/// URL of one interactions page
///
/// `cache_buster` defeats intermediary caches; any changing value works.
pub fn interactions_url(base_url: &str, id: &str, start: u64, length: u32, cache_buster: i64) -> String {
    format!(
        "{}/drugs/{}/drug_interactions.json?start={}&length={}&_={}",
        base_url, id, start, length, cache_buster
    )
}

/// Decodes one payload into interaction triples
///
/// Rows whose first column has no drug anchor are skipped.
pub fn parse_interactions(json: &str) -> FieldResult<InteractionPage> {
    let payload: InteractionPayload =
        serde_json::from_str(json).map_err(|source| FieldError::Payload {
            field: "drug_interactions",
            source,
        })?;

    let interactions = payload
        .data
        .iter()
        .filter_map(|row| {
            let (anchor, description) = (row.first()?, row.get(1)?);
            let captures = DRUG_ANCHOR.captures(anchor)?;
            Some(Interaction {
                other_id: captures[1].to_string(),
                other_name: collapse_whitespace(&captures[2]),
                description: collapse_whitespace(description),
            })
        })
        .collect();

    Ok(InteractionPage {
        records_total: payload.records_total,
        records_filtered: payload.records_filtered,
        row_count: payload.data.len(),
        interactions,
    })
}
