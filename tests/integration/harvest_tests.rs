//! Integration tests for complete harvests
//!
//! These tests serve a miniature catalog from wiremock: two listing pages, a
//! handful of detail pages and the interactions endpoint.

use drugbank_harvester::config::{Config, FetcherConfig, HarvestConfig, OutputConfig, SiteConfig};
use drugbank_harvester::crawler::{harvest, HarvestTarget, Harvester, RunCounters};
use drugbank_harvester::document::Node;
use drugbank_harvester::extract::{Attribute, Handler, HandlerRegistry, Slot};
use drugbank_harvester::output::{write_corpus, write_stats, RunStats};
use drugbank_harvester::{FieldResult, HarvestError, Record};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTERACTIONS: &str = r#"{
    "draw": 0,
    "recordsTotal": 1,
    "recordsFiltered": 1,
    "data": [["<a href=\"/drugs/DB09999\">Warfarin</a>", "The risk of bleeding can be increased."]]
}"#;

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str) -> Config {
    Config {
        site: SiteConfig {
            base_url: base_url.to_string(),
            listing_path: "/drugs?page=".to_string(),
            ..SiteConfig::default()
        },
        fetcher: FetcherConfig {
            retry_limit: 2,
            base_delay_ms: 0,
            error_delay_ms: 0,
            ..FetcherConfig::default()
        },
        harvest: HarvestConfig {
            max_pages: 10,
            workers: 3,
            ..HarvestConfig::default()
        },
        output: OutputConfig::default(),
    }
}

fn listing_page(entries: &[(&str, &str)]) -> String {
    let rows: String = entries
        .iter()
        .map(|(id, name)| {
            format!(
                r#"<tr><td><strong><a href="/drugs/{id}">{name}</a></strong></td><td>-</td></tr>"#
            )
        })
        .collect();

    format!(
        r#"<html><body>
        <table id="drugs-table">
            <thead><tr><th>Name</th><th>Weight</th></tr></thead>
            <tbody>{rows}</tbody>
        </table>
        </body></html>"#
    )
}

/// A detail page; complete pages carry every field a valid record needs
fn detail_page(id: &str, name: &str, complete: bool) -> String {
    let extra = if complete {
        format!(
            r#"<dt>Synonyms</dt><dd><ul><li>{name} alpha</li></ul></dd>
            <dt>Weight</dt><dd>Average: 180.159<br>Monoisotopic: 180.042 Da</dd>
            <dt>Categories</dt><dd><ul><li>Anticoagulants</li></ul></dd>
            <dt>Mechanism of action</dt><dd><table><tbody>
                <tr><td>Prothrombin</td><td>inhibitor</td><td>Humans</td></tr>
            </tbody></table></dd>
            <dt>InChI Key</dt><dd>bsynrygnxymlxb-uhfffaoysa-n</dd>
            <dt>InChI</dt><dd>InChI=1S/C9H8O4</dd>
            <dt>Drug Interactions</dt><dd><table id="drug-interactions-table"></table></dd>"#
        )
    } else {
        String::new()
    };

    format!(
        r#"<html><body>
        <a class="track-link" href="/ads">Sponsored</a>
        <dl>
            <dt>Generic Name</dt><dd>{name}</dd>
            <dt>DrugBank Accession Number</dt><dd>{id}</dd>
            <dt>Type</dt><dd>Small Molecule</dd>
            {extra}
        </dl>
        </body></html>"#
    )
}

async fn mount_listing(server: &MockServer, page: &str, entries: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path("/drugs"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(entries)))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str, name: &str, complete: bool) {
    Mock::given(method("GET"))
        .and(path(format!("/drugs/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(id, name, complete)))
        .mount(server)
        .await;
}

async fn mount_interactions(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/drugs/DB\d+/drug_interactions\.json$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INTERACTIONS))
        .mount(server)
        .await;
}

/// Two listing pages of three entries; DB00001 is listed on both
async fn mount_catalog(server: &MockServer) {
    mount_listing(
        server,
        "0",
        &[("DB00001", "Lepirudin"), ("DB00002", "Cetuximab"), ("DB00003", "Dornase alfa")],
    )
    .await;
    mount_listing(
        server,
        "1",
        &[("DB00004", "Denileukin"), ("DB00005", "Etanercept"), ("DB00001", "Lepirudin")],
    )
    .await;

    mount_detail(server, "DB00001", "Lepirudin", true).await;
    mount_detail(server, "DB00002", "Cetuximab", true).await;
    mount_detail(server, "DB00003", "Dornase alfa", false).await;
    mount_detail(server, "DB00004", "Denileukin", false).await;
    mount_detail(server, "DB00005", "Etanercept", true).await;
    mount_interactions(server).await;
}

fn find<'a>(records: &'a [Record], id: &str) -> &'a Record {
    records
        .iter()
        .find(|record| record.id == id)
        .unwrap_or_else(|| panic!("{} was not harvested", id))
}

#[tokio::test]
async fn test_harvest_pages() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let run = harvest(config, HarvestTarget::Pages(2)).await.unwrap();

    assert_eq!(run.records.len(), 6);

    let lepirudin = find(&run.records, "DB00001");
    assert_eq!(lepirudin.molecule, "Lepirudin");
    assert_eq!(lepirudin.kind, "Small Molecule");
    assert_eq!(lepirudin.link, format!("{}/drugs/DB00001", mock_server.uri()));
    assert_eq!(lepirudin.synonyms, vec!["Lepirudin alpha"]);
    assert_eq!(lepirudin.weight.len(), 2);
    assert_eq!(lepirudin.moa[0].target, "Prothrombin");
    assert_eq!(lepirudin.inchi.hash, "BSYNRYGNXYMLXB-UHFFFAOYSA-N");
    assert_eq!(lepirudin.interactions_total, 1);
    assert_eq!(lepirudin.drug_interactions[0].other_id, "DB09999");
    assert_eq!(lepirudin.drug_interactions[0].other_name, "Warfarin");
    assert!(!lepirudin.is_stub);

    let dornase = find(&run.records, "DB00003");
    assert!(dornase.synonyms.is_empty());
    assert!(dornase.drug_interactions.is_empty());

    let stats = &run.stats;
    assert_eq!(stats.stats.total_records, 6);
    assert_eq!(stats.duplicate_entries.total, 1);
    assert_eq!(stats.duplicate_entries.set.get("DB00001"), Some(&true));
    assert_eq!(stats.duplicate_entries.set.get("DB00002"), Some(&false));

    // DB00001 twice, DB00002 and DB00005
    assert_eq!(stats.valid_records.total, 4);
    assert_eq!(stats.valid_records.set.len(), 3);
    assert!(!stats.valid_records.set.contains_key("DB00003"));

    // Two listing pages, six detail pages, four interaction lookups
    assert_eq!(stats.num_requests, 12);
    assert_eq!(stats.num_retries, 0);
    assert!(stats.rate_limit_failures.is_empty());
}

#[tokio::test]
async fn test_failed_detail_page_is_dropped() {
    let mock_server = MockServer::start().await;
    mount_listing(
        &mock_server,
        "0",
        &[("DB00001", "Lepirudin"), ("DB00002", "Cetuximab")],
    )
    .await;
    mount_detail(&mock_server, "DB00001", "Lepirudin", false).await;
    Mock::given(method("GET"))
        .and(path("/drugs/DB00002"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let run = harvest(config, HarvestTarget::Pages(1)).await.unwrap();

    assert_eq!(run.records.len(), 1);
    assert_eq!(run.records[0].id, "DB00001");

    let failed = format!("{}/drugs/DB00002", mock_server.uri());
    assert_eq!(run.stats.rate_limit_failures, vec![failed]);
    assert_eq!(run.stats.num_rate_limit_failures, 1);
    assert_eq!(run.stats.num_retries, 1);
    assert_eq!(run.stats.num_errors, 2);
}

#[tokio::test]
async fn test_failed_listing_page_contributes_nothing() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, "0", &[("DB00001", "Lepirudin")]).await;
    Mock::given(method("GET"))
        .and(path("/drugs"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Error code: 1015"))
        .mount(&mock_server)
        .await;
    mount_detail(&mock_server, "DB00001", "Lepirudin", false).await;

    let config = create_test_config(&mock_server.uri());
    let run = harvest(config, HarvestTarget::Pages(2)).await.unwrap();

    assert_eq!(run.records.len(), 1);
    assert_eq!(run.stats.num_rate_limit_failures, 1);
}

#[tokio::test]
async fn test_harvest_single_id() {
    let mock_server = MockServer::start().await;
    mount_detail(&mock_server, "DB00007", "Leuprolide", true).await;
    mount_interactions(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let harvester = Harvester::new(config, Arc::new(RunCounters::new())).unwrap();
    let run = harvester.run(HarvestTarget::Id(7)).await.unwrap();

    assert_eq!(run.records.len(), 1);
    let record = &run.records[0];
    assert_eq!(record.id, "DB00007");
    assert_eq!(record.molecule, "Leuprolide");
    assert_eq!(run.stats.valid_records.total, 1);
    assert_eq!(run.stats.duplicate_entries.total, 0);
    assert_eq!(harvester.counters().requests(), 2);
}

#[tokio::test]
async fn test_out_of_range_target_is_rejected() {
    let mock_server = MockServer::start().await;

    let config = create_test_config(&mock_server.uri());
    let result = harvest(config, HarvestTarget::Pages(11)).await;

    assert!(matches!(result, Err(HarvestError::InvalidTarget(_))));
    let received = mock_server.received_requests().await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_run_artifacts_are_written() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;
    let temp = TempDir::new().unwrap();

    let config = create_test_config(&mock_server.uri());
    let run = harvest(config, HarvestTarget::Pages(1)).await.unwrap();

    let corpus_path = write_corpus(&temp.path().join("results"), &run.records).unwrap();
    let stats_path = write_stats(&temp.path().join("stats"), &run.stats).unwrap();

    assert!(corpus_path.to_string_lossy().ends_with("_len3.json"));
    let corpus: Vec<Record> =
        serde_json::from_str(&std::fs::read_to_string(&corpus_path).unwrap()).unwrap();
    assert_eq!(corpus.len(), 3);

    let stats: RunStats =
        serde_json::from_str(&std::fs::read_to_string(&stats_path).unwrap()).unwrap();
    assert_eq!(stats.stats.total_records, 3);
    assert_eq!(stats.config_hash, "default");
}

fn panic_on_cetuximab(node: Node<'_>, slot: Slot<'_>, _attribute: Attribute) -> FieldResult<()> {
    let name = node.text();
    if name == "Cetuximab" {
        panic!("cannot handle {}", name);
    }
    if let Slot::Scalar(destination) = slot {
        *destination = name;
    }
    Ok(())
}

#[tokio::test]
async fn test_panicking_extraction_drops_only_that_record() {
    let mock_server = MockServer::start().await;
    mount_listing(
        &mock_server,
        "0",
        &[("DB00001", "Lepirudin"), ("DB00002", "Cetuximab")],
    )
    .await;
    mount_detail(&mock_server, "DB00001", "Lepirudin", false).await;
    mount_detail(&mock_server, "DB00002", "Cetuximab", false).await;

    let mut registry = HandlerRegistry::standard();
    registry.register(Attribute::Molecule, Handler::Inline(panic_on_cetuximab));

    let config = create_test_config(&mock_server.uri());
    let harvester =
        Harvester::with_registry(config, Arc::new(RunCounters::new()), registry).unwrap();
    let run = harvester.run(HarvestTarget::Pages(1)).await.unwrap();

    assert_eq!(run.records.len(), 1);
    assert_eq!(run.records[0].id, "DB00001");
    assert_eq!(run.records[0].molecule, "Lepirudin");
    assert_eq!(run.stats.stats.total_records, 1);
}

fn interactions_payload(total: u64, ids: &[&str]) -> String {
    let rows: Vec<_> = ids
        .iter()
        .map(|id| {
            json!([
                format!(r#"<a href="/drugs/{id}">Drug {id}</a>"#),
                format!("Interacts with {id}.")
            ])
        })
        .collect();
    json!({ "recordsTotal": total, "recordsFiltered": total, "data": rows }).to_string()
}

async fn mount_interactions_page(server: &MockServer, start: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/drugs/DB00001/drug_interactions.json"))
        .and(query_param("start", start))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn interaction_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path().ends_with("/drug_interactions.json"))
        .count()
}

async fn harvest_first_drug(server: &MockServer, page_length: u32, max_pages: u32) -> Record {
    let mut config = create_test_config(&server.uri());
    config.harvest.interaction_page_length = page_length;
    config.harvest.max_interaction_pages = max_pages;

    let mut run = harvest(config, HarvestTarget::Id(1)).await.unwrap();
    assert_eq!(run.records.len(), 1);
    run.records.remove(0)
}

#[tokio::test]
async fn test_interactions_are_paged_until_records_total() {
    let mock_server = MockServer::start().await;
    mount_detail(&mock_server, "DB00001", "Lepirudin", true).await;
    mount_interactions_page(&mock_server, "0", interactions_payload(3, &["DB00010", "DB00011"])).await;
    mount_interactions_page(&mock_server, "2", interactions_payload(3, &["DB00012"])).await;

    let record = harvest_first_drug(&mock_server, 2, 10).await;

    assert_eq!(record.interactions_total, 3);
    let ids: Vec<_> = record.drug_interactions.iter().map(|i| i.other_id.as_str()).collect();
    assert_eq!(ids, vec!["DB00010", "DB00011", "DB00012"]);
    assert_eq!(record.drug_interactions[2].description, "Interacts with DB00012.");
    assert_eq!(interaction_requests(&mock_server).await, 2);
}

#[tokio::test]
async fn test_interaction_paging_stops_at_page_cap() {
    let mock_server = MockServer::start().await;
    mount_detail(&mock_server, "DB00001", "Lepirudin", true).await;
    mount_interactions_page(&mock_server, "0", interactions_payload(3, &["DB00010", "DB00011"])).await;
    mount_interactions_page(&mock_server, "2", interactions_payload(3, &["DB00012"])).await;

    let record = harvest_first_drug(&mock_server, 2, 1).await;

    assert_eq!(record.interactions_total, 3);
    assert_eq!(record.drug_interactions.len(), 2);
    assert_eq!(interaction_requests(&mock_server).await, 1);
}

#[tokio::test]
async fn test_interaction_paging_stops_on_empty_page() {
    let mock_server = MockServer::start().await;
    mount_detail(&mock_server, "DB00001", "Lepirudin", true).await;
    mount_interactions_page(&mock_server, "0", interactions_payload(10, &["DB00010", "DB00011"])).await;
    mount_interactions_page(&mock_server, "2", interactions_payload(10, &[])).await;

    let record = harvest_first_drug(&mock_server, 2, 10).await;

    assert_eq!(record.interactions_total, 10);
    assert_eq!(record.drug_interactions.len(), 2);
    assert_eq!(interaction_requests(&mock_server).await, 2);
}

#[tokio::test]
async fn test_failed_interactions_keep_the_record() {
    let mock_server = MockServer::start().await;
    mount_detail(&mock_server, "DB00001", "Lepirudin", true).await;
    mount_interactions_page(&mock_server, "0", "<html><body>maintenance</body></html>".to_string())
        .await;

    let record = harvest_first_drug(&mock_server, 100, 10).await;

    assert_eq!(record.id, "DB00001");
    assert!(record.drug_interactions.is_empty());
    assert_eq!(record.interactions_total, 0);
    assert_eq!(record.synonyms, vec!["Lepirudin alpha"]);
    assert_eq!(record.categories, vec!["Anticoagulants"]);
}
