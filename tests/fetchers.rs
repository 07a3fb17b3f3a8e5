use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use collabmap::nwo::{NwoClient, ProjectFilter, PAGE_SIZE};
use collabmap::ror::RorClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Params = HashMap<String, String>;
type RequestLog = Arc<Mutex<Vec<Params>>>;

/// Serve `app` on a random local port and return its base URL
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}", addr)
}

/// Address nothing listens on
fn dead_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

/// Project API stub; every request's query string is recorded in `log`
fn projects_app(respond: fn(&Params) -> (StatusCode, Value), log: RequestLog) -> Router {
    Router::new().route(
        "/projects",
        get(move |Query(params): Query<Params>| {
            let log = log.clone();
            async move {
                let (status, body) = respond(&params);
                log.lock().expect("log lock").push(params);
                (status, Json(body))
            }
        }),
    )
}

/// `count` records alternating between an Open Science scheme and Veni
fn open_science_page(count: usize) -> Value {
    let projects: Vec<Value> = (0..count)
        .map(|i| {
            let scheme = if i % 2 == 0 {
                "Open Science NL - Call A"
            } else {
                "Veni"
            };
            json!({
                "project_id": format!("500.{:03}", i),
                "funding_scheme": scheme,
                "project_members": [{ "organisation": "UvA" }, { "organisation": "KB" }]
            })
        })
        .collect();
    json!({ "projects": projects })
}

fn open_science_filter() -> ProjectFilter {
    ProjectFilter::IdPrefix {
        prefix: "500.".to_string(),
        scheme_prefix: Some("Open Science NL".to_string()),
    }
}

fn page_number(params: &Params) -> usize {
    params
        .get("page")
        .and_then(|p| p.parse().ok())
        .expect("page parameter")
}

#[tokio::test]
async fn test_failed_page_keeps_earlier_pages() {
    let log = RequestLog::default();
    let base = serve(projects_app(
        |params| match page_number(params) {
            1 => (StatusCode::OK, open_science_page(PAGE_SIZE)),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "unavailable" })),
        },
        log.clone(),
    ))
    .await;

    let client = NwoClient::new(format!("{}/projects", base)).expect("client");
    let projects = client.fetch_projects(&open_science_filter()).await;

    assert_eq!(projects.len(), PAGE_SIZE / 2);
    assert!(projects
        .iter()
        .all(|p| p.funding_scheme.as_deref() == Some("Open Science NL - Call A")));

    let requests = log.lock().expect("log lock");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].get("project_id").map(String::as_str), Some("500."));
    assert_eq!(requests[0].get("pageSize").map(String::as_str), Some("100"));
    assert_eq!(page_number(&requests[1]), 2);
}

#[tokio::test]
async fn test_short_page_ends_sweep() {
    let log = RequestLog::default();
    let base = serve(projects_app(
        |_| (StatusCode::OK, open_science_page(10)),
        log.clone(),
    ))
    .await;

    let client = NwoClient::new(format!("{}/projects", base)).expect("client");
    let projects = client.fetch_projects(&open_science_filter()).await;

    assert_eq!(projects.len(), 5);
    assert_eq!(log.lock().expect("log lock").len(), 1);
}

#[tokio::test]
async fn test_empty_page_ends_sweep() {
    let log = RequestLog::default();
    let base = serve(projects_app(
        |params| match page_number(params) {
            1 => (StatusCode::OK, open_science_page(PAGE_SIZE)),
            _ => (StatusCode::OK, json!({ "projects": [] })),
        },
        log.clone(),
    ))
    .await;

    let client = NwoClient::new(format!("{}/projects", base)).expect("client");
    let projects = client.fetch_projects(&open_science_filter()).await;

    assert_eq!(projects.len(), PAGE_SIZE / 2);
    assert_eq!(log.lock().expect("log lock").len(), 2);
}

#[tokio::test]
async fn test_reporting_years_sweep_each_year() {
    let log = RequestLog::default();
    let base = serve(projects_app(
        |params| {
            let year = params.get("reporting_year").cloned().unwrap_or_default();
            let body = json!([
                { "project_id": format!("{}-1", year), "sub_department": "Science" },
                { "project_id": format!("{}-2", year), "sub_department": "Humanities" },
                { "project_id": format!("{}-3", year), "sub_department": " Science " }
            ]);
            (StatusCode::OK, body)
        },
        log.clone(),
    ))
    .await;

    let client = NwoClient::new(format!("{}/projects", base)).expect("client");
    let filter = ProjectFilter::ReportingYears {
        years: vec![2023, 2024],
        department: Some("Science".to_string()),
    };
    let projects = client.fetch_projects(&filter).await;

    let ids: Vec<&str> = projects.iter().filter_map(|p| p.project_id.as_deref()).collect();
    assert_eq!(ids, vec!["2023-1", "2023-3", "2024-1", "2024-3"]);

    let requests = log.lock().expect("log lock");
    assert_eq!(requests.len(), 2);
    let years: Vec<&str> = requests
        .iter()
        .filter_map(|r| r.get("reporting_year").map(String::as_str))
        .collect();
    assert_eq!(years, vec!["2023", "2024"]);
    assert!(requests
        .iter()
        .all(|r| r.get("sub_department").map(String::as_str) == Some("Science")));
}

#[tokio::test]
async fn test_unreachable_project_api_yields_nothing() {
    let client = NwoClient::new(dead_address()).expect("client");
    let projects = client.fetch_projects(&open_science_filter()).await;
    assert!(projects.is_empty());
}

fn registry_app() -> Router {
    Router::new().route(
        "/organizations/{id}",
        get(|Path(id): Path<String>| async move {
            if id == "missing" {
                return (StatusCode::NOT_FOUND, Json(json!({ "errors": ["not found"] })));
            }
            let body = json!({
                "names": [
                    { "value": format!("Label {}", id), "types": ["label"] },
                    { "value": format!("Institute {}", id), "types": ["ror_display"] }
                ],
                "locations": [{
                    "geonames_details": {
                        "lat": 52.0,
                        "lng": 5.0,
                        "country_name": "The Netherlands",
                        "country_code": "NL"
                    }
                }]
            });
            (StatusCode::OK, Json(body))
        }),
    )
}

#[tokio::test]
async fn test_lookup_all_skips_failed_ids() {
    let base = serve(registry_app()).await;
    let client = RorClient::new(format!("{}/organizations/", base)).expect("client");

    let ids = vec!["ok1".to_string(), "missing".to_string(), "ok2".to_string()];
    let resolved = client.lookup_all(&ids).await;

    assert_eq!(resolved.len(), 2);
    assert!(!resolved.contains_key("missing"));

    let first = &resolved["ok1"];
    assert_eq!(first.name, "Institute ok1");
    assert_eq!((first.lat, first.lng), (Some(52.0), Some(5.0)));
    assert_eq!(first.country_code, "NL");
    assert_eq!(first.ror_id.as_deref(), Some("ok1"));
    assert_eq!(resolved["ok2"].name, "Institute ok2");
}

#[tokio::test]
async fn test_lookup_reports_status() {
    let base = serve(registry_app()).await;
    let client = RorClient::new(format!("{}/organizations", base)).expect("client");

    let err = client.lookup("missing").await.expect_err("404 should fail");
    assert!(matches!(err, collabmap::CollabError::Api { code: 404, .. }));
}

#[tokio::test]
async fn test_lookup_all_survives_transport_errors() {
    let client = RorClient::new(dead_address()).expect("client");
    let ids = vec!["a".to_string(), "b".to_string()];
    assert!(client.lookup_all(&ids).await.is_empty());
}
