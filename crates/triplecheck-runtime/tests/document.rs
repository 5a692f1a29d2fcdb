//! HTTP document source against a loopback server.

mod support;

use std::time::Duration;

use support::{closed_port_url, MockServer, Route};
use triplecheck_runtime::document::NOT_ARCHIVED_MARKER;
use triplecheck_runtime::{DocumentError, DocumentSource, FallbackSource, HttpDocumentSource};

const PARIS: &str = "Paris is the capital and most populous city of France, with an estimated population of 2,102,650 residents in January 2023.";
const SEINE: &str = "The City of Paris is the centre of the Île-de-France region, or Paris Region, with an official estimated population of 12,271,794.";

fn source() -> HttpDocumentSource {
    HttpDocumentSource::with_timeout(Duration::from_secs(5))
        .unwrap()
        .with_retry(2, Duration::from_millis(1))
}

#[tokio::test]
async fn extracts_paragraphs_in_document_order() {
    let server = MockServer::start().await;
    server.route(Route::new("GET", "/wiki/Paris").html(format!(
        "<html><body><p>Paris</p><div><p id=\"a\">{PARIS}</p></div>\n<p>{SEINE}</p></body></html>"
    )));

    let passages = source().fetch(&server.url("/wiki/Paris")).await.unwrap();

    assert_eq!(passages.len(), 2);
    assert_eq!(passages[0].as_str(), PARIS);
    assert_eq!(passages[1].as_str(), SEINE);
}

#[tokio::test]
async fn error_status_page_yields_no_passages() {
    let server = MockServer::start().await;

    let passages = source().fetch(&server.url("/missing")).await.unwrap();
    assert!(passages.is_empty());
}

#[tokio::test]
async fn not_archived_page_is_an_error() {
    let server = MockServer::start().await;
    server.route(Route::new("GET", "/web/page").html(format!(
        "<html><body><p>Hrm.</p><p>{NOT_ARCHIVED_MARKER}</p></body></html>"
    )));

    assert!(matches!(
        source().fetch(&server.url("/web/page")).await,
        Err(DocumentError::NotArchived { .. })
    ));
}

#[tokio::test]
async fn empty_page_without_fallback_is_fatal() {
    let server = MockServer::start().await;
    server.route(Route::new("GET", "/empty").html("<html><body><p>short</p></body></html>"));

    let source = FallbackSource::new(source()).with_archive(false);
    match source.fetch(&server.url("/empty")).await {
        Err(DocumentError::NoParagraphs { url, .. }) => assert!(url.ends_with("/empty")),
        other => panic!("expected NoParagraphs, got {other:?}"),
    }
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn transport_failure_is_retried_then_reported() {
    let url = closed_port_url().await;

    match source().fetch(&url).await {
        Err(err @ DocumentError::HttpError { .. }) => assert!(err.is_transient()),
        other => panic!("expected HTTP error, got {other:?}"),
    }
}
