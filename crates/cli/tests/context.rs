use cli::context::{self, ListOptions};
use lexdocs_core::config;
use lexdocs_core::filter::{SortKey, SortOrder};
use lexdocs_core::models::DocumentRecord;
use lexdocs_core::FolderBrowser;
use providers::memory::MemoryDocumentService;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn config_file_feeds_clients_and_sorting() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lexdocs.toml");
    fs::write(
        &path,
        r#"
[api]
base_url = "http://127.0.0.1:9000/"
token = "secret"

[browser]
default_sort = "size"
default_order = "desc"
"#,
    )
    .unwrap();
    let cfg = config::load(Some(path.to_str().unwrap())).unwrap();

    let service = context::document_service(&cfg).unwrap();
    assert_eq!(service.base_url(), "http://127.0.0.1:9000");
    assert!(context::chat_client(&cfg).is_ok());

    let opts = ListOptions::default();
    assert_eq!(opts.ordering(&cfg), (SortKey::Size, SortOrder::Desc));
    let opts = ListOptions {
        sort: Some("date".into()),
        ..Default::default()
    };
    assert_eq!(opts.ordering(&cfg), (SortKey::Date, SortOrder::Desc));
}

#[test]
fn list_options_build_filter() {
    let docs = vec![
        DocumentRecord::new(1, "Brief.PDF"),
        DocumentRecord::new(2, "brief-notes.docx"),
        DocumentRecord::new(3, "exhibit.pdf"),
    ];
    let opts = ListOptions {
        search: Some("brief".into()),
        pattern: Some("*.pdf".into()),
        ..Default::default()
    };
    let filter = opts.filter().unwrap();
    let ids: Vec<i64> = filter.apply(&docs).iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![1]);

    let bad = ListOptions {
        pattern: Some("[".into()),
        ..Default::default()
    };
    assert!(bad.filter().is_err());
}

#[tokio::test]
async fn folder_missing_from_folder_list_still_lists() {
    let svc = Arc::new(
        MemoryDocumentService::new()
            .with_folders(["/Contracts"])
            .with_documents(vec![
                DocumentRecord::new(1, "b.pdf").in_folder("/Unlisted"),
                DocumentRecord::new(2, "a.pdf").in_folder("/Unlisted/"),
                DocumentRecord::new(3, "c.pdf").in_folder("/Contracts"),
            ]),
    );
    let mut browser = FolderBrowser::new(svc);
    browser.refresh().await.unwrap();
    let cfg = config::AppConfig::default();
    let opts = ListOptions::default();

    browser.open_folder("/Unlisted");
    let listing = opts.listing(&browser, &cfg).unwrap();
    assert!(!listing.known);
    assert!(listing.folders.is_empty());
    let ids: Vec<i64> = listing.documents.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![2, 1]);

    browser.open_folder("/Deleted");
    let listing = opts.listing(&browser, &cfg).unwrap();
    assert_eq!(listing.folder, "/Deleted");
    assert!(listing.documents.is_empty());
    assert!(listing.folders.is_empty());

    browser.open_folder("/");
    let listing = opts.listing(&browser, &cfg).unwrap();
    assert!(listing.known);
    assert_eq!(listing.folders, vec!["/Contracts"]);
}
