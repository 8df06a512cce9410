//! Builds service clients from the loaded configuration.

use anyhow::Context;
use lexdocs_core::config::AppConfig;
use lexdocs_core::filter::{sort_documents, DocumentFilter, SortKey, SortOrder};
use lexdocs_core::models::DocumentRecord;
use lexdocs_core::FolderBrowser;
use providers::chat::{ChatClient, ChatConfig};
use providers::http::{HttpDocumentService, HttpServiceConfig};
use providers::ServiceError;
use std::time::Duration;
use tracing::debug;

pub fn document_service(cfg: &AppConfig) -> Result<HttpDocumentService, ServiceError> {
    HttpDocumentService::new(HttpServiceConfig {
        base_url: cfg.api.base_url.clone(),
        token: cfg.api.token.clone(),
        timeout: Duration::from_secs(cfg.api.timeout_secs),
    })
}

pub fn chat_client(cfg: &AppConfig) -> Result<ChatClient, ServiceError> {
    ChatClient::new(ChatConfig {
        base_url: cfg.api.base_url.clone(),
        token: cfg.api.token.clone(),
        timeout: Duration::from_secs(cfg.api.chat_timeout_secs),
    })
}

/// Listing options from the command line, falling back to the configured sort.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub search: Option<String>,
    pub file_type: Option<String>,
    pub tag: Option<String>,
    pub pattern: Option<String>,
    pub sort: Option<String>,
    pub desc: bool,
}

impl ListOptions {
    pub fn filter(&self) -> anyhow::Result<DocumentFilter> {
        let mut filter = DocumentFilter::new();
        if let Some(q) = &self.search {
            filter = filter.query(q.clone());
        }
        if let Some(t) = &self.file_type {
            filter = filter.file_type(t.clone());
        }
        if let Some(t) = &self.tag {
            filter = filter.tag(t.clone());
        }
        if let Some(p) = &self.pattern {
            filter = filter
                .pattern(p)
                .with_context(|| format!("invalid pattern {p:?}"))?;
        }
        Ok(filter)
    }

    pub fn ordering(&self, cfg: &AppConfig) -> (SortKey, SortOrder) {
        let key = self
            .sort
            .as_deref()
            .map(SortKey::from)
            .unwrap_or(cfg.browser.default_sort);
        let order = if self.desc {
            SortOrder::Desc
        } else {
            cfg.browser.default_order
        };
        (key, order)
    }
}

/// What `ls` shows for the browser's current folder.
pub struct Listing<'a> {
    pub folder: String,
    /// False when the folder is not in the server's folder list.
    pub known: bool,
    pub folders: Vec<&'a str>,
    pub documents: Vec<&'a DocumentRecord>,
}

impl ListOptions {
    /// Filters and sorts the documents of the current folder.
    ///
    /// A folder missing from the folder list is listed like any other; it
    /// may still hold documents.
    pub fn listing<'a>(
        &self,
        browser: &'a FolderBrowser,
        cfg: &AppConfig,
    ) -> anyhow::Result<Listing<'a>> {
        let folder = browser.cursor().to_string();
        let known = browser.tree().contains(&folder);
        if !known {
            debug!(%folder, "folder not in folder list");
        }
        let mut documents = self.filter()?.apply(browser.visible_documents());
        let (key, order) = self.ordering(cfg);
        sort_documents(&mut documents, key, order);
        Ok(Listing {
            folders: browser.tree().sorted_children(&folder),
            folder,
            known,
            documents,
        })
    }
}
