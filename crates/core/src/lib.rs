//! Core library: folder paths, tree building, the folder view and mutation reconciliation.

pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod paths;
pub mod reconcile;
pub mod tree;
pub mod view;

pub use error::{BrowserError, ErrorKind};
pub use reconcile::{BatchSummary, FolderBrowser, Notice, NoticeLevel, Phase};
pub use tree::FolderTree;
pub use view::ViewState;
