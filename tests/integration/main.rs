//! Integration tests: history download, analytics pipeline and the HTTP
//! API wired together with in-memory collaborators.

mod mock_history;
mod pipeline;
