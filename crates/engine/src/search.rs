//! Search operations: per-container sessions and global chores
//!
//! A per-container search is compiled once, synchronously, and cached under a
//! fresh search id; page reads append skip/limit to the cached stages and
//! never recompile. A global search is a chore: compiled up front, registered,
//! submitted to the pool, and observed by polling.

use annostore_chores::{execute_chore, Chore, ChoreState, GlobalSearchChore, StatusSummary};
use annostore_core::{Annotation, Result};
use annostore_query::{CustomQueryCall, Stage};
use chrono::Duration as ChronoDuration;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub use annostore_chores::GlobalResultPage;

use crate::repository::Repository;

/// One page of a per-container search
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// The search session id
    pub search_id: String,
    /// Page number, zero-based
    pub page: usize,
    /// The annotations on this page
    pub annotations: Vec<Annotation>,
    /// Whether more pages follow
    pub has_more: bool,
}

/// Info view of a search session: its query and (lazily computed) hit count
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInfo {
    /// The query as submitted
    pub query: Value,
    /// Total number of hits, stable for the session's lifetime
    pub hits: u64,
}

/// Outcome of reading a global search page
#[derive(Debug, Clone)]
pub enum GlobalSearchOutcome {
    /// The chore has not reached a terminal state; poll again
    Pending(StatusSummary),
    /// The chore failed; the summary carries the recorded errors
    Failed(StatusSummary),
    /// The chore is done; here is the requested page
    Page(GlobalResultPage),
}

impl Repository {
    // =========================================================================
    // Per-container search
    // =========================================================================

    /// Compile and register a search session; returns its id
    pub fn create_search(&self, container: &str, query: &Value) -> Result<String> {
        self.controller.get(container)?;
        let stages = self.compiler.compile(query)?;
        let search_id = Uuid::new_v4().to_string();
        debug!(container, search_id = search_id.as_str(), "created search");
        self.search_cache
            .put(search_id.clone(), query.clone(), stages);
        Ok(search_id)
    }

    /// Read one page, appending pagination to the cached stage list
    pub fn search_result_page(
        &self,
        container: &str,
        search_id: &str,
        page: usize,
    ) -> Result<SearchPage> {
        self.controller.get(container)?;
        let page_size = self.config.page_size;
        let mut stages = self.search_cache.stages(search_id)?;
        stages.push(Stage::Skip((page * page_size) as u64));
        stages.push(Stage::Limit(page_size as u64));
        let annotations = self.store.execute(container, &stages)?;
        Ok(SearchPage {
            search_id: search_id.to_string(),
            page,
            has_more: annotations.len() == page_size,
            annotations,
        })
    }

    /// The session's query and hit count (computed on first call, then frozen)
    pub fn search_info(&self, container: &str, search_id: &str) -> Result<SearchInfo> {
        self.controller.get(container)?;
        let query = self.search_cache.query(search_id)?;
        let hits = self
            .search_cache
            .hit_count_or_compute(search_id, |stages| self.store.count(container, stages))?;
        Ok(SearchInfo { query, hits })
    }

    // =========================================================================
    // Global search
    // =========================================================================

    /// Accept a global search over the caller's accessible containers
    ///
    /// The query is compiled synchronously (so compilation errors reach the
    /// caller), then the chore runs on the worker pool. Returns the chore id
    /// and its initial status.
    pub fn create_global_search(
        &self,
        container_names: Vec<String>,
        query: &Value,
    ) -> Result<(String, StatusSummary)> {
        let stages = self.compiler.compile(query)?;
        let chore = Arc::new(GlobalSearchChore::new(
            Arc::clone(&self.store),
            container_names,
            query.clone(),
            stages,
            ChronoDuration::seconds(self.config.chore_ttl_secs as i64),
        ));
        self.search_chores.insert(Arc::clone(&chore));

        // snapshot before submission so the caller sees the accepted state
        let initial_status = chore.status().summary();
        let task = Arc::clone(&chore);
        if let Err(e) = self.pool.submit(move || execute_chore(task.as_ref())) {
            self.search_chores.remove(chore.id());
            return Err(e);
        }
        Ok((chore.id().to_string(), initial_status))
    }

    /// Poll a global search's status
    pub fn global_search_status(&self, search_id: &str) -> Result<StatusSummary> {
        Ok(self.search_chores.get(search_id)?.status().summary())
    }

    /// Read a global search page, or its status while not yet Done
    pub fn global_search_page(&self, search_id: &str, page: usize) -> Result<GlobalSearchOutcome> {
        let chore = self.search_chores.get(search_id)?;
        let summary = chore.status().summary();
        Ok(match summary.state {
            ChoreState::Done => {
                GlobalSearchOutcome::Page(chore.result_page(page, self.config.page_size))
            }
            ChoreState::Failed => GlobalSearchOutcome::Failed(summary),
            _ => GlobalSearchOutcome::Pending(summary),
        })
    }

    // =========================================================================
    // Custom queries
    // =========================================================================

    /// Store a new custom query definition
    pub fn create_custom_query(
        &self,
        name: &str,
        template: &Value,
        label: Option<String>,
        description: Option<String>,
        public: bool,
        created_by: &str,
    ) -> Result<annostore_query::CustomQuery> {
        let mut query = annostore_query::CustomQuery::new(name, template, public, created_by)?;
        query.label = label;
        query.description = description;
        self.custom_queries.create(query.clone())?;
        Ok(query)
    }

    /// All custom query definitions, sorted by name
    pub fn custom_queries(&self) -> Vec<annostore_query::CustomQuery> {
        self.custom_queries.list()
    }

    /// One custom query definition
    pub fn custom_query(&self, name: &str) -> Result<annostore_query::CustomQuery> {
        self.custom_queries.get(name)
    }

    /// Delete a custom query (creator or root only)
    pub fn delete_custom_query(&self, name: &str, user: &str, is_root: bool) -> Result<()> {
        self.custom_queries.delete(name, user, is_root)
    }

    /// Decode a query call and interpolate its parameters into the template
    pub fn expand_custom_query(&self, call: &str) -> Result<Value> {
        let call = CustomQueryCall::decode(call)?;
        let query = self.custom_queries.get(&call.name)?;
        query.expand(&call)
    }

    /// Run a custom query call against one container, paginated
    pub fn custom_query_result_page(
        &self,
        container: &str,
        call: &str,
        page: usize,
    ) -> Result<SearchPage> {
        self.controller.get(container)?;
        let expanded = self.expand_custom_query(call)?;
        let page_size = self.config.page_size;
        let mut stages = self.compiler.compile(&expanded)?;
        stages.push(Stage::Skip((page * page_size) as u64));
        stages.push(Stage::Limit(page_size as u64));
        let annotations = self.store.execute(container, &stages)?;
        Ok(SearchPage {
            search_id: call.to_string(),
            page,
            has_more: annotations.len() == page_size,
            annotations,
        })
    }
}
