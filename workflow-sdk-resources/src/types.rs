//! Request and result types for the resource clients.
//!
//! Free-form parts (run input, config, item values, filters) are kept as
//! [`serde_json::Value`]; everything the clients rely on is typed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default page size for cron and item searches.
pub const DEFAULT_SEARCH_LIMIT: i64 = 10;

/// Default page size for namespace listings.
pub const DEFAULT_NAMESPACE_LIMIT: i64 = 100;

/// What to do when a run is requested while another is active on the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultitaskStrategy {
    /// Reject the new run.
    Reject,
    /// Interrupt the active run.
    Interrupt,
    /// Roll back the active run.
    Rollback,
    /// Queue the new run.
    Enqueue,
}

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Waiting to start.
    Pending,
    /// Executing.
    Running,
    /// Failed.
    Error,
    /// Finished.
    Success,
    /// Timed out.
    Timeout,
    /// Interrupted.
    Interrupted,
}

/// A run created by a cron job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Run ID.
    pub run_id: String,
    /// Thread the run belongs to.
    pub thread_id: String,
    /// Assistant executing the run.
    pub assistant_id: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Current status.
    pub status: RunStatus,
    /// Run metadata.
    #[serde(default)]
    pub metadata: Value,
    /// Strategy applied to concurrent runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multitask_strategy: Option<MultitaskStrategy>,
}

/// A scheduled cron job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cron {
    /// Cron ID.
    pub cron_id: String,
    /// Thread the job runs on, if bound to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Time after which the job stops running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Cron schedule expression.
    pub schedule: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Run payload used for each execution.
    #[serde(default)]
    pub payload: Value,
}

/// Parameters for creating a cron job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateCron {
    /// Assistant to run.
    pub assistant_id: String,
    /// Cron schedule expression.
    pub schedule: String,
    /// Run input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Run metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Run configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    /// Whether to checkpoint during the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_during: Option<bool>,
    /// Nodes to interrupt before (`"*"` or a list).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt_before: Option<Value>,
    /// Nodes to interrupt after (`"*"` or a list).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt_after: Option<Value>,
    /// Webhook called when a run finishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
    /// Strategy for concurrent runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multitask_strategy: Option<MultitaskStrategy>,
}

impl CreateCron {
    /// Create parameters for an assistant and schedule.
    pub fn new(assistant_id: impl Into<String>, schedule: impl Into<String>) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            schedule: schedule.into(),
            ..Default::default()
        }
    }

    /// Set the run input.
    #[must_use]
    pub fn input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Set the run metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the run configuration.
    #[must_use]
    pub fn config(mut self, config: Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Checkpoint during the run.
    #[must_use]
    pub fn checkpoint_during(mut self, enabled: bool) -> Self {
        self.checkpoint_during = Some(enabled);
        self
    }

    /// Interrupt before the given nodes.
    #[must_use]
    pub fn interrupt_before(mut self, nodes: Value) -> Self {
        self.interrupt_before = Some(nodes);
        self
    }

    /// Interrupt after the given nodes.
    #[must_use]
    pub fn interrupt_after(mut self, nodes: Value) -> Self {
        self.interrupt_after = Some(nodes);
        self
    }

    /// Call a webhook when each run finishes.
    #[must_use]
    pub fn webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook = Some(url.into());
        self
    }

    /// Set the multitask strategy.
    #[must_use]
    pub fn multitask_strategy(mut self, strategy: MultitaskStrategy) -> Self {
        self.multitask_strategy = Some(strategy);
        self
    }
}

/// Filters for searching cron jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CronSearch {
    /// Only jobs for this assistant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    /// Only jobs bound to this thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Page size; values of zero or less become the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Page offset; negative values become zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

impl CronSearch {
    /// Create an unfiltered search.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by assistant.
    #[must_use]
    pub fn assistant_id(mut self, id: impl Into<String>) -> Self {
        self.assistant_id = Some(id.into());
        self
    }

    /// Filter by thread.
    #[must_use]
    pub fn thread_id(mut self, id: impl Into<String>) -> Self {
        self.thread_id = Some(id.into());
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the page offset.
    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.limit = normalize_limit(self.limit, DEFAULT_SEARCH_LIMIT);
        self.offset = normalize_offset(self.offset);
        self
    }
}

/// A stored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Namespace path of the item.
    pub namespace: Vec<String>,
    /// Key within the namespace.
    pub key: String,
    /// Stored value.
    pub value: Value,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Relevance score, present in search results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Parameters for storing an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PutItem {
    /// Namespace path.
    pub namespace: Vec<String>,
    /// Key within the namespace.
    pub key: String,
    /// Value to store.
    pub value: Value,
    /// Indexing control: `false` to skip, or a list of fields to index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<Value>,
    /// Time to live in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

impl PutItem {
    /// Create parameters for a namespace, key and value.
    pub fn new<S: Into<String>>(
        namespace: impl IntoIterator<Item = S>,
        key: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            namespace: namespace.into_iter().map(Into::into).collect(),
            key: key.into(),
            value,
            index: None,
            ttl: None,
        }
    }

    /// Control indexing.
    #[must_use]
    pub fn index(mut self, index: Value) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the time to live in minutes.
    #[must_use]
    pub fn ttl(mut self, minutes: i64) -> Self {
        self.ttl = Some(minutes);
        self
    }
}

/// Parameters for searching items.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchItems {
    /// Namespace prefix to search under.
    pub namespace_prefix: Vec<String>,
    /// Exact-match filter on item values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Page size; values of zero or less become the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Page offset; negative values become zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Natural-language query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Whether reading refreshes item TTLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_ttl: Option<bool>,
}

impl SearchItems {
    /// Search under a namespace prefix.
    pub fn new<S: Into<String>>(namespace_prefix: impl IntoIterator<Item = S>) -> Self {
        Self {
            namespace_prefix: namespace_prefix.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Filter on item values.
    #[must_use]
    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the page offset.
    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set a natural-language query.
    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Refresh TTLs of returned items.
    #[must_use]
    pub fn refresh_ttl(mut self, refresh: bool) -> Self {
        self.refresh_ttl = Some(refresh);
        self
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.limit = normalize_limit(self.limit, DEFAULT_SEARCH_LIMIT);
        self.offset = normalize_offset(self.offset);
        self
    }
}

/// Result of an item search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchItemsResponse {
    /// Matching items.
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Parameters for listing namespaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListNamespaces {
    /// Only namespaces starting with this path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Vec<String>>,
    /// Only namespaces ending with this path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<Vec<String>>,
    /// Truncate namespaces to this depth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<i64>,
    /// Page size; values of zero or less become the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Page offset; negative values become zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

impl ListNamespaces {
    /// List every namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only namespaces starting with `prefix`.
    #[must_use]
    pub fn prefix<S: Into<String>>(mut self, prefix: impl IntoIterator<Item = S>) -> Self {
        self.prefix = Some(prefix.into_iter().map(Into::into).collect());
        self
    }

    /// Only namespaces ending with `suffix`.
    #[must_use]
    pub fn suffix<S: Into<String>>(mut self, suffix: impl IntoIterator<Item = S>) -> Self {
        self.suffix = Some(suffix.into_iter().map(Into::into).collect());
        self
    }

    /// Truncate namespaces to `depth` labels.
    #[must_use]
    pub fn max_depth(mut self, depth: i64) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the page offset.
    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.limit = normalize_limit(self.limit, DEFAULT_NAMESPACE_LIMIT);
        self.offset = normalize_offset(self.offset);
        self
    }
}

/// Result of a namespace listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListNamespaceResponse {
    /// Namespace paths.
    #[serde(default)]
    pub namespaces: Vec<Vec<String>>,
}

fn normalize_limit(limit: Option<i64>, default: i64) -> Option<i64> {
    limit.map(|l| if l <= 0 { default } else { l })
}

fn normalize_offset(offset: Option<i64>) -> Option<i64> {
    offset.map(|o| o.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(None, None)]
    #[case(Some(0), Some(DEFAULT_SEARCH_LIMIT))]
    #[case(Some(-5), Some(DEFAULT_SEARCH_LIMIT))]
    #[case(Some(25), Some(25))]
    fn test_search_limit(#[case] limit: Option<i64>, #[case] expected: Option<i64>) {
        let search = CronSearch {
            limit,
            ..Default::default()
        };
        assert_eq!(search.normalized().limit, expected);
    }

    #[test]
    fn test_namespace_defaults() {
        let list = ListNamespaces::new().limit(0).offset(-1).normalized();
        assert_eq!(list.limit, Some(DEFAULT_NAMESPACE_LIMIT));
        assert_eq!(list.offset, Some(0));
    }

    #[test]
    fn test_create_cron_serialization() {
        let cron = CreateCron::new("agent", "0 9 * * *")
            .input(json!({"messages": []}))
            .multitask_strategy(MultitaskStrategy::Enqueue);

        assert_eq!(
            serde_json::to_value(&cron).unwrap(),
            json!({
                "assistant_id": "agent",
                "schedule": "0 9 * * *",
                "input": {"messages": []},
                "multitask_strategy": "enqueue",
            })
        );
    }

    #[test]
    fn test_run_deserialization() {
        let run: Run = serde_json::from_value(json!({
            "run_id": "r-1",
            "thread_id": "t-1",
            "assistant_id": "agent",
            "created_at": "2024-05-01T00:00:00Z",
            "updated_at": "2024-05-01T00:00:00Z",
            "status": "pending",
            "metadata": {"source": "cron"},
            "kwargs": {"ignored": true},
        }))
        .unwrap();

        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.metadata["source"], "cron");
        assert_eq!(run.multitask_strategy, None);
    }
}
