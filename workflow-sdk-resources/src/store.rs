//! Key-value store client.
//!
//! Items live under a namespace, a path of labels. On the wire a namespace
//! is either a JSON array or, in query strings, its labels joined with `.`,
//! so labels themselves may not contain a period.

use crate::error::ResourceResult;
use crate::payload::{check_namespace, to_payload};
use crate::types::{
    Item, ListNamespaceResponse, ListNamespaces, PutItem, SearchItems, SearchItemsResponse,
};
use serde_json::json;
use tracing::debug;
use workflow_sdk_http::{CallOptions, HttpClient};

/// Client for the item store.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: HttpClient,
}

impl StoreClient {
    /// Create a client over an HTTP client.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Store or replace an item.
    pub async fn put_item(&self, item: PutItem, options: &CallOptions) -> ResourceResult<()> {
        check_namespace(item.namespace.as_slice())?;
        debug!(namespace = ?item.namespace, key = %item.key, "Putting item");
        let payload = to_payload(&item)?;
        self.http
            .put::<serde_json::Value>("/store/items", payload, options)
            .await?;
        Ok(())
    }

    /// Fetch one item.
    pub async fn get_item<S: AsRef<str>>(
        &self,
        namespace: &[S],
        key: &str,
        refresh_ttl: Option<bool>,
        options: &CallOptions,
    ) -> ResourceResult<Item> {
        check_namespace(namespace)?;
        let joined = join_namespace(namespace);
        let refresh = refresh_ttl.map(|r| r.to_string());

        let mut query = vec![("namespace", joined.as_str()), ("key", key)];
        if let Some(refresh) = &refresh {
            query.push(("refresh_ttl", refresh.as_str()));
        }

        Ok(self.http.get("/store/items", &query, options).await?)
    }

    /// Delete one item.
    pub async fn delete_item<S: AsRef<str>>(
        &self,
        namespace: &[S],
        key: &str,
        options: &CallOptions,
    ) -> ResourceResult<()> {
        check_namespace(namespace)?;
        let labels: Vec<&str> = namespace.iter().map(AsRef::as_ref).collect();
        let body = json!({"namespace": labels, "key": key});
        Ok(self.http.delete("/store/items", Some(body), options).await?)
    }

    /// Search items under a namespace prefix.
    pub async fn search_items(
        &self,
        search: SearchItems,
        options: &CallOptions,
    ) -> ResourceResult<SearchItemsResponse> {
        let payload = to_payload(&search.normalized())?;
        Ok(self
            .http
            .post("/store/items/search", Some(payload), options)
            .await?)
    }

    /// List namespaces.
    pub async fn list_namespaces(
        &self,
        list: ListNamespaces,
        options: &CallOptions,
    ) -> ResourceResult<ListNamespaceResponse> {
        let payload = to_payload(&list.normalized())?;
        Ok(self
            .http
            .post("/store/namespaces", Some(payload), options)
            .await?)
    }
}

fn join_namespace<S: AsRef<str>>(namespace: &[S]) -> String {
    namespace
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}
