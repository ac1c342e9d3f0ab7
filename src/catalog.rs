//! Quick-query catalog
//!
//! The chat service offers a short list of canned questions. The catalog
//! fetches that list and groups it by category for display. Grouping is
//! stable: categories appear in the order they are first seen, and queries
//! keep their original relative order inside each category.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::Result;

/// One server-suggested query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickQuery {
    pub query: String,
    /// Free-form category tag, e.g. `performance`
    pub category: String,
    pub description: String,
}

/// All queries of one category, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub queries: Vec<QuickQuery>,
}

/// Category-to-queries mapping that preserves first-seen category order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupedQueries {
    groups: Vec<CategoryGroup>,
}

impl GroupedQueries {
    /// Queries for `category`, if it exists.
    pub fn get(&self, category: &str) -> Option<&[QuickQuery]> {
        self.groups
            .iter()
            .find(|g| g.category == category)
            .map(|g| g.queries.as_slice())
    }

    /// Category names in first-seen order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.category.as_str())
    }

    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    /// Every query, walking categories in order. This is the numbering the
    /// REPL uses for `/q N`.
    pub fn iter_queries(&self) -> impl Iterator<Item = &QuickQuery> {
        self.groups.iter().flat_map(|g| g.queries.iter())
    }

    /// The `n`-th query (1-based) in [`GroupedQueries::iter_queries`] order.
    pub fn nth_query(&self, n: usize) -> Option<&QuickQuery> {
        n.checked_sub(1).and_then(|i| self.iter_queries().nth(i))
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Group `queries` by category in a single pass.
///
/// # Examples
///
/// ```
/// use opschat::catalog::{group_by_category, QuickQuery};
///
/// let q = |query: &str, category: &str| QuickQuery {
///     query: query.into(),
///     category: category.into(),
///     description: String::new(),
/// };
/// let grouped = group_by_category(vec![q("Q1", "performance"), q("Q3", "monitoring"), q("Q2", "performance")]);
/// let order: Vec<&str> = grouped.categories().collect();
/// assert_eq!(order, vec!["performance", "monitoring"]);
/// ```
pub fn group_by_category(queries: Vec<QuickQuery>) -> GroupedQueries {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for query in queries {
        match index.get(&query.category) {
            Some(&i) => groups[i].queries.push(query),
            None => {
                index.insert(query.category.clone(), groups.len());
                groups.push(CategoryGroup {
                    category: query.category.clone(),
                    queries: vec![query],
                });
            }
        }
    }

    GroupedQueries { groups }
}

/// Fetches and holds the grouped quick-query list.
#[derive(Debug, Clone)]
pub struct QuickQueryCatalog {
    api: ApiClient,
    grouped: GroupedQueries,
}

impl QuickQueryCatalog {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            grouped: GroupedQueries::default(),
        }
    }

    /// Fetch the list and replace the current grouping.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::OpschatError::Fetch`] when the fetch fails.
    /// The previous grouping stays in place in that case.
    pub async fn load(&mut self) -> Result<&GroupedQueries> {
        match self.api.quick_queries().await {
            Ok(queries) => {
                let count = queries.len();
                self.grouped = group_by_category(queries);
                tracing::info!(
                    count,
                    categories = self.grouped.len(),
                    "Loaded quick queries"
                );
                Ok(&self.grouped)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load quick queries; keeping previous catalog");
                Err(e)
            }
        }
    }

    /// The last successful grouping, empty before the first load.
    pub fn grouped(&self) -> &GroupedQueries {
        &self.grouped
    }
}
