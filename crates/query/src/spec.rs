//! The accumulated query specification and its chainable builder operations.
//!
//! A [`QuerySpec`] is owned by exactly one resource client. Builder methods
//! take `&mut self` and return `&mut Self` so calls chain; state persists
//! until [`QuerySpec::reset`].

use serde::{Deserialize, Serialize};

use crate::errors::QueryError;
use crate::filter::{compile_filter, FilterMap, LogicalOp};
use crate::identifiers::SearchField;

/// Sort direction for [`QuerySpec::sort`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Random sampling request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub count: u32,
    pub seed: Option<u64>,
}

/// Everything a caller has asked for on one resource client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub filter: FilterMap,
    pub search: Option<String>,
    pub search_field: Option<SearchField>,
    pub sort: Option<String>,
    pub select: Option<Vec<String>>,
    pub sample: Option<Sample>,
    pub group_by: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub cursor: Option<String>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Filters
    // -----------------------------------------------------------------------

    /// Merges `filter` into the spec; colliding keys are overwritten.
    pub fn filter(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.filter.merge(filter.into());
        self
    }

    /// Alias of [`QuerySpec::filter`]: comma-joined clauses are ANDed.
    pub fn filter_and(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.filter(filter)
    }

    /// Merges `filter` with every plain leaf wrapped in OR.
    pub fn filter_or(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.filter(FilterMap::wrap_leaves(filter.into(), LogicalOp::Or))
    }

    /// Merges `filter` with every plain leaf wrapped in NOT.
    pub fn filter_not(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.filter(FilterMap::wrap_leaves(filter.into(), LogicalOp::Not))
    }

    /// Merges `filter` with every plain leaf wrapped in GT.
    pub fn filter_gt(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.filter(FilterMap::wrap_leaves(filter.into(), LogicalOp::Gt))
    }

    /// Merges `filter` with every plain leaf wrapped in LT.
    pub fn filter_lt(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.filter(FilterMap::wrap_leaves(filter.into(), LogicalOp::Lt))
    }

    // -----------------------------------------------------------------------
    // Search, sort, projection, sampling, aggregation
    // -----------------------------------------------------------------------

    pub fn search(&mut self, term: impl Into<String>) -> &mut Self {
        self.search = Some(term.into());
        self
    }

    /// Sets the name of an extra parameter that carries the search term.
    pub fn search_field(&mut self, field: SearchField) -> &mut Self {
        self.search_field = Some(field);
        self
    }

    /// Sets the filter entry `"<field>.search"` to `term`.
    pub fn search_filter(&mut self, field: &str, term: impl Into<String>) -> &mut Self {
        let term: String = term.into();
        self.filter.insert(format!("{field}.search"), term);
        self
    }

    /// Sets the sort to `"field:direction"`.
    pub fn sort(&mut self, field: &str, direction: SortDirection) -> &mut Self {
        self.sort = Some(format!("{field}:{}", direction.as_str()));
        self
    }

    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn sample(&mut self, count: u32, seed: Option<u64>) -> &mut Self {
        self.sample = Some(Sample { count, seed });
        self
    }

    pub fn group_by(&mut self, field: impl Into<String>) -> &mut Self {
        self.group_by = Some(field.into());
        self
    }

    // -----------------------------------------------------------------------
    // Paging
    // -----------------------------------------------------------------------

    pub fn page(&mut self, page: u32) -> &mut Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(&mut self, per_page: u32) -> &mut Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn cursor(&mut self, cursor: impl Into<String>) -> &mut Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Clears the whole spec back to empty.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    // -----------------------------------------------------------------------
    // Wire parameters
    // -----------------------------------------------------------------------

    /// Renders the spec into ordered query parameters.
    ///
    /// Fails with [`QueryError::FilterShape`] before anything is sent if the
    /// filter is nested too deeply.
    pub fn wire_params(&self, api_key: Option<&str>) -> Result<Vec<(String, String)>, QueryError> {
        let mut params = Vec::new();
        let mut push = |name: &str, value: String| params.push((name.to_owned(), value));

        if let Some(key) = api_key {
            push("api_key", key.to_owned());
        }
        if let Some(filter) = compile_filter(&self.filter)? {
            push("filter", filter);
        }
        if let Some(search) = &self.search {
            push("search", search.clone());
            if let Some(field) = &self.search_field {
                push(field.as_str(), search.clone());
            }
        }
        if let Some(sort) = &self.sort {
            push("sort", sort.clone());
        }
        if let Some(select) = &self.select {
            push("select", select.join(","));
        }
        if let Some(sample) = &self.sample {
            push("sample", sample.count.to_string());
            if let Some(seed) = sample.seed {
                push("seed", seed.to_string());
            }
        }
        if let Some(group_by) = &self.group_by {
            push("group_by", group_by.clone());
        }
        if let Some(page) = self.page {
            push("page", page.to_string());
        }
        if let Some(per_page) = self.per_page {
            push("per_page", per_page.to_string());
        }
        if let Some(cursor) = &self.cursor {
            push("cursor", cursor.clone());
        }
        Ok(params)
    }
}
