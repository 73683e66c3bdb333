//! Query-string construction for listing and search endpoints
//!
//! Parameters are only emitted when present, in a fixed order, and encoded
//! as `application/x-www-form-urlencoded`.

use crate::types::{MediaType, PostStatus};
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

/// Ordered list of query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter unconditionally
    pub fn push(&mut self, key: &'static str, value: impl ToString) -> &mut Self {
        self.pairs.push((key, value.to_string()));
        self
    }

    /// Append a parameter when a value is present
    pub fn push_opt(&mut self, key: &'static str, value: Option<impl ToString>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// Append a string parameter when it is non-empty
    pub fn push_non_empty(&mut self, key: &'static str, value: Option<&str>) -> &mut Self {
        self.push_opt(key, value.filter(|value| !value.is_empty()))
    }

    /// Append an id parameter when it is non-zero
    pub fn push_id(&mut self, key: &'static str, id: Option<i64>) -> &mut Self {
        self.push_opt(key, id.filter(|id| *id != 0))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encoded query string without the leading `?`
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter().map(|(key, value)| (*key, value.as_str())))
            .finish()
    }

    /// `path?query`, or just `path` when there are no parameters
    pub fn append_to(&self, path: &str) -> String {
        if self.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{}", self.encode())
        }
    }

    /// `path?query`, keeping the `?` even when there are no parameters
    pub fn always_append_to(&self, path: &str) -> String {
        format!("{path}?{}", self.encode())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Sort key rendered as `field` or `field,direction`
///
/// Without a direction the backend applies its own default order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Option<SortDirection>,
}

impl Sort {
    /// Sort by `field` in the backend's default order
    pub fn by(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: None,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Some(SortDirection::Asc),
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Some(SortDirection::Desc),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Some(direction) => write!(f, "{},{}", self.field, direction.as_str()),
            None => f.write_str(&self.field),
        }
    }
}

impl FromStr for Sort {
    type Err = String;

    /// Parse `field` or `field,asc|desc`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(',') {
            Some((field, direction)) => (field, Some(direction)),
            None => (s, None),
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(format!("invalid sort key: {s:?}"));
        }
        let direction = match direction.map(|d| d.trim().to_ascii_lowercase()).as_deref() {
            None => None,
            Some("asc") => Some(SortDirection::Asc),
            Some("desc") => Some(SortDirection::Desc),
            Some(other) => return Err(format!("invalid sort direction: {other:?}")),
        };
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Pagination shared by every paged endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<Sort>,
}

impl PageParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub const fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub(crate) fn write(&self, query: &mut QueryParams) {
        query
            .push_opt("page", self.page)
            .push_opt("size", self.size)
            .push_opt("sort", self.sort.as_ref().filter(|sort| !sort.field.is_empty()));
    }
}

/// Paging plus an optional status filter, for per-category and per-tag listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub paging: PageParams,
    pub status: Option<PostStatus>,
}

impl PostFilter {
    pub(crate) fn to_query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        self.paging.write(&mut query);
        query.push_opt("status", self.status.map(PostStatus::as_str));
        query
    }
}

/// Full-text post search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostSearch {
    pub q: Option<String>,
    pub category: Option<i64>,
    pub tag: Option<i64>,
    pub paging: PageParams,
}

impl PostSearch {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }

    pub(crate) fn to_query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        query
            .push_non_empty("q", self.q.as_deref())
            .push_id("category", self.category)
            .push_id("tag", self.tag);
        self.paging.write(&mut query);
        query
    }
}

/// Category listing options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryQuery {
    pub include_counts: Option<bool>,
    pub parent_id: Option<i64>,
}

impl CategoryQuery {
    pub(crate) fn to_query(self) -> QueryParams {
        let mut query = QueryParams::new();
        query
            .push_opt("includeCounts", self.include_counts)
            .push_id("parentId", self.parent_id);
        query
    }
}

/// Media library listing options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaQuery {
    pub paging: PageParams,
    pub media_type: Option<MediaType>,
    pub uploaded_by: Option<i64>,
}

impl MediaQuery {
    pub(crate) fn to_query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        self.paging.write(&mut query);
        query
            .push_opt("type", self.media_type.map(MediaType::as_str))
            .push_id("uploadedBy", self.uploaded_by);
        query
    }
}
