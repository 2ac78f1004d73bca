/// Pagination and sorting
///
/// List endpoints accept `page` (0-based), `size` (default 10, at most 100)
/// and `sort=field[,asc|desc]`. Sort fields are a closed set per entity, so
/// a raw query parameter never reaches SQL. Every order is tie-broken by
/// `id ASC`, which keeps paging stable when the sort column has duplicates.
///
/// # Example
///
/// ```
/// use task_service_shared::models::{Direction, PageRequest, TaskSortField};
///
/// let request = PageRequest::<TaskSortField>::parse(Some(1), Some(20), Some("title,desc")).unwrap();
/// assert_eq!(request.offset(), 20);
/// assert_eq!(request.sort.direction, Direction::Desc);
/// assert_eq!(request.sort.to_sql(), "t.title DESC, t.id ASC");
/// ```

use serde::Serialize;
use std::fmt;

/// Entity column a page may be ordered by
pub trait SortField: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Maps a client-facing field name to a column, `None` if not sortable
    fn parse(name: &str) -> Option<Self>;

    /// Qualified SQL column
    fn column(&self) -> &'static str;

    /// Primary key column, used as default order and tie-breaker
    fn id() -> Self;
}

/// Paging parameter errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("Page size must be between 1 and {max}, got {size}")]
    InvalidSize { size: u64, max: u64 },

    #[error("Cannot sort by '{0}'")]
    UnknownSortField(String),

    #[error("Sort direction must be 'asc' or 'desc', got '{0}'")]
    InvalidDirection(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Requested order: one field plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder<F> {
    pub field: F,
    pub direction: Direction,
}

impl<F: SortField> SortOrder<F> {
    /// Parses `field` or `field,direction`
    pub fn parse(raw: &str) -> Result<Self, PageError> {
        let mut parts = raw.splitn(2, ',');
        let name = parts.next().unwrap_or_default().trim();

        let field = F::parse(name).ok_or_else(|| PageError::UnknownSortField(name.to_string()))?;

        let direction = match parts.next().map(|d| d.trim().to_ascii_lowercase()) {
            None => Direction::Asc,
            Some(d) if d == "asc" => Direction::Asc,
            Some(d) if d == "desc" => Direction::Desc,
            Some(other) => return Err(PageError::InvalidDirection(other)),
        };

        Ok(Self { field, direction })
    }

    /// `ORDER BY` body including the id tie-breaker
    pub fn to_sql(&self) -> String {
        let id = F::id();
        if self.field == id {
            format!("{} {}", id.column(), self.direction.as_sql())
        } else {
            format!(
                "{} {}, {} ASC",
                self.field.column(),
                self.direction.as_sql(),
                id.column()
            )
        }
    }
}

impl<F: SortField> Default for SortOrder<F> {
    fn default() -> Self {
        Self {
            field: F::id(),
            direction: Direction::Asc,
        }
    }
}

/// One page of a sorted, active-scoped listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<F> {
    /// 0-based page index
    pub page: u64,

    pub size: u64,

    pub sort: SortOrder<F>,
}

impl<F: SortField> PageRequest<F> {
    pub const DEFAULT_SIZE: u64 = 10;
    pub const MAX_SIZE: u64 = 100;

    /// Builds a request from raw query parameters, applying defaults
    pub fn parse(page: Option<u64>, size: Option<u64>, sort: Option<&str>) -> Result<Self, PageError> {
        let size = size.unwrap_or(Self::DEFAULT_SIZE);
        if size == 0 || size > Self::MAX_SIZE {
            return Err(PageError::InvalidSize {
                size,
                max: Self::MAX_SIZE,
            });
        }

        let sort = match sort.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => SortOrder::parse(raw)?,
            None => SortOrder::default(),
        };

        Ok(Self {
            page: page.unwrap_or(0),
            size,
            sort,
        })
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

impl<F: SortField> Default for PageRequest<F> {
    fn default() -> Self {
        Self {
            page: 0,
            size: Self::DEFAULT_SIZE,
            sort: SortOrder::default(),
        }
    }
}

/// A page of results with totals over the whole listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new<F>(content: Vec<T>, request: &PageRequest<F>, total_elements: u64) -> Self {
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(request.size.max(1)),
        }
    }

    /// Converts every item, keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskSortField, UserSortField};

    #[test]
    fn test_defaults() {
        let request = PageRequest::<TaskSortField>::parse(None, None, None).unwrap();
        assert_eq!(request.page, 0);
        assert_eq!(request.size, 10);
        assert_eq!(request.sort.field, TaskSortField::Id);
        assert_eq!(request.sort.to_sql(), "t.id ASC");
    }

    #[test]
    fn test_size_bounds() {
        assert_eq!(
            PageRequest::<UserSortField>::parse(None, Some(0), None),
            Err(PageError::InvalidSize { size: 0, max: 100 })
        );
        assert!(PageRequest::<UserSortField>::parse(None, Some(101), None).is_err());
        assert!(PageRequest::<UserSortField>::parse(None, Some(100), None).is_ok());
    }

    #[test]
    fn test_sort_parsing() {
        let sort = SortOrder::<UserSortField>::parse("username, DESC").unwrap();
        assert_eq!(sort.field, UserSortField::Username);
        assert_eq!(sort.direction, Direction::Desc);
        assert_eq!(sort.to_sql(), "u.username DESC, u.id ASC");

        assert_eq!(
            SortOrder::<UserSortField>::parse("password"),
            Err(PageError::UnknownSortField("password".to_string()))
        );
        assert_eq!(
            SortOrder::<UserSortField>::parse("email,sideways"),
            Err(PageError::InvalidDirection("sideways".to_string()))
        );
    }

    #[test]
    fn test_id_descending_has_no_tie_breaker() {
        let sort = SortOrder::<TaskSortField>::parse("id,desc").unwrap();
        assert_eq!(sort.to_sql(), "t.id DESC");
    }

    #[test]
    fn test_total_pages() {
        let request = PageRequest::<TaskSortField>::default();
        assert_eq!(Page::new(vec![0; 10], &request, 15).total_pages, 2);
        assert_eq!(Page::new(vec![0; 10], &request, 10).total_pages, 1);
        assert_eq!(Page::<u8>::new(vec![], &request, 0).total_pages, 0);
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let request = PageRequest::<TaskSortField>::default();
        let page = Page::new(vec!["a"], &request, 1).map(str::to_uppercase);
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["content"][0], "A");
        assert_eq!(json["totalElements"], 1);
        assert_eq!(json["totalPages"], 1);
    }
}
