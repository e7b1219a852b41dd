//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::config::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE};
use crate::domain::{AuditEntry, UserResponse};
use crate::errors::{AppError, AppResult};

/// Raw pagination query parameters (0-indexed pages)
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number, starting at 0
    #[serde(default = "default_page")]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_page() -> i64 {
    DEFAULT_PAGE_NUMBER
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE_NUMBER,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParams {
    pub fn validate(&self) -> AppResult<PageRequest> {
        PageRequest::new(self.page, self.size)
    }
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    /// Reject negative pages, non-positive sizes and pages whose offset
    /// does not fit in an `i64`.
    pub fn new(page: i64, size: i64) -> AppResult<Self> {
        if page < 0 {
            return Err(AppError::validation("Page number cannot be negative"));
        }
        if size <= 0 {
            return Err(AppError::validation("Page size must be positive"));
        }
        if page.checked_mul(size).is_none() {
            return Err(page_out_of_range());
        }
        Ok(Self {
            page: page as u64,
            size: size as u64,
        })
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

pub(crate) fn page_out_of_range() -> AppError {
    AppError::validation("Page number is out of range")
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[aliases(UserPage = Paginated<UserResponse>, AuditPage = Paginated<AuditEntry>)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub size: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(request.size.max(1));

        Self {
            data,
            meta: PaginationMeta {
                page: request.page,
                size: request.size,
                total,
                total_pages,
            },
        }
    }

    /// Cut one page out of a fully materialized list.
    pub fn slice(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len() as u64;
        let data = items
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(request.size).unwrap_or(usize::MAX))
            .collect();

        Self::new(data, request, total)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
