//! Shared types for DRY compliance.

mod pagination;
mod response;

pub use pagination::{
    AuditPage, PageRequest, Paginated, PaginationMeta, PaginationParams, UserPage,
};
pub use response::MessageResponse;

pub(crate) use pagination::page_out_of_range;
