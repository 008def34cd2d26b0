//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

/// One page of a list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Page metadata.
    pub pagination: PaginationMeta,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl PaginationParams {
    /// Clamps `per_page` to the allowed maximum of 100.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }
}

impl<T> Paginated<T> {
    /// Cuts the requested page out of `items`.
    #[must_use]
    pub fn from_items(items: Vec<T>, params: &PaginationParams) -> Self {
        let params = params.clamped();
        let total = u32::try_from(items.len()).unwrap_or(u32::MAX);
        let total_pages = total.div_ceil(params.per_page);
        let start = usize::try_from((params.page - 1).saturating_mul(params.per_page))
            .unwrap_or(usize::MAX);
        let per_page = usize::try_from(params.per_page).unwrap_or(usize::MAX);
        let data = items.into_iter().skip(start).take(per_page).collect();

        Self {
            data,
            pagination: PaginationMeta {
                page: params.page,
                per_page: params.per_page,
                total,
                total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_cut_and_counted() {
        let params = PaginationParams {
            page: 2,
            per_page: 2,
        };
        let page = Paginated::from_items(vec![1, 2, 3, 4, 5], &params);
        assert_eq!(page.data, vec![3, 4]);
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let params = PaginationParams {
            page: 0,
            per_page: 1_000,
        };
        let page = Paginated::from_items(Vec::<u8>::new(), &params);
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.per_page, 100);
        assert_eq!(page.pagination.total_pages, 0);
    }
}
