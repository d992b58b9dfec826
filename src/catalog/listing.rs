//! Filtering, sorting and page-windowing over materialized product views.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::hierarchy::CategoryTree;
use super::view::ProductView;
use crate::errors::AppError;

/// Composable listing filters. Every present filter must match.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to this category and everything below it.
    pub category_id: Option<i64>,
    /// Case-insensitive name substring, or substring of the id.
    pub search: Option<String>,
    /// Case-insensitive category path substring.
    pub path: Option<String>,
    /// Only products with negative stock.
    pub negative_only: bool,
    /// Only products between zero and their minimum, inclusive.
    pub low_only: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Name,
    Price,
    CurrentStock,
    MinimumStock,
    CategoryPath,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// 1-indexed page window with a bounded size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    /// Page size is clamped to `1..=max_page_size`.
    pub fn new(page: usize, page_size: usize, max_page_size: usize) -> Self {
        Self {
            page,
            page_size: page_size.clamp(1, max_page_size.max(1)),
        }
    }
}

/// One page of results plus totals computed before windowing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Cut one page out of an already filtered and ordered collection.
/// Pages outside `1..=total_pages` come back empty.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total_items = items.len();
    let page_size = request.page_size.max(1);
    let total_pages = total_items.div_ceil(page_size);

    let window = if request.page == 0 || request.page > total_pages {
        Vec::new()
    } else {
        let start = (request.page - 1) * page_size;
        items.into_iter().skip(start).take(page_size).collect()
    };

    Page {
        items: window,
        page: request.page,
        page_size,
        total_items,
        total_pages,
        has_previous: request.page > 1,
        has_next: request.page < total_pages,
    }
}

fn compare(a: &ProductView, b: &ProductView, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Price => a.price.cmp(&b.price),
        SortKey::CurrentStock => a.current_stock.cmp(&b.current_stock),
        SortKey::MinimumStock => a.minimum_stock.cmp(&b.minimum_stock),
        SortKey::CategoryPath => a
            .category_path
            .to_lowercase()
            .cmp(&b.category_path.to_lowercase()),
    }
}

/// Order views by `key`; ties fall back to ascending id in both directions.
pub fn sort_views(views: &mut [ProductView], key: SortKey, order: SortOrder) {
    views.sort_by(|a, b| {
        let ordering = compare(a, b, key);
        let ordering = match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        ordering.then(a.id.cmp(&b.id))
    });
}

fn matches_search(view: &ProductView, term: &str) -> bool {
    view.name.to_lowercase().contains(&term.to_lowercase()) || view.id.to_string().contains(term)
}

/// Apply filters, sort and paging. The category scope is expanded through
/// `tree`, so an unknown category id is reported as not found.
pub fn list(
    views: Vec<ProductView>,
    tree: &CategoryTree,
    filter: &ProductFilter,
    key: SortKey,
    order: SortOrder,
    page: PageRequest,
) -> Result<Page<ProductView>, AppError> {
    let scope = filter
        .category_id
        .map(|id| tree.subtree_ids(id))
        .transpose()?;
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let path = filter
        .path
        .as_deref()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty());

    let mut selected: Vec<ProductView> = views
        .into_iter()
        .filter(|v| {
            scope
                .as_ref()
                .map_or(true, |ids| ids.contains(&v.category_id))
        })
        .filter(|v| search.map_or(true, |term| matches_search(v, term)))
        .filter(|v| {
            path.as_ref()
                .map_or(true, |p| v.category_path.to_lowercase().contains(p.as_str()))
        })
        .filter(|v| !filter.negative_only || v.current_stock < 0)
        .filter(|v| !filter.low_only || (0..=v.minimum_stock).contains(&v.current_stock))
        .collect();

    sort_views(&mut selected, key, order);
    Ok(paginate(selected, page))
}
