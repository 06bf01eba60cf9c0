//! Page slicing for lookup results

use serde::{Deserialize, Serialize};

/// Position of a page within a result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Zero-based page index
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_results: usize,
}

/// Return the items on `page` (zero-based) together with the pagination info.
///
/// Pages past the end yield an empty vector. A `page_size` of zero puts every
/// result on page 0.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> (Vec<T>, Pagination) {
    let total_results = items.len();

    let total_pages = match (total_results, page_size) {
        (0, _) => 0,
        (_, 0) => 1,
        (n, size) => n.div_ceil(size),
    };

    let slice: &[T] = if page_size == 0 {
        if page == 0 {
            items
        } else {
            &[]
        }
    } else {
        let start = page.saturating_mul(page_size);
        if start >= total_results {
            &[]
        } else {
            let end = start.saturating_add(page_size).min(total_results);
            &items[start..end]
        }
    };

    (
        slice.to_vec(),
        Pagination {
            page,
            page_size,
            total_pages,
            total_results,
        },
    )
}
