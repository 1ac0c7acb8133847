//! Page arithmetic for result navigation. Pure, no I/O.

use serde::Serialize;

use crate::interface::Range;

/// Neighbour pages listed on each side of the current one are closer than this.
pub const NEIGHBOR_SPAN: usize = 10;

/// Navigation metadata for one results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub window: Range,
    pub total_pages: usize,
    pub current_page: usize,
    pub before_pages: Vec<usize>,
    pub after_pages: Vec<usize>,
    /// 0 when there is no previous page to link to
    pub prev_page: usize,
    /// 0 when there is no next page to link to
    pub next_page: usize,
}

/// Parse a caller-supplied page number. Anything but a positive integer is page 1.
pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&p| p >= 1)
        .unwrap_or(1)
}

/// Entry window shown on `page` (1-based). Independent of how many entries exist.
pub fn page_window(page: usize, page_size: usize) -> Range {
    let page_size = page_size.max(1);
    Range::new(page.max(1).saturating_sub(1).saturating_mul(page_size), page_size)
}

/// Compute the window and neighbour links for `page` (1-based).
pub fn paginate(total_entries: usize, page: usize, page_size: usize) -> Pagination {
    let page_size = page_size.max(1);
    let page = page.max(1);
    let total_pages = total_entries.div_ceil(page_size);

    let before_pages = (1..page.min(total_pages + 1))
        .filter(|&i| page - i < NEIGHBOR_SPAN)
        .collect();
    let after_pages = (page.saturating_add(1)..=total_pages)
        .take_while(|&i| i - page < NEIGHBOR_SPAN)
        .collect();

    let link = |p: usize| if p <= total_pages { p } else { 0 };

    Pagination {
        window: page_window(page, page_size),
        total_pages,
        current_page: page,
        before_pages,
        after_pages,
        prev_page: link(page - 1),
        next_page: link(page.saturating_add(1)),
    }
}
