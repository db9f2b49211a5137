pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PARTS_PER_ROW: usize = 5;

/// One page of a list, with slice bounds into the full list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

pub fn paginate(total_items: usize, requested_page: usize, page_size: usize) -> Page {
    let page_size = page_size.max(1);
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = requested_page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);

    Page {
        page,
        total_pages,
        start,
        end,
        has_prev: page > 1,
        has_next: page < total_pages,
    }
}

/// Page that holds the item at zero-based `index`.
pub fn page_of(index: usize, page_size: usize) -> usize {
    index / page_size.max(1) + 1
}
