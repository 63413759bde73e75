use serde::Serialize;

pub const MAX_LIMIT: i64 = 100;
/// Highest page whose offset still fits in an i64 at any limit.
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// Resolved `page`/`limit` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn meta(&self, total: i64) -> PageMeta {
        PageMeta {
            total,
            page: self.page,
            limit: self.limit,
            total_pages: (total + self.limit - 1) / self.limit,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: Page, total: i64) -> Self {
        Self {
            data,
            meta: page.meta(total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(Page::new(None, None, 10), Page { page: 1, limit: 10 });
        assert_eq!(Page::new(Some(0), Some(0), 10), Page { page: 1, limit: 1 });
        assert_eq!(Page::new(Some(-3), Some(5000), 20), Page { page: 1, limit: MAX_LIMIT });
    }

    #[test]
    fn offset_and_total_pages() {
        let p = Page::new(Some(3), Some(10), 10);
        assert_eq!(p.offset(), 20);
        assert_eq!(p.meta(0).total_pages, 0);
        assert_eq!(p.meta(10).total_pages, 1);
        assert_eq!(p.meta(21).total_pages, 3);
    }

    #[test]
    fn huge_page_keeps_offset_in_range() {
        let p = Page::new(Some(i64::MAX), Some(100), 10);
        assert_eq!(p.page, MAX_PAGE);
        assert!(p.offset() >= 0);
        assert_eq!(p.offset(), (MAX_PAGE - 1) * 100);

        let p = Page::new(Some(i64::MAX), Some(1), 10);
        assert!(p.offset() >= 0);
    }

    #[test]
    fn meta_serializes_camel_case() {
        let json = serde_json::to_value(Page::new(None, None, 10).meta(11)).unwrap();
        assert_eq!(json["totalPages"], 2);
        assert_eq!(json["page"], 1);
        assert_eq!(json["limit"], 10);
    }
}
