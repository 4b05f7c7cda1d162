use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Page window of a query and, once counted, the size of the full result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total_record: i64,
    pub total_page: i64,
}

impl Pagination {
    /// Pages are 1-based; page sizes below 1 fall back to [`DEFAULT_PAGE_SIZE`]
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.max(1),
            page_size: if page_size < 1 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            total_record: 0,
            total_page: 0,
        }
    }

    /// Returns `(limit, skip)` for the driver's find options
    ///
    /// The skip saturates, so absurd page numbers yield an empty page.
    pub fn limit(&self) -> (i64, u64) {
        let skip = (self.page.max(1) - 1).saturating_mul(self.page_size.max(0));
        (self.page_size, skip as u64)
    }

    pub fn set_total_record(&mut self, total: u64) {
        self.total_record = i64::try_from(total).unwrap_or(i64::MAX);
        if self.page_size > 0 {
            self.total_page =
                i64::try_from(total.div_ceil(self.page_size as u64)).unwrap_or(i64::MAX);
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}
