pub mod orders;
pub mod products;
pub mod system;

use common::Pagination;
use serde::Deserialize;

/// `page`/`per_page` query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::page(
            self.page.unwrap_or(1),
            self.per_page.unwrap_or(Pagination::DEFAULT_PER_PAGE),
        )
    }
}
