use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::config::ListingConfig;

/// `?pagina=&por_pagina=` as sent by clients
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub pagina: Option<i64>,
    pub por_pagina: Option<i64>,
}

/// Page numbers clamped to the configured limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub pagina: i64,
    pub por_pagina: i64,
}

impl Pagination {
    pub fn resolve(query: PageQuery, listing: &ListingConfig) -> Self {
        let pagina = query.pagina.unwrap_or(1).max(1);
        let por_pagina = query
            .por_pagina
            .unwrap_or(listing.default_page_size)
            .clamp(1, listing.max_page_size.max(1));
        Self { pagina, por_pagina }
    }

    pub fn limit(&self) -> i64 {
        self.por_pagina
    }

    pub fn offset(&self) -> i64 {
        (self.pagina - 1).saturating_mul(self.por_pagina)
    }
}

/// One page of results, serialized as `{<key>: [...], pagina, por_pagina, total}`
#[derive(Debug)]
pub struct Page<T> {
    key: &'static str,
    items: Vec<T>,
    pagination: Pagination,
    total: i64,
}

impl<T> Page<T> {
    pub fn new(key: &'static str, items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        Self {
            key,
            items,
            pagination,
            total,
        }
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(self.key, &self.items)?;
        map.serialize_entry("pagina", &self.pagination.pagina)?;
        map.serialize_entry("por_pagina", &self.pagination.por_pagina)?;
        map.serialize_entry("total", &self.total)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing() -> ListingConfig {
        ListingConfig {
            default_page_size: 20,
            max_page_size: 100,
        }
    }

    #[test]
    fn defaults_and_clamping() {
        let p = Pagination::resolve(PageQuery::default(), &listing());
        assert_eq!(p, Pagination { pagina: 1, por_pagina: 20 });
        assert_eq!(p.offset(), 0);

        let p = Pagination::resolve(
            PageQuery {
                pagina: Some(-3),
                por_pagina: Some(1000),
            },
            &listing(),
        );
        assert_eq!(p, Pagination { pagina: 1, por_pagina: 100 });

        let p = Pagination::resolve(
            PageQuery {
                pagina: Some(3),
                por_pagina: Some(0),
            },
            &listing(),
        );
        assert_eq!(p.por_pagina, 1);
        assert_eq!(p.offset(), 2);
    }

    #[test]
    fn zero_max_page_size_does_not_panic() {
        let listing = ListingConfig {
            default_page_size: 20,
            max_page_size: 0,
        };
        let p = Pagination::resolve(PageQuery::default(), &listing);
        assert_eq!(p.por_pagina, 1);
    }

    #[test]
    fn page_uses_named_collection() {
        let pagination = Pagination { pagina: 2, por_pagina: 10 };
        let page = Page::new("eventos", vec![1, 2], pagination, 12);
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({"eventos": [1, 2], "pagina": 2, "por_pagina": 10, "total": 12})
        );
    }
}
