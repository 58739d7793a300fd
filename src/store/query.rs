//! Predicate queries over the page store.
//!
//! Deliberately small: equality/inequality filters on named fields, optional
//! ordering, limit/offset. No joins, no aggregation, no full-text search.

use super::{Page, PageStore};
use anyhow::Result;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Builder for a single store query.
pub struct Query<'a> {
    store: &'a PageStore,
    filters: Vec<(String, Op, Value)>,
    order: Option<(String, SortDir)>,
    limit: Option<usize>,
    offset: usize,
}

impl<'a> Query<'a> {
    pub(super) fn new(store: &'a PageStore) -> Self {
        Self {
            store,
            filters: Vec::new(),
            order: None,
            limit: None,
            offset: 0,
        }
    }

    pub fn filter(mut self, field: &str, op: Op, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), op, value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, dir: SortDir) -> Self {
        self.order = Some((field.to_string(), dir));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Execute and return all matching records.
    ///
    /// Without an explicit ordering, results come back sorted by `file`, so
    /// "first match" is deterministic.
    pub fn all(self) -> Result<Vec<Page>> {
        let mut pages: Vec<Page> = self
            .store
            .all_pages()?
            .into_iter()
            .filter(|page| self.matches(page))
            .collect();

        if let Some((field, dir)) = &self.order {
            pages.sort_by(|a, b| {
                let ord = cmp_values(a.field(field), b.field(field));
                match dir {
                    SortDir::Asc => ord,
                    SortDir::Desc => ord.reverse(),
                }
            });
        }

        let iter = pages.into_iter().skip(self.offset);
        Ok(match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        })
    }

    /// Execute and return the first matching record, if any.
    pub fn first(self) -> Result<Option<Page>> {
        Ok(self.limit(1).all()?.into_iter().next())
    }

    fn matches(&self, page: &Page) -> bool {
        self.filters.iter().all(|(field, op, value)| {
            let actual = page.field(field);
            match op {
                Op::Eq => actual.as_ref() == Some(value),
                Op::Ne => actual.as_ref() != Some(value),
            }
        })
    }
}

/// Order missing values first, then compare by type.
fn cmp_values(a: Option<Value>, b: Option<Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (&a, &b) {
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_store(temp: &TempDir) -> PageStore {
        let store = PageStore::open(&temp.path().join("pages")).unwrap();
        for (url, file, title) in [
            ("index", "index.md", "Home"),
            ("guide", "guide.md", "Guide"),
            ("blog/first", "blog/first.md", "First post"),
        ] {
            let mut page = Page::new(url, file);
            page.set("title", title.to_string());
            store.upsert(&page).unwrap();
        }
        store
    }

    #[test]
    fn test_filter_eq() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let page = store
            .query()
            .filter("url", Op::Eq, "guide")
            .first()
            .unwrap()
            .unwrap();
        assert_eq!(page.title.as_deref(), Some("Guide"));
    }

    #[test]
    fn test_filter_ne() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let pages = store.query().filter("url", Op::Ne, "index").all().unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.url != "index"));
    }

    #[test]
    fn test_no_match() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let page = store
            .query()
            .filter("url", Op::Eq, "missing")
            .first()
            .unwrap();
        assert!(page.is_none());
    }

    #[test]
    fn test_order_and_limit() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let pages = store
            .query()
            .order_by("title", SortDir::Desc)
            .limit(2)
            .all()
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].title.as_deref(), Some("Home"));
        assert_eq!(pages[1].title.as_deref(), Some("Guide"));
    }

    #[test]
    fn test_offset() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let pages = store
            .query()
            .order_by("file", SortDir::Asc)
            .limit(10)
            .offset(1)
            .all()
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].file, "guide.md");
    }

    #[test]
    fn test_default_order_is_by_file() {
        let temp = TempDir::new().unwrap();
        let store = seeded_store(&temp);

        let pages = store.query().all().unwrap();
        let files: Vec<_> = pages.iter().map(|p| p.file.as_str()).collect();
        assert_eq!(files, vec!["blog/first.md", "guide.md", "index.md"]);
    }
}
