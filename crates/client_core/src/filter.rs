//! Search and pagination over the controller's collection. Nothing here
//! touches the network or reorders the collection.

use std::num::NonZeroUsize;

use shared::{domain::Record, schema::ResourceSchema};

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(size) => size,
    None => unreachable!(),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub query: String,
    pub page_index: usize,
    pub page_size: NonZeroUsize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            query: String::new(),
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Partial update merged into a [`FilterState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterUpdate {
    pub query: Option<String>,
    pub page_index: Option<usize>,
    pub page_size: Option<NonZeroUsize>,
}

impl FilterUpdate {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn page(page_index: usize) -> Self {
        Self {
            page_index: Some(page_index),
            ..Self::default()
        }
    }

    pub fn page_size(page_size: NonZeroUsize) -> Self {
        Self {
            page_size: Some(page_size),
            ..Self::default()
        }
    }
}

impl FilterState {
    /// Merges `update`. A changed query or page size sends the view back to
    /// the first page; the query survives a page size change.
    pub fn apply(&mut self, update: FilterUpdate) {
        if let Some(page_index) = update.page_index {
            self.page_index = page_index;
        }
        if let Some(query) = update.query {
            if query != self.query {
                self.query = query;
                self.page_index = 0;
            }
        }
        if let Some(page_size) = update.page_size {
            if page_size != self.page_size {
                self.page_size = page_size;
                self.page_index = 0;
            }
        }
    }

    pub fn clamp(&mut self, filtered_count: usize) {
        self.page_index = self
            .page_index
            .min(last_page_index(filtered_count, self.page_size));
    }
}

pub fn page_count(filtered_count: usize, page_size: NonZeroUsize) -> usize {
    filtered_count.div_ceil(page_size.get())
}

pub fn last_page_index(filtered_count: usize, page_size: NonZeroUsize) -> usize {
    page_count(filtered_count, page_size).saturating_sub(1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleSlice<F> {
    pub items: Vec<Record<F>>,
    pub page_index: usize,
    pub page_count: usize,
    pub filtered_count: usize,
    pub total_count: usize,
}

impl<F> VisibleSlice<F> {
    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.page_count
    }
}

/// Clamps `filter` against `collection` and returns the page it selects.
pub fn visible_slice<F: ResourceSchema>(
    collection: &[Record<F>],
    filter: &mut FilterState,
) -> VisibleSlice<F> {
    let needle = filter.query.to_lowercase();
    let matching: Vec<&Record<F>> = collection
        .iter()
        .filter(|record| record.fields.matches(&needle))
        .collect();
    filter.clamp(matching.len());

    let start = filter.page_index * filter.page_size.get();
    let items = matching
        .iter()
        .skip(start)
        .take(filter.page_size.get())
        .map(|record| (*record).clone())
        .collect();

    VisibleSlice {
        items,
        page_index: filter.page_index,
        page_count: page_count(matching.len(), filter.page_size),
        filtered_count: matching.len(),
        total_count: collection.len(),
    }
}
