//! Plain-text tables for the list and show commands.

use client_core::VisibleSlice;
use shared::domain::{CategoryFields, CouponFields, CustomerFields, Record};

/// Columns shown for one resource type.
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;

    /// Item lists shown under the table by `show`, as (label, items).
    fn details(&self) -> Vec<(&'static str, &[String])> {
        Vec::new()
    }
}

impl TableRow for CouponFields {
    const HEADERS: &'static [&'static str] =
        &["CODE", "DISCOUNT", "MIN ORDER", "MAX DISCOUNT", "EXPIRES", "STATUS"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.code.clone(),
            self.discount_label(),
            format!("Rs. {}", self.min_order_amount),
            self.max_discount
                .map(|max| format!("Rs. {max}"))
                .unwrap_or_else(|| "-".into()),
            self.expires_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".into()),
            self.status_label().to_string(),
        ]
    }
}

impl TableRow for CategoryFields {
    const HEADERS: &'static [&'static str] = &["NAME", "DESCRIPTION"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.description.clone().unwrap_or_else(|| "-".into()),
        ]
    }
}

impl TableRow for CustomerFields {
    const HEADERS: &'static [&'static str] =
        &["NAME", "EMAIL", "PHONE", "ORDERS", "CART", "WISHLIST", "ADDRESS"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.orders.len().to_string(),
            self.cart.len().to_string(),
            self.wishlist.len().to_string(),
            self.address.to_string(),
        ]
    }

    fn details(&self) -> Vec<(&'static str, &[String])> {
        vec![
            ("cart", self.cart.as_slice()),
            ("wishlist", self.wishlist.as_slice()),
            ("orders", self.orders.as_slice()),
        ]
    }
}

pub fn render<F: TableRow>(records: &[Record<F>]) -> String {
    let mut rows = vec![std::iter::once("ID")
        .chain(F::HEADERS.iter().copied())
        .map(str::to_string)
        .collect::<Vec<_>>()];
    rows.extend(records.iter().map(|record| {
        std::iter::once(record.id.to_string())
            .chain(record.fields.cells())
            .collect()
    }));

    let mut widths = vec![0; rows[0].len()];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_details<F: TableRow>(fields: &F) -> String {
    fields
        .details()
        .into_iter()
        .map(|(label, items)| {
            if items.is_empty() {
                format!("{label}:\n  No items in {label}.")
            } else {
                let lines = items
                    .iter()
                    .map(|item| format!("  - {item}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{label}:\n{lines}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn page_footer<F>(slice: &VisibleSlice<F>) -> String {
    format!(
        "page {} of {} ({} matching, {} total)",
        slice.page_index + 1,
        slice.page_count.max(1),
        slice.filtered_count,
        slice.total_count
    )
}
