// Page geometry, pagination and the plate grid plan.
//
// Coordinates are PDF points with the origin at the bottom-left corner.

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

// A4 portrait in points
const A4_WIDTH_PT: f32 = 595.2756;
const A4_HEIGHT_PT: f32 = 841.8898;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_x: f32,
    pub margin_bottom: f32,
    // Space reserved above the grid for the header block.
    pub top_reserve: f32,
    pub columns: usize,
    pub column_gap: f32,
    pub row_height: f32,
    pub records_per_page: usize,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH_PT,
            page_height: A4_HEIGHT_PT,
            margin_x: 40.0,
            margin_bottom: 70.0,
            top_reserve: 180.0,
            columns: 4,
            column_gap: 25.0,
            row_height: 12.0,
            records_per_page: 140,
        }
    }
}

impl PageGeometry {
    /// Reject geometries whose grid cannot hold `records_per_page` entries.
    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 {
            return Err(ReportError::Config("grid needs at least one column".into()));
        }
        if !(self.row_height > 0.0) {
            return Err(ReportError::Config("row height must be positive".into()));
        }
        if self.column_width() <= 0.0 {
            return Err(ReportError::Config(format!(
                "{} columns with a {}pt gap do not fit between the margins",
                self.columns, self.column_gap
            )));
        }
        let capacity = self.columns * self.row_capacity();
        if capacity == 0 {
            return Err(ReportError::Config("no vertical room for a single row".into()));
        }
        if self.records_per_page == 0 || self.records_per_page > capacity {
            return Err(ReportError::Config(format!(
                "records per page must be between 1 and {} for this geometry, got {}",
                capacity, self.records_per_page
            )));
        }
        Ok(())
    }

    pub fn column_width(&self) -> f32 {
        let gaps = self.columns.saturating_sub(1) as f32 * self.column_gap;
        (self.page_width - 2.0 * self.margin_x - gaps) / self.columns.max(1) as f32
    }

    pub fn column_x(&self) -> Vec<f32> {
        let step = self.column_width() + self.column_gap;
        (0..self.columns)
            .map(|i| self.margin_x + i as f32 * step)
            .collect()
    }

    pub fn grid_top(&self) -> f32 {
        self.page_height - self.top_reserve
    }

    pub fn row_capacity(&self) -> usize {
        let usable = self.grid_top() - self.margin_bottom;
        if usable <= 0.0 || !(self.row_height > 0.0) {
            return 0;
        }
        (usable / self.row_height).floor() as usize
    }

    // A column runs down to the bottom margin before the cursor moves on;
    // `records_per_page` alone decides the page break.
    pub fn rows_per_column(&self) -> usize {
        self.row_capacity()
    }

    /// `ceil(total / records_per_page)`, never less than one.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.records_per_page.max(1)).max(1)
    }
}

/// Split a title into two balanced lines at the space nearest its middle.
///
/// Prefers the closest space at or before the middle character, then the
/// closest one after it, and only breaks mid-word when there is no space.
pub fn split_title(title: &str) -> (String, String) {
    let chars: Vec<(usize, char)> = title.char_indices().collect();
    let mid = chars.len() / 2;

    let before = chars[..(mid + 1).min(chars.len())]
        .iter()
        .rev()
        .find(|(_, ch)| *ch == ' ');
    let after = chars.iter().skip(mid).find(|(_, ch)| *ch == ' ');

    let split = before
        .or(after)
        .map(|(offset, _)| *offset)
        .or_else(|| chars.get(mid).map(|(offset, _)| *offset))
        .unwrap_or(title.len());

    let (first, second) = title.split_at(split);
    (first.trim().to_string(), second.trim().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub column: usize,
    pub row: usize,
    pub shaded: bool,
}

// Running grid state while a page is filled: current column, rows used in
// it and the alternating shade flag. Shading restarts unshaded in every
// column.
#[derive(Debug, Clone, Default)]
pub struct GridCursor {
    column: usize,
    row: usize,
    shaded: bool,
}

impl GridCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next slot, or `None` once every column is full.
    pub fn place(&mut self, geometry: &PageGeometry) -> Option<Slot> {
        if self.column >= geometry.columns {
            return None;
        }
        let slot = Slot {
            column: self.column,
            row: self.row,
            shaded: self.shaded,
        };

        self.row += 1;
        self.shaded = !self.shaded;
        if self.row >= geometry.rows_per_column() {
            self.column += 1;
            self.row = 0;
            self.shaded = false;
        }
        Some(slot)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridEntry {
    // 1-based, continuous across pages.
    pub number: usize,
    pub text: String,
    pub slot: Slot,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    pub number: usize,
    pub total_pages: usize,
    pub entries: Vec<GridEntry>,
}

impl PagePlan {
    pub fn is_last(&self) -> bool {
        self.number == self.total_pages
    }

    pub fn page_label(&self) -> String {
        format!("{}/{}", self.number, self.total_pages)
    }
}

/// Distribute plates over pages, filling each column top to bottom before
/// moving right.
pub fn plan_pages(plates: &[String], geometry: &PageGeometry) -> Vec<PagePlan> {
    let total_pages = geometry.page_count(plates.len());
    let column_x = geometry.column_x();
    let per_page = geometry.records_per_page.max(1);

    (0..total_pages)
        .map(|page_idx| {
            let start = page_idx * per_page;
            let end = (start + per_page).min(plates.len());
            let mut cursor = GridCursor::new();
            let mut entries = Vec::with_capacity(end.saturating_sub(start));

            for (offset, plate) in plates.get(start..end).unwrap_or_default().iter().enumerate() {
                let Some(slot) = cursor.place(geometry) else {
                    break;
                };
                entries.push(GridEntry {
                    number: start + offset + 1,
                    text: format!("{}. {}", start + offset + 1, plate),
                    slot,
                    x: column_x[slot.column],
                    y: geometry.grid_top() - slot.row as f32 * geometry.row_height,
                });
            }

            PagePlan {
                number: page_idx + 1,
                total_pages,
                entries,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plates(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("P{:04}", i)).collect()
    }

    #[test]
    fn default_geometry_is_valid() {
        let geometry = PageGeometry::default();
        geometry.validate().unwrap();
        assert_eq!(geometry.row_capacity(), 49);
        assert_eq!(geometry.rows_per_column(), 49);
        assert!((geometry.column_width() - 110.07).abs() < 0.01);
    }

    #[test]
    fn page_count_is_ceiling_with_a_floor_of_one() {
        let geometry = PageGeometry::default();
        assert_eq!(geometry.page_count(0), 1);
        assert_eq!(geometry.page_count(1), 1);
        assert_eq!(geometry.page_count(140), 1);
        assert_eq!(geometry.page_count(141), 2);
        assert_eq!(geometry.page_count(420), 3);
    }

    #[test]
    fn numbering_is_contiguous_across_pages() {
        let geometry = PageGeometry::default();
        let list = plates(301);
        let pages = plan_pages(&list, &geometry);

        assert_eq!(pages.len(), 3);
        let numbers: Vec<usize> = pages
            .iter()
            .flat_map(|p| p.entries.iter().map(|e| e.number))
            .collect();
        assert_eq!(numbers, (1..=301).collect::<Vec<_>>());
        assert_eq!(pages[1].entries[0].text, "141. P0140");
        assert_eq!(pages[2].entries.len(), 21);
        assert!(pages[2].is_last() && !pages[0].is_last());
        assert_eq!(pages[0].page_label(), "1/3");
    }

    #[test]
    fn empty_list_still_plans_one_page() {
        let pages = plan_pages(&[], &PageGeometry::default());
        assert_eq!(pages.len(), 1);
        assert!(pages[0].entries.is_empty());
        assert!(pages[0].is_last());
    }

    #[test]
    fn columns_fill_top_to_bottom_and_shading_resets() {
        let geometry = PageGeometry::default();
        let pages = plan_pages(&plates(140), &geometry);
        let entries = &pages[0].entries;

        let per_column: Vec<usize> = (0..geometry.columns)
            .map(|c| entries.iter().filter(|e| e.slot.column == c).count())
            .collect();
        assert_eq!(per_column, vec![49, 49, 42, 0]);

        let first_col: Vec<&GridEntry> = entries.iter().filter(|e| e.slot.column == 0).collect();
        assert!(first_col.windows(2).all(|w| w[1].y < w[0].y));
        let lowest = first_col[48].y;
        assert!(lowest - geometry.row_height < geometry.margin_bottom + geometry.row_height);

        // Row 48 is unshaded, so without the reset column 2 would start shaded.
        let second_top = entries.iter().find(|e| e.slot.column == 1).unwrap();
        assert_eq!(second_top.number, 50);
        assert_eq!(second_top.slot.row, 0);
        assert!(!second_top.slot.shaded);
        assert!(entries[1].slot.shaded);
        assert!(!entries[48].slot.shaded);
    }

    #[test]
    fn rows_stay_above_the_bottom_margin() {
        let geometry = PageGeometry {
            records_per_page: 196,
            ..PageGeometry::default()
        };
        geometry.validate().unwrap();
        let pages = plan_pages(&plates(196), &geometry);
        let lowest = pages[0]
            .entries
            .iter()
            .map(|e| e.y)
            .fold(f32::INFINITY, f32::min);
        assert!(lowest - geometry.row_height + 2.0 >= geometry.margin_bottom);
    }

    #[test]
    fn oversized_records_per_page_is_rejected() {
        let geometry = PageGeometry {
            records_per_page: 500,
            ..PageGeometry::default()
        };
        assert!(geometry.validate().is_err());

        let geometry = PageGeometry {
            columns: 0,
            ..PageGeometry::default()
        };
        assert!(geometry.validate().is_err());
    }

    #[test]
    fn title_splits_at_nearest_space_before_middle() {
        let title = "Excise Taxation Vehicle Registration";
        let (first, second) = split_title(title);
        assert_eq!(first, "Excise Taxation");
        assert_eq!(second, "Vehicle Registration");
        assert_eq!(format!("{} {}", first, second), title);
    }

    #[test]
    fn title_falls_back_to_space_after_middle() {
        let (first, second) = split_title("Registrations of KHI");
        assert_eq!(first, "Registrations");
        assert_eq!(second, "of KHI");
    }

    #[test]
    fn title_without_spaces_breaks_mid_word() {
        assert_eq!(split_title("ABCDEF"), ("ABC".to_string(), "DEF".to_string()));
        assert_eq!(split_title(""), (String::new(), String::new()));
    }

    #[test]
    fn default_title_splits_before_middle() {
        let (first, second) =
            split_title("Excise Taxation Vehicle Registration & Number Plate Section Hyderabad");
        assert_eq!(first, "Excise Taxation Vehicle");
        assert_eq!(second, "Registration & Number Plate Section Hyderabad");
    }
}
