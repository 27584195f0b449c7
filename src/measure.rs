use crate::config::LayoutConfig;
use crate::topology::Table;
use unicode_width::UnicodeWidthStr;

/// Table box metrics derived from the layout configuration.
#[derive(Debug, Clone)]
pub struct TableMetrics {
    pub width: f64,
    pub header_height: f64,
    pub row_height: f64,
    pub padding: f64,
    pub char_width: f64,
}

impl Default for TableMetrics {
    fn default() -> Self {
        Self::from_config(&LayoutConfig::default())
    }
}

impl TableMetrics {
    pub fn from_config(cfg: &LayoutConfig) -> Self {
        Self {
            width: cfg.table_width,
            header_height: cfg.header_height,
            row_height: cfg.row_height,
            padding: cfg.padding,
            char_width: cfg.char_width,
        }
    }

    pub fn text_width(&self, text: &str) -> f64 {
        UnicodeWidthStr::width(text) as f64 * self.char_width
    }

    pub fn height(&self, column_count: usize) -> f64 {
        self.header_height + column_count as f64 * self.row_height + self.padding
    }

    /// Unscaled table size. Compact tables have the fixed width; verbose ones
    /// grow to fit `name: type -- comment` rows.
    pub fn table_size(&self, table: &Table, verbose: bool) -> (f64, f64) {
        let height = self.height(table.columns.len());
        if !verbose {
            return (self.width, height);
        }

        let header = self.text_width(&table.name) + self.padding * 2.0;
        let widest_row = table
            .columns
            .iter()
            .map(|c| {
                let mut w = self.text_width(&c.name) + self.text_width(&c.typ) + self.char_width * 3.0;
                if let Some(comment) = &c.comment {
                    w += self.text_width(comment) + self.char_width * 4.0;
                }
                w + self.padding * 2.0
            })
            .fold(0.0, f64::max);

        (self.width.max(header).max(widest_row), height)
    }

    /// Offset from the table top to the vertical middle of row `index`.
    pub fn row_center_offset(&self, index: usize) -> f64 {
        self.header_height + index as f64 * self.row_height + self.row_height / 2.0
    }

    /// Row index at `offset_y` from the table top, `None` inside the header or padding.
    pub fn row_at(&self, offset_y: f64, column_count: usize) -> Option<usize> {
        let into_rows = offset_y - self.header_height;
        if into_rows < 0.0 {
            return None;
        }
        let idx = (into_rows / self.row_height).floor() as usize;
        (idx < column_count).then_some(idx)
    }
}
