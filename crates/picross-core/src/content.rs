use std::fmt;

use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A color value carried by a colored cell. Encoded on the wire as `[r, g, b, a]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(u8, u8, u8, f64)", into = "(u8, u8, u8, f64)")]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f64,
}

impl Rgba {
    pub fn new(red: u8, green: u8, blue: u8, alpha: f64) -> Result<Self, ContentError> {
        if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
            return Err(ContentError::InvalidAlpha(alpha));
        }
        Ok(Self {
            red,
            green,
            blue,
            alpha,
        })
    }

    /// Opaque color.
    pub fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 1.0,
        }
    }
}

impl TryFrom<(u8, u8, u8, f64)> for Rgba {
    type Error = ContentError;

    fn try_from((red, green, blue, alpha): (u8, u8, u8, f64)) -> Result<Self, Self::Error> {
        Rgba::new(red, green, blue, alpha)
    }
}

impl From<Rgba> for (u8, u8, u8, f64) {
    fn from(c: Rgba) -> Self {
        (c.red, c.green, c.blue, c.alpha)
    }
}

/// One grid position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Filled,
    Colored(Rgba),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn kind(&self) -> Option<CellKind> {
        match self {
            Cell::Empty => None,
            Cell::Filled => Some(CellKind::Binary),
            Cell::Colored(_) => Some(CellKind::Colored),
        }
    }

    pub fn rgba(&self) -> Option<Rgba> {
        match self {
            Cell::Colored(c) => Some(*c),
            _ => None,
        }
    }
}

/// The family of cells a puzzle is drawn with. A content never mixes kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Binary,
    Colored,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKind::Binary => f.write_str("binary"),
            CellKind::Colored => f.write_str("colored"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentError {
    #[error("alpha must be within [0.0, 1.0], got {0}")]
    InvalidAlpha(f64),
    #[error("cell ({row}, {column}) mixes binary and colored cells")]
    MixedCellKinds { row: usize, column: usize },
}

/// Raw wire form of a non-null cell.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireCell {
    Flag(bool),
    Color(Rgba),
}

impl WireCell {
    fn kind(&self) -> CellKind {
        match self {
            WireCell::Flag(_) => CellKind::Binary,
            WireCell::Color(_) => CellKind::Colored,
        }
    }
}

impl From<Option<WireCell>> for Cell {
    fn from(raw: Option<WireCell>) -> Self {
        match raw {
            None | Some(WireCell::Flag(false)) => Cell::Empty,
            Some(WireCell::Flag(true)) => Cell::Filled,
            Some(WireCell::Color(c)) => Cell::Colored(c),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_none(),
            Cell::Filled => serializer.serialize_bool(true),
            Cell::Colored(c) => c.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<WireCell>::deserialize(deserializer).map(Cell::from)
    }
}

/// A puzzle grid: ordered rows of cells. Rows may be ragged.
///
/// Content is immutable once built; derived values such as clues must be
/// recomputed from a new value rather than patched.
#[derive(Clone, Debug, Default)]
pub struct Content {
    rows: Vec<Vec<Cell>>,
    kind: Option<CellKind>,
}

impl Content {
    /// Build a content from rows, rejecting grids that mix binary and colored cells.
    pub fn new(rows: Vec<Vec<Cell>>) -> Result<Self, ContentError> {
        let mut kind = None;
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                kind = merge_kind(kind, cell.kind(), r, c)?;
            }
        }
        Ok(Self { rows, kind })
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Vertical slice at `index`. Rows too short to reach it read as empty.
    pub fn column(&self, index: usize) -> Vec<Cell> {
        self.rows
            .iter()
            .map(|row| row.get(index).copied().unwrap_or_default())
            .collect()
    }

    /// `None` when the grid holds nothing but nulls.
    pub fn kind(&self) -> Option<CellKind> {
        self.kind
    }

    pub fn is_blank(&self) -> bool {
        self.cells().all(Cell::is_empty)
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flatten()
    }

    pub fn dimensions(&self) -> PuzzleDimensions {
        PuzzleDimensions {
            rows_count: self.row_count(),
            cols_count: self.column_count(),
        }
    }
}

fn merge_kind(
    current: Option<CellKind>,
    next: Option<CellKind>,
    row: usize,
    column: usize,
) -> Result<Option<CellKind>, ContentError> {
    match (current, next) {
        (Some(a), Some(b)) if a != b => Err(ContentError::MixedCellKinds { row, column }),
        (Some(a), _) => Ok(Some(a)),
        (None, b) => Ok(b),
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let binary = self.kind == Some(CellKind::Binary);
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&WireRow { cells: row, binary })?;
        }
        seq.end()
    }
}

struct WireRow<'a> {
    cells: &'a [Cell],
    binary: bool,
}

impl Serialize for WireRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.cells.len()))?;
        for cell in self.cells {
            if self.binary && cell.is_empty() {
                seq.serialize_element(&false)?;
            } else {
                seq.serialize_element(cell)?;
            }
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<Option<Vec<Option<WireCell>>>>::deserialize(deserializer)?;

        let mut kind = None;
        let mut rows = Vec::with_capacity(raw.len());
        for (r, row) in raw.into_iter().enumerate() {
            // A null row is a zero-length row.
            let row = row.unwrap_or_default();
            let mut cells = Vec::with_capacity(row.len());
            for (c, cell) in row.into_iter().enumerate() {
                let cell_kind = cell.as_ref().map(WireCell::kind);
                kind = merge_kind(kind, cell_kind, r, c).map_err(D::Error::custom)?;
                cells.push(Cell::from(cell));
            }
            rows.push(cells);
        }

        Ok(Content { rows, kind })
    }
}

/// Grid size shown in puzzle listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleDimensions {
    pub rows_count: usize,
    pub cols_count: usize,
}

/// Number of rows, or `None` when there is no content.
pub fn row_count(content: Option<&Content>) -> Option<usize> {
    content.map(Content::row_count)
}

/// Longest row length, or `None` when there is no content.
pub fn column_count(content: Option<&Content>) -> Option<usize> {
    content.map(Content::column_count)
}

pub fn column(content: &Content, index: usize) -> Vec<Cell> {
    content.column(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Content {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn counts_on_absent_content() {
        assert_eq!(row_count(None), None);
        assert_eq!(column_count(None), None);
    }

    #[test]
    fn column_count_is_longest_row() {
        let content = parse("[[true], [true, false, true], []]");
        assert_eq!(row_count(Some(&content)), Some(3));
        assert_eq!(column_count(Some(&content)), Some(3));
    }

    #[test]
    fn zero_length_rows_have_no_columns() {
        let content = parse("[[], []]");
        assert_eq!(content.row_count(), 2);
        assert_eq!(content.column_count(), 0);
    }

    #[test]
    fn ragged_column_reads_empty_past_row_end() {
        let content = parse("[[true], [true, false]]");
        // Row 0 is too short. Row 1 holds a binary `false`, which decodes to `Empty`.
        assert_eq!(column(&content, 1), vec![Cell::Empty, Cell::Empty]);
        assert_eq!(column(&content, 0), vec![Cell::Filled, Cell::Filled]);
    }

    #[test]
    fn null_row_is_zero_length() {
        let content = parse("[null, [true]]");
        assert_eq!(content.row(0), Some(&[][..]));
        assert_eq!(content.column(0), vec![Cell::Empty, Cell::Filled]);
    }

    #[test]
    fn decodes_colored_cells() {
        let content = parse("[[[255, 0, 0, 1.0], null, [0, 0, 255, 0.5]]]");
        assert_eq!(content.kind(), Some(CellKind::Colored));
        assert_eq!(
            content.row(0).unwrap(),
            &[
                Cell::Colored(Rgba::opaque(255, 0, 0)),
                Cell::Empty,
                Cell::Colored(Rgba::new(0, 0, 255, 0.5).unwrap()),
            ]
        );
    }

    #[test]
    fn false_and_null_are_both_empty() {
        let content = parse("[[false, null, true]]");
        assert_eq!(content.kind(), Some(CellKind::Binary));
        assert_eq!(content.row(0).unwrap(), &[Cell::Empty, Cell::Empty, Cell::Filled]);
    }

    #[test]
    fn only_nulls_has_no_kind() {
        let content = parse("[[null, null], [null]]");
        assert_eq!(content.kind(), None);
        assert!(content.is_blank());
    }

    #[test]
    fn rejects_mixed_cell_kinds() {
        let err = serde_json::from_str::<Content>("[[true], [[1, 2, 3, 1.0]]]").unwrap_err();
        assert!(err.to_string().contains("mixes binary and colored"));

        let err = Content::new(vec![vec![Cell::Filled, Cell::Colored(Rgba::opaque(1, 2, 3))]])
            .unwrap_err();
        assert_eq!(err, ContentError::MixedCellKinds { row: 0, column: 1 });
    }

    #[test]
    fn rejects_alpha_out_of_range() {
        assert!(serde_json::from_str::<Content>("[[[1, 2, 3, 1.5]]]").is_err());
        assert!(serde_json::from_str::<Content>("[[[1, 2, 300, 1.0]]]").is_err());
        assert_eq!(Rgba::new(0, 0, 0, -0.1), Err(ContentError::InvalidAlpha(-0.1)));
    }

    #[test]
    fn binary_empty_encodes_as_false() {
        let content = parse("[[null, true], []]");
        assert_eq!(serde_json::to_string(&content).unwrap(), "[[false,true],[]]");
    }

    #[test]
    fn colored_empty_encodes_as_null() {
        let colored = parse("[[null, [10, 20, 30, 1.0]]]");
        assert_eq!(
            serde_json::to_string(&colored).unwrap(),
            "[[null,[10,20,30,1.0]]]"
        );
    }

    #[test]
    fn dimensions_follow_shape() {
        let content = parse("[[true, false], [true], [false, false, false]]");
        assert_eq!(
            content.dimensions(),
            PuzzleDimensions {
                rows_count: 3,
                cols_count: 3
            }
        );
    }
}
