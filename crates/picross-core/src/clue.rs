use serde::{Deserialize, Serialize};

use crate::content::{Cell, Content, Rgba};

/// One run of consecutive equal, non-empty cells.
///
/// Binary runs carry no color and serialize as `{"count": n}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgba: Option<Rgba>,
    pub count: usize,
}

/// The clues for one row or column.
///
/// A line without any filled cell is `Blank` (encoded as `null`) rather than
/// an empty list, so a renderer always has one symbol to draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClueLine {
    Runs(Vec<Clue>),
    Blank,
}

impl ClueLine {
    pub fn from_runs(runs: Vec<Clue>) -> Self {
        if runs.is_empty() {
            ClueLine::Blank
        } else {
            ClueLine::Runs(runs)
        }
    }

    pub fn runs(&self) -> &[Clue] {
        match self {
            ClueLine::Runs(runs) => runs,
            ClueLine::Blank => &[],
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, ClueLine::Blank)
    }
}

/// Row and column clue lines of a whole grid. Encoded as `[rows, columns]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Vec<ClueLine>, Vec<ClueLine>)", into = "(Vec<ClueLine>, Vec<ClueLine>)")]
pub struct Clues {
    pub rows: Vec<ClueLine>,
    pub columns: Vec<ClueLine>,
}

impl From<(Vec<ClueLine>, Vec<ClueLine>)> for Clues {
    fn from((rows, columns): (Vec<ClueLine>, Vec<ClueLine>)) -> Self {
        Self { rows, columns }
    }
}

impl From<Clues> for (Vec<ClueLine>, Vec<ClueLine>) {
    fn from(clues: Clues) -> Self {
        (clues.rows, clues.columns)
    }
}

/// Run-length clues of a single line, left to right.
pub fn line_clues(line: &[Cell]) -> ClueLine {
    let mut runs: Vec<Clue> = Vec::new();
    let mut previous = Cell::Empty;

    for &cell in line {
        if !cell.is_empty() {
            match runs.last_mut() {
                Some(run) if cell == previous => run.count += 1,
                _ => runs.push(Clue {
                    rgba: cell.rgba(),
                    count: 1,
                }),
            }
        }
        previous = cell;
    }

    ClueLine::from_runs(runs)
}

/// Clues for every row and every column of `content`, or `None` without content.
pub fn all_clues(content: Option<&Content>) -> Option<Clues> {
    content.map(Content::clues)
}

impl Content {
    /// Recomputes all clue lines from scratch.
    pub fn clues(&self) -> Clues {
        let rows = self.rows().iter().map(|row| line_clues(row)).collect();
        let columns = (0..self.column_count())
            .map(|i| line_clues(&self.column(i)))
            .collect();
        Clues { rows, columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn binary(count: usize) -> Clue {
        Clue { rgba: None, count }
    }

    fn colored(rgba: Rgba, count: usize) -> Clue {
        Clue {
            rgba: Some(rgba),
            count,
        }
    }

    fn parse(json: &str) -> Content {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_line_is_blank() {
        assert_eq!(line_clues(&[]), ClueLine::Blank);
        assert_eq!(line_clues(&[Cell::Empty, Cell::Empty]), ClueLine::Blank);
    }

    #[test]
    fn binary_runs_are_split_by_gaps() {
        let line = [Cell::Filled, Cell::Filled, Cell::Empty, Cell::Filled];
        assert_eq!(line_clues(&line), ClueLine::Runs(vec![binary(2), binary(1)]));
    }

    #[test]
    fn color_change_starts_new_run() {
        let red = Rgba::opaque(255, 0, 0);
        let blue = Rgba::opaque(0, 0, 255);
        let line = [Cell::Colored(red), Cell::Colored(red), Cell::Colored(blue)];
        assert_eq!(
            line_clues(&line),
            ClueLine::Runs(vec![colored(red, 2), colored(blue, 1)])
        );
    }

    #[test]
    fn alpha_difference_breaks_run() {
        let solid = Rgba::opaque(10, 10, 10);
        let faded = Rgba::new(10, 10, 10, 0.5).unwrap();
        let line = [Cell::Colored(solid), Cell::Colored(faded)];
        assert_eq!(
            line_clues(&line),
            ClueLine::Runs(vec![colored(solid, 1), colored(faded, 1)])
        );
    }

    #[test]
    fn same_color_across_gap_is_two_runs() {
        let red = Rgba::opaque(255, 0, 0);
        let line = [Cell::Colored(red), Cell::Empty, Cell::Colored(red)];
        assert_eq!(
            line_clues(&line),
            ClueLine::Runs(vec![colored(red, 1), colored(red, 1)])
        );
    }

    #[test]
    fn absent_content_has_no_clues() {
        assert_eq!(all_clues(None), None);
    }

    #[test]
    fn single_zero_length_row() {
        let clues = all_clues(Some(&parse("[[]]"))).unwrap();
        assert_eq!(clues.rows, vec![ClueLine::Blank]);
        assert!(clues.columns.is_empty());
    }

    #[test]
    fn rows_and_columns_of_ragged_grid() {
        let content = parse("[[true, true, false], [true], [false, true, true]]");
        let clues = content.clues();
        assert_eq!(
            clues.rows,
            vec![
                ClueLine::Runs(vec![binary(2)]),
                ClueLine::Runs(vec![binary(1)]),
                ClueLine::Runs(vec![binary(2)]),
            ]
        );
        assert_eq!(
            clues.columns,
            vec![
                ClueLine::Runs(vec![binary(2)]),
                ClueLine::Runs(vec![binary(1), binary(1)]),
                ClueLine::Runs(vec![binary(1)]),
            ]
        );
    }

    #[test]
    fn wire_format() {
        let content = parse("[[[255, 0, 0, 1.0], [255, 0, 0, 1.0]], [null, null]]");
        let json = serde_json::to_value(content.clues()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                [[{"rgba": [255, 0, 0, 1.0], "count": 2}], null],
                [[{"rgba": [255, 0, 0, 1.0], "count": 1}], [{"rgba": [255, 0, 0, 1.0], "count": 1}]]
            ])
        );

        let grid = parse("[[true, false, true]]");
        let json = serde_json::to_value(grid.clues()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                [[{"count": 1}, {"count": 1}]],
                [[{"count": 1}], null, [{"count": 1}]]
            ])
        );
    }

    #[test]
    fn wire_round_trip_keeps_blank_lines() {
        let clues = parse("[[true], [false]]").clues();
        let json = serde_json::to_string(&clues).unwrap();
        let back: Clues = serde_json::from_str(&json).unwrap();
        assert_eq!(back, clues);
    }

    #[test]
    fn recomputing_is_idempotent() {
        let content = parse("[[true, false, true], [false, true, true]]");
        assert_eq!(content.clues(), content.clues());
    }

    fn arb_line() -> impl Strategy<Value = Vec<Cell>> {
        let red = Rgba::opaque(255, 0, 0);
        let green = Rgba::opaque(0, 255, 0);
        prop::collection::vec(
            prop_oneof![
                Just(Cell::Empty),
                Just(Cell::Colored(red)),
                Just(Cell::Colored(green)),
            ],
            0..40,
        )
    }

    fn arb_binary_line() -> impl Strategy<Value = Vec<Cell>> {
        prop::collection::vec(prop_oneof![Just(Cell::Empty), Just(Cell::Filled)], 0..40)
    }

    proptest! {
        #[test]
        fn binary_runs_match_filled_stretches(line in arb_binary_line()) {
            let clues = line_clues(&line);
            prop_assert!(clues.runs().iter().all(|c| c.rgba.is_none() && c.count >= 1));

            let stretches: Vec<usize> = line
                .split(|c| c.is_empty())
                .map(<[Cell]>::len)
                .filter(|&len| len > 0)
                .collect();
            let counts: Vec<usize> = clues.runs().iter().map(|c| c.count).collect();
            prop_assert_eq!(counts, stretches);
        }

        #[test]
        fn run_counts_never_exceed_line_length(line in arb_line()) {
            let clues = line_clues(&line);
            let total: usize = clues.runs().iter().map(|c| c.count).sum();
            let filled = line.iter().filter(|c| !c.is_empty()).count();
            prop_assert!(total <= line.len());
            prop_assert_eq!(total, filled);
            prop_assert!(clues.runs().iter().all(|c| c.count >= 1));
            prop_assert_eq!(clues.is_blank(), filled == 0);
        }

        #[test]
        fn line_clues_are_deterministic(line in arb_line()) {
            let a = serde_json::to_string(&line_clues(&line)).unwrap();
            let b = serde_json::to_string(&line_clues(&line)).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
