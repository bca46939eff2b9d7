pub mod clue;
pub mod completion;
pub mod content;
pub mod progress;
pub mod protocol;

pub use clue::{Clue, ClueLine, Clues, all_clues, line_clues};
pub use completion::{ShapeMismatch, check_completion};
pub use content::{Cell, CellKind, Content, ContentError, PuzzleDimensions, Rgba};
pub use progress::{GameProgress, ProgressState};
