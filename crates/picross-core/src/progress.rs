use crate::completion::{ShapeMismatch, check_completion};
use crate::content::Content;

/// Where a player stands on one puzzle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressState {
    NotStarted,
    InProgress,
    Completed,
}

/// A player's attempt at a puzzle.
///
/// `is_completed` is derived from the goal on every submission and cannot be
/// set from outside.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameProgress {
    current_content: Option<Content>,
    is_completed: bool,
}

impl GameProgress {
    /// Rebuild a record that was computed by [`GameProgress::submit`] earlier.
    pub fn restore(current_content: Option<Content>, is_completed: bool) -> Self {
        let is_completed = is_completed && current_content.is_some();
        Self {
            current_content,
            is_completed,
        }
    }

    pub fn current_content(&self) -> Option<&Content> {
        self.current_content.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn state(&self) -> ProgressState {
        match (&self.current_content, self.is_completed) {
            (None, _) => ProgressState::NotStarted,
            (Some(_), false) => ProgressState::InProgress,
            (Some(_), true) => ProgressState::Completed,
        }
    }

    /// Replace the player's grid and recompute completion against `goal`.
    ///
    /// On a shape mismatch the record is left untouched.
    pub fn submit(
        &mut self,
        goal: Option<&Content>,
        content: Option<Content>,
    ) -> Result<ProgressState, ShapeMismatch> {
        let is_completed = check_completion(goal, content.as_ref())?;
        self.current_content = content;
        self.is_completed = is_completed;
        Ok(self.state())
    }

    pub fn into_parts(self) -> (Option<Content>, bool) {
        (self.current_content, self.is_completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Content {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn starts_not_started() {
        assert_eq!(GameProgress::default().state(), ProgressState::NotStarted);
    }

    #[test]
    fn submission_moves_through_states() {
        let goal = parse("[[true, false], [false, true]]");
        let mut progress = GameProgress::default();

        let state = progress
            .submit(Some(&goal), Some(parse("[[true, false], [false, false]]")))
            .unwrap();
        assert_eq!(state, ProgressState::InProgress);
        assert!(!progress.is_completed());

        let state = progress
            .submit(Some(&goal), Some(parse("[[true, false], [false, true]]")))
            .unwrap();
        assert_eq!(state, ProgressState::Completed);

        // Undoing a cell drops back to in progress.
        let state = progress
            .submit(Some(&goal), Some(parse("[[true, false], [null, null]]")))
            .unwrap();
        assert_eq!(state, ProgressState::InProgress);
    }

    #[test]
    fn clearing_content_resets() {
        let goal = parse("[[true]]");
        let mut progress = GameProgress::default();
        progress.submit(Some(&goal), Some(parse("[[true]]"))).unwrap();
        assert_eq!(progress.submit(Some(&goal), None), Ok(ProgressState::NotStarted));
        assert!(!progress.is_completed());
    }

    #[test]
    fn mismatch_leaves_record_untouched() {
        let goal = parse("[[true, false]]");
        let mut progress = GameProgress::default();
        progress.submit(Some(&goal), Some(parse("[[true, null]]"))).unwrap();
        let before = progress.clone();

        let err = progress
            .submit(Some(&goal), Some(parse("[[true]]")))
            .unwrap_err();
        assert!(matches!(err, ShapeMismatch::RowLength { row: 0, .. }));
        assert_eq!(progress, before);
    }

    #[test]
    fn missing_goal_never_completes() {
        let mut progress = GameProgress::default();
        let state = progress.submit(None, Some(parse("[[true]]"))).unwrap();
        assert_eq!(state, ProgressState::InProgress);
    }

    #[test]
    fn restore_cannot_complete_without_content() {
        let progress = GameProgress::restore(None, true);
        assert_eq!(progress.state(), ProgressState::NotStarted);
        assert!(!progress.is_completed());
    }
}
