//! Bounded context window over the session history.

use super::history::Turn;

/// Most recent turns sent to the model on each request.
pub const CONTEXT_WINDOW_TURNS: usize = 5;

/// The last [`CONTEXT_WINDOW_TURNS`] turns, or all of them when there are fewer.
pub fn window(history: &[Turn]) -> &[Turn] {
    let start = history.len().saturating_sub(CONTEXT_WINDOW_TURNS);
    &history[start..]
}
