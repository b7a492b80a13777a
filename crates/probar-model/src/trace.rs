//! Path trace rendering for failure messages.
//!
//! Every recorded half-step is classified as passed, failed, or unknown (it
//! comes after the first failure, so the walk never got to check it). The
//! classification is rendered as `State:`/`Event:` lines, green while the
//! path is healthy, red at the failure, gray afterwards. Colors follow
//! [`console::colors_enabled`], so non-terminals get plain text.

use crate::executor::TestPathResult;
use console::style;
use std::iter;

/// Status of one trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    /// Ran and succeeded
    Passed,
    /// The first failure on the path
    Failed,
    /// Not known: the walk stopped earlier
    Unknown,
}

/// Which part of the path a line shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Assertion of a step's starting state
    State,
    /// A step's event executor
    Event,
    /// Assertion of the terminal state
    Terminal,
}

/// One classified line of a path trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    /// What the line shows
    pub kind: LineKind,
    /// State or event text
    pub text: String,
    /// Classification
    pub status: LineStatus,
}

/// Classify every recorded half-step and the terminal state, in order.
#[must_use]
pub fn classify(result: &TestPathResult) -> Vec<TraceLine> {
    let halves = result
        .steps
        .iter()
        .flat_map(|step| {
            [
                (LineKind::State, step.step.state.clone(), step.state.error.is_some()),
                (LineKind::Event, step.step.event.serialize(), step.event.error.is_some()),
            ]
        })
        .chain(iter::once((
            LineKind::Terminal,
            result.state.value.clone(),
            result.state.error.is_some(),
        )));

    let (lines, _) = halves.fold(
        (Vec::new(), false),
        |(mut lines, failed_before), (kind, text, has_error)| {
            let status = if failed_before {
                LineStatus::Unknown
            } else if has_error {
                LineStatus::Failed
            } else {
                LineStatus::Passed
            };
            lines.push(TraceLine { kind, text, status });
            (lines, failed_before || has_error)
        },
    );
    lines
}

fn paint(line: &TraceLine) -> String {
    let styled = style(line.text.as_str());
    let styled = match (line.status, line.kind) {
        (LineStatus::Unknown, _) => styled.black().bright(),
        (LineStatus::Failed, LineKind::State) => styled.red().bright(),
        (LineStatus::Failed, _) => styled.red(),
        (LineStatus::Passed, LineKind::State) => styled.green().bright(),
        (LineStatus::Passed, _) => styled.green(),
    };
    styled.to_string()
}

fn render_with(result: &TestPathResult, format: impl Fn(&TraceLine) -> String) -> String {
    let lines = classify(result);
    let mut blocks = Vec::with_capacity(result.steps.len() + 1);
    let mut pending_state: Option<String> = None;

    for line in &lines {
        let text = format(line);
        match line.kind {
            LineKind::State => pending_state = Some(format!("\tState: {text}")),
            LineKind::Event => {
                let state = pending_state.take().unwrap_or_default();
                blocks.push(format!("{state}\n\tEvent: {text}"));
            }
            LineKind::Terminal => blocks.push(format!("\tState: {text}")),
        }
    }

    format!("\nPath:\n{}", blocks.join("\n\n"))
}

/// Render the trace with ANSI colors (when enabled).
#[must_use]
pub fn render(result: &TestPathResult) -> String {
    render_with(result, paint)
}

/// Render the trace as plain text.
#[must_use]
pub fn render_plain(result: &TestPathResult) -> String {
    render_with(result, |line| line.text.clone())
}
