//! Progress reporting for batch runs.

/// Steps reported per input file: copied, converted, calculated, persisted.
pub const STEPS_PER_FILE: usize = 4;

/// Total progress steps for a batch of `files` files, including the final
/// summary step.
///
/// # Example
///
/// ```
/// use commission_engine::processing::total_steps;
///
/// assert_eq!(total_steps(3), 13);
/// assert_eq!(total_steps(0), 1);
/// ```
pub fn total_steps(files: usize) -> usize {
    files * STEPS_PER_FILE + 1
}

/// Receives the number of completed steps, which only ever increases.
pub trait ProgressReporter {
    /// Called with the cumulative number of completed steps.
    fn step(&mut self, completed: usize);
}

impl<F: FnMut(usize)> ProgressReporter for F {
    fn step(&mut self, completed: usize) {
        self(completed)
    }
}

/// A reporter that ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn step(&mut self, _completed: usize) {}
}
