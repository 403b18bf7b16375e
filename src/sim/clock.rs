/// Splits a time window into demand-evaluation intervals.
///
/// Each interval spans at most `max_step` days; the last one is clipped to
/// the window end. A zero-length window yields a single instant.
///
/// # Examples
///
/// ```
/// use space_logistics_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(0.0, 2.5, 1.0);
/// let mut steps = Vec::new();
///
/// clock.run(|start, end| steps.push((start, end)));
/// assert_eq!(steps, vec![(0.0, 1.0), (1.0, 2.0), (2.0, 2.5)]);
/// ```
pub struct Clock {
    /// Window start
    start: f64,
    /// Window end
    end: f64,
    /// Longest interval
    max_step: f64,
    /// Intervals issued so far
    issued: u64,
}

impl Clock {
    /// Creates a clock over `[start, end]`.
    ///
    /// # Arguments
    ///
    /// * `start` - Window start (days)
    /// * `end` - Window end (days), not before `start`
    /// * `max_step` - Longest interval (days, must be > 0)
    pub fn new(start: f64, end: f64, max_step: f64) -> Self {
        Self {
            start,
            end: end.max(start),
            max_step,
            issued: 0,
        }
    }

    /// Advances the clock by one interval.
    ///
    /// # Returns
    ///
    /// * `Some((start, end))` - The next interval
    /// * `None` - If the window is exhausted
    pub fn tick(&mut self) -> Option<(f64, f64)> {
        if self.start == self.end {
            if self.issued == 0 {
                self.issued = 1;
                return Some((self.start, self.end));
            }
            return None;
        }
        // boundaries derive from the step count so long windows do not drift
        let from = self.start + self.issued as f64 * self.max_step;
        if self.end - from <= 1e-9 || !(self.max_step > 0.0) {
            return None;
        }
        let to = (from + self.max_step).min(self.end);
        self.issued += 1;
        Some((from, to))
    }

    /// Runs a function for each remaining interval.
    pub fn run(&mut self, mut f: impl FnMut(f64, f64)) {
        while let Some((start, end)) = self.tick() {
            f(start, end);
        }
    }
}
