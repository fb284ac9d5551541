use web_time::Instant;

/// Simulated clock time, decoupled from wall time so the viewer can freeze
/// the mechanism or run it at minute- or half-day-per-second rates.
pub struct SimClock {
    time: f64,
    /// Simulated seconds per wall second.
    pub speed: f64,
    previous: Option<Instant>,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            speed: 1.0,
            previous: None,
        }
    }

    /// Advance by the wall time elapsed since the last call, scaled by the
    /// current speed, and return the new simulated time in seconds.
    pub fn advance(&mut self) -> f64 {
        let now = Instant::now();
        if let Some(previous) = self.previous {
            self.time += (now - previous).as_secs_f64() * self.speed;
        }
        self.previous = Some(now);
        self.time
    }

    pub fn time(&self) -> f64 {
        self.time
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Escapement motion: within each second the fractional part holds at zero
/// until the final 1/16th, which sweeps it from 0 to 1. Gears driven
/// through this mapping tick once a second instead of creeping.
pub fn escaped_time(time: f64) -> f64 {
    let integer = time.floor();
    let fraction = time - integer;

    let fraction = (fraction * 16.0 - 15.0).max(0.0);

    integer + fraction
}
