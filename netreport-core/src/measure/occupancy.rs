/// Buffer occupancy of a host, as a percentage within `[0, 100]`.
///
/// Hosts may report anything: a rounding error above `100`, or a `NaN`
/// from a buffer of capacity zero. [`Occupancy::clamped`] is how the
/// reports turn a host reading into an [`Occupancy`], and it never fails.
///
/// ```
/// use netreport_core::measure::Occupancy;
///
/// assert_eq!(Occupancy::clamped(104.2), Occupancy::FULL);
/// assert_eq!(Occupancy::clamped(f64::NAN), Occupancy::EMPTY);
/// assert_eq!(Occupancy::clamped(42.5).value(), 42.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Occupancy(f64);

impl Occupancy {
    pub const EMPTY: Self = Self(0.0);
    pub const FULL: Self = Self(100.0);

    /// Clamp a raw host reading into `[0, 100]`. `NaN` becomes `0`.
    pub fn clamped(percent: f64) -> Self {
        if percent.is_nan() {
            Self::EMPTY
        } else {
            Self(percent.clamp(0.0, 100.0))
        }
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}
