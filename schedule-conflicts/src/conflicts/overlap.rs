use super::types::Appointment;

/// Checks whether `[s2, e2]` overlaps `[s1, e1]`.
///
/// Overlap holds when the second interval starts strictly inside the first,
/// ends strictly inside the first, or contains the first (boundaries included).
/// Intervals that only touch at an endpoint do not overlap. Incomparable
/// values (e.g. NaN) make every clause false.
pub fn intervals_overlap<T: PartialOrd>(s1: &T, e1: &T, s2: &T, e2: &T) -> bool {
    // second starts inside first
    (s2 > s1 && s2 < e1)
        // second ends inside first
        || (e2 > s1 && e2 < e1)
        // second contains first
        || (s2 <= s1 && e2 >= e1)
}

impl<T: PartialOrd> Appointment<T> {
    /// Tests `other` against `self` with `self` as the first interval
    pub fn overlaps(&self, other: &Appointment<T>) -> bool {
        intervals_overlap(&self.start, &self.end, &other.start, &other.end)
    }
}
