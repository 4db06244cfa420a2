/// Absolute band comparison shared by grouping predicates and plane
/// detection. The band is inclusive.
pub fn within(a: f64, b: f64, band: f64) -> bool {
    (a - b).abs() <= band
}
