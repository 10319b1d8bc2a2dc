use crate::f;

/// Fixed-width scientific notation for reports and summaries
pub trait ValueExt {
    /// Mantissa with `precision` decimals and a signed, zero padded exponent
    ///
    /// Plain `{:e}` drops the exponent sign and padding, so columns of
    /// totals and maxima do not line up. Anything implementing `LowerExp`
    /// can be formatted.
    ///
    /// ```rust
    /// # use mutools_utils::ValueExt;
    /// assert_eq!((-1.0_f64).sci(5, 2), "-1.00000e+00");
    /// assert_eq!((9000.0_f64).sci(2, 2), "9.00e+03");
    /// assert_eq!((0.25_f64).sci(1, 3), "2.5e-001");
    /// ```
    fn sci(&self, precision: usize, exp_pad: usize) -> String;
}

impl<T: std::fmt::LowerExp> ValueExt for T {
    fn sci(&self, precision: usize, exp_pad: usize) -> String {
        let formatted = f!("{:.precision$e}", self);

        match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                f!("{mantissa}e{sign}{digits:0>exp_pad$}")
            }
            None => formatted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_keep_negative_exponent() {
        assert_eq!((0.0125_f64).sci(2, 2), "1.25e-02");
        assert_eq!((1e-10_f64).sci(1, 3), "1.0e-010");
    }

    #[test]
    fn integers_are_formatted() {
        assert_eq!(400_u32.sci(1, 2), "4.0e+02");
    }

    #[test]
    fn wide_exponents_are_not_truncated() {
        assert_eq!((1.5e120_f64).sci(1, 2), "1.5e+120");
    }
}
