use half::f16;

/// Packs a double into the 16-bit "sfloat" layout: 1 sign, 5 exponent and 10
/// mantissa bits.
///
/// Values too large for the format become infinities, values too small become
/// denormals or a signed zero, and NaN stays NaN.
pub fn to_sfloat(f: f64) -> u16 { f16::from_f64(f).to_bits() }

/// Unpacks a 16-bit "sfloat".
pub fn from_sfloat(bits: u16) -> f64 { f16::from_bits(bits).to_f64() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_values() {
        for &v in &[0.0, 1.0, -2.5, 65504.0, 6.103_515_625e-5] {
            assert_eq!(from_sfloat(to_sfloat(v)), v);
        }
    }

    #[test]
    fn signed_zero() {
        assert_eq!(to_sfloat(0.0), 0x0000);
        assert_eq!(to_sfloat(-0.0), 0x8000);
        assert!(from_sfloat(0x8000).is_sign_negative());
    }

    #[test]
    fn specials() {
        assert_eq!(to_sfloat(f64::INFINITY), 0x7c00);
        assert_eq!(to_sfloat(f64::NEG_INFINITY), 0xfc00);
        assert_eq!(to_sfloat(1.0e6), 0x7c00);
        assert!(from_sfloat(to_sfloat(f64::NAN)).is_nan());
    }

    #[test]
    fn denormals() {
        // smallest positive denormal, 2^-24
        assert_eq!(to_sfloat(5.960_464_477_539_063e-8), 0x0001);
        assert_eq!(from_sfloat(0x0001), 5.960_464_477_539_063e-8);
        // largest denormal
        assert_eq!(from_sfloat(0x03ff), 1023.0 * 5.960_464_477_539_063e-8);
        // underflow
        assert_eq!(to_sfloat(1.0e-10), 0x0000);
    }
}
