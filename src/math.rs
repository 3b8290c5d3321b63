//! Fixed-point scalar arithmetic.
//!
//! Every physical quantity is a 32-bit signed integer where
//! [`FRACTIONS_PER_UNIT`] (512) represents one whole unit. Angles use the same
//! scale for one full turn, so `F / 4` is a right angle.

/// Basic fixed-point type.
pub type Unit = i32;

/// Narrow fixed-point type used where storage size matters (joint velocities,
/// body coefficients).
pub type UnitReduced = i16;

/// One whole unit, also one full turn for angles.
pub const FRACTIONS_PER_UNIT: Unit = 512;

/// Short alias of [`FRACTIONS_PER_UNIT`].
pub const F: Unit = FRACTIONS_PER_UNIT;

/// Joint radii are stored divided by this to fit in a byte.
pub const JOINT_SIZE_MULTIPLIER: Unit = 32;

/// Sentinel for "no hit" / unbounded distance.
pub const INFINITY: Unit = i32::MAX;

/// Maximum absolute error of [`sin`] and [`cos`] against `F * sin(2πx / F)`,
/// over the whole `Unit` domain.
pub const SIN_MAX_ERROR: Unit = 2;

/// Maximum absolute error of [`atan`] against `F * atan(x / F) / 2π`,
/// including the saturated range beyond ±30000.
pub const ATAN_MAX_ERROR: Unit = 3;

/// Maximum absolute angular error of [`vec2_angle`] (same scale as [`atan`]).
pub const VEC2_ANGLE_MAX_ERROR: Unit = 3;

const PI_SQUARED: Unit = 5053; // 9.8696044 * F
const ATAN_SATURATION: Unit = 30000;

#[inline]
pub fn abs(x: Unit) -> Unit {
    if x >= 0 {
        x
    } else {
        -x
    }
}

#[inline]
pub fn max(a: Unit, b: Unit) -> Unit {
    if a > b {
        a
    } else {
        b
    }
}

#[inline]
pub fn min(a: Unit, b: Unit) -> Unit {
    if a < b {
        a
    } else {
        b
    }
}

/// Returns `x`, or 1 if `x` is zero. Used to guard divisions.
#[inline]
pub fn non_zero(x: Unit) -> Unit {
    if x != 0 {
        x
    } else {
        1
    }
}

/// Clamps `x` into `[x_min, x_max]`. Handy for smoothing rendered motion.
#[inline]
pub fn keep_in_range(x: Unit, x_min: Unit, x_max: Unit) -> Unit {
    if x > x_min {
        if x < x_max {
            x
        } else {
            x_max
        }
    } else {
        x_min
    }
}

/// `a * b / F` with a 64-bit intermediate.
#[inline]
pub fn mul(a: Unit, b: Unit) -> Unit {
    ((a as i64 * b as i64) / F as i64) as Unit
}

/// `a * F / b` with a 64-bit intermediate. `b` must not be zero.
#[inline]
pub fn div(a: Unit, b: Unit) -> Unit {
    ((a as i64 * F as i64) / b as i64) as Unit
}

/// `a * b / c` with a 64-bit intermediate. `c` must not be zero.
#[inline]
pub fn mul_div(a: Unit, b: Unit, c: Unit) -> Unit {
    ((a as i64 * b as i64) / c as i64) as Unit
}

/// Narrows a value into [`UnitReduced`], saturating at the 16-bit range.
#[inline]
pub fn reduce(x: Unit) -> UnitReduced {
    if x > UnitReduced::MAX as Unit {
        UnitReduced::MAX
    } else if x < UnitReduced::MIN as Unit {
        UnitReduced::MIN
    } else {
        x as UnitReduced
    }
}

/// Integer square root of an unsigned 64-bit value (floor).
///
/// Digit-by-digit extraction, two bits of input per iteration. Exact for
/// perfect squares.
pub fn sqrt_u64(x: u64) -> u64 {
    let mut result: u64 = 0;
    let mut a = x;
    let mut b: u64 = 1 << 62;

    while b > a {
        b >>= 2;
    }

    while b != 0 {
        if a >= result + b {
            a -= result + b;
            result += 2 * b;
        }

        b >>= 2;
        result >>= 1;
    }

    result
}

/// Signed integer square root: `sqrt(-x) == -sqrt(x)`.
pub fn sqrt(x: Unit) -> Unit {
    let root = sqrt_u64(x.unsigned_abs() as u64) as Unit;

    if x < 0 {
        -root
    } else {
        root
    }
}

/// Sine with `F` as a full turn, result in `[-F, F]`.
///
/// Bhaskara I's rational approximation on a half period, extended by
/// symmetry. See [`SIN_MAX_ERROR`].
pub fn sin(x: Unit) -> Unit {
    let mut sign = 1;
    let mut x = x as i64;

    if x < 0 {
        x = -x;
        sign = -1;
    }

    x %= F as i64;

    if x > (F / 2) as i64 {
        x -= (F / 2) as i64;
        sign = -sign;
    }

    let f = F as i64;
    let pi2 = PI_SQUARED as i64;
    let tmp = f - 2 * x;

    let numerator = ((32 * x * pi2) / f) * tmp;
    let denominator = (pi2 * (5 * f - (8 * x * tmp) / f)) / f;

    (sign * (numerator / denominator)) as Unit
}

/// Cosine as a phase-shifted [`sin`].
pub fn cos(x: Unit) -> Unit {
    sin(x.wrapping_add(F / 4))
}

/// Arctangent of `x / F`, result in turns scaled by `F` (so within `±F / 4`).
///
/// Rational polynomial approximation; ratios beyond ±30000 saturate to a
/// quarter turn. See [`ATAN_MAX_ERROR`].
pub fn atan(x: Unit) -> Unit {
    let mut sign: i64 = 1;
    let mut x = x as i64;

    if x < 0 {
        x = -x;
        sign = -1;
    }

    if x > ATAN_SATURATION as i64 {
        return sign as Unit * (F / 4);
    }

    let x2 = x * x;

    ((sign * (307 * x + x2)) / ((267026 + 633 * x + x2) / 128)) as Unit
}

/// Angle of the 2D vector `(x, y)` with the X axis, counter-clockwise, in
/// `[0, F)`.
pub fn vec2_angle(x: Unit, y: Unit) -> Unit {
    if x != 0 {
        let ratio = ((y as i64 * F as i64) / x as i64)
            .clamp(-(INFINITY as i64), INFINITY as i64) as Unit;

        let r = atan(ratio);

        if x < 0 {
            r + F / 2
        } else if r < 0 {
            r + F
        } else {
            r
        }
    } else if y < 0 {
        (3 * F) / 4
    } else if y > 0 {
        F / 4
    } else {
        0
    }
}

/// Signed deviation of `length` from `desired_length`, `F` meaning 100%.
pub fn connection_tension(length: Unit, desired_length: Unit) -> Unit {
    div(length, non_zero(desired_length)) - F
}
