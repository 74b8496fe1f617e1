//! Trigger evaluators.
//!
//! Each evaluator decides whether an event fires given the current bytes of
//! its range and its retained state, and updates that state. They are pure
//! over their arguments: no I/O, no registry access.
//!
//! Bitmaps (`armed`, BOOL `baseline`) are indexed by element ordinal. Tag
//! bits are addressed by absolute position (see [`crate::bits`]).

use std::cmp::Ordering;

use crate::bits;
use crate::compare::Scalar;
use crate::datatype::DataType;

/// CHANGE over whole bytes. The baseline always takes the current value.
pub fn change_bytes(baseline: &mut [u8], current: &[u8]) -> bool {
    let changed = baseline != current;
    if changed {
        baseline.copy_from_slice(current);
    }
    changed
}

/// CHANGE over `count` bits of `tag` starting at absolute bit `start`.
pub fn change_bits(baseline: &mut [u8], tag: &[u8], start: usize, count: usize) -> bool {
    let mut changed = false;
    for n in 0..count {
        let now = bits::get(tag, start + n);
        if now != bits::get(baseline, n) {
            bits::set(baseline, n, now);
            changed = true;
        }
    }
    changed
}

/// SET (`level = true`) or RESET (`level = false`) over `count` bits of
/// `tag` starting at absolute bit `start`.
///
/// A bit fires when it reads `level` while unarmed, which arms it; a bit
/// reading the other level disarms.
pub fn edge_bits(armed: &mut [u8], tag: &[u8], start: usize, count: usize, level: bool) -> bool {
    let mut fired = false;
    for n in 0..count {
        let hit = bits::get(tag, start + n) == level;
        fired |= step(armed, n, hit);
    }
    fired
}

/// EQUAL / GREATER / LESS: element `n` matches when comparing it against
/// `operand` yields `want`. NaN matches nothing.
pub fn edge_compare(
    armed: &mut [u8],
    datatype: DataType,
    current: &[u8],
    operand: &[u8],
    count: usize,
    want: Ordering,
) -> bool {
    let (Some(width), Some(operand)) = (datatype.width_bytes(), Scalar::decode(datatype, operand))
    else {
        return false;
    };
    let mut fired = false;
    for n in 0..count {
        let hit = current
            .get(n * width..)
            .and_then(|bytes| Scalar::decode(datatype, bytes))
            .and_then(|value| value.compare(&operand))
            == Some(want);
        fired |= step(armed, n, hit);
    }
    fired
}

/// DEADBAND: element `n` fires when it is at least `band` away from its
/// baseline; firing elements rebase, the others keep their baseline.
pub fn deadband(
    baseline: &mut [u8],
    datatype: DataType,
    current: &[u8],
    band: &[u8],
    count: usize,
) -> bool {
    let (Some(width), Some(band)) = (datatype.width_bytes(), Scalar::decode(datatype, band)) else {
        return false;
    };
    let mut fired = false;
    for n in 0..count {
        let range = n * width..(n + 1) * width;
        let (Some(now), Some(base)) = (
            current.get(range.clone()),
            baseline.get(range.clone()),
        ) else {
            break;
        };
        let exceeded = match (Scalar::decode(datatype, now), Scalar::decode(datatype, base)) {
            (Some(now), Some(base)) => now.exceeds_deadband(&base, &band),
            _ => false,
        };
        if exceeded {
            baseline[range].copy_from_slice(now);
            fired = true;
        }
    }
    fired
}

/// Advance one armed flag. Returns whether the element fired.
fn step(armed: &mut [u8], n: usize, hit: bool) -> bool {
    let was = bits::get(armed, n);
    bits::set(armed, n, hit);
    hit && !was
}
