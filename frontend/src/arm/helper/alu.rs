//! Integer helpers: flag-setting shifts, saturation, SIMD-within-a-
//! register arithmetic, division and CRC32.

use crate::arm::cpu::ArmCpu;

// ── Shifts that update CF ───────────────────────────────────────

pub fn shl_cc(cpu: &mut ArmCpu, x: u32, n: u32) -> u32 {
    let n = n & 0xff;
    match n {
        0 => x,
        1..=31 => {
            cpu.env.cf = (x >> (32 - n)) & 1;
            x << n
        }
        32 => {
            cpu.env.cf = x & 1;
            0
        }
        _ => {
            cpu.env.cf = 0;
            0
        }
    }
}

pub fn shr_cc(cpu: &mut ArmCpu, x: u32, n: u32) -> u32 {
    let n = n & 0xff;
    match n {
        0 => x,
        1..=31 => {
            cpu.env.cf = (x >> (n - 1)) & 1;
            x >> n
        }
        32 => {
            cpu.env.cf = x >> 31;
            0
        }
        _ => {
            cpu.env.cf = 0;
            0
        }
    }
}

pub fn sar_cc(cpu: &mut ArmCpu, x: u32, n: u32) -> u32 {
    let n = n & 0xff;
    match n {
        0 => x,
        1..=31 => {
            cpu.env.cf = (x >> (n - 1)) & 1;
            ((x as i32) >> n) as u32
        }
        _ => {
            cpu.env.cf = x >> 31;
            ((x as i32) >> 31) as u32
        }
    }
}

pub fn ror_cc(cpu: &mut ArmCpu, x: u32, n: u32) -> u32 {
    if n & 0xff == 0 {
        return x;
    }
    let n = n & 0x1f;
    cpu.env.cf = if n == 0 { x >> 31 } else { (x >> (n - 1)) & 1 };
    x.rotate_right(n)
}

// ── Saturation ──────────────────────────────────────────────────

fn set_q(cpu: &mut ArmCpu) {
    cpu.env.qf = 1;
}

/// Plain addition that sets Q on signed overflow (SMLA*, SMLAD).
pub fn add_setq(cpu: &mut ArmCpu, a: u32, b: u32) -> u32 {
    let (r, ovf) = (a as i32).overflowing_add(b as i32);
    if ovf {
        set_q(cpu);
    }
    r as u32
}

pub fn add_saturate(cpu: &mut ArmCpu, a: u32, b: u32) -> u32 {
    match (a as i32).checked_add(b as i32) {
        Some(r) => r as u32,
        None => {
            set_q(cpu);
            (a as i32).saturating_add(b as i32) as u32
        }
    }
}

pub fn sub_saturate(cpu: &mut ArmCpu, a: u32, b: u32) -> u32 {
    match (a as i32).checked_sub(b as i32) {
        Some(r) => r as u32,
        None => {
            set_q(cpu);
            (a as i32).saturating_sub(b as i32) as u32
        }
    }
}

/// `SignedSat(2 * x)`, the doubling step of QDADD/QDSUB.
pub fn double_saturate(cpu: &mut ArmCpu, x: u32) -> u32 {
    add_saturate(cpu, x, x)
}

/// Signed saturation to `shift + 1` bits.
fn do_ssat(cpu: &mut ArmCpu, x: i32, shift: u32) -> u32 {
    let top = x >> shift;
    let mask = ((1u32 << shift) - 1) as i32;
    if top > 0 {
        set_q(cpu);
        mask as u32
    } else if top < -1 {
        set_q(cpu);
        !mask as u32
    } else {
        x as u32
    }
}

/// Unsigned saturation to `shift` bits.
fn do_usat(cpu: &mut ArmCpu, x: i32, shift: u32) -> u32 {
    let max = ((1u64 << shift) - 1) as u32;
    if x < 0 {
        set_q(cpu);
        0
    } else if x as u32 > max {
        set_q(cpu);
        max
    } else {
        x as u32
    }
}

pub fn ssat(cpu: &mut ArmCpu, x: u32, shift: u32) -> u32 {
    do_ssat(cpu, x as i32, shift & 31)
}

pub fn usat(cpu: &mut ArmCpu, x: u32, shift: u32) -> u32 {
    do_usat(cpu, x as i32, shift & 31)
}

pub fn ssat16(cpu: &mut ArmCpu, x: u32, shift: u32) -> u32 {
    let shift = shift & 15;
    let lo = do_ssat(cpu, x as i16 as i32, shift) & 0xffff;
    let hi = do_ssat(cpu, (x >> 16) as i16 as i32, shift) & 0xffff;
    lo | (hi << 16)
}

pub fn usat16(cpu: &mut ArmCpu, x: u32, shift: u32) -> u32 {
    let shift = shift & 15;
    let lo = do_usat(cpu, x as i16 as i32, shift);
    let hi = do_usat(cpu, (x >> 16) as i16 as i32, shift);
    lo | (hi << 16)
}

// ── Parallel add/subtract ───────────────────────────────────────

/// Flavour of a parallel add/subtract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ParallelPrefix {
    /// Signed modulo, sets GE.
    S,
    /// Signed saturating.
    Q,
    /// Signed halving.
    Sh,
    /// Unsigned modulo, sets GE.
    U,
    /// Unsigned saturating.
    Uq,
    /// Unsigned halving.
    Uh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ParallelKind {
    Add16,
    /// High halfword adds, low halfword subtracts.
    Asx,
    /// High halfword subtracts, low halfword adds.
    Sax,
    Sub16,
    Add8,
    Sub8,
}

impl ParallelPrefix {
    const ALL: [ParallelPrefix; 6] = [Self::S, Self::Q, Self::Sh, Self::U, Self::Uq, Self::Uh];

    fn is_signed(self) -> bool {
        matches!(self, Self::S | Self::Q | Self::Sh)
    }
}

impl ParallelKind {
    const ALL: [ParallelKind; 6] =
        [Self::Add16, Self::Asx, Self::Sax, Self::Sub16, Self::Add8, Self::Sub8];
}

/// Encode the constant argument of `Helper::ParallelAddSub`.
pub const fn parallel_op(prefix: ParallelPrefix, kind: ParallelKind) -> u32 {
    (prefix as u32) << 3 | kind as u32
}

/// One lane: returns the result bits and whether the GE bits for the
/// lane are set.
fn lane(prefix: ParallelPrefix, add: bool, a: u32, b: u32, bits: u32) -> (u32, bool) {
    let mask = (1u32 << bits) - 1;
    let (x, y) = if prefix.is_signed() {
        let sx = |v: u32| ((v << (32 - bits)) as i32 >> (32 - bits)) as i64;
        (sx(a), sx(b))
    } else {
        ((a & mask) as i64, (b & mask) as i64)
    };
    let r = if add { x + y } else { x - y };
    let (smin, smax) = (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1);
    let out = match prefix {
        ParallelPrefix::S | ParallelPrefix::U => r,
        ParallelPrefix::Q => r.clamp(smin, smax),
        ParallelPrefix::Uq => r.clamp(0, mask as i64),
        ParallelPrefix::Sh | ParallelPrefix::Uh => r >> 1,
    };
    let ge = match prefix {
        ParallelPrefix::S => r >= 0,
        // Unsigned add: carry out; unsigned subtract: no borrow.
        ParallelPrefix::U if add => r > mask as i64,
        ParallelPrefix::U => r >= 0,
        _ => false,
    };
    (out as u32 & mask, ge)
}

pub fn parallel_addsub(cpu: &mut ArmCpu, a: u32, b: u32, op: u32) -> u32 {
    let prefix = ParallelPrefix::ALL[((op >> 3) as usize).min(5)];
    let kind = ParallelKind::ALL[((op & 7) as usize).min(5)];
    let mut res = 0;
    let mut ge = 0;
    let mut put = |r: (u32, bool), n: u32, bits: u32| {
        res |= r.0 << (n * bits);
        if r.1 {
            ge |= if bits == 16 { 3 << (n * 2) } else { 1 << n };
        }
    };
    let h = |v: u32, n: u32| v >> (16 * n);
    match kind {
        ParallelKind::Add16 | ParallelKind::Sub16 => {
            let add = kind == ParallelKind::Add16;
            put(lane(prefix, add, a, b, 16), 0, 16);
            put(lane(prefix, add, h(a, 1), h(b, 1), 16), 1, 16);
        }
        ParallelKind::Asx => {
            put(lane(prefix, false, a, h(b, 1), 16), 0, 16);
            put(lane(prefix, true, h(a, 1), b, 16), 1, 16);
        }
        ParallelKind::Sax => {
            put(lane(prefix, true, a, h(b, 1), 16), 0, 16);
            put(lane(prefix, false, h(a, 1), b, 16), 1, 16);
        }
        ParallelKind::Add8 | ParallelKind::Sub8 => {
            let add = kind == ParallelKind::Add8;
            for n in 0..4 {
                put(lane(prefix, add, a >> (8 * n), b >> (8 * n), 8), n, 8);
            }
        }
    }
    if matches!(prefix, ParallelPrefix::S | ParallelPrefix::U) {
        cpu.env.ge = ge;
    }
    res
}

/// Byte-wise select on GE\[3:0\].
pub fn sel(cpu: &mut ArmCpu, a: u32, b: u32) -> u32 {
    let ge = cpu.env.ge;
    let mut mask = 0u32;
    for n in 0..4 {
        if ge & (1 << n) != 0 {
            mask |= 0xff << (8 * n);
        }
    }
    (a & mask) | (b & !mask)
}

pub fn usad8(a: u32, b: u32) -> u32 {
    (0..4)
        .map(|n| {
            let x = (a >> (8 * n)) & 0xff;
            let y = (b >> (8 * n)) & 0xff;
            x.abs_diff(y)
        })
        .sum()
}

// ── Division ────────────────────────────────────────────────────

/// Division by zero returns zero (no DIV_0_TRP).
pub fn sdiv(num: u32, den: u32) -> u32 {
    if den == 0 {
        return 0;
    }
    (num as i32).wrapping_div(den as i32) as u32
}

pub fn udiv(num: u32, den: u32) -> u32 {
    num.checked_div(den).unwrap_or(0)
}

// ── CRC32 ───────────────────────────────────────────────────────

fn crc_update(mut crc: u32, val: u32, bytes: u32, poly: u32) -> u32 {
    for i in 0..bytes.min(4) {
        crc ^= (val >> (8 * i)) & 0xff;
        for _ in 0..8 {
            crc = (crc >> 1) ^ (poly & (crc & 1).wrapping_neg());
        }
    }
    crc
}

/// CRC-32 (polynomial 0x04C11DB7, reflected) over the low `bytes`
/// bytes of `val`, without pre- or post-inversion.
pub fn crc32(acc: u32, val: u32, bytes: u32) -> u32 {
    crc_update(acc, val, bytes, 0xedb8_8320)
}

/// CRC-32C (Castagnoli).
pub fn crc32c(acc: u32, val: u32, bytes: u32) -> u32 {
    crc_update(acc, val, bytes, 0x82f6_3b78)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_matches_reference() {
        // zlib crc32("a") = 0xe8b7be43, which is the raw update with
        // pre- and post-inversion.
        assert_eq!(!crc32(!0, b'a' as u32, 1), 0xe8b7_be43);
        // CRC-32C("a") = 0xc1d04330.
        assert_eq!(!crc32c(!0, b'a' as u32, 1), 0xc1d0_4330);
    }

    #[test]
    fn usad8_sums_byte_differences() {
        assert_eq!(usad8(0x0102_0304, 0x0403_0201), 3 + 1 + 1 + 3);
    }

    #[test]
    fn sdiv_edge_cases() {
        assert_eq!(sdiv(7, 0), 0);
        assert_eq!(sdiv(0x8000_0000, 0xffff_ffff), 0x8000_0000);
        assert_eq!(sdiv(-7i32 as u32, 2), -3i32 as u32);
        assert_eq!(udiv(7, 0), 0);
    }
}
