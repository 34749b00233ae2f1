//! AArch32 CPU model configuration.
//!
//! `ArmFeature` is the architecture feature set, `ArmCpuConfig` a
//! complete model: features, ID register values, reset state and the
//! run-time options (endianness, semihosting, user-only).

use bitflags::bitflags;

// ── Feature set ──────────────────────────────────────────────────

bitflags! {
    /// Architecture features of a CPU model.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ArmFeature: u64 {
        const V4T           = 1 << 0;
        const V5            = 1 << 1;
        const V6            = 1 << 2;
        const V6K           = 1 << 3;
        const V7            = 1 << 4;
        /// v7 with the Virtualization Extensions.
        const V7VE          = 1 << 5;
        const V8            = 1 << 6;
        /// Thumb-2 (also stands for ARMv6T2).
        const THUMB2        = 1 << 7;
        /// DSP instructions in the Thumb instruction set.
        const THUMB_DSP     = 1 << 8;
        const JAZELLE       = 1 << 9;
        /// M-profile.
        const M             = 1 << 10;
        /// M-profile Main Extension.
        const M_MAIN        = 1 << 11;
        const EL2           = 1 << 12;
        const EL3           = 1 << 13;
        const VFP           = 1 << 14;
        const VFP3          = 1 << 15;
        const VFP4          = 1 << 16;
        const NEON          = 1 << 17;
        /// SDIV/UDIV in A32.
        const ARM_DIV       = 1 << 18;
        /// SDIV/UDIV in T32.
        const THUMB_DIV     = 1 << 19;
        const CRC           = 1 << 20;
        const LPAE          = 1 << 21;
        const GENERIC_TIMER = 1 << 22;
        const MPIDR         = 1 << 23;
        /// Implementation-defined CP15 c15 registers read as zero.
        const DUMMY_C15     = 1 << 24;
        /// RAS extension (ESB is a real barrier).
        const RAS           = 1 << 25;
        /// Speculation barrier (SB).
        const SB            = 1 << 26;
    }
}

impl ArmFeature {
    /// Add every feature implied by those already present.
    pub fn closure(self) -> Self {
        let mut f = self;
        if f.contains(Self::V8) {
            f |= if f.contains(Self::M) {
                Self::V7
            } else {
                Self::V7VE
            };
        }
        if f.contains(Self::V7VE) {
            f |= Self::V7 | Self::ARM_DIV | Self::THUMB_DIV | Self::LPAE;
        }
        if f.contains(Self::V7) {
            f |= Self::THUMB2 | Self::MPIDR;
            f |= if f.contains(Self::M) {
                Self::V6
            } else {
                Self::V6K
            };
        }
        if f.contains(Self::V6K) {
            f |= Self::V6;
        }
        if f.contains(Self::V6) {
            f |= Self::V5;
        }
        if f.contains(Self::V5) {
            f |= Self::V4T;
        }
        if f.contains(Self::THUMB2) && !f.contains(Self::M) {
            f |= Self::THUMB_DSP;
        }
        if f.contains(Self::M_MAIN) {
            f |= Self::M;
        }
        if f.contains(Self::VFP4) {
            f |= Self::VFP3;
        }
        if f.contains(Self::VFP3) {
            f |= Self::VFP;
        }
        f
    }
}

// ── Errors ───────────────────────────────────────────────────────

/// An inconsistent CPU model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("feature {feature:?} requires {needs:?}")]
    Missing {
        feature: ArmFeature,
        needs: ArmFeature,
    },
    #[error("feature {0:?} is not available on M-profile")]
    NotOnMProfile(ArmFeature),
    #[error("BE32 (SCTLR.B) requires a pre-ARMv7 model")]
    Be32OnV7,
    #[error("max_insns must be between 1 and {max}, got {got}")]
    MaxInsns { got: u32, max: u32 },
}

// ── Model ────────────────────────────────────────────────────────

/// Upper bound on instructions per TB (the `CF_COUNT_MASK` range).
pub const TB_MAX_INSNS: u32 = 512;

/// A CPU model plus run-time options.
#[derive(Debug, Clone)]
pub struct ArmCpuConfig {
    pub name: &'static str,
    pub features: ArmFeature,
    pub midr: u32,
    pub ctr: u32,
    pub fpsid: u32,
    pub mvfr0: u32,
    pub mvfr1: u32,
    pub mvfr2: u32,
    /// SCTLR value at reset (before BE32/EE adjustments).
    pub reset_sctlr: u32,
    /// CPSR.M at reset for A/R-profile.
    pub reset_mode: u32,
    /// Data accesses are big-endian (BE8 CPSR.E at reset on A/R,
    /// the fixed AIRCR.ENDIANNESS on M).
    pub big_endian_data: bool,
    /// Legacy word-invariant big-endian (SCTLR.B) for code and data.
    pub be32: bool,
    pub semihosting: bool,
    /// Linux user-mode emulation: EL0 only, kernel helper page at
    /// 0xffff0000, FPU enabled.
    pub user_only: bool,
    pub max_insns: u32,
}

impl ArmCpuConfig {
    fn base(name: &'static str, features: ArmFeature, midr: u32) -> Self {
        Self {
            name,
            features,
            midr,
            ctr: 0,
            fpsid: 0,
            mvfr0: 0,
            mvfr1: 0,
            mvfr2: 0,
            reset_sctlr: 0,
            reset_mode: super::cpu::MODE_SVC,
            big_endian_data: false,
            be32: false,
            semihosting: false,
            user_only: false,
            max_insns: TB_MAX_INSNS,
        }
    }

    pub fn cortex_a15() -> Self {
        Self {
            ctr: 0x8444_c004,
            fpsid: 0x4104_30f0,
            mvfr0: 0x1011_0222,
            mvfr1: 0x1111_1111,
            reset_sctlr: 0x00c5_0078,
            ..Self::base(
                "cortex-a15",
                ArmFeature::V7VE
                    | ArmFeature::VFP4
                    | ArmFeature::NEON
                    | ArmFeature::GENERIC_TIMER
                    | ArmFeature::DUMMY_C15
                    | ArmFeature::EL2
                    | ArmFeature::EL3,
                0x412f_c0f1,
            )
        }
    }

    pub fn cortex_a7() -> Self {
        Self {
            ctr: 0x8444_c004,
            fpsid: 0x4102_3075,
            mvfr0: 0x1011_0222,
            mvfr1: 0x1111_1111,
            reset_sctlr: 0x00c5_0078,
            ..Self::base(
                "cortex-a7",
                ArmFeature::V7VE
                    | ArmFeature::VFP4
                    | ArmFeature::NEON
                    | ArmFeature::GENERIC_TIMER
                    | ArmFeature::DUMMY_C15
                    | ArmFeature::EL2
                    | ArmFeature::EL3,
                0x410f_c075,
            )
        }
    }

    pub fn cortex_a9() -> Self {
        Self {
            ctr: 0x8003_8003,
            fpsid: 0x4103_3090,
            mvfr0: 0x1111_0222,
            mvfr1: 0x0111_1111,
            reset_sctlr: 0x00c5_0078,
            ..Self::base(
                "cortex-a9",
                ArmFeature::V7 | ArmFeature::VFP3 | ArmFeature::NEON | ArmFeature::EL3,
                0x410f_c090,
            )
        }
    }

    pub fn arm1176() -> Self {
        Self {
            ctr: 0x1dd2_0d2,
            fpsid: 0x4101_20b5,
            mvfr0: 0x1111_1111,
            reset_sctlr: 0x0005_0078,
            ..Self::base(
                "arm1176",
                ArmFeature::V6K | ArmFeature::VFP | ArmFeature::DUMMY_C15 | ArmFeature::EL3,
                0x410f_b767,
            )
        }
    }

    pub fn arm926() -> Self {
        Self {
            ctr: 0x1dd2_0d2,
            fpsid: 0x4101_1090,
            // No MVFR registers on v5; these enable VFPv2 with short
            // vectors.
            mvfr0: 0x0100_0111,
            reset_sctlr: 0x0009_0078,
            ..Self::base(
                "arm926",
                ArmFeature::V5 | ArmFeature::VFP | ArmFeature::DUMMY_C15 | ArmFeature::JAZELLE,
                0x4106_9265,
            )
        }
    }

    /// Cortex-A53 running AArch32 code.
    pub fn cortex_a53_aa32() -> Self {
        Self {
            ctr: 0x8444_8004,
            fpsid: 0x4103_4070,
            mvfr0: 0x1011_0222,
            mvfr1: 0x1211_1111,
            mvfr2: 0x0000_0043,
            reset_sctlr: 0x00c5_0838,
            ..Self::base(
                "cortex-a53",
                ArmFeature::V8
                    | ArmFeature::VFP4
                    | ArmFeature::NEON
                    | ArmFeature::CRC
                    | ArmFeature::GENERIC_TIMER
                    | ArmFeature::EL2
                    | ArmFeature::EL3,
                0x410f_d034,
            )
        }
    }

    pub fn cortex_m3() -> Self {
        Self {
            reset_sctlr: 0,
            ..Self::base(
                "cortex-m3",
                ArmFeature::V7 | ArmFeature::M | ArmFeature::M_MAIN | ArmFeature::THUMB_DIV,
                0x410f_c231,
            )
        }
    }

    // ── Builder ──

    pub fn with_features(mut self, f: ArmFeature) -> Self {
        self.features |= f;
        self
    }

    pub fn without_features(mut self, f: ArmFeature) -> Self {
        self.features -= f;
        self
    }

    /// Run as a user-mode process. A process never sees the Hyp or
    /// Secure Monitor layers, so EL2 and EL3 are dropped; their reset
    /// values would otherwise trap the FPU.
    pub fn user_only(mut self, on: bool) -> Self {
        self.user_only = on;
        if on {
            self.features -= ArmFeature::EL2 | ArmFeature::EL3;
        }
        self
    }

    pub fn big_endian(mut self, on: bool) -> Self {
        self.big_endian_data = on;
        self
    }

    pub fn be32(mut self, on: bool) -> Self {
        self.be32 = on;
        self
    }

    pub fn semihosting(mut self, on: bool) -> Self {
        self.semihosting = on;
        self
    }

    pub fn max_insns(mut self, n: u32) -> Self {
        self.max_insns = n;
        self
    }

    pub fn has(&self, f: ArmFeature) -> bool {
        self.features.contains(f)
    }

    /// Check the feature set for contradictions. Call after
    /// `closure()`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = self.features;
        let needs = |feature: ArmFeature, needs: ArmFeature| {
            if f.contains(feature) && !f.contains(needs) {
                Err(ConfigError::Missing { feature, needs })
            } else {
                Ok(())
            }
        };
        needs(ArmFeature::NEON, ArmFeature::VFP3)?;
        needs(ArmFeature::EL2, ArmFeature::V7VE)?;
        needs(ArmFeature::CRC, ArmFeature::V8)?;
        needs(ArmFeature::THUMB2, ArmFeature::V6)?;
        if f.contains(ArmFeature::M) {
            for bad in [
                ArmFeature::EL2,
                ArmFeature::EL3,
                ArmFeature::NEON,
                ArmFeature::JAZELLE,
            ] {
                if f.contains(bad) {
                    return Err(ConfigError::NotOnMProfile(bad));
                }
            }
        }
        if self.be32 && f.contains(ArmFeature::V7) {
            return Err(ConfigError::Be32OnV7);
        }
        if self.max_insns == 0 || self.max_insns > TB_MAX_INSNS {
            return Err(ConfigError::MaxInsns {
                got: self.max_insns,
                max: TB_MAX_INSNS,
            });
        }
        Ok(())
    }

    /// Apply the feature closure and validate.
    pub fn finalize(mut self) -> Result<Self, ConfigError> {
        self.features = self.features.closure();
        self.validate()?;
        Ok(self)
    }

    // ── ID register derived predicates ──

    fn mvfr0_field(&self, shift: u32) -> u32 {
        (self.mvfr0 >> shift) & 0xf
    }

    /// 32 double-precision registers rather than 16.
    pub fn simd_r32(&self) -> bool {
        self.mvfr0_field(0) >= 2
    }

    pub fn fp_sp(&self) -> bool {
        self.mvfr0_field(4) > 0
    }

    pub fn fp_dp(&self) -> bool {
        self.mvfr0_field(8) > 0
    }

    pub fn fp_div(&self) -> bool {
        self.mvfr0_field(16) > 0
    }

    pub fn fp_sqrt(&self) -> bool {
        self.mvfr0_field(20) > 0
    }

    /// FPSCR.LEN/STRIDE short vectors.
    pub fn fp_short_vec(&self) -> bool {
        self.mvfr0_field(24) > 0
    }

    /// VFPv3 VMOV immediate, fixed-point VCVT.
    pub fn fp_v3(&self) -> bool {
        self.has(ArmFeature::VFP3)
    }

    /// VFMA family.
    pub fn fp_fma(&self) -> bool {
        self.has(ArmFeature::VFP4)
    }

    /// v8 FP additions: VSEL, VMAXNM, VRINT, VCVT{A,N,P,M}.
    pub fn fp_v8(&self) -> bool {
        self.has(ArmFeature::V8) && self.has(ArmFeature::VFP)
    }

    pub fn neon(&self) -> bool {
        self.has(ArmFeature::NEON)
    }
}

impl Default for ArmCpuConfig {
    fn default() -> Self {
        Self::cortex_a15()
    }
}
