//! Coprocessor (CP14/CP15) register table.
//!
//! Registers are registered once per CPU model and looked up at
//! translation time by `CpRegKey`. The table is immutable afterwards
//! and shared between the CPU and every translation through an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::mem::size_of;

use bitflags::bitflags;

use super::config::{ArmCpuConfig, ArmFeature};
use super::cpu::{ArmCpu, ArmEnv, HCR_TGE, SCR_NS, SCTLR_B};
use crate::cp15_field;

/// Wildcard for `crm`, `opc1` or `opc2` in a definition.
pub const CP_ANY: u8 = 0xff;

/// Lookup key of an AArch32 coprocessor register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpRegKey {
    pub cp: u8,
    pub is64: bool,
    /// Non-secure banked view.
    pub ns: bool,
    pub crn: u8,
    pub crm: u8,
    pub opc1: u8,
    pub opc2: u8,
}

impl fmt::Display for CpRegKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is64 {
            write!(f, "p{} {} c{}", self.cp, self.opc1, self.crm)?;
        } else {
            write!(
                f,
                "p{} {} c{} c{} {}",
                self.cp, self.opc1, self.crn, self.crm, self.opc2
            )?;
        }
        if !self.ns {
            write!(f, " (S)")?;
        }
        Ok(())
    }
}

bitflags! {
    /// Access rights per exception level. Each right implies the
    /// same right at every higher EL.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpPerm: u8 {
        const PL3_R = 0x80;
        const PL3_W = 0x40;
        const PL2_R = 0x20 | Self::PL3_R.bits();
        const PL2_W = 0x10 | Self::PL3_W.bits();
        const PL1_R = 0x08 | Self::PL2_R.bits();
        const PL1_W = 0x04 | Self::PL2_W.bits();
        const PL0_R = 0x02 | Self::PL1_R.bits();
        const PL0_W = 0x01 | Self::PL1_W.bits();
        const PL3_RW = Self::PL3_R.bits() | Self::PL3_W.bits();
        const PL2_RW = Self::PL2_R.bits() | Self::PL2_W.bits();
        const PL1_RW = Self::PL1_R.bits() | Self::PL1_W.bits();
        const PL0_RW = Self::PL0_R.bits() | Self::PL0_W.bits();
    }
}

bitflags! {
    /// Register behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CpRegFlags: u16 {
        /// Accesses do nothing (cache maintenance and the like).
        const NOP             = 1 << 0;
        /// Write means "wait for interrupt".
        const WFI             = 1 << 1;
        /// Access touches device-like state: ends the TB under icount.
        const IO              = 1 << 2;
        /// Writes do not end the TB.
        const SUPPRESS_TB_END = 1 << 3;
        /// The read/write function may raise an exception.
        const RAISES_EXC      = 1 << 4;
        /// Writes may change the exception level.
        const NEWEL           = 1 << 5;
    }
}

/// Which security state(s) a definition is visible in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpSecState {
    Both,
    Secure,
    NonSecure,
}

/// Outcome of a runtime access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpAccessResult {
    Ok,
    /// UNDEF to the default exception level, with the trap syndrome.
    Trap,
    /// UNDEF with the uncategorized syndrome.
    TrapUncategorized,
    TrapEl2,
    TrapEl3,
}

pub type CpReadFn = fn(&mut ArmCpu, &CpRegInfo) -> u64;
pub type CpWriteFn = fn(&mut ArmCpu, &CpRegInfo, u64);
pub type CpAccessFn = fn(&ArmCpu, &CpRegInfo, bool) -> CpAccessResult;

/// How a register's value is obtained and stored.
#[derive(Clone, Copy)]
pub enum CpAccessor {
    /// Reads as the value; writes are ignored.
    Const(u64),
    /// Plain storage at an env offset.
    Field(i64),
    /// Function access; a missing half falls back to `field`.
    Fn {
        read: Option<CpReadFn>,
        write: Option<CpWriteFn>,
        field: Option<i64>,
    },
}

impl fmt::Debug for CpAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(v) => write!(f, "Const({v:#x})"),
            Self::Field(o) => write!(f, "Field({o})"),
            Self::Fn { read, write, field } => f
                .debug_struct("Fn")
                .field("read", &read.is_some())
                .field("write", &write.is_some())
                .field("field", field)
                .finish(),
        }
    }
}

/// A coprocessor register definition.
#[derive(Clone)]
pub struct CpRegInfo {
    pub name: &'static str,
    pub cp: u8,
    pub crn: u8,
    pub crm: u8,
    pub opc1: u8,
    pub opc2: u8,
    pub is64: bool,
    pub secstate: CpSecState,
    pub access: CpPerm,
    pub flags: CpRegFlags,
    pub accessor: CpAccessor,
    pub accessfn: Option<CpAccessFn>,
    pub resetvalue: u64,
}

impl fmt::Debug for CpRegInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpRegInfo")
            .field("name", &self.name)
            .field("cp", &self.cp)
            .field("crn", &self.crn)
            .field("crm", &self.crm)
            .field("opc1", &self.opc1)
            .field("opc2", &self.opc2)
            .field("is64", &self.is64)
            .field("access", &self.access)
            .field("flags", &self.flags)
            .field("accessor", &self.accessor)
            .field("accessfn", &self.accessfn.is_some())
            .finish()
    }
}

impl CpRegInfo {
    /// A 32-bit (MCR/MRC) register, constant zero until refined.
    pub const fn new(
        name: &'static str,
        cp: u8,
        crn: u8,
        crm: u8,
        opc1: u8,
        opc2: u8,
        access: CpPerm,
    ) -> Self {
        Self {
            name,
            cp,
            crn,
            crm,
            opc1,
            opc2,
            is64: false,
            secstate: CpSecState::Both,
            access,
            flags: CpRegFlags::empty(),
            accessor: CpAccessor::Const(0),
            accessfn: None,
            resetvalue: 0,
        }
    }

    /// A 64-bit (MCRR/MRRC) register.
    pub const fn new64(name: &'static str, cp: u8, crm: u8, opc1: u8, access: CpPerm) -> Self {
        let mut ri = Self::new(name, cp, 0, crm, opc1, 0, access);
        ri.is64 = true;
        ri
    }

    pub const fn constant(mut self, v: u64) -> Self {
        self.accessor = CpAccessor::Const(v);
        self.resetvalue = v;
        self
    }

    pub const fn field(mut self, offset: i64) -> Self {
        self.accessor = CpAccessor::Field(offset);
        self
    }

    pub const fn func(
        mut self,
        read: Option<CpReadFn>,
        write: Option<CpWriteFn>,
        field: Option<i64>,
    ) -> Self {
        self.accessor = CpAccessor::Fn { read, write, field };
        self
    }

    pub const fn access_fn(mut self, f: CpAccessFn) -> Self {
        self.accessfn = Some(f);
        self
    }

    pub const fn flags(mut self, flags: CpRegFlags) -> Self {
        self.flags = flags;
        self
    }

    pub const fn reset(mut self, v: u64) -> Self {
        self.resetvalue = v;
        self
    }

    pub const fn secure(mut self, s: CpSecState) -> Self {
        self.secstate = s;
        self
    }

    /// Static permission check for an access from `el`.
    pub fn access_ok(&self, el: u32, isread: bool) -> bool {
        (self.access.bits() >> (el * 2 + isread as u32)) & 1 != 0
    }

    pub fn is_const(&self) -> bool {
        matches!(self.accessor, CpAccessor::Const(_))
    }

    pub fn readfn(&self) -> Option<CpReadFn> {
        match self.accessor {
            CpAccessor::Fn { read, .. } => read,
            _ => None,
        }
    }

    pub fn writefn(&self) -> Option<CpWriteFn> {
        match self.accessor {
            CpAccessor::Fn { write, .. } => write,
            _ => None,
        }
    }

    /// Env offset of the backing storage, if any.
    pub fn fieldoffset(&self) -> Option<i64> {
        match self.accessor {
            CpAccessor::Field(o) => Some(o),
            CpAccessor::Fn { field, .. } => field,
            CpAccessor::Const(_) => None,
        }
    }

    fn width(&self) -> usize {
        if self.is64 {
            8
        } else {
            4
        }
    }
}

/// Errors while building a coprocessor table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CpRegError {
    #[error("{new}: encoding {key} already used by {existing}")]
    Duplicate {
        key: CpRegKey,
        existing: &'static str,
        new: &'static str,
    },
    #[error("{name}: field offset {offset} outside the CPU state")]
    BadField { name: &'static str, offset: i64 },
    #[error("{name}: {reason}")]
    Invalid {
        name: &'static str,
        reason: &'static str,
    },
}

/// The registers of one CPU model.
#[derive(Debug, Default)]
pub struct CpRegTable {
    regs: Vec<CpRegInfo>,
    keys: HashMap<CpRegKey, u32>,
}

fn expand(v: u8, max: u8) -> std::ops::RangeInclusive<u8> {
    if v == CP_ANY {
        0..=max
    } else {
        v..=v
    }
}

impl CpRegTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one definition (wildcards expand to every encoding).
    pub fn define(&mut self, ri: CpRegInfo) -> Result<(), CpRegError> {
        if let Some(offset) = ri.fieldoffset() {
            if offset < 0 || offset as usize + ri.width() > size_of::<ArmEnv>() {
                return Err(CpRegError::BadField {
                    name: ri.name,
                    offset,
                });
            }
        }
        if let CpAccessor::Fn { read, write, field } = ri.accessor {
            let readable = ri.access.intersects(CpPerm::PL3_R | CpPerm::PL0_R);
            let writable = ri.access.intersects(CpPerm::PL3_W | CpPerm::PL0_W);
            if readable && read.is_none() && field.is_none() {
                return Err(CpRegError::Invalid {
                    name: ri.name,
                    reason: "readable register without read function or field",
                });
            }
            if writable && write.is_none() && field.is_none() {
                return Err(CpRegError::Invalid {
                    name: ri.name,
                    reason: "writable register without write function or field",
                });
            }
        }
        if ri.flags.contains(CpRegFlags::NOP | CpRegFlags::WFI) {
            return Err(CpRegError::Invalid {
                name: ri.name,
                reason: "NOP and WFI are exclusive",
            });
        }

        let id = self.regs.len() as u32;
        let ns_views: &[bool] = match ri.secstate {
            CpSecState::Both => &[false, true],
            CpSecState::Secure => &[false],
            CpSecState::NonSecure => &[true],
        };
        let crn = if ri.is64 { 0 } else { ri.crn };
        let mut new_keys = Vec::new();
        for &ns in ns_views {
            for crm in expand(ri.crm, 15) {
                for opc1 in expand(ri.opc1, if ri.is64 { 15 } else { 7 }) {
                    for opc2 in expand(ri.opc2, if ri.is64 { 0 } else { 7 }) {
                        let key = CpRegKey {
                            cp: ri.cp,
                            is64: ri.is64,
                            ns,
                            crn,
                            crm,
                            opc1,
                            opc2,
                        };
                        if let Some(&old) = self.keys.get(&key) {
                            return Err(CpRegError::Duplicate {
                                key,
                                existing: self.regs[old as usize].name,
                                new: ri.name,
                            });
                        }
                        new_keys.push(key);
                    }
                }
            }
        }
        for key in new_keys {
            self.keys.insert(key, id);
        }
        self.regs.push(ri);
        Ok(())
    }

    pub fn define_all(
        &mut self,
        regs: impl IntoIterator<Item = CpRegInfo>,
    ) -> Result<(), CpRegError> {
        regs.into_iter().try_for_each(|ri| self.define(ri))
    }

    pub fn lookup(&self, key: &CpRegKey) -> Option<(u32, &CpRegInfo)> {
        let id = *self.keys.get(key)?;
        Some((id, &self.regs[id as usize]))
    }

    pub fn get(&self, id: u32) -> Option<&CpRegInfo> {
        self.regs.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    /// Write every register's reset value into its backing field.
    pub fn reset(&self, env: &mut ArmEnv) {
        for ri in &self.regs {
            if let Some(offset) = ri.fieldoffset() {
                write_field(env, offset, ri.is64, ri.resetvalue);
            }
        }
    }

    /// The table for a CPU model.
    pub fn for_config(cfg: &ArmCpuConfig) -> Result<Self, CpRegError> {
        let mut t = Self::new();
        if cfg.has(ArmFeature::M) {
            return Ok(t);
        }
        t.define_all(id_regs(cfg))?;
        t.define_all(system_regs(cfg))?;
        t.define_all(fault_regs())?;
        t.define_all(cache_ops(cfg))?;
        if cfg.has(ArmFeature::V6K) {
            t.define_all(thread_id_regs())?;
        }
        if cfg.has(ArmFeature::LPAE) {
            t.define_all(lpae_regs())?;
        }
        if cfg.has(ArmFeature::EL3) || cfg.has(ArmFeature::V8) {
            t.define(
                CpRegInfo::new("VBAR", 15, 12, 0, 0, 0, CpPerm::PL1_RW)
                    .field(cp15_field!(vbar)),
            )?;
        }
        if cfg.has(ArmFeature::EL3) {
            t.define_all(el3_regs(cfg))?;
        }
        if cfg.has(ArmFeature::EL2) {
            t.define_all(el2_regs())?;
        }
        if cfg.has(ArmFeature::GENERIC_TIMER) {
            t.define_all(timer_regs())?;
        }
        if cfg.has(ArmFeature::DUMMY_C15) {
            t.define(
                CpRegInfo::new("C15_IMPDEF", 15, 15, CP_ANY, CP_ANY, CP_ANY, CpPerm::PL1_RW)
                    .constant(0),
            )?;
        }
        if cfg.has(ArmFeature::JAZELLE) {
            t.define_all(jazelle_regs())?;
        }
        t.define_all(debug_regs(cfg))?;
        Ok(t)
    }
}

fn env_bytes(env: &mut ArmEnv) -> *mut u8 {
    (env as *mut ArmEnv).cast::<u8>()
}

/// Store into a register's backing field.
pub fn write_field(env: &mut ArmEnv, offset: i64, is64: bool, v: u64) {
    let size = if is64 { 8 } else { 4 };
    if offset < 0 || offset as usize + size > size_of::<ArmEnv>() {
        return;
    }
    // SAFETY: the range lies inside `*env` (checked above) and every
    // field of `ArmEnv` is a plain integer.
    unsafe {
        let p = env_bytes(env).add(offset as usize);
        if is64 {
            p.cast::<u64>().write_unaligned(v);
        } else {
            p.cast::<u32>().write_unaligned(v as u32);
        }
    }
}

/// Load from a register's backing field.
pub fn read_field(env: &mut ArmEnv, offset: i64, is64: bool) -> u64 {
    let size = if is64 { 8 } else { 4 };
    if offset < 0 || offset as usize + size > size_of::<ArmEnv>() {
        return 0;
    }
    // SAFETY: as in `write_field`.
    unsafe {
        let p = env_bytes(env).add(offset as usize);
        if is64 {
            p.cast::<u64>().read_unaligned()
        } else {
            p.cast::<u32>().read_unaligned() as u64
        }
    }
}

/// Read a register the way MRC/MRRC would, without access checks.
pub fn read_cpreg(cpu: &mut ArmCpu, ri: &CpRegInfo) -> u64 {
    match ri.accessor {
        CpAccessor::Const(v) => v,
        CpAccessor::Fn { read: Some(f), .. } => f(cpu, ri),
        _ => ri
            .fieldoffset()
            .map_or(0, |o| read_field(&mut cpu.env, o, ri.is64)),
    }
}

/// Write a register the way MCR/MCRR would, without access checks.
pub fn write_cpreg(cpu: &mut ArmCpu, ri: &CpRegInfo, v: u64) {
    match ri.accessor {
        CpAccessor::Const(_) => {}
        CpAccessor::Fn { write: Some(f), .. } => f(cpu, ri, v),
        _ => {
            if let Some(o) = ri.fieldoffset() {
                write_field(&mut cpu.env, o, ri.is64, v);
            }
        }
    }
}

// ── Access functions ─────────────────────────────────────────────

/// HCR.TVM/TRVM traps of the virtual memory control registers.
fn access_tvm_trvm(cpu: &ArmCpu, _ri: &CpRegInfo, isread: bool) -> CpAccessResult {
    const HCR_TVM: u32 = 1 << 26;
    const HCR_TRVM: u32 = 1 << 30;
    if cpu.current_el() == 1 && cpu.el2_enabled() {
        let trap = if isread { HCR_TRVM } else { HCR_TVM };
        if cpu.env.cp15.hcr & trap != 0 {
            return CpAccessResult::TrapEl2;
        }
    }
    CpAccessResult::Ok
}

/// HCPTR.TCPAC traps CPACR accesses from EL1.
fn cpacr_access(cpu: &ArmCpu, _ri: &CpRegInfo, _isread: bool) -> CpAccessResult {
    if cpu.current_el() == 1 && cpu.el2_enabled() && cpu.env.cp15.hcptr & (1 << 31) != 0 {
        return CpAccessResult::TrapEl2;
    }
    CpAccessResult::Ok
}

fn gt_cntfrq_access(cpu: &ArmCpu, _ri: &CpRegInfo, _isread: bool) -> CpAccessResult {
    if cpu.current_el() == 0 && cpu.env.cp15.cntkctl & 3 == 0 {
        return CpAccessResult::Trap;
    }
    CpAccessResult::Ok
}

fn gt_pct_access(cpu: &ArmCpu, _ri: &CpRegInfo, _isread: bool) -> CpAccessResult {
    if cpu.current_el() == 0 && cpu.env.cp15.cntkctl & 1 == 0 {
        return CpAccessResult::Trap;
    }
    CpAccessResult::Ok
}

fn gt_vct_access(cpu: &ArmCpu, _ri: &CpRegInfo, _isread: bool) -> CpAccessResult {
    if cpu.current_el() == 0 && cpu.env.cp15.cntkctl & 2 == 0 {
        return CpAccessResult::Trap;
    }
    CpAccessResult::Ok
}

/// Debug registers accessed from EL0 while TGE routes to EL2.
fn access_tdra(cpu: &ArmCpu, _ri: &CpRegInfo, _isread: bool) -> CpAccessResult {
    if cpu.current_el() == 0 && cpu.el2_enabled() && cpu.env.cp15.hcr & HCR_TGE != 0 {
        return CpAccessResult::TrapEl2;
    }
    CpAccessResult::Ok
}

// ── Read/write functions ─────────────────────────────────────────

fn sctlr_write(cpu: &mut ArmCpu, _ri: &CpRegInfo, v: u64) {
    let mut v = v as u32;
    if cpu.has(ArmFeature::V7) {
        v &= !SCTLR_B;
    } else {
        v = (v & !SCTLR_B) | (cpu.env.cp15.sctlr & SCTLR_B);
    }
    cpu.env.cp15.sctlr = v;
}

fn cpacr_write(cpu: &mut ArmCpu, _ri: &CpRegInfo, v: u64) {
    const CP10: u32 = 3 << 20;
    const CP11: u32 = 3 << 22;
    const D32DIS: u32 = 1 << 30;
    const ASEDIS: u32 = 1 << 31;
    let mut v = v as u32;
    let mut mask = 0;
    if cpu.has(ArmFeature::VFP) {
        mask |= ASEDIS | D32DIS | CP11 | CP10;
        if !cpu.has(ArmFeature::NEON) {
            v |= ASEDIS;
        }
        if !cpu.config.simd_r32() {
            v |= D32DIS;
        }
    }
    v &= mask;
    // CP11 follows CP10.
    v = (v & !CP11) | ((v & CP10) << 2);
    if cpu.has(ArmFeature::EL3) && !cpu.is_secure() && cpu.env.cp15.nsacr & (1 << 10) == 0 {
        let keep = CP10 | CP11;
        v = (v & !keep) | (cpu.env.cp15.cpacr & keep);
    }
    cpu.env.cp15.cpacr = v;
}

fn ttbcr_write(cpu: &mut ArmCpu, _ri: &CpRegInfo, v: u64) {
    let mask = if cpu.has(ArmFeature::LPAE) {
        0xffff_ffff
    } else {
        0x37
    };
    cpu.env.cp15.ttbcr = v as u32 & mask;
}

fn scr_write(cpu: &mut ArmCpu, _ri: &CpRegInfo, v: u64) {
    // NS, IRQ, FIQ, EA, FW, AW, nET.
    let mut valid: u32 = 0x7f;
    if cpu.has(ArmFeature::EL2) {
        // SCD exists only with EL2 on v7.
        valid |= 1 << 7 | 1 << 8;
    }
    if cpu.has(ArmFeature::V8) {
        valid |= 1 << 9;
    }
    cpu.env.cp15.scr = v as u32 & valid;
}

/// ATS1C*: with no MMU model the translation is flat.
fn ats_write(cpu: &mut ArmCpu, _ri: &CpRegInfo, v: u64) {
    cpu.env.cp15.par = v & 0xffff_f000;
}

fn ccsidr_read(cpu: &mut ArmCpu, _ri: &CpRegInfo) -> u64 {
    match cpu.env.cp15.csselr & 0xf {
        0 => 0x701f_e00a,
        1 => 0x201f_e00a,
        2 => 0x711f_e07a,
        _ => 0,
    }
}

fn cntpct_read(cpu: &mut ArmCpu, _ri: &CpRegInfo) -> u64 {
    cpu.env.cp15.cntpct = cpu.env.cp15.cntpct.wrapping_add(1);
    cpu.env.cp15.cntpct
}

fn mdscr_write(cpu: &mut ArmCpu, _ri: &CpRegInfo, v: u64) {
    cpu.env.cp15.mdscr = v as u32 & 0x0000_c001;
}

// ── Register lists ───────────────────────────────────────────────

fn id_regs(cfg: &ArmCpuConfig) -> Vec<CpRegInfo> {
    let mpidr = if cfg.has(ArmFeature::MPIDR) {
        0x8000_0000
    } else {
        cfg.midr as u64
    };
    vec![
        CpRegInfo::new("MIDR", 15, 0, 0, 0, 0, CpPerm::PL1_R).constant(cfg.midr as u64),
        CpRegInfo::new("CTR", 15, 0, 0, 0, 1, CpPerm::PL1_R).constant(cfg.ctr as u64),
        CpRegInfo::new("TCMTR", 15, 0, 0, 0, 2, CpPerm::PL1_R).constant(0),
        CpRegInfo::new("TLBTR", 15, 0, 0, 0, 3, CpPerm::PL1_R).constant(0),
        CpRegInfo::new("MPIDR", 15, 0, 0, 0, 5, CpPerm::PL1_R).constant(mpidr),
        CpRegInfo::new("REVIDR", 15, 0, 0, 0, 6, CpPerm::PL1_R).constant(0),
        CpRegInfo::new("CCSIDR", 15, 0, 0, 1, 0, CpPerm::PL1_R)
            .func(Some(ccsidr_read), None, None),
        CpRegInfo::new("CLIDR", 15, 0, 0, 1, 1, CpPerm::PL1_R).constant(0x0a20_0023),
        CpRegInfo::new("CSSELR", 15, 0, 0, 2, 0, CpPerm::PL1_RW).field(cp15_field!(csselr)),
    ]
}

fn system_regs(cfg: &ArmCpuConfig) -> Vec<CpRegInfo> {
    let mut v = vec![
        CpRegInfo::new("SCTLR", 15, 1, 0, 0, 0, CpPerm::PL1_RW)
            .func(None, Some(sctlr_write), Some(cp15_field!(sctlr)))
            .access_fn(access_tvm_trvm)
            .reset(cfg.reset_sctlr as u64),
        CpRegInfo::new("ACTLR", 15, 1, 0, 0, 1, CpPerm::PL1_RW).field(cp15_field!(actlr)),
        CpRegInfo::new("TTBR0", 15, 2, 0, 0, 0, CpPerm::PL1_RW)
            .field(cp15_field!(ttbr0))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new("TTBR1", 15, 2, 0, 0, 1, CpPerm::PL1_RW)
            .field(cp15_field!(ttbr1))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new("TTBCR", 15, 2, 0, 0, 2, CpPerm::PL1_RW)
            .func(None, Some(ttbcr_write), Some(cp15_field!(ttbcr)))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new("DACR", 15, 3, 0, 0, 0, CpPerm::PL1_RW)
            .field(cp15_field!(dacr))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new("PRRR", 15, 10, 2, 0, 0, CpPerm::PL1_RW)
            .field(cp15_field!(prrr))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new("NMRR", 15, 10, 2, 0, 1, CpPerm::PL1_RW)
            .field(cp15_field!(nmrr))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new("FCSEIDR", 15, 13, 0, 0, 0, CpPerm::PL1_RW).field(cp15_field!(fcseidr)),
        CpRegInfo::new("CONTEXTIDR", 15, 13, 0, 0, 1, CpPerm::PL1_RW)
            .field(cp15_field!(contextidr))
            .access_fn(access_tvm_trvm),
    ];
    if cfg.has(ArmFeature::V6) {
        v.push(
            CpRegInfo::new("CPACR", 15, 1, 0, 0, 2, CpPerm::PL1_RW)
                .func(None, Some(cpacr_write), Some(cp15_field!(cpacr)))
                .access_fn(cpacr_access),
        );
    }
    v
}

fn fault_regs() -> Vec<CpRegInfo> {
    vec![
        CpRegInfo::new("DFSR", 15, 5, 0, 0, 0, CpPerm::PL1_RW)
            .field(cp15_field!(dfsr))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new("IFSR", 15, 5, 0, 0, 1, CpPerm::PL1_RW)
            .field(cp15_field!(ifsr))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new("DFAR", 15, 6, 0, 0, 0, CpPerm::PL1_RW)
            .field(cp15_field!(dfar))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new("IFAR", 15, 6, 0, 0, 2, CpPerm::PL1_RW)
            .field(cp15_field!(ifar))
            .access_fn(access_tvm_trvm),
    ]
}

fn cache_ops(cfg: &ArmCpuConfig) -> Vec<CpRegInfo> {
    let nop = |name, crm, opc2, access| {
        CpRegInfo::new(name, 15, 7, crm, 0, opc2, access).flags(CpRegFlags::NOP)
    };
    let tlb = |name, crm, opc2| {
        CpRegInfo::new(name, 15, 8, crm, 0, opc2, CpPerm::PL1_W).flags(CpRegFlags::NOP)
    };
    let mut v = vec![
        nop("ICIALLUIS", 1, 0, CpPerm::PL1_W),
        nop("BPIALLIS", 1, 6, CpPerm::PL1_W),
        nop("ICIALLU", 5, 0, CpPerm::PL1_W),
        nop("ICIMVAU", 5, 1, CpPerm::PL1_W),
        nop("CP15ISB", 5, 4, CpPerm::PL0_W),
        nop("BPIALL", 5, 6, CpPerm::PL1_W),
        nop("DCIMVAC", 6, 1, CpPerm::PL1_W),
        nop("DCISW", 6, 2, CpPerm::PL1_W),
        nop("DCCMVAC", 10, 1, CpPerm::PL1_W),
        nop("DCCSW", 10, 2, CpPerm::PL1_W),
        nop("CP15DSB", 10, 4, CpPerm::PL0_W),
        nop("CP15DMB", 10, 5, CpPerm::PL0_W),
        nop("DCCMVAU", 11, 1, CpPerm::PL1_W),
        nop("DCCIMVAC", 14, 1, CpPerm::PL1_W),
        nop("DCCISW", 14, 2, CpPerm::PL1_W),
        tlb("TLBIALLIS", 3, 0),
        tlb("TLBIMVAIS", 3, 1),
        tlb("TLBIASIDIS", 3, 2),
        tlb("TLBIMVAAIS", 3, 3),
        tlb("TLBIALL", 7, 0),
        tlb("TLBIMVA", 7, 1),
        tlb("TLBIASID", 7, 2),
        tlb("TLBIMVAA", 7, 3),
    ];
    // VA-to-PA translation arrived with v6K; earlier cores put WFI in
    // the same c7, c8 slot.
    if cfg.has(ArmFeature::V6K) {
        v.push(CpRegInfo::new("PAR", 15, 7, 4, 0, 0, CpPerm::PL1_RW).field(cp15_field!(par)));
        for (i, name) in ["ATS1CPR", "ATS1CPW", "ATS1CUR", "ATS1CUW"].into_iter().enumerate() {
            v.push(
                CpRegInfo::new(name, 15, 7, 8, 0, i as u8, CpPerm::PL1_W)
                    .func(None, Some(ats_write), None)
                    .flags(CpRegFlags::SUPPRESS_TB_END),
            );
        }
    }
    if !cfg.has(ArmFeature::V7) {
        v.push(CpRegInfo::new("WFI_v6", 15, 7, 0, 0, 4, CpPerm::PL1_W).flags(CpRegFlags::WFI));
    }
    if !cfg.has(ArmFeature::V6) {
        v.push(CpRegInfo::new("WFI_v5", 15, 7, 8, 0, 2, CpPerm::PL1_W).flags(CpRegFlags::WFI));
    }
    v
}

fn thread_id_regs() -> Vec<CpRegInfo> {
    vec![
        CpRegInfo::new("TPIDRURW", 15, 13, 0, 0, 2, CpPerm::PL0_RW)
            .field(cp15_field!(tpidrurw))
            .flags(CpRegFlags::SUPPRESS_TB_END),
        CpRegInfo::new(
            "TPIDRURO",
            15,
            13,
            0,
            0,
            3,
            CpPerm::PL0_R.union(CpPerm::PL1_W),
        )
        .field(cp15_field!(tpidruro))
        .flags(CpRegFlags::SUPPRESS_TB_END),
        CpRegInfo::new("TPIDRPRW", 15, 13, 0, 0, 4, CpPerm::PL1_RW)
            .field(cp15_field!(tpidrprw))
            .flags(CpRegFlags::SUPPRESS_TB_END),
    ]
}

fn lpae_regs() -> Vec<CpRegInfo> {
    vec![
        CpRegInfo::new64("TTBR0_64", 15, 2, 0, CpPerm::PL1_RW)
            .field(cp15_field!(ttbr0))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new64("TTBR1_64", 15, 2, 1, CpPerm::PL1_RW)
            .field(cp15_field!(ttbr1))
            .access_fn(access_tvm_trvm),
        CpRegInfo::new64("PAR_64", 15, 7, 0, CpPerm::PL1_RW).field(cp15_field!(par)),
    ]
}

fn el3_regs(cfg: &ArmCpuConfig) -> Vec<CpRegInfo> {
    vec![
        CpRegInfo::new("SCR", 15, 1, 1, 0, 0, CpPerm::PL3_RW)
            .func(None, Some(scr_write), Some(cp15_field!(scr)))
            .flags(CpRegFlags::NEWEL)
            .secure(CpSecState::Secure)
            .reset(if cfg.user_only { SCR_NS as u64 } else { 0 }),
        CpRegInfo::new("SDER", 15, 1, 1, 0, 1, CpPerm::PL3_RW)
            .field(cp15_field!(sder))
            .secure(CpSecState::Secure),
        CpRegInfo::new("NSACR", 15, 1, 1, 0, 2, CpPerm::PL3_RW.union(CpPerm::PL1_R))
            .field(cp15_field!(nsacr)),
        CpRegInfo::new("MVBAR", 15, 12, 0, 0, 1, CpPerm::PL3_RW)
            .field(cp15_field!(mvbar))
            .secure(CpSecState::Secure),
    ]
}

fn el2_regs() -> Vec<CpRegInfo> {
    vec![
        CpRegInfo::new("HSCTLR", 15, 1, 0, 4, 0, CpPerm::PL2_RW).field(cp15_field!(hsctlr)),
        CpRegInfo::new("HCR", 15, 1, 1, 4, 0, CpPerm::PL2_RW).field(cp15_field!(hcr)),
        CpRegInfo::new("HCPTR", 15, 1, 1, 4, 2, CpPerm::PL2_RW).field(cp15_field!(hcptr)),
        CpRegInfo::new("HSTR", 15, 1, 1, 4, 3, CpPerm::PL2_RW).field(cp15_field!(hstr)),
        CpRegInfo::new("HVBAR", 15, 12, 0, 4, 0, CpPerm::PL2_RW).field(cp15_field!(hvbar)),
        CpRegInfo::new("HTPIDR", 15, 13, 0, 4, 2, CpPerm::PL2_RW)
            .field(cp15_field!(htpidr))
            .flags(CpRegFlags::SUPPRESS_TB_END),
    ]
}

fn timer_regs() -> Vec<CpRegInfo> {
    vec![
        CpRegInfo::new(
            "CNTFRQ",
            15,
            14,
            0,
            0,
            0,
            CpPerm::PL1_RW.union(CpPerm::PL0_R),
        )
        .field(cp15_field!(cntfrq))
        .access_fn(gt_cntfrq_access)
        .reset(62_500_000),
        CpRegInfo::new("CNTKCTL", 15, 14, 1, 0, 0, CpPerm::PL1_RW).field(cp15_field!(cntkctl)),
        CpRegInfo::new64("CNTPCT", 15, 14, 0, CpPerm::PL0_R)
            .func(Some(cntpct_read), None, None)
            .access_fn(gt_pct_access)
            .flags(CpRegFlags::IO),
        CpRegInfo::new64("CNTVCT", 15, 14, 1, CpPerm::PL0_R)
            .func(Some(cntpct_read), None, None)
            .access_fn(gt_vct_access)
            .flags(CpRegFlags::IO),
    ]
}

fn jazelle_regs() -> Vec<CpRegInfo> {
    vec![
        CpRegInfo::new("JIDR", 14, 0, 0, 7, 0, CpPerm::PL1_R).constant(0),
        CpRegInfo::new("JOSCR", 14, 1, 0, 7, 0, CpPerm::PL1_RW).constant(0),
        CpRegInfo::new("JMCR", 14, 2, 0, 7, 0, CpPerm::PL1_RW).constant(0),
    ]
}

fn debug_regs(cfg: &ArmCpuConfig) -> Vec<CpRegInfo> {
    let didr = if cfg.has(ArmFeature::V7) {
        0x3515_f005
    } else {
        0
    };
    vec![
        CpRegInfo::new("DBGDIDR", 14, 0, 0, 0, 0, CpPerm::PL0_R)
            .constant(didr)
            .access_fn(access_tdra),
        CpRegInfo::new("DBGDRAR", 14, 1, 0, 0, 0, CpPerm::PL0_R)
            .constant(0)
            .access_fn(access_tdra),
        CpRegInfo::new("DBGDSAR", 14, 2, 0, 0, 0, CpPerm::PL0_R)
            .constant(0)
            .access_fn(access_tdra),
        CpRegInfo::new("DBGDSCRext", 14, 0, 2, 0, 2, CpPerm::PL1_RW)
            .func(None, Some(mdscr_write), Some(cp15_field!(mdscr))),
    ]
}
