//! System instructions: status register access, mode changes,
//! exception generation, hints, barriers and coprocessor transfers.

use tcg_core::tb::cflags::CF_PARALLEL;
use tcg_core::{bar, Context, TempIdx, Type};

use super::ArmDisasContext;
use crate::arm::config::ArmFeature;
use crate::arm::coproc::{CpRegFlags, CpRegKey};
use crate::arm::cpu::{
    cpsr_valid_mask, CPSR_A, CPSR_EXEC, CPSR_F, CPSR_I, CPSR_M, CPSR_USER, ELR_HYP_OFFSET,
    MODE_ABT, MODE_FIQ, MODE_HYP, MODE_IRQ, MODE_MON, MODE_SVC, MODE_UND, MODE_USR, SPSR_OFFSET,
};
use crate::arm::decode::{
    ArgsCps, ArgsMcr, ArgsMcrr, ArgsMrsBank, ArgsMrsReg, ArgsMrsV7m, ArgsMsrBank, ArgsMsrI,
    ArgsMsrReg, ArgsMsrV7m,
};
use crate::arm::helper::sys::{BANKED_ELR_HYP, BANKED_SPSR};
use crate::arm::helper::Helper;
use crate::arm::syndrome::{
    syn_aa32_bkpt, syn_aa32_smc, syn_cp_rrt_trap, syn_cp_rt_trap, syn_uncategorized,
    EC_CP14RRTTRAP, EC_CP14RTTRAP, EC_CP15RRTTRAP, EC_CP15RTTRAP, EXCP_SEMIHOST, EXCP_UDEF,
};
use crate::DisasJumpType;

/// v7-M special register numbers written by CPS.
const SYSM_PRIMASK: u32 = 16;
const SYSM_FAULTMASK: u32 = 19;

/// One coprocessor register transfer.
#[derive(Debug, Clone, Copy)]
struct CpAccess {
    cp: u32,
    is64: bool,
    opc1: u32,
    crn: u32,
    crm: u32,
    opc2: u32,
    isread: bool,
    rt: i64,
    rt2: i64,
}

impl ArmDisasContext<'_> {
    /// Resume at the next instruction through the main loop, so that
    /// state changed by this one is seen by the TB lookup.
    pub(super) fn gen_lookup_tb(&mut self, ir: &mut Context) {
        let next = self.pc_next();
        self.gen_update_pc(ir, next);
        self.base.is_jmp = DisasJumpType::Exit;
    }

    pub(super) fn gen_rebuild_hflags(&self, ir: &mut Context) {
        self.call_void(ir, Helper::RebuildHflags, &[]);
    }

    fn semihosting_enabled(&self) -> bool {
        self.cfg.semihosting && (!self.is_user() || self.cfg.user_only)
    }

    // -- Status registers --

    /// CPSR/SPSR byte-lane mask of an MSR, limited to what the
    /// current state may write.
    fn msr_mask(&self, flags: i64, spsr: bool) -> u32 {
        let mut mask = 0u32;
        for lane in 0..4 {
            if flags & (1 << lane) != 0 {
                mask |= 0xff << (lane * 8);
            }
        }
        mask &= cpsr_valid_mask(self.cfg.features);
        if !spsr {
            mask &= !CPSR_EXEC;
        }
        if self.is_user() {
            mask &= CPSR_USER;
        }
        mask
    }

    /// Write the bits of `val` under `mask` to the CPSR or SPSR.
    /// Returns false when the access UNDEFs.
    fn gen_set_psr(&mut self, ir: &mut Context, mask: u32, spsr: bool, val: TempIdx) -> bool {
        if spsr {
            if self.is_user() {
                return false;
            }
            let tmp = self.load_cpu_offset(ir, SPSR_OFFSET);
            ir.gen_andi(Type::I32, tmp, tmp, !mask as u64);
            ir.gen_andi(Type::I32, val, val, mask as u64);
            ir.gen_or(Type::I32, tmp, tmp, val);
            self.store_cpu_offset(ir, tmp, SPSR_OFFSET);
        } else {
            let m = self.const32(ir, mask);
            self.call_void(ir, Helper::CpsrWrite, &[val, m]);
        }
        self.gen_lookup_tb(ir);
        true
    }

    fn gen_set_psr_im(&mut self, ir: &mut Context, mask: u32, spsr: bool, val: u32) -> bool {
        let t = ir.new_temp(Type::I32);
        ir.gen_movi(Type::I32, t, val as u64);
        self.gen_set_psr(ir, mask, spsr, t)
    }

    pub(super) fn op_msr_imm(&mut self, ir: &mut Context, a: &ArgsMsrI) -> bool {
        let val = (a.imm as u32).rotate_right(a.rot as u32 * 2);
        let mask = self.msr_mask(a.mask, a.r != 0);
        if !self.gen_set_psr_im(ir, mask, a.r != 0, val) {
            self.unallocated_encoding(ir);
        }
        true
    }

    pub(super) fn op_msr_reg(&mut self, ir: &mut Context, a: &ArgsMsrReg) -> bool {
        if self.is_m() {
            return false;
        }
        let mask = self.msr_mask(a.mask, a.r != 0);
        let tmp = self.load_reg(ir, a.rn);
        if !self.gen_set_psr(ir, mask, a.r != 0, tmp) {
            self.unallocated_encoding(ir);
        }
        true
    }

    pub(super) fn op_mrs_reg(&mut self, ir: &mut Context, a: &ArgsMrsReg) -> bool {
        if self.is_m() {
            return false;
        }
        let tmp = if a.r != 0 {
            if self.is_user() {
                self.unallocated_encoding(ir);
                return true;
            }
            self.load_cpu_offset(ir, SPSR_OFFSET)
        } else {
            self.call(ir, Helper::CpsrRead, &[])
        };
        self.store_reg(ir, a.rd, tmp);
        true
    }

    pub(super) fn op_msr_v7m(&mut self, ir: &mut Context, a: &ArgsMsrV7m) -> bool {
        if !self.is_m() {
            return false;
        }
        let maskreg = self.const32(ir, ((a.mask as u32) << 10) | a.sysm as u32);
        let reg = self.load_reg(ir, a.rn);
        self.call_void(ir, Helper::V7mMsr, &[maskreg, reg]);
        // CONTROL writes can change the privilege level.
        self.gen_rebuild_hflags(ir);
        self.gen_lookup_tb(ir);
        true
    }

    pub(super) fn op_mrs_v7m(&mut self, ir: &mut Context, a: &ArgsMrsV7m) -> bool {
        if !self.is_m() {
            return false;
        }
        let sysm = self.const32(ir, a.sysm as u32);
        let tmp = self.call(ir, Helper::V7mMrs, &[sysm]);
        self.store_reg(ir, a.rd, tmp);
        true
    }

    // -- Banked registers --

    /// Map the `r`/`sysm` fields of a banked MRS/MSR to the target
    /// mode and register number. UNDEFs and returns `None` for the
    /// encodings that are not accessible from the current state.
    fn banked_access_decode(
        &mut self,
        ir: &mut Context,
        r: bool,
        sysm: u32,
        rn: i64,
    ) -> Option<(u32, u32)> {
        let mut exc_target = self.default_exception_el();
        let el = self.tb.current_el as u32;

        let decoded = if self.is_user() || rn == 15 {
            None
        } else if r {
            let mode = match sysm {
                0x0e => Some(MODE_FIQ),
                0x10 => Some(MODE_IRQ),
                0x12 => Some(MODE_SVC),
                0x14 => Some(MODE_ABT),
                0x16 => Some(MODE_UND),
                0x1c => Some(MODE_MON),
                0x1e => Some(MODE_HYP),
                _ => None,
            };
            mode.map(|m| (m, BANKED_SPSR))
        } else {
            let lr_or_sp = |bit: u32| if bit & 1 != 0 { 13 } else { 14 };
            match sysm {
                0x00..=0x06 => Some((MODE_USR, sysm + 8)),
                0x08..=0x0e => Some((MODE_FIQ, sysm)),
                0x10..=0x11 => Some((MODE_IRQ, lr_or_sp(sysm))),
                0x12..=0x13 => Some((MODE_SVC, lr_or_sp(sysm))),
                0x14..=0x15 => Some((MODE_ABT, lr_or_sp(sysm))),
                0x16..=0x17 => Some((MODE_UND, lr_or_sp(sysm))),
                0x1c..=0x1d => Some((MODE_MON, lr_or_sp(sysm))),
                // ELR_hyp rather than a banked LR.
                0x1e..=0x1f => Some((MODE_HYP, if sysm & 1 != 0 { 13 } else { BANKED_ELR_HYP })),
                _ => None,
            }
        };

        let ok = match decoded {
            Some((MODE_MON, _)) => {
                if !self.has(ArmFeature::EL3) || self.tb.ns {
                    false
                } else if el == 1 {
                    // Secure EL1 under an AArch64 EL3 traps to EL3.
                    exc_target = 3;
                    false
                } else {
                    true
                }
            }
            Some((MODE_HYP, regno)) => {
                self.has(ArmFeature::EL2) && el >= 2 && !(el < 3 && regno != BANKED_ELR_HYP)
            }
            Some(_) => true,
            None => false,
        };
        if !ok {
            let pc = self.pc_curr;
            self.gen_exception_insn_el(ir, pc, EXCP_UDEF, syn_uncategorized(), exc_target);
            return None;
        }
        decoded
    }

    fn banked_ok(&self) -> bool {
        self.has(ArmFeature::V7VE) && !self.is_m()
    }

    pub(super) fn op_msr_bank(&mut self, ir: &mut Context, a: &ArgsMsrBank) -> bool {
        if !self.banked_ok() {
            return false;
        }
        let Some((tgtmode, regno)) = self.banked_access_decode(ir, a.r != 0, a.sysm as u32, a.rn)
        else {
            return true;
        };
        // The helper may raise an exception.
        self.gen_set_condexec(ir);
        let pc = self.pc_curr;
        self.gen_update_pc(ir, pc);
        let val = self.load_reg(ir, a.rn);
        let m = self.const32(ir, tgtmode);
        let r = self.const32(ir, regno);
        self.call_void(ir, Helper::MsrBanked, &[val, m, r]);
        self.base.is_jmp = DisasJumpType::UpdateExit;
        true
    }

    pub(super) fn op_mrs_bank(&mut self, ir: &mut Context, a: &ArgsMrsBank) -> bool {
        if !self.banked_ok() {
            return false;
        }
        let Some((tgtmode, regno)) = self.banked_access_decode(ir, a.r != 0, a.sysm as u32, a.rd)
        else {
            return true;
        };
        self.gen_set_condexec(ir);
        let pc = self.pc_curr;
        self.gen_update_pc(ir, pc);
        let m = self.const32(ir, tgtmode);
        let r = self.const32(ir, regno);
        let tmp = self.call(ir, Helper::MrsBanked, &[m, r]);
        self.store_reg(ir, a.rd, tmp);
        self.base.is_jmp = DisasJumpType::UpdateExit;
        true
    }

    // -- Mode changes --

    pub(super) fn op_cps(&mut self, ir: &mut Context, a: &ArgsCps) -> bool {
        if !self.has(ArmFeature::V6) || self.is_m() {
            return false;
        }
        // NOP in User mode.
        if self.is_user() {
            return true;
        }
        let mut mask = 0u32;
        let mut val = 0u32;
        if a.imod & 2 != 0 {
            if a.a != 0 {
                mask |= CPSR_A;
            }
            if a.i != 0 {
                mask |= CPSR_I;
            }
            if a.f != 0 {
                mask |= CPSR_F;
            }
            if a.imod & 1 != 0 {
                val |= mask;
            }
        }
        if a.m != 0 {
            mask |= CPSR_M;
            val |= a.mode as u32;
        }
        if mask != 0 {
            self.gen_set_psr_im(ir, mask, false, val);
        }
        true
    }

    /// v7-M CPSIE/CPSID: PRIMASK and FAULTMASK only.
    pub(super) fn op_cps_v7m(&mut self, ir: &mut Context, im: bool, i: bool, f: bool) -> bool {
        if !self.is_m() {
            return false;
        }
        if self.is_user() {
            return true;
        }
        let val = self.const32(ir, im as u32);
        if f {
            let sysm = self.const32(ir, SYSM_FAULTMASK);
            self.call_void(ir, Helper::V7mMsr, &[sysm, val]);
        }
        if i {
            let sysm = self.const32(ir, SYSM_PRIMASK);
            self.call_void(ir, Helper::V7mMsr, &[sysm, val]);
        }
        self.gen_rebuild_hflags(ir);
        self.gen_lookup_tb(ir);
        true
    }

    pub(super) fn op_setend(&mut self, ir: &mut Context, e: bool) -> bool {
        if !self.has(ArmFeature::V6) || self.is_m() {
            return false;
        }
        if e != self.tb.be_data {
            self.call_void(ir, Helper::Setend, &[]);
            self.base.is_jmp = DisasJumpType::UpdateExit;
        }
        true
    }

    pub(super) fn op_eret(&mut self, ir: &mut Context) -> bool {
        if !self.has(ArmFeature::V7VE) {
            return false;
        }
        if self.is_user() {
            self.unallocated_encoding(ir);
            return true;
        }
        // Hyp returns through ELR_hyp, not LR.
        let tmp = if self.tb.current_el == 2 {
            self.load_cpu_offset(ir, ELR_HYP_OFFSET)
        } else {
            self.load_reg(ir, 14)
        };
        self.gen_exception_return(ir, tmp);
        true
    }

    // -- Exception generation --

    pub(super) fn op_svc(&mut self, ir: &mut Context, imm: i64) -> bool {
        let semihost_imm = if self.tb.thumb { 0xab } else { 0x12_3456 };
        if !self.is_m() && self.semihosting_enabled() && imm == semihost_imm {
            let pc = self.pc_curr;
            self.gen_exception_internal_insn(ir, pc, EXCP_SEMIHOST);
        } else {
            let next = self.pc_next();
            self.gen_update_pc(ir, next);
            self.svc_imm = imm as u32;
            self.base.is_jmp = DisasJumpType::Swi;
        }
        true
    }

    pub(super) fn op_hvc(&mut self, ir: &mut Context, imm: i64) -> bool {
        if !self.has(ArmFeature::V7) || self.is_m() {
            return false;
        }
        if self.is_user() {
            self.unallocated_encoding(ir);
            return true;
        }
        // The pre-check may UNDEF before the instruction executes; the
        // HVC exception itself is taken after it.
        self.gen_set_condexec(ir);
        let pc = self.pc_curr;
        self.gen_update_pc(ir, pc);
        self.call_void(ir, Helper::PreHvc, &[]);
        self.svc_imm = imm as u32;
        let next = self.pc_next();
        self.gen_update_pc(ir, next);
        self.base.is_jmp = DisasJumpType::Hvc;
        true
    }

    pub(super) fn op_smc(&mut self, ir: &mut Context) -> bool {
        if !self.has(ArmFeature::V6K) || self.is_m() {
            return false;
        }
        if self.is_user() {
            self.unallocated_encoding(ir);
            return true;
        }
        self.gen_set_condexec(ir);
        let pc = self.pc_curr;
        self.gen_update_pc(ir, pc);
        let syn = self.const32(ir, syn_aa32_smc());
        self.call_void(ir, Helper::PreSmc, &[syn]);
        let next = self.pc_next();
        self.gen_update_pc(ir, next);
        self.base.is_jmp = DisasJumpType::Smc;
        true
    }

    pub(super) fn op_bkpt(&mut self, ir: &mut Context, imm: i64) -> bool {
        if !self.has(ArmFeature::V5) {
            return false;
        }
        if self.is_m() && self.semihosting_enabled() && imm == 0xab {
            let pc = self.pc_curr;
            self.gen_exception_internal_insn(ir, pc, EXCP_SEMIHOST);
        } else {
            self.gen_exception_bkpt_insn(ir, syn_aa32_bkpt(imm as u32, false));
        }
        true
    }

    /// HLT: only the semihosting trap forms do anything; the rest
    /// UNDEF as with halting debug disabled.
    pub(super) fn op_hlt(&mut self, ir: &mut Context, imm: i64) -> bool {
        let semihost_imm = if self.tb.thumb { 0x3c } else { 0xf000 };
        if self.semihosting_enabled() && imm == semihost_imm {
            let pc = self.pc_curr;
            self.gen_exception_internal_insn(ir, pc, EXCP_SEMIHOST);
        } else {
            self.unallocated_encoding(ir);
        }
        true
    }

    // -- Hints and barriers --

    pub(super) fn op_wfi(&mut self, ir: &mut Context) -> bool {
        let next = self.pc_next();
        self.gen_update_pc(ir, next);
        self.base.is_jmp = DisasJumpType::Wfi;
        true
    }

    /// WFE and YIELD only matter when other vCPUs share this thread.
    pub(super) fn op_wfe_yield(&mut self, ir: &mut Context, jump: DisasJumpType) -> bool {
        if self.cflags & CF_PARALLEL == 0 {
            let next = self.pc_next();
            self.gen_update_pc(ir, next);
            self.base.is_jmp = jump;
        }
        true
    }

    fn barriers_ok(&self) -> bool {
        self.has(ArmFeature::V7) || self.is_m()
    }

    pub(super) fn op_dmb(&mut self, ir: &mut Context) -> bool {
        if !self.barriers_ok() {
            return false;
        }
        ir.gen_mb(bar::MO_ALL | bar::SC);
        true
    }

    /// ISB: end the block so that context changes take effect.
    pub(super) fn op_isb(&mut self, ir: &mut Context) -> bool {
        if !self.barriers_ok() {
            return false;
        }
        let next = self.pc_next();
        self.gen_goto_tb(ir, 0, next);
        true
    }

    pub(super) fn op_sb(&mut self, ir: &mut Context) -> bool {
        if !self.has(ArmFeature::SB) {
            return false;
        }
        ir.gen_mb(bar::MO_ALL | bar::SC);
        let next = self.pc_next();
        self.gen_goto_tb(ir, 0, next);
        true
    }

    // -- Coprocessor transfers --

    /// Coprocessor numbers that can name a system register. VFP and
    /// Advanced SIMD (10 and 11) go to their own decoders.
    fn valid_cp(&self, cp: i64) -> bool {
        if self.is_m() {
            return false;
        }
        if self.has(ArmFeature::V8) && !(cp == 14 || cp == 15) {
            return false;
        }
        cp < 8 || cp >= 14
    }

    pub(super) fn op_mcr_mrc(&mut self, ir: &mut Context, a: &ArgsMcr, isread: bool) -> bool {
        if !self.valid_cp(a.cp) {
            return false;
        }
        let acc = CpAccess {
            cp: a.cp as u32,
            is64: false,
            opc1: a.opc1 as u32,
            crn: a.crn as u32,
            crm: a.crm as u32,
            opc2: a.opc2 as u32,
            isread,
            rt: a.rt,
            rt2: 0,
        };
        self.do_coproc_insn(ir, acc);
        true
    }

    pub(super) fn op_mcrr_mrrc(&mut self, ir: &mut Context, a: &ArgsMcrr, isread: bool) -> bool {
        if !self.valid_cp(a.cp) {
            return false;
        }
        let acc = CpAccess {
            cp: a.cp as u32,
            is64: true,
            opc1: a.opc1 as u32,
            crn: 0,
            crm: a.crm as u32,
            opc2: 0,
            isread,
            rt: a.rt,
            rt2: a.rt2,
        };
        self.do_coproc_insn(ir, acc);
        true
    }

    /// Trap syndrome of a coprocessor access. A trapped conditional
    /// access always passed its condition, so COND is reported as AL.
    fn cp_syndrome(&self, acc: &CpAccess) -> u32 {
        let is_16bit = false;
        match (acc.cp, acc.is64) {
            (14, true) | (15, true) => syn_cp_rrt_trap(
                if acc.cp == 14 { EC_CP14RRTTRAP } else { EC_CP15RRTTRAP },
                true,
                0xe,
                acc.opc1,
                acc.crm,
                acc.rt as u32,
                acc.rt2 as u32,
                acc.isread,
                is_16bit,
            ),
            (14, false) | (15, false) => syn_cp_rt_trap(
                if acc.cp == 14 { EC_CP14RTTRAP } else { EC_CP15RTTRAP },
                true,
                0xe,
                acc.opc1,
                acc.opc2,
                acc.crn,
                acc.rt as u32,
                acc.crm,
                acc.isread,
                is_16bit,
            ),
            // Only pre-v8 cores get here; the syndrome is never
            // guest-visible.
            _ => syn_uncategorized(),
        }
    }

    fn do_coproc_insn(&mut self, ir: &mut Context, acc: CpAccess) {
        let key = CpRegKey {
            cp: acc.cp as u8,
            is64: acc.is64,
            ns: self.tb.ns,
            crn: acc.crn as u8,
            crm: acc.crm as u8,
            opc1: acc.opc1 as u8,
            opc2: acc.opc2 as u8,
        };
        let syndrome = self.cp_syndrome(&acc);
        let el = self.tb.current_el as u32;

        let cpregs = self.cpregs;
        let Some((id, ri)) = cpregs.lookup(&key) else {
            let state = if self.tb.ns { "non-secure" } else { "secure" };
            let dir = if acc.isread { "read" } else { "write" };
            if acc.is64 {
                log::warn!(
                    "{dir} access to unsupported AArch32 64 bit system register cp:{} opc1:{} crm:{} ({state})",
                    acc.cp, acc.opc1, acc.crm
                );
            } else {
                log::warn!(
                    "{dir} access to unsupported AArch32 system register cp:{} opc1:{} crn:{} crm:{} opc2:{} ({state})",
                    acc.cp, acc.opc1, acc.crn, acc.crm, acc.opc2
                );
            }
            self.unallocated_encoding(ir);
            return;
        };

        if !ri.access_ok(el, acc.isread) {
            self.unallocated_encoding(ir);
            return;
        }

        let pc = self.pc_curr;
        if (self.tb.hstr_active && el <= 1 && acc.cp == 15) || ri.accessfn.is_some() {
            // Runtime permission checks; may raise an exception.
            self.gen_set_condexec(ir);
            self.gen_update_pc(ir, pc);
            let args = [
                self.const32(ir, id),
                self.const32(ir, syndrome),
                self.const32(ir, acc.isread as u32),
            ];
            self.call_void(ir, Helper::AccessCheckCpReg, &args);
        } else if ri.flags.contains(CpRegFlags::RAISES_EXC) {
            self.gen_set_condexec(ir);
            self.gen_update_pc(ir, pc);
        }

        if ri.flags.contains(CpRegFlags::NOP) {
            return;
        }
        if ri.flags.contains(CpRegFlags::WFI) {
            if acc.isread {
                self.unallocated_encoding(ir);
            } else {
                self.op_wfi(ir);
            }
            return;
        }

        let mut need_exit_tb =
            ri.flags.contains(CpRegFlags::IO) && self.translator_io_start(ir);

        if acc.isread {
            if acc.is64 {
                let tmp64 = if ri.is_const() {
                    ir.new_const(Type::I64, ri.resetvalue)
                } else if let (None, Some(off)) = (ri.readfn(), ri.fieldoffset()) {
                    let t = ir.new_temp(Type::I64);
                    ir.gen_ld(Type::I64, t, self.env, off);
                    t
                } else {
                    let idc = self.const32(ir, id);
                    self.call64(ir, Helper::GetCpReg64, &[idc])
                };
                let lo = ir.new_temp(Type::I32);
                ir.gen_extrl_i64_i32(lo, tmp64);
                self.store_reg(ir, acc.rt, lo);
                let hi = ir.new_temp(Type::I32);
                ir.gen_extrh_i64_i32(hi, tmp64);
                self.store_reg(ir, acc.rt2, hi);
            } else {
                let tmp = if ri.is_const() {
                    self.const32(ir, ri.resetvalue as u32)
                } else if let (None, Some(off)) = (ri.readfn(), ri.fieldoffset()) {
                    self.load_cpu_offset(ir, off)
                } else {
                    let idc = self.const32(ir, id);
                    self.call(ir, Helper::GetCpReg, &[idc])
                };
                if acc.rt == 15 {
                    // MRC to PC sets NZCV from the top bits.
                    self.gen_set_nzcv(ir, tmp);
                } else {
                    self.store_reg(ir, acc.rt, tmp);
                }
            }
        } else {
            // Writes to constant registers are ignored.
            if ri.is_const() {
                return;
            }
            if acc.is64 {
                let lo = self.load_reg(ir, acc.rt);
                let hi = self.load_reg(ir, acc.rt2);
                let tmp64 = ir.new_temp(Type::I64);
                ir.gen_concat_i32_i64(tmp64, lo, hi);
                if let (None, Some(off)) = (ri.writefn(), ri.fieldoffset()) {
                    ir.gen_st(Type::I64, tmp64, self.env, off);
                } else {
                    let idc = self.const32(ir, id);
                    self.call_void(ir, Helper::SetCpReg64, &[idc, tmp64]);
                }
            } else {
                let tmp = self.load_reg(ir, acc.rt);
                if let (None, Some(off)) = (ri.writefn(), ri.fieldoffset()) {
                    self.store_cpu_offset(ir, tmp, off);
                } else {
                    let idc = self.const32(ir, id);
                    self.call_void(ir, Helper::SetCpReg, &[idc, tmp]);
                }
            }
            if !ri.flags.contains(CpRegFlags::SUPPRESS_TB_END) {
                // The write may have changed anything the TB flags
                // capture.
                self.gen_rebuild_hflags(ir);
                need_exit_tb = true;
            }
        }

        if need_exit_tb {
            self.gen_lookup_tb(ir);
        }
    }
}
