//! AArch32 translator: A32 and T32 instructions to TCG IR.
//!
//! The CPU state the translator specialises on arrives packed in the
//! TB flags word (see [`TbFlags`]); everything else is read from the
//! env at run time. Core registers and the NZCV flags are IR globals,
//! VFP and Advanced SIMD registers are accessed with plain env loads
//! and stores.

mod dp;
mod emit;
mod ldst;
mod neon;
mod sys;
mod trans;
mod vfp;

pub use emit::DisasCompare;

use tcg_core::tb::cflags::{CF_COUNT_MASK, CF_LAST_IO, CF_SINGLE_STEP, CF_USE_ICOUNT};
use tcg_core::{Context, TempIdx, Type};

use super::config::{ArmCpuConfig, ArmFeature, TB_MAX_INSNS};
use super::coproc::CpRegTable;
use super::cpu::{
    reg_offset, TbFlags, CF_OFFSET, EXCLUSIVE_ADDR_OFFSET, EXCLUSIVE_VAL_OFFSET, NF_OFFSET,
    VF_OFFSET, ZF_OFFSET,
};
use super::syndrome::{
    syn_illegalstate, syn_insn_abort, syn_uncategorized, EXCP_INVSTATE, EXCP_KERNEL_TRAP,
    EXCP_PREFETCH_ABORT, EXCP_UDEF, FSC_EXTERNAL,
};
use crate::{translator_loop, DisasContextBase, DisasJumpType, TranslatorOps};

pub const TARGET_PAGE_BITS: u32 = 12;
pub const TARGET_PAGE_SIZE: u32 = 1 << TARGET_PAGE_BITS;
pub const TARGET_PAGE_MASK: u32 = !(TARGET_PAGE_SIZE - 1);

const REG_NAMES: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13",
    "r14", "pc",
];

/// Source of guest instruction bytes.
pub trait CodeFetch {
    /// Read a little-endian halfword (`size == 2`) or word
    /// (`size == 4`) of code at `addr`, or `None` if nothing is
    /// mapped there.
    fn fetch(&self, addr: u32, size: u32) -> Option<u32>;
}

/// Code held in a byte slice that starts at guest address `base`.
#[derive(Debug, Clone, Copy)]
pub struct CodeSlice<'a> {
    pub base: u32,
    pub bytes: &'a [u8],
}

impl<'a> CodeSlice<'a> {
    pub fn new(base: u32, bytes: &'a [u8]) -> Self {
        Self { base, bytes }
    }
}

impl CodeFetch for CodeSlice<'_> {
    fn fetch(&self, addr: u32, size: u32) -> Option<u32> {
        let start = addr.checked_sub(self.base)? as usize;
        let b = self.bytes.get(start..start + size as usize)?;
        Some(b.iter().rev().fold(0, |acc, &x| acc << 8 | x as u32))
    }
}

/// Per-TB translation state.
pub struct ArmDisasContext<'a> {
    pub base: DisasContextBase,
    code: &'a dyn CodeFetch,
    cfg: &'a ArmCpuConfig,
    cpregs: &'a CpRegTable,
    /// Translation flags of the TB.
    tb: TbFlags,
    cflags: u32,

    env: TempIdx,
    regs: [TempIdx; 16],
    /// Carry as 0 or 1.
    cf: TempIdx,
    /// N in bit 31.
    nf: TempIdx,
    /// V in bit 31.
    vf: TempIdx,
    /// Zero iff Z is set.
    zf: TempIdx,
    exclusive_addr: TempIdx,
    exclusive_val: TempIdx,

    /// IT block state: current condition and the remaining mask,
    /// shifted left by one.
    condexec_cond: u32,
    condexec_mask: u32,
    pstate_ss: bool,
    pc_curr: u32,
    page_start: u32,
    insn: u32,
    /// A conditional instruction branched to `condlabel` when its
    /// condition failed.
    condjmp: bool,
    condlabel: u32,
    /// Immediate of a pending SVC/HVC.
    svc_imm: u32,
    /// The instruction is a load-exclusive (reported in the
    /// software-step syndrome).
    is_ldex: bool,
}

impl<'a> ArmDisasContext<'a> {
    pub fn new(
        code: &'a dyn CodeFetch,
        cfg: &'a ArmCpuConfig,
        cpregs: &'a CpRegTable,
        pc: u32,
        flags: u64,
        cflags: u32,
    ) -> Self {
        let tb = TbFlags::unpack(flags);
        Self {
            base: DisasContextBase::new(pc as u64, cfg.max_insns.clamp(1, TB_MAX_INSNS)),
            code,
            cfg,
            cpregs,
            tb,
            cflags,
            env: TempIdx(0),
            regs: [TempIdx(0); 16],
            cf: TempIdx(0),
            nf: TempIdx(0),
            vf: TempIdx(0),
            zf: TempIdx(0),
            exclusive_addr: TempIdx(0),
            exclusive_val: TempIdx(0),
            condexec_cond: (tb.condexec >> 4) as u32,
            condexec_mask: ((tb.condexec & 0xf) << 1) as u32,
            pstate_ss: tb.pstate_ss,
            pc_curr: pc,
            page_start: pc & TARGET_PAGE_MASK,
            insn: 0,
            condjmp: false,
            condlabel: 0,
            svc_imm: 0,
            is_ldex: false,
        }
    }

    fn has(&self, f: ArmFeature) -> bool {
        self.cfg.features.contains(f)
    }

    fn is_m(&self) -> bool {
        self.has(ArmFeature::M)
    }

    /// Executing at EL0.
    fn is_user(&self) -> bool {
        self.tb.current_el == 0
    }

    fn pc_next(&self) -> u32 {
        self.base.pc_next as u32
    }

    /// Length in bytes of the instruction being translated.
    fn curr_insn_len(&self) -> u32 {
        self.pc_next().wrapping_sub(self.pc_curr)
    }

    // -- Code fetch --

    /// User-only BE32 images store code big-endian; under system
    /// emulation BE32 code words are fetched as-is.
    fn bswap_code(&self) -> bool {
        self.tb.sctlr_b && self.cfg.user_only
    }

    fn ldl_code(&self, addr: u32) -> Option<u32> {
        let insn = self.code.fetch(addr, 4)?;
        Some(if self.bswap_code() { insn.swap_bytes() } else { insn })
    }

    fn lduw_code(&self, addr: u32) -> Option<u32> {
        // BE32 swaps adjacent Thumb halfwords within each word.
        let addr = if self.tb.sctlr_b && !self.cfg.user_only {
            addr ^ 2
        } else {
            addr
        };
        let insn = self.code.fetch(addr, 2)?;
        Some(if self.bswap_code() {
            (insn as u16).swap_bytes() as u32
        } else {
            insn
        })
    }

    fn thumb_insn_is_16bit(&self, pc: u32, insn: u32) -> bool {
        if (insn >> 11) < 0x1d {
            return true;
        }
        if self.has(ArmFeature::THUMB2) || self.is_m() {
            return false;
        }
        // Thumb-1 BL/BLX prefix: merge with its suffix unless the
        // suffix sits on the next page.
        !((insn >> 11) == 0x1e && pc - self.page_start < TARGET_PAGE_SIZE - 3)
    }

    fn thumb_insn_is_unconditional(&self, insn: u32) -> bool {
        // BKPT
        if insn & 0xffff_ff00 == 0xbe00 {
            return true;
        }
        // HLT
        insn & 0xffff_ffc0 == 0xba80 && self.has(ArmFeature::V8) && !self.is_m()
    }

    fn insn_crosses_page(&self) -> bool {
        match self.lduw_code(self.pc_next()) {
            Some(insn) => !self.thumb_insn_is_16bit(self.pc_next(), insn),
            None => false,
        }
    }

    /// The instruction at `pc` could not be fetched.
    fn fetch_failed(&mut self, ir: &mut Context, pc: u32) {
        if self.base.num_insns == 1 {
            let el = self.default_exception_el();
            self.gen_exception_insn_el(
                ir,
                pc,
                EXCP_PREFETCH_ABORT,
                syn_insn_abort(false, FSC_EXTERNAL),
                el,
            );
        } else {
            // Let the next TB start at the faulting instruction.
            self.base.is_jmp = DisasJumpType::TooMany;
        }
    }

    // -- Per-instruction checks --

    fn check_ss_active(&mut self, ir: &mut Context) -> bool {
        if self.tb.ss_active && !self.pstate_ss {
            // Active-pending: step exception before executing.
            debug_assert_eq!(self.base.num_insns, 1);
            self.gen_swstep_exception(ir, false, false);
            self.base.is_jmp = DisasJumpType::NoReturn;
            return true;
        }
        false
    }

    fn check_kernelpage(&mut self, ir: &mut Context) -> bool {
        if self.cfg.user_only && self.pc_next() >= 0xffff_0000 {
            let pc = self.pc_next();
            self.gen_exception_internal_insn(ir, pc, EXCP_KERNEL_TRAP);
            return true;
        }
        false
    }

    fn disas_arm_insn(&mut self, ir: &mut Context, insn: u32) {
        use super::decode::{a32, a32_uncond};
        use super::neon_decode::{neon_dp, neon_ls};
        use super::vfp_decode::{vfp, vfp_uncond};

        let cond = insn >> 28;
        if self.is_m() {
            let pc = self.pc_curr;
            self.gen_exception_insn(ir, pc, EXCP_INVSTATE, syn_uncategorized());
            return;
        }
        if self.tb.illegal {
            let pc = self.pc_curr;
            self.gen_exception_insn(ir, pc, EXCP_UDEF, syn_illegalstate());
            return;
        }
        if cond == 0xf {
            // NV is UNPREDICTABLE before v5.
            if !self.has(ArmFeature::V5) {
                self.unallocated_encoding(ir);
                return;
            }
            if a32_uncond::decode(self, ir, insn)
                || vfp_uncond::decode(self, ir, insn)
                || neon_dp::decode(self, ir, insn)
                || neon_ls::decode(self, ir, insn)
            {
                return;
            }
            self.unallocated_encoding(ir);
            return;
        }
        if cond != 0xe {
            self.skip_unless(ir, cond);
        }
        if a32::decode(self, ir, insn) || vfp::decode(self, ir, insn) {
            return;
        }
        self.unallocated_encoding(ir);
    }

    fn disas_thumb_insn(&mut self, ir: &mut Context, insn: u32) {
        if !super::decode::t16::decode(self, ir, insn as u16) {
            self.unallocated_encoding(ir);
        }
    }

    fn disas_thumb2_insn(&mut self, ir: &mut Context, insn: u32) {
        use super::decode::t32;
        use super::neon_decode::{neon_dp, neon_ls};
        use super::vfp_decode::{vfp, vfp_uncond};

        // v6-M only has the BL, MSR, MRS and barrier 32-bit encodings.
        if self.is_m() && !self.has(ArmFeature::V7) {
            const V6M_INSNS: [(u32, u32); 6] = [
                (0xf800_d000, 0xf000_d000), // BL
                (0xfff0_d0ff, 0xf380_8000), // MSR
                (0xffff_d000, 0xf3ef_8000), // MRS
                (0xffff_ff0f, 0xf3bf_8f40), // DSB
                (0xffff_ff0f, 0xf3bf_8f50), // DMB
                (0xffff_ff0f, 0xf3bf_8f60), // ISB
            ];
            if !V6M_INSNS.iter().any(|&(mask, val)| insn & mask == val) {
                self.unallocated_encoding(ir);
                return;
            }
        } else if !self.has(ArmFeature::THUMB2) && insn & 0xf800_e800 != 0xf000_e800 {
            // Thumb-1 only merges the BL/BLX pair.
            self.unallocated_encoding(ir);
            return;
        }

        // 0b111p_1111_qqqq... is the A32 encoding 0b1111_001p_qqqq...
        if insn & 0xef00_0000 == 0xef00_0000 {
            let a32_insn = (insn & 0xe2ff_ffff) | ((insn & (1 << 28)) >> 4) | (1 << 28);
            if neon_dp::decode(self, ir, a32_insn) {
                return;
            }
        }
        if insn & 0xff10_0000 == 0xf900_0000 {
            let a32_insn = (insn & 0x00ff_ffff) | 0xf400_0000;
            if neon_ls::decode(self, ir, a32_insn) {
                return;
            }
        }
        if t32::decode(self, ir, insn)
            || vfp_uncond::decode(self, ir, insn)
            || ((insn >> 28) == 0xe && vfp::decode(self, ir, insn))
        {
            return;
        }
        self.unallocated_encoding(ir);
    }

    /// Close the skip label of a conditional instruction that fell
    /// through.
    fn post_translate_insn(&mut self, ir: &mut Context) {
        if self.condjmp && self.base.is_jmp == DisasJumpType::Next {
            ir.gen_set_label(self.condlabel);
            self.condjmp = false;
        }
    }

    fn arm_translate_insn(&mut self, ir: &mut Context) {
        let pc = self.pc_next();
        self.pc_curr = pc;
        if self.check_ss_active(ir) || self.check_kernelpage(ir) {
            self.base.pc_next = pc.wrapping_add(4) as u64;
            return;
        }
        if pc & 3 != 0 {
            // The only way to get here is a misaligned branch target
            // with the exception taken before the first instruction.
            self.gen_update_pc(ir, pc);
            let pc_c = ir.new_const(Type::I32, pc as u64);
            self.call_void(ir, super::helper::Helper::ExceptionPcAlignment, &[pc_c]);
            self.base.is_jmp = DisasJumpType::NoReturn;
            self.base.pc_next = ((pc + 3) & !3) as u64;
            return;
        }
        let Some(insn) = self.ldl_code(pc) else {
            self.fetch_failed(ir, pc);
            return;
        };
        self.insn = insn;
        self.base.pc_next = pc.wrapping_add(4) as u64;
        self.disas_arm_insn(ir, insn);
        self.post_translate_insn(ir);
    }

    fn thumb_translate_insn(&mut self, ir: &mut Context) {
        let mut pc = self.pc_next();
        if self.check_ss_active(ir) || self.check_kernelpage(ir) {
            self.base.pc_next = pc.wrapping_add(2) as u64;
            return;
        }
        self.pc_curr = pc;
        let Some(mut insn) = self.lduw_code(pc) else {
            self.fetch_failed(ir, pc);
            return;
        };
        let is_16bit = self.thumb_insn_is_16bit(pc, insn);
        pc = pc.wrapping_add(2);
        if !is_16bit {
            let Some(insn2) = self.lduw_code(pc) else {
                self.fetch_failed(ir, self.pc_curr);
                return;
            };
            insn = insn << 16 | insn2;
            pc = pc.wrapping_add(2);
        }
        self.base.pc_next = pc as u64;
        self.insn = insn;

        if self.tb.illegal {
            let pc = self.pc_curr;
            self.gen_exception_insn(ir, pc, EXCP_UDEF, syn_illegalstate());
            return;
        }

        if self.condexec_mask != 0 && !self.thumb_insn_is_unconditional(insn) {
            // 0xe and 0xf both mean "always".
            let cond = self.condexec_cond;
            if cond < 0xe {
                self.skip_unless(ir, cond);
            }
        }

        if is_16bit {
            self.disas_thumb_insn(ir, insn);
        } else {
            self.disas_thumb2_insn(ir, insn);
        }

        if self.condexec_mask != 0 {
            (self.condexec_cond, self.condexec_mask) =
                advance_it(self.condexec_cond, self.condexec_mask);
        }

        self.post_translate_insn(ir);

        // Stop before an instruction that would start on, or cross
        // into, the next page.
        if self.base.is_jmp == DisasJumpType::Next {
            let used = self.pc_next().wrapping_sub(self.page_start);
            if used >= TARGET_PAGE_SIZE
                || (used >= TARGET_PAGE_SIZE - 3 && self.insn_crosses_page())
            {
                self.base.is_jmp = DisasJumpType::TooMany;
            }
        }
    }
}

/// Advance the IT state by one instruction: the next condition takes
/// its low bit from the top of the mask, and the block ends when the
/// mask runs out.
pub fn advance_it(cond: u32, mask: u32) -> (u32, u32) {
    let cond = (cond & 0xe) | ((mask >> 4) & 1);
    let mask = (mask << 1) & 0x1f;
    if mask == 0 {
        (0, 0)
    } else {
        (cond, mask)
    }
}

/// The global at env `offset`, registering it on first use.
fn global(ir: &mut Context, env: TempIdx, ty: Type, offset: i64, name: &'static str) -> TempIdx {
    match ir.find_global(offset) {
        Some(t) => t,
        None => ir.new_global(ty, env, offset, name),
    }
}

/// Marker type for the AArch32 translator.
pub struct ArmTranslator<'a>(std::marker::PhantomData<&'a ()>);

impl<'a> TranslatorOps for ArmTranslator<'a> {
    type DisasContext = ArmDisasContext<'a>;

    fn init_disas_context(ctx: &mut ArmDisasContext<'a>, ir: &mut Context) {
        // A reused context keeps the globals of earlier blocks.
        ctx.env = if ir.nb_globals() > 0 {
            TempIdx(0)
        } else {
            ir.new_fixed(Type::I64, "env")
        };
        let env = ctx.env;
        for (i, name) in REG_NAMES.iter().enumerate() {
            ctx.regs[i] = global(ir, env, Type::I32, reg_offset(i), name);
        }
        ctx.cf = global(ir, env, Type::I32, CF_OFFSET, "CF");
        ctx.nf = global(ir, env, Type::I32, NF_OFFSET, "NF");
        ctx.vf = global(ir, env, Type::I32, VF_OFFSET, "VF");
        ctx.zf = global(ir, env, Type::I32, ZF_OFFSET, "ZF");
        ctx.exclusive_addr = global(ir, env, Type::I64, EXCLUSIVE_ADDR_OFFSET, "exclusive_addr");
        ctx.exclusive_val = global(ir, env, Type::I64, EXCLUSIVE_VAL_OFFSET, "exclusive_val");

        let mut max = ctx.base.max_insns;
        let count = ctx.cflags & CF_COUNT_MASK;
        if count != 0 {
            max = max.min(count);
        }
        if ctx.tb.ss_active || ctx.cflags & CF_SINGLE_STEP != 0 {
            max = 1;
        }
        // A32 instructions never cross a page: bound by what is left
        // of it.
        if !ctx.tb.thumb {
            let left = (TARGET_PAGE_SIZE - (ctx.pc_curr & !TARGET_PAGE_MASK)) / 4;
            max = max.min(left.max(1));
        }
        ctx.base.max_insns = max;
    }

    fn tb_start(ctx: &mut ArmDisasContext<'a>, ir: &mut Context) {
        // The IT bits live in the translator from here on; clear the
        // env copy so an exception mid-block sees them restored from
        // the insn_start data instead.
        if ctx.condexec_mask != 0 || ctx.condexec_cond != 0 {
            ctx.store_cpu_field_constant(ir, 0, super::cpu::CONDEXEC_OFFSET);
        }
        if ctx.cflags & CF_USE_ICOUNT != 0 {
            ctx.store_cpu_field_constant(ir, 0, super::cpu::CAN_DO_IO_OFFSET);
        }
    }

    fn insn_start(ctx: &mut ArmDisasContext<'a>, ir: &mut Context) {
        let condexec_bits = (ctx.condexec_cond << 4) | (ctx.condexec_mask >> 1);
        ir.gen_insn_start(ctx.pc_next(), condexec_bits, 0);
        ctx.base.num_insns += 1;
        ctx.is_ldex = false;
        // A block retranslated to end on an I/O access may do I/O in
        // its last instruction.
        if ctx.base.num_insns == ctx.base.max_insns && ctx.cflags & CF_LAST_IO != 0 {
            ctx.store_cpu_field_constant(ir, 1, super::cpu::CAN_DO_IO_OFFSET);
        }
    }

    fn translate_insn(ctx: &mut ArmDisasContext<'a>, ir: &mut Context) {
        if ctx.tb.thumb {
            ctx.thumb_translate_insn(ir);
        } else {
            ctx.arm_translate_insn(ir);
        }
    }

    fn tb_stop(ctx: &mut ArmDisasContext<'a>, ir: &mut Context) {
        ctx.tb_stop(ir);
    }

    fn base(ctx: &Self::DisasContext) -> &DisasContextBase {
        &ctx.base
    }

    fn base_mut(ctx: &mut Self::DisasContext) -> &mut DisasContextBase {
        &mut ctx.base
    }
}

/// Translate the block at `pc` under `flags` (a packed [`TbFlags`])
/// into `ir`, which must be empty. Returns the number of guest bytes
/// the block covers.
pub fn gen_intermediate_code(
    ir: &mut Context,
    code: &dyn CodeFetch,
    cfg: &ArmCpuConfig,
    cpregs: &CpRegTable,
    pc: u32,
    flags: u64,
    cflags: u32,
) -> u32 {
    let mut ctx = ArmDisasContext::new(code, cfg, cpregs, pc, flags, cflags);
    translator_loop::<ArmTranslator>(&mut ctx, ir);
    log::debug!(
        "translated {} insns at {pc:#x} ({})",
        ctx.base.num_insns,
        if ctx.tb.thumb { "T32" } else { "A32" }
    );
    ctx.pc_next().wrapping_sub(pc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_state_advances_and_terminates() {
        // ITTE EQ: firstcond = 0000, mask = 0110 (cond_mask 0x06).
        let cond_mask = 0x06u32;
        let (cond, mask) = ((cond_mask >> 4) & 0xe, cond_mask & 0x1f);
        // The IT instruction itself advances once.
        let (cond, mask) = advance_it(cond, mask);
        assert_eq!((cond, mask), (0x0, 0x0c));
        let (cond, mask) = advance_it(cond, mask);
        assert_eq!((cond, mask), (0x0, 0x18));
        let (cond, mask) = advance_it(cond, mask);
        assert_eq!((cond, mask), (0x1, 0x10));
        assert_eq!(advance_it(cond, mask), (0, 0));
    }

    #[test]
    fn code_slice_reads_little_endian() {
        let bytes = [0x01, 0x00, 0x80, 0xe2, 0x34, 0x12];
        let code = CodeSlice::new(0x1000, &bytes);
        assert_eq!(code.fetch(0x1000, 4), Some(0xe280_0001));
        assert_eq!(code.fetch(0x1004, 2), Some(0x1234));
        assert_eq!(code.fetch(0x1004, 4), None);
        assert_eq!(code.fetch(0xfff, 2), None);
    }
}
