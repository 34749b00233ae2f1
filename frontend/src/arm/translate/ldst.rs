//! Loads and stores: single, doubleword, block, exclusive,
//! acquire/release, swap and table branches.

use tcg_core::{bar, Cond, Context, MemOp, TempIdx, Type};

use super::emit::{ISS_INVALID, ISS_IS_16BIT, ISS_IS_ACQ_REL, ISS_IS_WRITE};
use super::ArmDisasContext;
use crate::arm::config::ArmFeature;
use crate::arm::cpu::{
    MODE_ABT, MODE_FIQ, MODE_HYP, MODE_IRQ, MODE_MON, MODE_SVC, MODE_SYS, MODE_UND, MODE_USR,
    SPSR_OFFSET,
};
use crate::arm::decode::{
    ArgsLdrex, ArgsLdstBlock, ArgsLdstRi, ArgsLdstRi2, ArgsLdstRr, ArgsRfe, ArgsRrr, ArgsSrs,
    ArgsStrex, ArgsTbranch,
};
use crate::arm::helper::Helper;
use crate::arm::syndrome::{syn_uncategorized, EXCP_UDEF};
use crate::DisasJumpType;

/// Immediate-offset addressing shared by the single and dual forms.
#[derive(Debug, Clone, Copy)]
struct RiAddr {
    p: bool,
    w: bool,
    u: bool,
    rn: i64,
    imm: i64,
}

impl From<&ArgsLdstRi> for RiAddr {
    fn from(a: &ArgsLdstRi) -> Self {
        RiAddr { p: a.p != 0, w: a.w != 0, u: a.u != 0, rn: a.rn, imm: a.imm }
    }
}

impl From<&ArgsLdstRi2> for RiAddr {
    fn from(a: &ArgsLdstRi2) -> Self {
        RiAddr { p: a.p != 0, w: a.w != 0, u: a.u != 0, rn: a.rn, imm: a.imm }
    }
}

/// Block-transfer start offsets and writeback adjustments, indexed
/// by the P:U mode (DA, IA, DB, IB).
const RFE_PRE: [i32; 4] = [-4, 0, -8, 4];
const RFE_POST: [i32; 4] = [-8, 4, -4, 0];

impl ArmDisasContext<'_> {
    fn make_issinfo(&self, rt: i64, p: bool, w: bool) -> u32 {
        // Writeback forms carry no syndrome.
        if p && !w {
            let mut iss = rt as u32;
            if self.curr_insn_len() == 2 {
                iss |= ISS_IS_16BIT;
            }
            iss
        } else {
            ISS_INVALID
        }
    }

    fn gen_rr_offset(&self, ir: &mut Context, addr: TempIdx, a: &ArgsLdstRr) {
        let ofs = self.load_reg(ir, a.rm);
        self.gen_arm_shift_im(ir, ofs, a.shtype as u32, a.shimm as u32, false);
        if a.u != 0 {
            ir.gen_add(Type::I32, addr, addr, ofs);
        } else {
            ir.gen_sub(Type::I32, addr, addr, ofs);
        }
    }

    fn op_addr_rr_pre(&self, ir: &mut Context, a: &ArgsLdstRr) -> TempIdx {
        let addr = self.load_reg(ir, a.rn);
        if a.p != 0 {
            self.gen_rr_offset(ir, addr, a);
        }
        addr
    }

    fn op_addr_rr_post(&mut self, ir: &mut Context, a: &ArgsLdstRr, addr: TempIdx) {
        if a.p == 0 {
            self.gen_rr_offset(ir, addr, a);
        } else if a.w == 0 {
            return;
        }
        self.store_reg(ir, a.rn, addr);
    }

    fn op_addr_ri_pre(&self, ir: &mut Context, a: RiAddr) -> TempIdx {
        let ofs = if a.u { a.imm } else { -a.imm };
        self.add_reg_for_lit(ir, a.rn, if a.p { ofs as i32 } else { 0 })
    }

    fn op_addr_ri_post(&mut self, ir: &mut Context, a: RiAddr, addr: TempIdx) {
        let ofs = if !a.p {
            if a.u {
                a.imm
            } else {
                -a.imm
            }
        } else if !a.w {
            return;
        } else {
            0
        };
        ir.gen_addi(Type::I32, addr, addr, ofs as u64);
        self.store_reg(ir, a.rn, addr);
    }

    pub(super) fn op_load_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr, mop: MemOp, user: bool) -> bool {
        let iss = self.make_issinfo(a.rt, a.p != 0, a.w != 0);
        let mem_idx = self.ldst_mem_index(user);
        let addr = self.op_addr_rr_pre(ir, a);
        let tmp = ir.new_temp(Type::I32);
        self.gen_aa32_ld_i32(ir, tmp, addr, mem_idx, mop);
        self.disas_set_da_iss(ir, mop, iss);
        // Writeback before the loaded value so that rt == rn loads win.
        self.op_addr_rr_post(ir, a, addr);
        self.store_reg_from_load(ir, a.rt, tmp);
        true
    }

    pub(super) fn op_store_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr, mop: MemOp, user: bool) -> bool {
        if self.tb.thumb && a.rn == 15 {
            return false;
        }
        let iss = self.make_issinfo(a.rt, a.p != 0, a.w != 0) | ISS_IS_WRITE;
        let mem_idx = self.ldst_mem_index(user);
        let addr = self.op_addr_rr_pre(ir, a);
        let tmp = self.load_reg(ir, a.rt);
        self.gen_aa32_st_i32(ir, tmp, addr, mem_idx, mop);
        self.disas_set_da_iss(ir, mop, iss);
        self.op_addr_rr_post(ir, a, addr);
        true
    }

    pub(super) fn op_load_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi, mop: MemOp, user: bool) -> bool {
        let iss = self.make_issinfo(a.rt, a.p != 0, a.w != 0);
        let mem_idx = self.ldst_mem_index(user);
        let addr = self.op_addr_ri_pre(ir, a.into());
        let tmp = ir.new_temp(Type::I32);
        self.gen_aa32_ld_i32(ir, tmp, addr, mem_idx, mop);
        self.disas_set_da_iss(ir, mop, iss);
        self.op_addr_ri_post(ir, a.into(), addr);
        self.store_reg_from_load(ir, a.rt, tmp);
        true
    }

    pub(super) fn op_store_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi, mop: MemOp, user: bool) -> bool {
        if self.tb.thumb && a.rn == 15 {
            return false;
        }
        let iss = self.make_issinfo(a.rt, a.p != 0, a.w != 0) | ISS_IS_WRITE;
        let mem_idx = self.ldst_mem_index(user);
        let addr = self.op_addr_ri_pre(ir, a.into());
        let tmp = self.load_reg(ir, a.rt);
        self.gen_aa32_st_i32(ir, tmp, addr, mem_idx, mop);
        self.disas_set_da_iss(ir, mop, iss);
        self.op_addr_ri_post(ir, a.into(), addr);
        true
    }

    fn ldst_mem_index(&self, user: bool) -> u32 {
        if user {
            self.get_a32_user_mem_index()
        } else {
            self.get_mem_index()
        }
    }

    // -- Doubleword --

    /// One 64-bit access. `rt` always takes the word at the lower
    /// address, whatever the data endianness.
    fn do_ldrd_load(&mut self, ir: &mut Context, addr: TempIdx, rt: i64, rt2: i64) {
        let op = self.finalize_memop(MemOp::uq().with(MemOp::ALIGN_4));
        let taddr = self.gen_aa32_addr(ir, addr, op);
        let t64 = ir.new_temp(Type::I64);
        let lo = ir.new_temp(Type::I32);
        let hi = ir.new_temp(Type::I32);
        ir.gen_qemu_ld(Type::I64, t64, taddr, op, self.get_mem_index());
        if self.tb.be_data {
            ir.gen_extr_i64_i32(hi, lo, t64);
        } else {
            ir.gen_extr_i64_i32(lo, hi, t64);
        }
        self.store_reg(ir, rt, lo);
        self.store_reg(ir, rt2, hi);
    }

    fn do_ldrd_store(&self, ir: &mut Context, addr: TempIdx, rt: i64, rt2: i64) {
        let op = self.finalize_memop(MemOp::uq().with(MemOp::ALIGN_4));
        let taddr = self.gen_aa32_addr(ir, addr, op);
        let t1 = self.load_reg(ir, rt);
        let t2 = self.load_reg(ir, rt2);
        let n64 = ir.new_temp(Type::I64);
        if self.tb.be_data {
            ir.gen_concat_i32_i64(n64, t2, t1);
        } else {
            ir.gen_concat_i32_i64(n64, t1, t2);
        }
        ir.gen_qemu_st(Type::I64, n64, taddr, op, self.get_mem_index());
    }

    fn ldrd_ok(&self) -> bool {
        self.has(ArmFeature::V5)
    }

    pub(super) fn op_ldrd_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr, store: bool) -> bool {
        if !self.ldrd_ok() {
            return false;
        }
        if a.rt & 1 != 0 {
            self.unallocated_encoding(ir);
            return true;
        }
        let addr = self.op_addr_rr_pre(ir, a);
        if store {
            self.do_ldrd_store(ir, addr, a.rt, a.rt + 1);
        } else {
            self.do_ldrd_load(ir, addr, a.rt, a.rt + 1);
        }
        self.op_addr_rr_post(ir, a, addr);
        true
    }

    pub(super) fn op_ldrd_ri_a32(&mut self, ir: &mut Context, a: &ArgsLdstRi, store: bool) -> bool {
        if !self.ldrd_ok() {
            return false;
        }
        if a.rt & 1 != 0 {
            self.unallocated_encoding(ir);
            return true;
        }
        self.do_ldrd_ri(ir, a.into(), a.rt, a.rt + 1, store)
    }

    pub(super) fn op_ldrd_ri_t32(&mut self, ir: &mut Context, a: &ArgsLdstRi2, store: bool) -> bool {
        self.do_ldrd_ri(ir, a.into(), a.rt, a.rt2, store)
    }

    fn do_ldrd_ri(&mut self, ir: &mut Context, ad: RiAddr, rt: i64, rt2: i64, store: bool) -> bool {
        let addr = self.op_addr_ri_pre(ir, ad);
        if store {
            self.do_ldrd_store(ir, addr, rt, rt2);
        } else {
            self.do_ldrd_load(ir, addr, rt, rt2);
        }
        self.op_addr_ri_post(ir, ad, addr);
        true
    }

    // -- Exclusives --

    fn gen_load_exclusive(&mut self, ir: &mut Context, rt: i64, rt2: i64, addr: TempIdx, size: u16) {
        let op = self.finalize_memop(MemOp::from_size(size as u32).with(MemOp::ALIGN));
        self.is_ldex = true;
        let tmp = ir.new_temp(Type::I32);
        if size == MemOp::SIZE_64 {
            // Rt is the lower-addressed word, as for LDRD.
            let taddr = self.gen_aa32_addr(ir, addr, op);
            let t64 = ir.new_temp(Type::I64);
            let tmp2 = ir.new_temp(Type::I32);
            ir.gen_qemu_ld(Type::I64, t64, taddr, op, self.get_mem_index());
            ir.gen_mov(Type::I64, self.exclusive_val, t64);
            if self.tb.be_data {
                ir.gen_extr_i64_i32(tmp2, tmp, t64);
            } else {
                ir.gen_extr_i64_i32(tmp, tmp2, t64);
            }
            self.store_reg(ir, rt2, tmp2);
        } else {
            self.gen_aa32_ld_i32(ir, tmp, addr, self.get_mem_index(), op);
            ir.gen_ext_u32_i64(self.exclusive_val, tmp);
        }
        self.store_reg(ir, rt, tmp);
        ir.gen_ext_u32_i64(self.exclusive_addr, addr);
    }

    /// Store only when the monitor still holds `addr` and memory still
    /// holds the loaded value; `rd` gets 0 on success, 1 otherwise.
    fn gen_store_exclusive(
        &mut self,
        ir: &mut Context,
        rd: i64,
        rt: i64,
        rt2: i64,
        addr: TempIdx,
        size: u16,
    ) {
        let op = self.finalize_memop(MemOp::from_size(size as u32).with(MemOp::ALIGN));
        let fail = ir.new_label();
        let done = ir.new_label();
        let extaddr = ir.new_temp(Type::I64);
        ir.gen_ext_u32_i64(extaddr, addr);
        ir.gen_brcond(Type::I64, extaddr, self.exclusive_addr, Cond::Ne, fail);

        let taddr = self.gen_aa32_addr(ir, addr, op);
        let mem_idx = self.get_mem_index();
        let t0 = ir.new_temp(Type::I32);
        let t1 = self.load_reg(ir, rt);
        if size == MemOp::SIZE_64 {
            let t2 = self.load_reg(ir, rt2);
            let n64 = ir.new_temp(Type::I64);
            let o64 = ir.new_temp(Type::I64);
            if self.tb.be_data {
                ir.gen_concat_i32_i64(n64, t2, t1);
            } else {
                ir.gen_concat_i32_i64(n64, t1, t2);
            }
            ir.gen_atomic_cmpxchg(Type::I64, o64, taddr, self.exclusive_val, n64, op, mem_idx);
            ir.gen_setcond(Type::I64, o64, o64, self.exclusive_val, Cond::Ne);
            ir.gen_extrl_i64_i32(t0, o64);
        } else {
            let t2 = ir.new_temp(Type::I32);
            ir.gen_extrl_i64_i32(t2, self.exclusive_val);
            ir.gen_atomic_cmpxchg(Type::I32, t0, taddr, t2, t1, op, mem_idx);
            ir.gen_setcond(Type::I32, t0, t0, t2, Cond::Ne);
        }
        ir.gen_mov(Type::I32, self.regs[rd as usize], t0);
        ir.gen_br(done);

        ir.gen_set_label(fail);
        ir.gen_movi(Type::I32, self.regs[rd as usize], 1);
        ir.gen_set_label(done);
        ir.gen_movi(Type::I64, self.exclusive_addr, u64::MAX);
    }

    pub(super) fn gen_clrex(&self, ir: &mut Context) {
        ir.gen_movi(Type::I64, self.exclusive_addr, u64::MAX);
    }

    /// v8-A made a few SP operand cases predictable; v8-M did not.
    fn v8a(&self) -> bool {
        self.has(ArmFeature::V8) && !self.is_m()
    }

    pub(super) fn op_strex(&mut self, ir: &mut Context, a: &ArgsStrex, size: u16, rel: bool) -> bool {
        let v8a = self.v8a();
        let thumb = self.tb.thumb;
        let dual = size == MemOp::SIZE_64;
        if a.rd == 15
            || a.rn == 15
            || a.rt == 15
            || a.rd == a.rn
            || a.rd == a.rt
            || (!v8a && thumb && (a.rd == 13 || a.rt == 13))
            || (dual && (a.rt2 == 15 || a.rd == a.rt2 || (!v8a && thumb && a.rt2 == 13)))
        {
            self.unallocated_encoding(ir);
            return true;
        }
        if rel {
            ir.gen_mb(bar::MO_ALL | bar::STRL);
        }
        let addr = ir.new_temp(Type::I32);
        self.load_reg_var(ir, addr, a.rn);
        ir.gen_addi(Type::I32, addr, addr, a.imm as u64);
        self.gen_store_exclusive(ir, a.rd, a.rt, a.rt2, addr, size);
        true
    }

    /// STREXD/STLEXD in A32: the pair is Rt, Rt+1 with even Rt.
    pub(super) fn op_strexd_a32(&mut self, ir: &mut Context, a: &ArgsStrex, rel: bool) -> bool {
        if a.rt & 1 != 0 {
            self.unallocated_encoding(ir);
            return true;
        }
        let a = ArgsStrex { rt2: a.rt + 1, ..*a };
        self.op_strex(ir, &a, MemOp::SIZE_64, rel)
    }

    pub(super) fn op_ldrex(&mut self, ir: &mut Context, a: &ArgsLdrex, size: u16, acq: bool) -> bool {
        let v8a = self.v8a();
        let thumb = self.tb.thumb;
        if a.rn == 15
            || a.rt == 15
            || (!v8a && thumb && a.rt == 13)
            || (size == MemOp::SIZE_64
                && (a.rt2 == 15 || a.rt == a.rt2 || (!v8a && thumb && a.rt2 == 13)))
        {
            self.unallocated_encoding(ir);
            return true;
        }
        let addr = ir.new_temp(Type::I32);
        self.load_reg_var(ir, addr, a.rn);
        ir.gen_addi(Type::I32, addr, addr, a.imm as u64);
        self.gen_load_exclusive(ir, a.rt, a.rt2, addr, size);
        if acq {
            ir.gen_mb(bar::MO_ALL | bar::LDAQ);
        }
        true
    }

    pub(super) fn op_ldrexd_a32(&mut self, ir: &mut Context, a: &ArgsLdrex, acq: bool) -> bool {
        if a.rt & 1 != 0 {
            self.unallocated_encoding(ir);
            return true;
        }
        let a = ArgsLdrex { rt2: a.rt + 1, ..*a };
        self.op_ldrex(ir, &a, MemOp::SIZE_64, acq)
    }

    pub(super) fn op_stl(&mut self, ir: &mut Context, a: &ArgsLdrex, mop: MemOp) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        if a.rn == 15 || a.rt == 15 {
            self.unallocated_encoding(ir);
            return true;
        }
        let addr = self.load_reg(ir, a.rn);
        let tmp = self.load_reg(ir, a.rt);
        ir.gen_mb(bar::MO_ALL | bar::STRL);
        let mop = mop.with(MemOp::ALIGN);
        self.gen_aa32_st_i32(ir, tmp, addr, self.get_mem_index(), mop);
        self.disas_set_da_iss(ir, mop, a.rt as u32 | ISS_IS_ACQ_REL | ISS_IS_WRITE);
        true
    }

    pub(super) fn op_lda(&mut self, ir: &mut Context, a: &ArgsLdrex, mop: MemOp) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        if a.rn == 15 || a.rt == 15 {
            self.unallocated_encoding(ir);
            return true;
        }
        let addr = self.load_reg(ir, a.rn);
        let tmp = ir.new_temp(Type::I32);
        let mop = mop.with(MemOp::ALIGN);
        self.gen_aa32_ld_i32(ir, tmp, addr, self.get_mem_index(), mop);
        self.disas_set_da_iss(ir, mop, a.rt as u32 | ISS_IS_ACQ_REL);
        self.store_reg(ir, a.rt, tmp);
        ir.gen_mb(bar::MO_ALL | bar::LDAQ);
        true
    }

    /// SWP/SWPB: `rd` gets the old memory word, `rm` is stored.
    pub(super) fn op_swp(&mut self, ir: &mut Context, a: &ArgsRrr, mop: MemOp) -> bool {
        let op = self.finalize_memop(mop);
        let addr = self.load_reg(ir, a.rn);
        let taddr = self.gen_aa32_addr(ir, addr, op);
        let tmp = self.load_reg(ir, a.rm);
        ir.gen_atomic_xchg(Type::I32, tmp, taddr, tmp, op, self.get_mem_index());
        self.store_reg(ir, a.rd, tmp);
        true
    }

    // -- Block transfers --

    fn op_addr_block_pre(&self, ir: &mut Context, a: &ArgsLdstBlock, n: i64) -> TempIdx {
        let addr = self.load_reg(ir, a.rn);
        if a.b != 0 {
            if a.i != 0 {
                ir.gen_addi(Type::I32, addr, addr, 4);
            } else {
                ir.gen_addi(Type::I32, addr, addr, (-(n * 4)) as u64);
            }
        } else if a.i == 0 && n != 1 {
            ir.gen_addi(Type::I32, addr, addr, (-((n - 1) * 4)) as u64);
        }
        addr
    }

    fn op_addr_block_post(&mut self, ir: &mut Context, a: &ArgsLdstBlock, addr: TempIdx, n: i64) {
        if a.w == 0 {
            return;
        }
        if a.b == 0 {
            if a.i != 0 {
                ir.gen_addi(Type::I32, addr, addr, 4);
            } else {
                ir.gen_addi(Type::I32, addr, addr, (-(n * 4)) as u64);
            }
        } else if a.i == 0 && n != 1 {
            ir.gen_addi(Type::I32, addr, addr, (-((n - 1) * 4)) as u64);
        }
        self.store_reg(ir, a.rn, addr);
    }

    /// STM. A base register in the list stores its value from before
    /// writeback.
    pub(super) fn op_stm(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        let user = a.u != 0;
        if user && self.is_user() {
            self.unallocated_encoding(ir);
            return true;
        }
        let list = a.list as u32 & 0xffff;
        let n = list.count_ones() as i64;
        if n < 1 || a.rn == 15 {
            self.unallocated_encoding(ir);
            return true;
        }
        let addr = self.op_addr_block_pre(ir, a, n);
        let mem_idx = self.get_mem_index();
        let mut j = 0;
        for i in (0..16).filter(|i| list & (1 << i) != 0) {
            let tmp = if user && i != 15 {
                let r = self.const32(ir, i as u32);
                self.call(ir, Helper::GetUserReg, &[r])
            } else {
                self.load_reg(ir, i)
            };
            self.gen_aa32_st_i32(ir, tmp, addr, mem_idx, MemOp::ul().with(MemOp::ALIGN));
            j += 1;
            if j != n {
                ir.gen_addi(Type::I32, addr, addr, 4);
            }
        }
        self.op_addr_block_post(ir, a, addr, n);
        true
    }

    pub(super) fn op_stm_t32(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        if a.w != 0 && a.list & (1 << a.rn) != 0 {
            self.unallocated_encoding(ir);
            return true;
        }
        self.op_stm(ir, a)
    }

    /// LDM, LDM (user) and LDM (exception return). A loaded base
    /// register overrides the writeback value.
    pub(super) fn op_ldm(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        let mut user = a.u != 0;
        let mut exc_return = false;
        if user {
            if self.is_user() {
                self.unallocated_encoding(ir);
                return true;
            }
            if a.list & (1 << 15) != 0 {
                exc_return = true;
                user = false;
            } else if a.w != 0 {
                self.unallocated_encoding(ir);
                return true;
            }
        }
        let list = a.list as u32 & 0xffff;
        let n = list.count_ones() as i64;
        if n < 1 || a.rn == 15 {
            self.unallocated_encoding(ir);
            return true;
        }
        let addr = self.op_addr_block_pre(ir, a, n);
        let mem_idx = self.get_mem_index();
        let mut loaded_base = None;
        let mut j = 0;
        for i in (0..16).filter(|i| list & (1 << i) != 0) {
            let tmp = ir.new_temp(Type::I32);
            self.gen_aa32_ld_i32(ir, tmp, addr, mem_idx, MemOp::ul().with(MemOp::ALIGN));
            if user {
                let r = self.const32(ir, i as u32);
                self.call_void(ir, Helper::SetUserReg, &[r, tmp]);
            } else if i == a.rn {
                loaded_base = Some(tmp);
            } else if i == 15 && exc_return {
                ir.gen_mov(Type::I32, self.regs[15], tmp);
            } else {
                self.store_reg_from_load(ir, i, tmp);
            }
            j += 1;
            if j != n {
                ir.gen_addi(Type::I32, addr, addr, 4);
            }
        }
        self.op_addr_block_post(ir, a, addr, n);
        if let Some(base) = loaded_base {
            self.store_reg(ir, a.rn, base);
        }
        if exc_return {
            let spsr = self.load_cpu_offset(ir, SPSR_OFFSET);
            self.translator_io_start(ir);
            self.call_void(ir, Helper::CpsrWriteEret, &[spsr]);
            self.base.is_jmp = DisasJumpType::Exit;
        }
        true
    }

    pub(super) fn op_ldm_a32(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        // Pre-v7 cores wrote an UNKNOWN base; later ones UNDEF.
        if self.has(ArmFeature::V7) && a.w != 0 && a.list & (1 << a.rn) != 0 {
            self.unallocated_encoding(ir);
            return true;
        }
        self.op_ldm(ir, a)
    }

    pub(super) fn op_ldm_t32(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        if a.w != 0 && a.list & (1 << a.rn) != 0 {
            self.unallocated_encoding(ir);
            return true;
        }
        self.op_ldm(ir, a)
    }

    /// Thumb-1 LDM writes back only when the base is not loaded.
    pub(super) fn op_ldm_t16(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        let a = ArgsLdstBlock { w: (a.list & (1 << a.rn) == 0) as i64, ..*a };
        self.op_ldm(ir, &a)
    }

    // -- Exception return via memory --

    pub(super) fn op_rfe(&mut self, ir: &mut Context, a: &ArgsRfe) -> bool {
        if !self.has(ArmFeature::V6) || self.is_m() {
            return false;
        }
        if self.is_user() {
            self.unallocated_encoding(ir);
            return true;
        }
        let pu = (a.pu & 3) as usize;
        let addr = self.load_reg(ir, a.rn);
        ir.gen_addi(Type::I32, addr, addr, RFE_PRE[pu] as u64);
        let mop = MemOp::ul().with(MemOp::ALIGN);
        let pc = ir.new_temp(Type::I32);
        self.gen_aa32_ld_i32(ir, pc, addr, self.get_mem_index(), mop);
        ir.gen_addi(Type::I32, addr, addr, 4);
        let cpsr = ir.new_temp(Type::I32);
        self.gen_aa32_ld_i32(ir, cpsr, addr, self.get_mem_index(), mop);
        if a.w != 0 {
            ir.gen_addi(Type::I32, addr, addr, RFE_POST[pu] as u64);
            self.store_reg(ir, a.rn, addr);
        }
        self.gen_rfe(ir, pc, cpsr);
        true
    }

    /// SRS: store LR and SPSR to the stack of `mode`.
    pub(super) fn op_srs(&mut self, ir: &mut Context, a: &ArgsSrs) -> bool {
        if !self.has(ArmFeature::V6) || self.is_m() {
            return false;
        }
        let mode = a.mode as u32;
        let el = self.tb.current_el;
        if el == 1 && !self.tb.ns && mode == MODE_MON {
            self.gen_exception_insn_el(ir, self.pc_curr, EXCP_UDEF, syn_uncategorized(), 3);
            return true;
        }
        let mut undef = el == 0 || el == 2;
        match mode {
            MODE_USR | MODE_FIQ | MODE_IRQ | MODE_SVC | MODE_ABT | MODE_UND | MODE_SYS => {}
            MODE_HYP => undef |= el == 1 || !self.has(ArmFeature::EL2),
            // Anything below EL3 here is Non-secure.
            MODE_MON => undef |= el != 3,
            _ => undef = true,
        }
        if undef {
            self.unallocated_encoding(ir);
            return true;
        }

        let pu = (a.pu & 3) as usize;
        // Banked SP reads fault from System mode.
        self.gen_set_condexec(ir);
        self.gen_update_pc(ir, self.pc_curr);
        let m = self.const32(ir, mode);
        let addr = self.call(ir, Helper::GetR13Banked, &[m]);
        ir.gen_addi(Type::I32, addr, addr, RFE_PRE[pu] as u64);
        let mop = MemOp::ul().with(MemOp::ALIGN);
        let lr = self.load_reg(ir, 14);
        self.gen_aa32_st_i32(ir, lr, addr, self.get_mem_index(), mop);
        let spsr = self.load_cpu_offset(ir, SPSR_OFFSET);
        ir.gen_addi(Type::I32, addr, addr, 4);
        self.gen_aa32_st_i32(ir, spsr, addr, self.get_mem_index(), mop);
        if a.w != 0 {
            ir.gen_addi(Type::I32, addr, addr, RFE_POST[pu] as u64);
            self.call_void(ir, Helper::SetR13Banked, &[m, addr]);
        }
        self.base.is_jmp = DisasJumpType::UpdateExit;
        true
    }

    // -- Table branch --

    pub(super) fn op_tbranch(&mut self, ir: &mut Context, a: &ArgsTbranch, half: bool) -> bool {
        let tmp = self.load_reg(ir, a.rm);
        if half {
            ir.gen_add(Type::I32, tmp, tmp, tmp);
        }
        let addr = self.load_reg(ir, a.rn);
        ir.gen_add(Type::I32, addr, addr, tmp);
        let mop = if half { MemOp::uw() } else { MemOp::ub() };
        self.gen_aa32_ld_i32(ir, tmp, addr, self.get_mem_index(), mop);
        ir.gen_add(Type::I32, tmp, tmp, tmp);
        let pc = self.const32(ir, self.read_pc());
        ir.gen_add(Type::I32, tmp, tmp, pc);
        self.store_reg(ir, 15, tmp);
        true
    }
}
