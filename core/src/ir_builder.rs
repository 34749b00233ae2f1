use crate::context::Context;
use crate::op::Op;
use crate::opcode::Opcode;
use crate::temp::TempIdx;
use crate::types::{Cond, MemOp, Type};

/// Maximum number of input arguments to a helper call.
pub const MAX_CALL_ARGS: usize = 8;

/// `bswap` flag: input is zero-extended.
pub const BSWAP_IZ: u32 = 1;
/// `bswap` flag: zero-extend the output.
pub const BSWAP_OZ: u32 = 2;
/// `bswap` flag: sign-extend the output.
pub const BSWAP_OS: u32 = 4;

// Constant args are encoded as TempIdx(raw_value as u32).
fn carg(val: u32) -> TempIdx {
    TempIdx(val)
}

impl Context {
    // -- Internal helpers --

    fn emit_binary(
        &mut self,
        opc: Opcode,
        ty: Type,
        dst: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, opc, ty, &[dst, a, b]);
        self.emit_op(op);
        dst
    }

    fn emit_unary(
        &mut self,
        opc: Opcode,
        ty: Type,
        dst: TempIdx,
        src: TempIdx,
    ) -> TempIdx {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, opc, ty, &[dst, src]);
        self.emit_op(op);
        dst
    }

    fn emit_args(&mut self, opc: Opcode, ty: Type, args: &[TempIdx]) {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, opc, ty, args);
        self.emit_op(op);
    }

    // -- Binary ALU (1 oarg, 2 iargs) --

    pub fn gen_add(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::Add, ty, d, a, b)
    }

    pub fn gen_sub(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::Sub, ty, d, a, b)
    }

    pub fn gen_mul(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::Mul, ty, d, a, b)
    }

    pub fn gen_and(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::And, ty, d, a, b)
    }

    pub fn gen_or(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::Or, ty, d, a, b)
    }

    pub fn gen_xor(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::Xor, ty, d, a, b)
    }

    pub fn gen_shl(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::Shl, ty, d, a, b)
    }

    pub fn gen_shr(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::Shr, ty, d, a, b)
    }

    pub fn gen_sar(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::Sar, ty, d, a, b)
    }

    pub fn gen_rotl(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::RotL, ty, d, a, b)
    }

    pub fn gen_rotr(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::RotR, ty, d, a, b)
    }

    pub fn gen_andc(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::AndC, ty, d, a, b)
    }

    pub fn gen_orc(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::OrC, ty, d, a, b)
    }

    // -- Immediate forms (QEMU's tcg_gen_*i) --

    /// d = a + imm
    pub fn gen_addi(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_add(ty, d, a, c)
    }

    /// d = a - imm
    pub fn gen_subi(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_sub(ty, d, a, c)
    }

    /// d = a * imm
    pub fn gen_muli(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_mul(ty, d, a, c)
    }

    /// d = a & imm
    pub fn gen_andi(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_and(ty, d, a, c)
    }

    /// d = a | imm
    pub fn gen_ori(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_or(ty, d, a, c)
    }

    /// d = a ^ imm
    pub fn gen_xori(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_xor(ty, d, a, c)
    }

    /// d = a << imm
    pub fn gen_shli(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_shl(ty, d, a, c)
    }

    /// d = a >> imm (logical)
    pub fn gen_shri(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_shr(ty, d, a, c)
    }

    /// d = a >> imm (arithmetic)
    pub fn gen_sari(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_sar(ty, d, a, c)
    }

    /// d = a rotated right by imm
    pub fn gen_rotri(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_rotr(ty, d, a, c)
    }

    /// d = imm
    pub fn gen_movi(&mut self, ty: Type, d: TempIdx, imm: u64) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_mov(ty, d, c)
    }

    // -- Widening multiply (2 oargs, 2 iargs) --

    /// Signed a * b -> (lo, hi).
    pub fn gen_muls2(
        &mut self,
        ty: Type,
        dl: TempIdx,
        dh: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) {
        self.emit_args(Opcode::MulS2, ty, &[dl, dh, a, b]);
    }

    /// Unsigned a * b -> (lo, hi).
    pub fn gen_mulu2(
        &mut self,
        ty: Type,
        dl: TempIdx,
        dh: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) {
        self.emit_args(Opcode::MulU2, ty, &[dl, dh, a, b]);
    }

    // -- Carry arithmetic --
    //
    // The carry flag is implicit: it is produced by a `*O` op and
    // consumed by the next `*I` op, with nothing in between that
    // touches it.

    pub fn gen_addco(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::AddCO, ty, d, a, b)
    }

    pub fn gen_addci(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::AddCI, ty, d, a, b)
    }

    pub fn gen_subbo(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::SubBO, ty, d, a, b)
    }

    pub fn gen_subbi(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::SubBI, ty, d, a, b)
    }

    /// Double-word add: (rl, rh) = (al, ah) + (bl, bh).
    #[allow(clippy::too_many_arguments)]
    pub fn gen_add2(
        &mut self,
        ty: Type,
        rl: TempIdx,
        rh: TempIdx,
        al: TempIdx,
        ah: TempIdx,
        bl: TempIdx,
        bh: TempIdx,
    ) {
        // rl may alias an input of the high half.
        let lo = self.new_temp(ty);
        self.gen_addco(ty, lo, al, bl);
        self.gen_addci(ty, rh, ah, bh);
        self.gen_mov(ty, rl, lo);
    }

    /// Double-word subtract: (rl, rh) = (al, ah) - (bl, bh).
    #[allow(clippy::too_many_arguments)]
    pub fn gen_sub2(
        &mut self,
        ty: Type,
        rl: TempIdx,
        rh: TempIdx,
        al: TempIdx,
        ah: TempIdx,
        bl: TempIdx,
        bh: TempIdx,
    ) {
        let lo = self.new_temp(ty);
        self.gen_subbo(ty, lo, al, bl);
        self.gen_subbi(ty, rh, ah, bh);
        self.gen_mov(ty, rl, lo);
    }

    // -- Bit field --

    pub fn gen_extract(
        &mut self,
        ty: Type,
        d: TempIdx,
        src: TempIdx,
        ofs: u32,
        len: u32,
    ) -> TempIdx {
        self.emit_args(Opcode::Extract, ty, &[d, src, carg(ofs), carg(len)]);
        d
    }

    pub fn gen_sextract(
        &mut self,
        ty: Type,
        d: TempIdx,
        src: TempIdx,
        ofs: u32,
        len: u32,
    ) -> TempIdx {
        self.emit_args(
            Opcode::SExtract,
            ty,
            &[d, src, carg(ofs), carg(len)],
        );
        d
    }

    pub fn gen_deposit(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
        ofs: u32,
        len: u32,
    ) -> TempIdx {
        self.emit_args(
            Opcode::Deposit,
            ty,
            &[d, a, b, carg(ofs), carg(len)],
        );
        d
    }

    pub fn gen_ext8u(&mut self, ty: Type, d: TempIdx, s: TempIdx) -> TempIdx {
        self.gen_extract(ty, d, s, 0, 8)
    }

    pub fn gen_ext8s(&mut self, ty: Type, d: TempIdx, s: TempIdx) -> TempIdx {
        self.gen_sextract(ty, d, s, 0, 8)
    }

    pub fn gen_ext16u(&mut self, ty: Type, d: TempIdx, s: TempIdx) -> TempIdx {
        self.gen_extract(ty, d, s, 0, 16)
    }

    pub fn gen_ext16s(&mut self, ty: Type, d: TempIdx, s: TempIdx) -> TempIdx {
        self.gen_sextract(ty, d, s, 0, 16)
    }

    // -- Byte swap --

    pub fn gen_bswap16(
        &mut self,
        ty: Type,
        d: TempIdx,
        src: TempIdx,
        flags: u32,
    ) -> TempIdx {
        self.emit_args(Opcode::Bswap16, ty, &[d, src, carg(flags)]);
        d
    }

    pub fn gen_bswap32(
        &mut self,
        ty: Type,
        d: TempIdx,
        src: TempIdx,
        flags: u32,
    ) -> TempIdx {
        self.emit_args(Opcode::Bswap32, ty, &[d, src, carg(flags)]);
        d
    }

    // -- Bit counting --

    /// d = a ? clz(a) : b
    pub fn gen_clz(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.emit_binary(Opcode::Clz, ty, d, a, b)
    }

    // -- SetCond / NegSetCond / MovCond --

    pub fn gen_setcond(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
        cond: Cond,
    ) -> TempIdx {
        self.emit_args(Opcode::SetCond, ty, &[d, a, b, carg(cond as u32)]);
        d
    }

    pub fn gen_setcondi(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        imm: u64,
        cond: Cond,
    ) -> TempIdx {
        let c = self.new_const(ty, imm);
        self.gen_setcond(ty, d, a, c, cond)
    }

    pub fn gen_negsetcond(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
        cond: Cond,
    ) -> TempIdx {
        self.emit_args(
            Opcode::NegSetCond,
            ty,
            &[d, a, b, carg(cond as u32)],
        );
        d
    }

    /// d = (c1 cond c2) ? v1 : v2
    #[allow(clippy::too_many_arguments)]
    pub fn gen_movcond(
        &mut self,
        ty: Type,
        d: TempIdx,
        c1: TempIdx,
        c2: TempIdx,
        v1: TempIdx,
        v2: TempIdx,
        cond: Cond,
    ) -> TempIdx {
        self.emit_args(
            Opcode::MovCond,
            ty,
            &[d, c1, c2, v1, v2, carg(cond as u32)],
        );
        d
    }

    pub fn gen_umin(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.gen_movcond(ty, d, a, b, a, b, Cond::Ltu)
    }

    pub fn gen_umax(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.gen_movcond(ty, d, a, b, a, b, Cond::Gtu)
    }

    pub fn gen_smin(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.gen_movcond(ty, d, a, b, a, b, Cond::Lt)
    }

    pub fn gen_smax(
        &mut self,
        ty: Type,
        d: TempIdx,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        self.gen_movcond(ty, d, a, b, a, b, Cond::Gt)
    }

    pub fn gen_abs(&mut self, ty: Type, d: TempIdx, a: TempIdx) -> TempIdx {
        let n = self.new_temp(ty);
        self.gen_neg(ty, n, a);
        let zero = self.new_const(ty, 0);
        self.gen_movcond(ty, d, a, zero, n, a, Cond::Lt)
    }

    // -- Unary (1 oarg, 1 iarg) --

    pub fn gen_neg(&mut self, ty: Type, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::Neg, ty, d, s)
    }

    pub fn gen_not(&mut self, ty: Type, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::Not, ty, d, s)
    }

    pub fn gen_mov(&mut self, ty: Type, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::Mov, ty, d, s)
    }

    // -- Type conversion (1 oarg, 1 iarg) --

    /// Sign-extend i32 → i64.
    pub fn gen_ext_i32_i64(&mut self, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::ExtI32I64, Type::I64, d, s)
    }

    /// Zero-extend i32 → i64.
    pub fn gen_ext_u32_i64(&mut self, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::ExtUI32I64, Type::I64, d, s)
    }

    /// Truncate i64 → i32 (low 32 bits).
    pub fn gen_extrl_i64_i32(&mut self, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::ExtrlI64I32, Type::I32, d, s)
    }

    /// Extract i64 → i32 (high 32 bits).
    pub fn gen_extrh_i64_i32(&mut self, d: TempIdx, s: TempIdx) -> TempIdx {
        self.emit_unary(Opcode::ExtrhI64I32, Type::I32, d, s)
    }

    /// Split i64 into (lo, hi) i32 halves.
    pub fn gen_extr_i64_i32(&mut self, lo: TempIdx, hi: TempIdx, s: TempIdx) {
        self.gen_extrl_i64_i32(lo, s);
        self.gen_extrh_i64_i32(hi, s);
    }

    /// d = (hi << 32) | lo
    pub fn gen_concat_i32_i64(
        &mut self,
        d: TempIdx,
        lo: TempIdx,
        hi: TempIdx,
    ) -> TempIdx {
        let l = self.new_temp(Type::I64);
        let h = self.new_temp(Type::I64);
        self.gen_ext_u32_i64(l, lo);
        self.gen_ext_u32_i64(h, hi);
        self.gen_shli(Type::I64, h, h, 32);
        self.gen_or(Type::I64, d, l, h)
    }

    // -- Host Ld/St (for CPU env access) --

    fn emit_sized_load(
        &mut self,
        opc: Opcode,
        ty: Type,
        dst: TempIdx,
        base: TempIdx,
        offset: i64,
    ) -> TempIdx {
        self.emit_args(opc, ty, &[dst, base, carg(offset as u32)]);
        dst
    }

    fn emit_sized_store(
        &mut self,
        opc: Opcode,
        ty: Type,
        src: TempIdx,
        base: TempIdx,
        offset: i64,
    ) {
        self.emit_args(opc, ty, &[src, base, carg(offset as u32)]);
    }

    /// Load: dst = *(base + offset)
    pub fn gen_ld(
        &mut self,
        ty: Type,
        dst: TempIdx,
        base: TempIdx,
        offset: i64,
    ) -> TempIdx {
        self.emit_sized_load(Opcode::Ld, ty, dst, base, offset)
    }

    /// Store: *(base + offset) = src
    pub fn gen_st(
        &mut self,
        ty: Type,
        src: TempIdx,
        base: TempIdx,
        offset: i64,
    ) {
        self.emit_sized_store(Opcode::St, ty, src, base, offset);
    }

    /// Load unsigned byte: dst = *(base + offset)
    pub fn gen_ld8u(
        &mut self,
        ty: Type,
        dst: TempIdx,
        base: TempIdx,
        offset: i64,
    ) -> TempIdx {
        self.emit_sized_load(Opcode::Ld8U, ty, dst, base, offset)
    }

    /// Load signed byte: dst = *(base + offset)
    pub fn gen_ld8s(
        &mut self,
        ty: Type,
        dst: TempIdx,
        base: TempIdx,
        offset: i64,
    ) -> TempIdx {
        self.emit_sized_load(Opcode::Ld8S, ty, dst, base, offset)
    }

    /// Load unsigned halfword: dst = *(base + offset)
    pub fn gen_ld16u(
        &mut self,
        ty: Type,
        dst: TempIdx,
        base: TempIdx,
        offset: i64,
    ) -> TempIdx {
        self.emit_sized_load(Opcode::Ld16U, ty, dst, base, offset)
    }

    /// Load signed halfword: dst = *(base + offset)
    pub fn gen_ld16s(
        &mut self,
        ty: Type,
        dst: TempIdx,
        base: TempIdx,
        offset: i64,
    ) -> TempIdx {
        self.emit_sized_load(Opcode::Ld16S, ty, dst, base, offset)
    }

    /// Load unsigned word: dst = *(base + offset)
    pub fn gen_ld32u(
        &mut self,
        ty: Type,
        dst: TempIdx,
        base: TempIdx,
        offset: i64,
    ) -> TempIdx {
        self.emit_sized_load(Opcode::Ld32U, ty, dst, base, offset)
    }

    /// Load signed word: dst = *(base + offset)
    pub fn gen_ld32s(
        &mut self,
        ty: Type,
        dst: TempIdx,
        base: TempIdx,
        offset: i64,
    ) -> TempIdx {
        self.emit_sized_load(Opcode::Ld32S, ty, dst, base, offset)
    }

    /// Store byte: *(base + offset) = src
    pub fn gen_st8(
        &mut self,
        ty: Type,
        src: TempIdx,
        base: TempIdx,
        offset: i64,
    ) {
        self.emit_sized_store(Opcode::St8, ty, src, base, offset);
    }

    /// Store halfword: *(base + offset) = src
    pub fn gen_st16(
        &mut self,
        ty: Type,
        src: TempIdx,
        base: TempIdx,
        offset: i64,
    ) {
        self.emit_sized_store(Opcode::St16, ty, src, base, offset);
    }

    /// Store word: *(base + offset) = src
    pub fn gen_st32(
        &mut self,
        ty: Type,
        src: TempIdx,
        base: TempIdx,
        offset: i64,
    ) {
        self.emit_sized_store(Opcode::St32, ty, src, base, offset);
    }

    // -- Control flow --

    /// Unconditional branch to label.
    /// Br: 0 oargs, 0 iargs, 1 carg (label_id)
    pub fn gen_br(&mut self, label_id: u32) {
        let idx = self.next_op_idx();
        self.emit_args(Opcode::Br, Type::I32, &[carg(label_id)]);
        self.label_mut(label_id).add_use(idx);
    }

    /// Conditional branch.
    /// BrCond: 0 oargs, 2 iargs, 2 cargs (cond, label_id)
    pub fn gen_brcond(
        &mut self,
        ty: Type,
        a: TempIdx,
        b: TempIdx,
        cond: Cond,
        label_id: u32,
    ) {
        let idx = self.next_op_idx();
        self.emit_args(
            Opcode::BrCond,
            ty,
            &[a, b, carg(cond as u32), carg(label_id)],
        );
        self.label_mut(label_id).add_use(idx);
    }

    pub fn gen_brcondi(
        &mut self,
        ty: Type,
        a: TempIdx,
        imm: u64,
        cond: Cond,
        label_id: u32,
    ) {
        let c = self.new_const(ty, imm);
        self.gen_brcond(ty, a, c, cond, label_id);
    }

    /// Define label position.
    /// SetLabel: 0 oargs, 0 iargs, 1 carg (label_id)
    pub fn gen_set_label(&mut self, label_id: u32) {
        let idx = self.next_op_idx();
        self.emit_args(Opcode::SetLabel, Type::I32, &[carg(label_id)]);
        self.label_mut(label_id).set_position(idx);
    }

    // -- TB exit --

    /// GotoTb: 0 oargs, 0 iargs, 1 carg (slot)
    pub fn gen_goto_tb(&mut self, slot: u32) {
        self.emit_args(Opcode::GotoTb, Type::I32, &[carg(slot)]);
    }

    /// ExitTb: 0 oargs, 0 iargs, 1 carg (val)
    pub fn gen_exit_tb(&mut self, val: u64) {
        self.emit_args(Opcode::ExitTb, Type::I32, &[carg(val as u32)]);
    }

    /// Indirect jump: find the TB for the current guest PC.
    pub fn gen_lookup_and_goto_ptr(&mut self) {
        self.emit_args(Opcode::LookupAndGotoPtr, Type::I32, &[]);
    }

    // -- Boundary --

    /// InsnStart: 0 oargs, 0 iargs, 3 cargs (pc, data1, data2)
    pub fn gen_insn_start(&mut self, pc: u32, data1: u32, data2: u32) {
        self.emit_args(
            Opcode::InsnStart,
            Type::I32,
            &[carg(pc), carg(data1), carg(data2)],
        );
    }

    /// Mb: memory barrier.
    pub fn gen_mb(&mut self, bar_type: u32) {
        self.emit_args(Opcode::Mb, Type::I32, &[carg(bar_type)]);
    }

    // -- Call --

    fn emit_call(
        &mut self,
        ret: Option<TempIdx>,
        helper: u32,
        args: &[TempIdx],
    ) {
        assert!(args.len() <= MAX_CALL_ARGS, "too many helper arguments");
        let mut full = Vec::with_capacity(args.len() + 2);
        full.extend(ret);
        full.extend_from_slice(args);
        full.push(carg(helper));
        let idx = self.next_op_idx();
        let mut op = Op::with_args(idx, Opcode::Call, Type::I64, &full);
        op.param1 = args.len() as u8;
        op.param2 = ret.is_some() as u8;
        self.emit_op(op);
    }

    /// Call helper: dst = helper(args...)
    pub fn gen_call(
        &mut self,
        dst: TempIdx,
        helper: u32,
        args: &[TempIdx],
    ) -> TempIdx {
        self.emit_call(Some(dst), helper, args);
        dst
    }

    /// Call a helper whose result is not used.
    pub fn gen_call_void(&mut self, helper: u32, args: &[TempIdx]) {
        self.emit_call(None, helper, args);
    }

    pub fn gen_discard(&mut self, ty: Type, t: TempIdx) {
        self.emit_args(Opcode::Discard, ty, &[t]);
    }

    // -- Guest memory access --

    /// QemuLd: 1 oarg, 1 iarg (addr), 2 cargs (memop, mem_idx)
    pub fn gen_qemu_ld(
        &mut self,
        ty: Type,
        dst: TempIdx,
        addr: TempIdx,
        memop: MemOp,
        mem_idx: u32,
    ) -> TempIdx {
        self.emit_args(
            Opcode::QemuLd,
            ty,
            &[dst, addr, carg(memop.bits() as u32), carg(mem_idx)],
        );
        dst
    }

    /// QemuSt: 0 oargs, 2 iargs (val, addr), 2 cargs (memop, mem_idx)
    pub fn gen_qemu_st(
        &mut self,
        ty: Type,
        val: TempIdx,
        addr: TempIdx,
        memop: MemOp,
        mem_idx: u32,
    ) {
        self.emit_args(
            Opcode::QemuSt,
            ty,
            &[val, addr, carg(memop.bits() as u32), carg(mem_idx)],
        );
    }

    /// Atomic compare-and-exchange; `dst` receives the old value.
    #[allow(clippy::too_many_arguments)]
    pub fn gen_atomic_cmpxchg(
        &mut self,
        ty: Type,
        dst: TempIdx,
        addr: TempIdx,
        cmp: TempIdx,
        new: TempIdx,
        memop: MemOp,
        mem_idx: u32,
    ) -> TempIdx {
        self.emit_args(
            Opcode::AtomicCmpXchg,
            ty,
            &[
                dst,
                addr,
                cmp,
                new,
                carg(memop.bits() as u32),
                carg(mem_idx),
            ],
        );
        dst
    }

    /// Atomic exchange; `dst` receives the old value.
    pub fn gen_atomic_xchg(
        &mut self,
        ty: Type,
        dst: TempIdx,
        addr: TempIdx,
        new: TempIdx,
        memop: MemOp,
        mem_idx: u32,
    ) -> TempIdx {
        self.emit_args(
            Opcode::AtomicXchg,
            ty,
            &[dst, addr, new, carg(memop.bits() as u32), carg(mem_idx)],
        );
        dst
    }
}
