//! Reference IR interpreter.
//!
//! Runs the ops of one translation block directly against the CPU
//! env, standing in for generated host code. Globals live in the env
//! and are read/written through it on every access, so helpers
//! always observe up-to-date guest state.

use tcg_core::op::Op;
use tcg_core::temp::{TempIdx, TempKind};
use tcg_core::types::{Cond, MemOp, Type};
use tcg_core::{Context, Opcode};

use crate::{ExecError, ExecHost, Unwind};

/// Upper bound on ops executed in one block; guards against
/// backwards branches looping forever.
const MAX_STEPS: usize = 1 << 20;

/// How a translation block finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TbExit {
    /// `goto_tb` + `exit_tb`: the next block is a direct, chainable
    /// successor through the given slot.
    Chain(usize),
    /// Plain `exit_tb` back to the execution loop.
    Exit(u64),
    /// `lookup_and_goto_ptr`: indirect jump to the current PC.
    Lookup,
    /// A helper or memory access raised a guest exception.
    Exception,
}

struct Interp<'a> {
    ctx: &'a Context,
    vals: Vec<u64>,
    carry: bool,
    /// Parameters of the most recent `insn_start`.
    insn: [u32; 3],
    goto_slot: Option<usize>,
}

fn sext(v: u64, bits: u32) -> u64 {
    let sh = 64 - bits;
    (((v << sh) as i64) >> sh) as u64
}

fn field_mask(len: u32) -> u64 {
    if len >= 64 {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

impl<'a> Interp<'a> {
    fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            vals: vec![0; ctx.nb_temps() as usize],
            carry: false,
            insn: [0; 3],
            goto_slot: None,
        }
    }

    fn env_check<H: ExecHost + ?Sized>(
        host: &mut H,
        offset: i64,
        size: usize,
    ) -> Result<*mut u8, ExecError> {
        if offset < 0 || offset as usize + size > host.env_size() {
            return Err(ExecError::EnvAccess { offset, size });
        }
        Ok(host.env_ptr())
    }

    fn env_load<H: ExecHost + ?Sized>(
        host: &mut H,
        offset: i64,
        size: usize,
    ) -> Result<u64, ExecError> {
        let base = Self::env_check(host, offset, size)?;
        // SAFETY: bounds checked against the env size above.
        let v = unsafe {
            let p = base.add(offset as usize);
            match size {
                1 => p.read() as u64,
                2 => p.cast::<u16>().read_unaligned() as u64,
                4 => p.cast::<u32>().read_unaligned() as u64,
                _ => p.cast::<u64>().read_unaligned(),
            }
        };
        Ok(v)
    }

    fn env_store<H: ExecHost + ?Sized>(
        host: &mut H,
        offset: i64,
        size: usize,
        val: u64,
    ) -> Result<(), ExecError> {
        let base = Self::env_check(host, offset, size)?;
        // SAFETY: bounds checked against the env size above.
        unsafe {
            let p = base.add(offset as usize);
            match size {
                1 => p.write(val as u8),
                2 => p.cast::<u16>().write_unaligned(val as u16),
                4 => p.cast::<u32>().write_unaligned(val as u32),
                _ => p.cast::<u64>().write_unaligned(val),
            }
        }
        Ok(())
    }

    fn read<H: ExecHost + ?Sized>(
        &self,
        host: &mut H,
        t: TempIdx,
    ) -> Result<u64, ExecError> {
        let temp = self.ctx.temp(t);
        match temp.kind {
            TempKind::Const => Ok(temp.val),
            TempKind::Fixed => Ok(0),
            TempKind::Global => Self::env_load(
                host,
                temp.mem_offset,
                temp.ty.size_bytes() as usize,
            ),
            TempKind::Ebb | TempKind::Tb => Ok(self.vals[t.0 as usize]),
        }
    }

    fn write<H: ExecHost + ?Sized>(
        &mut self,
        host: &mut H,
        t: TempIdx,
        val: u64,
    ) -> Result<(), ExecError> {
        let temp = self.ctx.temp(t);
        let val = val & temp.ty.mask();
        match temp.kind {
            TempKind::Global => Self::env_store(
                host,
                temp.mem_offset,
                temp.ty.size_bytes() as usize,
                val,
            ),
            TempKind::Ebb | TempKind::Tb => {
                self.vals[t.0 as usize] = val;
                Ok(())
            }
            TempKind::Const | TempKind::Fixed => Err(ExecError::InvalidOp {
                op: usize::MAX,
                opc: Opcode::Mov,
            }),
        }
    }

    fn label_target(&self, id: u32) -> Result<usize, ExecError> {
        if id as usize >= self.ctx.labels().len() {
            return Err(ExecError::UnresolvedLabel(id));
        }
        self.ctx
            .label(id)
            .position
            .map(|p| p.0 as usize)
            .ok_or(ExecError::UnresolvedLabel(id))
    }

    fn unwind<H: ExecHost + ?Sized>(
        &self,
        host: &mut H,
        u: Unwind,
    ) -> Result<TbExit, ExecError> {
        match u {
            Unwind::Exception => Ok(TbExit::Exception),
            Unwind::ExceptionRestore => {
                host.restore_state(&self.insn);
                Ok(TbExit::Exception)
            }
            Unwind::Error(e) => Err(e),
        }
    }

    fn run<H: ExecHost + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Result<TbExit, ExecError> {
        let ctx = self.ctx;
        let ops = ctx.ops();
        let mut pc = 0usize;
        let mut steps = 0usize;
        while pc < ops.len() {
            steps += 1;
            if steps > MAX_STEPS {
                return Err(ExecError::StepLimit);
            }
            let op = &ops[pc];
            pc += 1;
            match self.step(host, op, pc - 1)? {
                Flow::Next => {}
                Flow::Jump(target) => pc = target,
                Flow::Exit(e) => return Ok(e),
            }
        }
        Err(ExecError::FellOffEnd)
    }

    fn step<H: ExecHost + ?Sized>(
        &mut self,
        host: &mut H,
        op: &Op,
        at: usize,
    ) -> Result<Flow, ExecError> {
        let ty = op.op_type;
        let bits = ty.size_bits();
        let mask = ty.mask();
        let bad = || ExecError::InvalidOp { op: at, opc: op.opc };
        let oa = op.oargs();
        let ia = op.iargs();
        let ca: Vec<u32> = op.cargs().iter().map(|c| c.0).collect();

        let mut inv = Vec::with_capacity(ia.len());
        // Inputs are masked by their own width; the extract/extend ops
        // take a source wider or narrower than the op type.
        for &t in ia {
            inv.push(self.read(host, t)? & self.ctx.temp(t).ty.mask());
        }
        let signed = |v: u64| sext(v, bits) as i64;
        let cond = |c: u32| Cond::from_raw(c).ok_or_else(bad);

        let result: u64 = match op.opc {
            Opcode::Mov => inv[0],
            Opcode::SetCond => cond(ca[0])?.eval(ty, inv[0], inv[1]) as u64,
            Opcode::NegSetCond => {
                (cond(ca[0])?.eval(ty, inv[0], inv[1]) as u64).wrapping_neg()
            }
            Opcode::MovCond => {
                if cond(ca[0])?.eval(ty, inv[0], inv[1]) {
                    inv[2]
                } else {
                    inv[3]
                }
            }
            Opcode::Add => inv[0].wrapping_add(inv[1]),
            Opcode::Sub => inv[0].wrapping_sub(inv[1]),
            Opcode::Mul => inv[0].wrapping_mul(inv[1]),
            Opcode::Neg => inv[0].wrapping_neg(),
            Opcode::MulS2 | Opcode::MulU2 => {
                let (lo, hi) = match (op.opc, ty) {
                    (Opcode::MulU2, Type::I32) => {
                        let p = inv[0] * inv[1];
                        (p, p >> 32)
                    }
                    (Opcode::MulS2, Type::I32) => {
                        let p = (signed(inv[0]) * signed(inv[1])) as u64;
                        (p, p >> 32)
                    }
                    (Opcode::MulU2, _) => {
                        let p = inv[0] as u128 * inv[1] as u128;
                        (p as u64, (p >> 64) as u64)
                    }
                    _ => {
                        let p = inv[0] as i64 as i128 * inv[1] as i64 as i128;
                        (p as u64, (p >> 64) as u64)
                    }
                };
                self.write(host, oa[0], lo)?;
                self.write(host, oa[1], hi)?;
                return Ok(Flow::Next);
            }
            Opcode::AddCO => {
                let r = inv[0].wrapping_add(inv[1]) & mask;
                self.carry = r < inv[0];
                r
            }
            Opcode::AddCI => inv[0]
                .wrapping_add(inv[1])
                .wrapping_add(self.carry as u64),
            Opcode::SubBO => {
                self.carry = inv[0] < inv[1];
                inv[0].wrapping_sub(inv[1])
            }
            Opcode::SubBI => inv[0]
                .wrapping_sub(inv[1])
                .wrapping_sub(self.carry as u64),
            Opcode::And => inv[0] & inv[1],
            Opcode::Or => inv[0] | inv[1],
            Opcode::Xor => inv[0] ^ inv[1],
            Opcode::Not => !inv[0],
            Opcode::AndC => inv[0] & !inv[1],
            Opcode::OrC => inv[0] | !inv[1],
            Opcode::Shl => inv[0] << (inv[1] as u32 % bits),
            Opcode::Shr => inv[0] >> (inv[1] as u32 % bits),
            Opcode::Sar => (signed(inv[0]) >> (inv[1] as u32 % bits)) as u64,
            Opcode::RotL | Opcode::RotR => {
                let mut n = inv[1] as u32 % bits;
                if op.opc == Opcode::RotR {
                    n = (bits - n) % bits;
                }
                if n == 0 {
                    inv[0]
                } else {
                    (inv[0] << n) | (inv[0] >> (bits - n))
                }
            }
            Opcode::Extract => (inv[0] >> ca[0]) & field_mask(ca[1]),
            Opcode::SExtract => sext(inv[0] >> ca[0], ca[1]),
            Opcode::Deposit => {
                let m = field_mask(ca[1]) << ca[0];
                (inv[0] & !m) | ((inv[1] << ca[0]) & m)
            }
            Opcode::Bswap16 => {
                let v = (inv[0] as u16).swap_bytes() as u64;
                if ca[0] & tcg_core::ir_builder::BSWAP_OS != 0 {
                    sext(v, 16)
                } else {
                    v
                }
            }
            Opcode::Bswap32 => {
                let v = (inv[0] as u32).swap_bytes() as u64;
                if ca[0] & tcg_core::ir_builder::BSWAP_OS != 0 {
                    sext(v, 32)
                } else {
                    v
                }
            }
            Opcode::Clz => {
                if inv[0] == 0 {
                    inv[1]
                } else {
                    (inv[0].leading_zeros() - (64 - bits)) as u64
                }
            }
            Opcode::ExtI32I64 => sext(inv[0], 32),
            Opcode::ExtUI32I64 => inv[0] & 0xffff_ffff,
            Opcode::ExtrlI64I32 => inv[0] & 0xffff_ffff,
            Opcode::ExtrhI64I32 => inv[0] >> 32,

            Opcode::Ld8U
            | Opcode::Ld8S
            | Opcode::Ld16U
            | Opcode::Ld16S
            | Opcode::Ld32U
            | Opcode::Ld32S
            | Opcode::Ld => {
                let (size, sign) = match op.opc {
                    Opcode::Ld8U => (1, false),
                    Opcode::Ld8S => (1, true),
                    Opcode::Ld16U => (2, false),
                    Opcode::Ld16S => (2, true),
                    Opcode::Ld32U => (4, false),
                    Opcode::Ld32S => (4, true),
                    _ => (ty.size_bytes() as usize, false),
                };
                let off = inv[0] as i64 + ca[0] as i32 as i64;
                let v = Self::env_load(host, off, size)?;
                if sign {
                    sext(v, size as u32 * 8)
                } else {
                    v
                }
            }
            Opcode::St8 | Opcode::St16 | Opcode::St32 | Opcode::St => {
                let size = match op.opc {
                    Opcode::St8 => 1,
                    Opcode::St16 => 2,
                    Opcode::St32 => 4,
                    _ => ty.size_bytes() as usize,
                };
                let off = inv[1] as i64 + ca[0] as i32 as i64;
                Self::env_store(host, off, size, inv[0])?;
                return Ok(Flow::Next);
            }

            Opcode::QemuLd => {
                let mop = MemOp::new(ca[0] as u16);
                match host.load(inv[0] as u32, mop, ca[1]) {
                    Ok(v) if mop.is_signed() => sext(v, mop.size_bytes() * 8),
                    Ok(v) => v,
                    Err(u) => return self.unwind(host, u).map(Flow::Exit),
                }
            }
            Opcode::QemuSt => {
                let mop = MemOp::new(ca[0] as u16);
                if let Err(u) = host.store(inv[1] as u32, inv[0], mop, ca[1]) {
                    return self.unwind(host, u).map(Flow::Exit);
                }
                return Ok(Flow::Next);
            }
            Opcode::AtomicCmpXchg => {
                let mop = MemOp::new(ca[0] as u16);
                let r = host.cmpxchg(inv[0] as u32, inv[1], inv[2], mop, ca[1]);
                match r {
                    Ok(v) if mop.is_signed() => sext(v, mop.size_bytes() * 8),
                    Ok(v) => v,
                    Err(u) => return self.unwind(host, u).map(Flow::Exit),
                }
            }
            Opcode::AtomicXchg => {
                let mop = MemOp::new(ca[0] as u16);
                match host.xchg(inv[0] as u32, inv[1], mop, ca[1]) {
                    Ok(v) => v,
                    Err(u) => return self.unwind(host, u).map(Flow::Exit),
                }
            }

            Opcode::Br => return Ok(Flow::Jump(self.label_target(ca[0])?)),
            Opcode::BrCond => {
                if cond(ca[0])?.eval(ty, inv[0], inv[1]) {
                    return Ok(Flow::Jump(self.label_target(ca[1])?));
                }
                return Ok(Flow::Next);
            }
            Opcode::GotoTb => {
                self.goto_slot = Some(ca[0] as usize);
                return Ok(Flow::Next);
            }
            Opcode::ExitTb => {
                let exit = match self.goto_slot.take() {
                    Some(slot) => TbExit::Chain(slot),
                    None => TbExit::Exit(ca[0] as u64),
                };
                return Ok(Flow::Exit(exit));
            }
            Opcode::LookupAndGotoPtr => return Ok(Flow::Exit(TbExit::Lookup)),
            Opcode::Mb => {
                std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
                return Ok(Flow::Next);
            }
            Opcode::Call => match host.call_helper(ca[0], &inv) {
                Ok(v) => {
                    if oa.is_empty() {
                        return Ok(Flow::Next);
                    }
                    v
                }
                Err(u) => return self.unwind(host, u).map(Flow::Exit),
            },
            Opcode::InsnStart => {
                self.insn = [ca[0], ca[1], ca[2]];
                return Ok(Flow::Next);
            }
            Opcode::SetLabel | Opcode::Nop | Opcode::Discard => {
                return Ok(Flow::Next);
            }
            Opcode::Count => return Err(bad()),
        };

        let dst = *oa.first().ok_or_else(bad)?;
        self.write(host, dst, result & mask).map_err(|e| match e {
            ExecError::InvalidOp { .. } => bad(),
            e => e,
        })?;
        Ok(Flow::Next)
    }
}

enum Flow {
    Next,
    Jump(usize),
    Exit(TbExit),
}

/// Execute the ops in `ctx` against `host`.
///
/// Returns how the block exited; host-level problems (bad IR, an
/// unknown helper, an env access out of bounds) are errors.
pub fn interpret<H: ExecHost + ?Sized>(
    ctx: &Context,
    host: &mut H,
) -> Result<TbExit, ExecError> {
    Interp::new(ctx).run(host)
}
