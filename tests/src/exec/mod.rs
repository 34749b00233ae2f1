//! Tests for the tcg-exec interpreter and execution loop, driven by a
//! toy guest whose "instructions" are translated by hand.

use tcg_core::tb::cflags::CF_NO_GOTO_TB;
use tcg_core::{Context, MemOp, TempIdx, Type};
use tcg_exec::{
    cpu_exec_loop, interpret, ExecEnv, ExecError, ExecHost, ExitReason, GuestCpu, TbExit, Unwind,
};

#[repr(C)]
#[derive(Default)]
struct ToyEnv {
    pc: u32,
    acc: u32,
}

const OFF_PC: i64 = 0;
const OFF_ACC: i64 = 4;

// Toy ISA: op in bits 31..24, immediate in 23..0.
const OP_ADD: u32 = 0;
const OP_STORE: u32 = 1;
const OP_LOAD: u32 = 2;
const OP_DOUBLE: u32 = 3;
const OP_JUMP: u32 = 4;
const OP_FAULT: u32 = 5;
const OP_HALT: u32 = 6;

const HELPER_DOUBLE: u32 = 7;
const HELPER_FAULT: u32 = 8;
const HELPER_HALT: u32 = 9;

fn insn(op: u32, imm: u32) -> u32 {
    (op << 24) | (imm & 0xff_ffff)
}

struct Toy {
    env: ToyEnv,
    code: Vec<u32>,
    mem: Vec<u8>,
    translations: u32,
    restored: Option<[u32; 3]>,
    halted: bool,
}

impl Toy {
    fn new(code: &[u32]) -> Self {
        Self {
            env: ToyEnv::default(),
            code: code.to_vec(),
            mem: vec![0; 64],
            translations: 0,
            restored: None,
            halted: false,
        }
    }
}

impl ExecHost for Toy {
    fn env_ptr(&mut self) -> *mut u8 {
        &mut self.env as *mut ToyEnv as *mut u8
    }

    fn env_size(&self) -> usize {
        std::mem::size_of::<ToyEnv>()
    }

    fn load(&mut self, addr: u32, memop: MemOp, _mem_idx: u32) -> Result<u64, Unwind> {
        let a = addr as usize;
        let n = memop.size_bytes() as usize;
        let b = self.mem.get(a..a + n).ok_or(Unwind::Exception)?;
        Ok(b.iter().rev().fold(0, |acc, &x| acc << 8 | x as u64))
    }

    fn store(&mut self, addr: u32, val: u64, memop: MemOp, _mem_idx: u32) -> Result<(), Unwind> {
        let a = addr as usize;
        let n = memop.size_bytes() as usize;
        let b = self.mem.get_mut(a..a + n).ok_or(Unwind::Exception)?;
        for (i, x) in b.iter_mut().enumerate() {
            *x = (val >> (8 * i)) as u8;
        }
        Ok(())
    }

    fn cmpxchg(
        &mut self,
        addr: u32,
        cmp: u64,
        new: u64,
        memop: MemOp,
        mem_idx: u32,
    ) -> Result<u64, Unwind> {
        let old = self.load(addr, memop, mem_idx)?;
        if old == cmp {
            self.store(addr, new, memop, mem_idx)?;
        }
        Ok(old)
    }

    fn xchg(&mut self, addr: u32, new: u64, memop: MemOp, mem_idx: u32) -> Result<u64, Unwind> {
        let old = self.load(addr, memop, mem_idx)?;
        self.store(addr, new, memop, mem_idx)?;
        Ok(old)
    }

    fn call_helper(&mut self, id: u32, args: &[u64]) -> Result<u64, Unwind> {
        match id {
            HELPER_DOUBLE => Ok(args[0].wrapping_mul(2)),
            HELPER_FAULT => Err(Unwind::ExceptionRestore),
            HELPER_HALT => {
                self.halted = true;
                Err(Unwind::Exception)
            }
            _ => Err(ExecError::UnknownHelper(id).into()),
        }
    }

    fn restore_state(&mut self, data: &[u32; 3]) {
        self.env.pc = data[0];
        self.restored = Some(*data);
    }
}

impl GuestCpu for Toy {
    fn get_pc(&self) -> u32 {
        self.env.pc
    }

    fn get_flags(&self) -> u64 {
        0
    }

    fn gen_code(&mut self, ir: &mut Context, pc: u32, _flags: u64, _cflags: u32) -> u32 {
        self.translations += 1;
        // Globals survive `Context::reset`, so only the first block
        // registers them.
        let (pc_g, acc) = if ir.nb_globals() == 0 {
            let env = ir.new_fixed(Type::I64, "env");
            let pc_g = ir.new_global(Type::I32, env, OFF_PC, "pc");
            let acc = ir.new_global(Type::I32, env, OFF_ACC, "acc");
            (pc_g, acc)
        } else {
            (TempIdx(1), TempIdx(2))
        };
        let mut cur = pc;
        loop {
            let word = self.code[(cur / 4) as usize];
            let (op, imm) = (word >> 24, word & 0xff_ffff);
            ir.gen_insn_start(cur, 0, op);
            cur += 4;
            match op {
                OP_ADD => {
                    ir.gen_addi(Type::I32, acc, acc, imm as u64);
                }
                OP_STORE => {
                    let a = ir.new_const(Type::I32, imm as u64);
                    ir.gen_qemu_st(Type::I32, acc, a, MemOp::ul(), 0);
                }
                OP_LOAD => {
                    let a = ir.new_const(Type::I32, imm as u64);
                    ir.gen_qemu_ld(Type::I32, acc, a, MemOp::ul(), 0);
                }
                OP_DOUBLE => {
                    ir.gen_call(acc, HELPER_DOUBLE, &[acc]);
                }
                OP_JUMP => {
                    ir.gen_goto_tb(0);
                    ir.gen_movi(Type::I32, pc_g, imm as u64);
                    ir.gen_exit_tb(0);
                    return cur - pc;
                }
                OP_FAULT => {
                    ir.gen_call_void(HELPER_FAULT, &[]);
                }
                _ => {
                    ir.gen_movi(Type::I32, pc_g, cur as u64);
                    ir.gen_call_void(HELPER_HALT, &[]);
                    ir.gen_exit_tb(0);
                    return cur - pc;
                }
            }
        }
    }

    fn is_halted(&self) -> bool {
        self.halted
    }
}

// ── Interpreter ──────────────────────────────────────────────

fn single_tb(toy: &mut Toy) -> Context {
    let mut ir = Context::new();
    let pc = toy.env.pc;
    toy.gen_code(&mut ir, pc, 0, 0);
    ir
}

#[test]
fn interp_arith_and_memory() {
    let mut toy = Toy::new(&[
        insn(OP_ADD, 20),
        insn(OP_STORE, 8),
        insn(OP_ADD, 1),
        insn(OP_LOAD, 8),
        insn(OP_DOUBLE, 0),
        insn(OP_HALT, 0),
    ]);
    let ir = single_tb(&mut toy);
    assert_eq!(interpret(&ir, &mut toy), Ok(TbExit::Exception));
    assert_eq!(toy.env.acc, 40);
    assert_eq!(&toy.mem[8..12], &[20, 0, 0, 0]);
    assert_eq!(toy.env.pc, 24);
    assert!(toy.halted);
}

#[test]
fn interp_goto_tb_reports_chain_slot() {
    let mut toy = Toy::new(&[insn(OP_ADD, 1), insn(OP_JUMP, 0)]);
    let ir = single_tb(&mut toy);
    assert_eq!(interpret(&ir, &mut toy), Ok(TbExit::Chain(0)));
    assert_eq!(toy.env.acc, 1);
    assert_eq!(toy.env.pc, 0);
}

#[test]
fn interp_restores_faulting_insn() {
    let mut toy = Toy::new(&[
        insn(OP_ADD, 3),
        insn(OP_FAULT, 0),
        insn(OP_ADD, 3),
        insn(OP_HALT, 0),
    ]);
    let ir = single_tb(&mut toy);
    assert_eq!(interpret(&ir, &mut toy), Ok(TbExit::Exception));
    // The add before the fault retired; the one after did not.
    assert_eq!(toy.env.acc, 3);
    assert_eq!(toy.restored, Some([4, 0, OP_FAULT]));
    assert_eq!(toy.env.pc, 4);
}

#[test]
fn interp_brcond_and_setcond() {
    let mut toy = Toy::new(&[]);
    let mut ir = Context::new();
    let env = ir.new_fixed(Type::I64, "env");
    let acc = ir.new_global(Type::I32, env, OFF_ACC, "acc");
    let t = ir.new_temp(Type::I32);
    let skip = ir.new_label();
    ir.gen_movi(Type::I32, t, 0xffff_fffe);
    ir.gen_brcondi(Type::I32, t, 0, tcg_core::Cond::Lt, skip);
    ir.gen_movi(Type::I32, acc, 99);
    ir.gen_set_label(skip);
    ir.gen_setcondi(Type::I32, acc, t, 0xffff_fffe, tcg_core::Cond::Eq);
    ir.gen_exit_tb(5);
    assert_eq!(interpret(&ir, &mut toy), Ok(TbExit::Exit(5)));
    assert_eq!(toy.env.acc, 1);
}

#[test]
fn interp_extr_reads_full_width_source() {
    let mut toy = Toy::new(&[]);
    let mut ir = Context::new();
    let env = ir.new_fixed(Type::I64, "env");
    let pc = ir.new_global(Type::I32, env, OFF_PC, "pc");
    let acc = ir.new_global(Type::I32, env, OFF_ACC, "acc");
    let wide = ir.new_temp(Type::I64);
    ir.gen_movi(Type::I64, wide, 0x1234_5678_9abc_def0);
    ir.gen_extr_i64_i32(pc, acc, wide);
    ir.gen_exit_tb(0);
    assert_eq!(interpret(&ir, &mut toy), Ok(TbExit::Exit(0)));
    assert_eq!(toy.env.pc, 0x9abc_def0);
    assert_eq!(toy.env.acc, 0x1234_5678);
}

#[test]
fn interp_unknown_helper_is_an_error() {
    let mut toy = Toy::new(&[]);
    let mut ir = Context::new();
    ir.gen_call_void(1234, &[]);
    ir.gen_exit_tb(0);
    assert_eq!(interpret(&ir, &mut toy), Err(ExecError::UnknownHelper(1234)));
}

#[test]
fn interp_env_access_is_bounds_checked() {
    let mut toy = Toy::new(&[]);
    let mut ir = Context::new();
    let env = ir.new_fixed(Type::I64, "env");
    let t = ir.new_temp(Type::I32);
    ir.gen_ld(Type::I32, t, env, 64);
    ir.gen_exit_tb(0);
    assert!(matches!(
        interpret(&ir, &mut toy),
        Err(ExecError::EnvAccess { offset: 64, size: 4 })
    ));
}

#[test]
fn interp_missing_exit_is_an_error() {
    let mut toy = Toy::new(&[]);
    let mut ir = Context::new();
    ir.gen_insn_start(0, 0, 0);
    assert_eq!(interpret(&ir, &mut toy), Err(ExecError::FellOffEnd));
}

// ── Execution loop ───────────────────────────────────────────

#[test]
fn loop_caches_translations() {
    // A self-loop: each pass adds 2.
    let mut toy = Toy::new(&[insn(OP_ADD, 2), insn(OP_JUMP, 0)]);
    let mut env = ExecEnv::default();
    let r = cpu_exec_loop(&mut env, &mut toy, 20);
    assert_eq!(r, Ok(ExitReason::Budget));
    assert_eq!(toy.env.acc, 20);
    assert_eq!(toy.translations, 1);
    assert_eq!(env.tb_store.len(), 1);
    // The block chained to itself.
    assert_eq!(env.tb_store.get(0).jmp_dest[0], Some(0));
}

#[test]
fn loop_without_chaining_still_runs() {
    let mut toy = Toy::new(&[insn(OP_ADD, 2), insn(OP_JUMP, 0)]);
    let mut env = ExecEnv::new(CF_NO_GOTO_TB);
    assert_eq!(cpu_exec_loop(&mut env, &mut toy, 6), Ok(ExitReason::Budget));
    assert_eq!(toy.env.acc, 6);
    assert_eq!(env.tb_store.get(0).jmp_dest[0], None);
}

#[test]
fn loop_stops_on_halt_and_exception() {
    let mut toy = Toy::new(&[
        insn(OP_JUMP, 8),
        insn(OP_HALT, 0),
        insn(OP_FAULT, 0),
        insn(OP_HALT, 0),
    ]);
    let mut env = ExecEnv::default();
    assert_eq!(cpu_exec_loop(&mut env, &mut toy, 100), Ok(ExitReason::Exception));
    assert_eq!(toy.env.pc, 8);

    let mut toy = Toy::new(&[insn(OP_ADD, 1), insn(OP_HALT, 0)]);
    let mut env = ExecEnv::default();
    assert_eq!(cpu_exec_loop(&mut env, &mut toy, 100), Ok(ExitReason::Halted));
    assert_eq!(toy.env.pc, 8);
}

#[test]
fn tb_flush_forces_retranslation() {
    let mut toy = Toy::new(&[insn(OP_ADD, 1), insn(OP_JUMP, 0)]);
    let mut env = ExecEnv::default();
    cpu_exec_loop(&mut env, &mut toy, 2).unwrap();
    env.tb_flush();
    toy.code[0] = insn(OP_ADD, 10);
    let before = toy.env.acc;
    cpu_exec_loop(&mut env, &mut toy, 2).unwrap();
    assert_eq!(toy.translations, 2);
    assert_eq!(toy.env.acc, before + 10);
}

#[test]
fn empty_translation_is_an_error() {
    struct Empty(Toy);
    impl ExecHost for Empty {
        fn env_ptr(&mut self) -> *mut u8 {
            self.0.env_ptr()
        }
        fn env_size(&self) -> usize {
            self.0.env_size()
        }
        fn load(&mut self, a: u32, m: MemOp, i: u32) -> Result<u64, Unwind> {
            self.0.load(a, m, i)
        }
        fn store(&mut self, a: u32, v: u64, m: MemOp, i: u32) -> Result<(), Unwind> {
            self.0.store(a, v, m, i)
        }
        fn cmpxchg(&mut self, a: u32, c: u64, n: u64, m: MemOp, i: u32) -> Result<u64, Unwind> {
            self.0.cmpxchg(a, c, n, m, i)
        }
        fn xchg(&mut self, a: u32, n: u64, m: MemOp, i: u32) -> Result<u64, Unwind> {
            self.0.xchg(a, n, m, i)
        }
        fn call_helper(&mut self, id: u32, args: &[u64]) -> Result<u64, Unwind> {
            self.0.call_helper(id, args)
        }
        fn restore_state(&mut self, data: &[u32; 3]) {
            self.0.restore_state(data)
        }
    }
    impl GuestCpu for Empty {
        fn get_pc(&self) -> u32 {
            0x40
        }
        fn get_flags(&self) -> u64 {
            0
        }
        fn gen_code(&mut self, _ir: &mut Context, _pc: u32, _f: u64, _c: u32) -> u32 {
            0
        }
    }
    let mut env = ExecEnv::default();
    let mut e = Empty(Toy::new(&[]));
    assert_eq!(cpu_exec_loop(&mut env, &mut e, 1), Err(ExecError::EmptyBlock(0x40)));
}
