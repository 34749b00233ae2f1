use log::{debug, trace};
use tcg_core::tb::{cflags::CF_NO_GOTO_TB, TranslationBlock};

use crate::interp::{interpret, TbExit};
use crate::{ExecEnv, ExecError, GuestCpu};

/// Reason the execution loop exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A guest exception is pending in the CPU state.
    Exception,
    /// The CPU halted (e.g. WFI with nothing to wake it).
    Halted,
    /// The instruction budget ran out.
    Budget,
}

/// Main CPU execution loop.
///
/// Repeatedly looks up or translates TBs and executes them until a
/// guest exception is raised or `budget` guest instructions have
/// been executed.
pub fn cpu_exec_loop<C: GuestCpu>(
    env: &mut ExecEnv,
    cpu: &mut C,
    budget: u64,
) -> Result<ExitReason, ExecError> {
    let mut next_tb_hint: Option<usize> = None;
    let mut executed = 0u64;

    loop {
        if executed >= budget {
            return Ok(ExitReason::Budget);
        }
        let tb_idx = match next_tb_hint.take() {
            Some(idx) => idx,
            None => tb_find(env, cpu)?,
        };

        let exit = interpret(env.tb_store.code(tb_idx), cpu)?;
        executed += env.tb_store.get(tb_idx).icount as u64;
        trace!("tb {tb_idx} exit {exit:?}");

        match exit {
            TbExit::Chain(slot) => {
                // Direct branch: follow an existing chain link if
                // it still matches, otherwise look up and link.
                let pc = cpu.get_pc();
                let flags = cpu.get_flags();
                let linked = env.tb_store.get(tb_idx).jmp_dest[slot];
                let dst = match linked {
                    Some(d) if env.tb_store.matches(d, pc, flags, env.cflags) => d,
                    _ => {
                        let d = tb_find(env, cpu)?;
                        if env.cflags & CF_NO_GOTO_TB == 0 {
                            env.tb_store.get_mut(tb_idx).set_jmp_dest(slot, d);
                        }
                        d
                    }
                };
                next_tb_hint = Some(dst);
            }
            TbExit::Lookup | TbExit::Exit(_) => {}
            TbExit::Exception => {
                return Ok(if cpu.is_halted() {
                    ExitReason::Halted
                } else {
                    ExitReason::Exception
                });
            }
        }
    }
}

/// Find a TB for the CPU's current (pc, flags), translating if needed.
fn tb_find<C: GuestCpu>(env: &mut ExecEnv, cpu: &mut C) -> Result<usize, ExecError> {
    let pc = cpu.get_pc();
    let flags = cpu.get_flags();

    // Fast path: jump cache
    if let Some(idx) = env.jump_cache.lookup(pc) {
        if idx < env.tb_store.len() && env.tb_store.matches(idx, pc, flags, env.cflags) {
            return Ok(idx);
        }
    }

    // Slow path: hash table
    if let Some(idx) = env.tb_store.lookup(pc, flags, env.cflags) {
        env.jump_cache.insert(pc, idx);
        return Ok(idx);
    }

    // Miss: translate a new TB
    tb_gen_code(env, cpu, pc, flags)
}

/// Translate guest code at `pc` into a new TB.
fn tb_gen_code<C: GuestCpu>(
    env: &mut ExecEnv,
    cpu: &mut C,
    pc: u32,
    flags: u64,
) -> Result<usize, ExecError> {
    env.ir_ctx.reset();
    let size = cpu.gen_code(&mut env.ir_ctx, pc, flags, env.cflags);
    let icount = env.ir_ctx.insn_starts().len();
    if icount == 0 {
        return Err(ExecError::EmptyBlock(pc));
    }
    debug!("translated tb pc={pc:#x} flags={flags:#x} insns={icount} size={size}");

    let mut tb = TranslationBlock::new(pc, flags, env.cflags);
    tb.size = size;
    tb.icount = icount as u16;
    let tb_idx = env.tb_store.alloc(tb, env.ir_ctx.clone())?;

    env.tb_store.insert(tb_idx);
    env.jump_cache.insert(pc, tb_idx);
    Ok(tb_idx)
}
