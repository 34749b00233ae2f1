//! TCG Execution Engine — TB cache, execution loop and a reference
//! IR interpreter.
//!
//! Drives the lookup → translate → execute cycle. Translated blocks
//! are kept as IR and run by [`interp::interpret`], which talks to
//! the guest through the [`ExecHost`] trait.
//!
//! Reference: `~/qemu/accel/tcg/cpu-exec.c`,
//! `~/qemu/accel/tcg/translate-all.c`.

pub mod exec_loop;
pub mod interp;
pub mod tb_store;

pub use exec_loop::{cpu_exec_loop, ExitReason};
pub use interp::{interpret, TbExit};
pub use tb_store::TbStore;

use tcg_core::tb::JumpCache;
use tcg_core::{Context, MemOp, Opcode};
use thiserror::Error;

/// Host-level execution failures.
///
/// Guest exceptions are not errors: they surface as
/// [`TbExit::Exception`] with the exception recorded in the CPU.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("unknown helper id {0}")]
    UnknownHelper(u32),
    #[error("malformed IR: {opc:?} at op {op}")]
    InvalidOp { op: usize, opc: Opcode },
    #[error("branch to unplaced label L{0}")]
    UnresolvedLabel(u32),
    #[error("env access out of bounds: offset {offset}, size {size}")]
    EnvAccess { offset: i64, size: usize },
    #[error("translation block has no exit")]
    FellOffEnd,
    #[error("op budget exhausted inside one translation block")]
    StepLimit,
    #[error("translation block store is full")]
    TbStoreFull,
    #[error("translation produced an empty block at pc {0:#x}")]
    EmptyBlock(u32),
}

/// Non-local exit out of a helper or guest memory access.
///
/// Maps to QEMU's `cpu_loop_exit()` family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unwind {
    /// A guest exception is pending; CPU state is already final.
    Exception,
    /// A guest exception is pending and PC/IT state must first be
    /// restored from the faulting instruction's `insn_start` data
    /// (`cpu_loop_exit_restore`).
    ExceptionRestore,
    /// Host-level failure.
    Error(ExecError),
}

impl From<ExecError> for Unwind {
    fn from(e: ExecError) -> Self {
        Unwind::Error(e)
    }
}

/// The interpreter's view of the guest machine.
pub trait ExecHost {
    /// Raw pointer to the CPU env struct that globals index into.
    fn env_ptr(&mut self) -> *mut u8;

    /// Size of the CPU env struct in bytes.
    fn env_size(&self) -> usize;

    /// Guest memory load; the value is zero-extended from the
    /// access size.
    fn load(&mut self, addr: u32, memop: MemOp, mem_idx: u32)
        -> Result<u64, Unwind>;

    /// Guest memory store.
    fn store(
        &mut self,
        addr: u32,
        val: u64,
        memop: MemOp,
        mem_idx: u32,
    ) -> Result<(), Unwind>;

    /// Atomic compare-and-exchange, returning the old value.
    fn cmpxchg(
        &mut self,
        addr: u32,
        cmp: u64,
        new: u64,
        memop: MemOp,
        mem_idx: u32,
    ) -> Result<u64, Unwind>;

    /// Atomic exchange, returning the old value.
    fn xchg(
        &mut self,
        addr: u32,
        new: u64,
        memop: MemOp,
        mem_idx: u32,
    ) -> Result<u64, Unwind>;

    /// Call runtime helper `id`.
    fn call_helper(&mut self, id: u32, args: &[u64]) -> Result<u64, Unwind>;

    /// Restore PC and per-insn state from `insn_start` parameters.
    fn restore_state(&mut self, data: &[u32; 3]);
}

/// Trait for guest CPU state used by the execution loop.
///
/// Each guest architecture implements this to provide PC/flags
/// access and frontend translation.
pub trait GuestCpu: ExecHost {
    /// Return the current guest program counter.
    fn get_pc(&self) -> u32;

    /// Return CPU flags that affect translation.
    fn get_flags(&self) -> u64;

    /// Translate guest code starting at `pc` into IR.
    ///
    /// Returns the number of guest bytes translated.
    fn gen_code(
        &mut self,
        ir: &mut Context,
        pc: u32,
        flags: u64,
        cflags: u32,
    ) -> u32;

    /// Whether the CPU stopped (WFI, halt) rather than taking an
    /// exception that needs delivery.
    fn is_halted(&self) -> bool {
        false
    }
}

/// Execution environment holding all shared translation state.
pub struct ExecEnv {
    pub tb_store: TbStore,
    pub jump_cache: JumpCache,
    pub ir_ctx: Context,
    /// Compile flags applied to every new TB.
    pub cflags: u32,
}

impl ExecEnv {
    pub fn new(cflags: u32) -> Self {
        Self {
            tb_store: TbStore::new(),
            jump_cache: JumpCache::new(),
            ir_ctx: Context::new(),
            cflags,
        }
    }

    /// Drop every cached translation, e.g. after guest code changed.
    pub fn tb_flush(&mut self) {
        self.tb_store.flush();
        self.jump_cache.invalidate();
    }
}

impl Default for ExecEnv {
    fn default() -> Self {
        Self::new(0)
    }
}
