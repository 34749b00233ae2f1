//! A minimal AArch32 machine: one CPU and a flat block of RAM.
//!
//! `ArmMachine` is what the execution loop drives. Guest memory is a
//! little-endian byte array at `ram_base`; big-endian accesses arrive
//! with `MemOp::BSWAP` set. Misaligned or unmapped accesses become
//! data aborts whose syndrome is completed from the faulting
//! instruction's `insn_start` data.

use tcg_core::{Context, MemOp};
use tcg_exec::{cpu_exec_loop, ExecEnv, ExecError, ExecHost, ExitReason, GuestCpu, Unwind};
use thiserror::Error;

use super::config::ArmCpuConfig;
use super::cpu::{ArmCpu, ArmEnv, CpuInitError};
use super::helper;
use super::syndrome::{
    merge_syn_data_abort, EXCP_DATA_ABORT, EXCP_UNALIGNED, FSC_ALIGNMENT, FSC_EXTERNAL,
    FSR_ALIGNMENT, FSR_EXTERNAL,
};
use super::translate::{gen_intermediate_code, CodeSlice};

/// TTBCR.EAE: fault status is reported in the long-descriptor format.
const TTBCR_EAE: u32 = 1 << 31;
/// Long-descriptor FSR format bit.
const FSR_LPAE: u32 = 1 << 9;

#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    Cpu(#[from] CpuInitError),
    #[error("{len} bytes at {addr:#x} fall outside RAM")]
    OutOfRange { addr: u32, len: usize },
}

/// Fault details known only at access time; merged into the
/// syndrome template once the faulting instruction is restored.
#[derive(Debug, Clone, Copy)]
struct PendingAbort {
    wnr: bool,
    fsc: u32,
}

pub struct ArmMachine {
    pub cpu: ArmCpu,
    ram_base: u32,
    ram: Vec<u8>,
    pending_abort: Option<PendingAbort>,
}

impl ArmMachine {
    /// Build a machine with `ram_size` zeroed bytes mapped at
    /// `ram_base`.
    pub fn new(config: ArmCpuConfig, ram_base: u32, ram_size: usize) -> Result<Self, MachineError> {
        Ok(Self {
            cpu: ArmCpu::new(config)?,
            ram_base,
            ram: vec![0; ram_size],
            pending_abort: None,
        })
    }

    pub fn env(&self) -> &ArmEnv {
        &self.cpu.env
    }

    pub fn env_mut(&mut self) -> &mut ArmEnv {
        &mut self.cpu.env
    }

    pub fn ram_base(&self) -> u32 {
        self.ram_base
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    fn ram_offset(&self, addr: u32, len: usize) -> Option<usize> {
        let off = addr.checked_sub(self.ram_base)? as usize;
        (off.checked_add(len)? <= self.ram.len()).then_some(off)
    }

    /// Copy `bytes` into RAM at `addr`. Any translation covering the
    /// range must be flushed by the caller.
    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), MachineError> {
        let off = self
            .ram_offset(addr, bytes.len())
            .ok_or(MachineError::OutOfRange { addr, len: bytes.len() })?;
        self.ram[off..off + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_bytes(&self, addr: u32, len: usize) -> Result<&[u8], MachineError> {
        let off = self
            .ram_offset(addr, len)
            .ok_or(MachineError::OutOfRange { addr, len })?;
        Ok(&self.ram[off..off + len])
    }

    /// Store 32-bit words in little-endian byte order at `addr`.
    pub fn load_words(&mut self, addr: u32, words: &[u32]) -> Result<(), MachineError> {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.write_bytes(addr, &bytes)
    }

    /// Store 16-bit halfwords in little-endian byte order at `addr`.
    pub fn load_halfwords(&mut self, addr: u32, halves: &[u16]) -> Result<(), MachineError> {
        let bytes: Vec<u8> = halves.iter().flat_map(|h| h.to_le_bytes()).collect();
        self.write_bytes(addr, &bytes)
    }

    pub fn read_u32(&self, addr: u32) -> Result<u32, MachineError> {
        let b = self.read_bytes(addr, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Run from the current state for at most `budget` guest
    /// instructions.
    pub fn run(&mut self, exec: &mut ExecEnv, budget: u64) -> Result<ExitReason, ExecError> {
        self.cpu.rebuild_hflags();
        self.pending_abort = None;
        cpu_exec_loop(exec, self, budget)
    }

    /// Check an access and return its RAM offset, or record the data
    /// abort it raises.
    fn access(&mut self, addr: u32, memop: MemOp, wnr: bool) -> Result<usize, Unwind> {
        let size = memop.size_bytes();
        if addr & (memop.align_bytes() - 1) != 0 {
            return Err(self.data_abort(addr, wnr, FSC_ALIGNMENT, FSR_ALIGNMENT));
        }
        match self.ram_offset(addr, size as usize) {
            Some(off) => Ok(off),
            None => Err(self.data_abort(addr, wnr, FSC_EXTERNAL, FSR_EXTERNAL)),
        }
    }

    fn data_abort(&mut self, addr: u32, wnr: bool, fsc: u32, fsr: u32) -> Unwind {
        let m = self.cpu.is_m_profile();
        let excp = if m && fsc == FSC_ALIGNMENT {
            EXCP_UNALIGNED
        } else {
            EXCP_DATA_ABORT
        };
        let el = self.cpu.exception_target_el();
        log::debug!("data abort at {addr:#x} fsc {fsc:#x} wnr {wnr}");
        let _ = self.cpu.raise_exception(excp, 0, el);
        let env = &mut *self.cpu.env;
        env.exception.vaddress = addr;
        env.exception.fsr = if !m && env.cp15.ttbcr & TTBCR_EAE != 0 {
            FSR_LPAE | fsc
        } else {
            fsr
        };
        self.pending_abort = Some(PendingAbort { wnr, fsc });
        Unwind::ExceptionRestore
    }

    fn read_raw(&self, off: usize, size: u32) -> u64 {
        self.ram[off..off + size as usize]
            .iter()
            .rev()
            .fold(0, |acc, &b| acc << 8 | b as u64)
    }

    fn write_raw(&mut self, off: usize, size: u32, val: u64) {
        for (i, b) in self.ram[off..off + size as usize].iter_mut().enumerate() {
            *b = (val >> (i * 8)) as u8;
        }
    }
}

/// Reverse the bytes of the low `size` bytes of `val`.
fn bswap(val: u64, size: u32) -> u64 {
    if size <= 1 {
        val
    } else {
        val.swap_bytes() >> (64 - size * 8)
    }
}

fn size_mask(size: u32) -> u64 {
    if size >= 8 {
        u64::MAX
    } else {
        (1u64 << (size * 8)) - 1
    }
}

impl ExecHost for ArmMachine {
    fn env_ptr(&mut self) -> *mut u8 {
        &mut *self.cpu.env as *mut ArmEnv as *mut u8
    }

    fn env_size(&self) -> usize {
        std::mem::size_of::<ArmEnv>()
    }

    fn load(&mut self, addr: u32, memop: MemOp, _mem_idx: u32) -> Result<u64, Unwind> {
        let off = self.access(addr, memop, false)?;
        let size = memop.size_bytes();
        let v = self.read_raw(off, size);
        Ok(if memop.is_bswap() { bswap(v, size) } else { v })
    }

    fn store(&mut self, addr: u32, val: u64, memop: MemOp, _mem_idx: u32) -> Result<(), Unwind> {
        let off = self.access(addr, memop, true)?;
        let size = memop.size_bytes();
        let v = if memop.is_bswap() { bswap(val, size) } else { val };
        self.write_raw(off, size, v);
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
        // Report any fault as a write, as for a store-exclusive.
        self.access(addr, memop, true)?;
        let mask = size_mask(memop.size_bytes());
        let old = self.load(addr, memop, mem_idx)?;
        if old == cmp & mask {
            self.store(addr, new & mask, memop, mem_idx)?;
        }
        Ok(old)
    }

    fn xchg(&mut self, addr: u32, new: u64, memop: MemOp, mem_idx: u32) -> Result<u64, Unwind> {
        self.access(addr, memop, true)?;
        let old = self.load(addr, memop, mem_idx)?;
        self.store(addr, new & size_mask(memop.size_bytes()), memop, mem_idx)?;
        Ok(old)
    }

    fn call_helper(&mut self, id: u32, args: &[u64]) -> Result<u64, Unwind> {
        helper::call(&mut self.cpu, id, args)
    }

    fn restore_state(&mut self, data: &[u32; 3]) {
        let same_el = self.cpu.env.exception.target_el == self.cpu.current_el();
        let env = &mut *self.cpu.env;
        env.regs[15] = data[0];
        env.condexec_bits = data[1];
        if let Some(PendingAbort { wnr, fsc }) = self.pending_abort.take() {
            env.exception.syndrome = merge_syn_data_abort(data[2], same_el, wnr, fsc);
        }
    }
}

impl GuestCpu for ArmMachine {
    fn get_pc(&self) -> u32 {
        self.cpu.env.regs[15]
    }

    fn get_flags(&self) -> u64 {
        self.cpu.lookup_flags()
    }

    fn gen_code(&mut self, ir: &mut Context, pc: u32, flags: u64, cflags: u32) -> u32 {
        let code = CodeSlice::new(self.ram_base, &self.ram);
        gen_intermediate_code(ir, &code, &self.cpu.config, &self.cpu.cpregs, pc, flags, cflags)
    }

    fn is_halted(&self) -> bool {
        self.cpu.env.halted != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::syndrome::{syn_data_abort_with_iss, syn_get_ec, EC_DATAABORT, ISV};

    fn machine() -> ArmMachine {
        ArmMachine::new(ArmCpuConfig::cortex_a15(), 0x1000, 0x1000).unwrap()
    }

    #[test]
    fn little_and_big_endian_loads() {
        let mut m = machine();
        m.write_bytes(0x1100, &[0x11, 0x22, 0x33, 0x44]).unwrap();
        assert_eq!(m.load(0x1100, MemOp::ul(), 0), Ok(0x4433_2211));
        assert_eq!(m.load(0x1100, MemOp::ul().with(MemOp::BSWAP), 0), Ok(0x1122_3344));
        assert_eq!(m.load(0x1102, MemOp::uw().with(MemOp::BSWAP), 0), Ok(0x3344));
        assert_eq!(m.load(0x1103, MemOp::ub().with(MemOp::BSWAP), 0), Ok(0x44));
    }

    #[test]
    fn big_endian_store_round_trips_bytes() {
        let mut m = machine();
        m.store(0x1200, 0xaabb_ccdd, MemOp::ul().with(MemOp::BSWAP), 0).unwrap();
        assert_eq!(m.read_bytes(0x1200, 4).unwrap(), &[0xaa, 0xbb, 0xcc, 0xdd]);
    }

    #[test]
    fn misaligned_access_records_alignment_fault() {
        let mut m = machine();
        let r = m.store(0x1102, 0, MemOp::ul().with(MemOp::ALIGN), 0);
        assert_eq!(r, Err(Unwind::ExceptionRestore));
        assert_eq!(m.env().exception.index, EXCP_DATA_ABORT);
        assert_eq!(m.env().exception.vaddress, 0x1102);
        assert_eq!(m.env().exception.fsr, FSR_ALIGNMENT);

        let template = syn_data_abort_with_iss(false, 2, false, 4, false, false, 0, false);
        m.restore_state(&[0x1010, 0, template]);
        let syn = m.env().exception.syndrome;
        assert_eq!(m.env().regs[15], 0x1010);
        assert_ne!(syn & ISV, 0);
        assert_ne!(syn & (1 << 6), 0);
        assert_eq!(syn & 0x3f, FSC_ALIGNMENT);
        assert_eq!((syn >> 16) & 0x1f, 4);
    }

    #[test]
    fn unaligned_without_align_flag_is_allowed() {
        let mut m = machine();
        m.write_bytes(0x1101, &[1, 2, 3, 4]).unwrap();
        assert_eq!(m.load(0x1101, MemOp::ul(), 0), Ok(0x0403_0201));
    }

    #[test]
    fn unmapped_access_is_external_abort() {
        let mut m = machine();
        assert_eq!(m.load(0x4000, MemOp::ul(), 0), Err(Unwind::ExceptionRestore));
        assert_eq!(m.env().exception.fsr, FSR_EXTERNAL);
        m.restore_state(&[0x1000, 0, 0]);
        let syn = m.env().exception.syndrome;
        assert_eq!(syn & ISV, 0);
        assert!(syn_get_ec(syn) == EC_DATAABORT || syn_get_ec(syn) == EC_DATAABORT + 1);
        assert_eq!(syn & 0x3f, FSC_EXTERNAL);
    }

    #[test]
    fn cmpxchg_only_writes_on_match() {
        let mut m = machine();
        m.load_words(0x1000, &[5]).unwrap();
        assert_eq!(m.cmpxchg(0x1000, 4, 9, MemOp::ul(), 0), Ok(5));
        assert_eq!(m.read_u32(0x1000).unwrap(), 5);
        assert_eq!(m.cmpxchg(0x1000, 5, 9, MemOp::ul(), 0), Ok(5));
        assert_eq!(m.read_u32(0x1000).unwrap(), 9);
    }

    #[test]
    fn restore_without_fault_keeps_syndrome() {
        let mut m = machine();
        m.env_mut().exception.syndrome = 0x1234;
        m.restore_state(&[0x1004, 0x0c, 0xffff]);
        assert_eq!(m.env().exception.syndrome, 0x1234);
        assert_eq!(m.env().condexec_bits, 0x0c);
    }

    #[test]
    fn writes_outside_ram_are_rejected() {
        let mut m = machine();
        assert!(matches!(
            m.write_bytes(0x1ffe, &[0; 4]),
            Err(MachineError::OutOfRange { addr: 0x1ffe, len: 4 })
        ));
    }
}
