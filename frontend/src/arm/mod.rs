//! AArch32 guest: CPU state, runtime helpers and the A32/T32
//! translator.

pub mod config;
pub mod coproc;
pub mod cpu;
pub mod helper;
pub mod machine;
pub mod syndrome;
pub mod translate;

/// Generated A32, T32 and T16 decoders.
#[allow(dead_code, clippy::all)]
pub mod decode {
    include!(concat!(env!("OUT_DIR"), "/arm_decode.rs"));
}

/// Generated VFP decoders (conditional and unconditional space).
#[allow(dead_code, clippy::all)]
pub mod vfp_decode {
    include!(concat!(env!("OUT_DIR"), "/vfp_decode.rs"));
}

/// Generated Advanced SIMD decoders (data processing and
/// element/structure load/store), in A32 encoding.
#[allow(dead_code, clippy::all)]
pub mod neon_decode {
    include!(concat!(env!("OUT_DIR"), "/neon_decode.rs"));
}

pub use config::{ArmCpuConfig, ArmFeature};
pub use cpu::{ArmCpu, ArmEnv, TbFlags};
pub use machine::{ArmMachine, MachineError};
pub use translate::{gen_intermediate_code, CodeFetch, CodeSlice};
