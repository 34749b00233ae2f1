//! Exception numbers and ESR/HSR syndrome encodings.

// ── Exception numbers ────────────────────────────────────────────

pub const EXCP_UDEF: u32 = 1;
pub const EXCP_SWI: u32 = 2;
pub const EXCP_PREFETCH_ABORT: u32 = 3;
pub const EXCP_DATA_ABORT: u32 = 4;
pub const EXCP_IRQ: u32 = 5;
pub const EXCP_FIQ: u32 = 6;
pub const EXCP_BKPT: u32 = 7;
/// M-profile exception return through a magic PC.
pub const EXCP_EXCEPTION_EXIT: u32 = 8;
/// User-only: jump into the kernel helper page.
pub const EXCP_KERNEL_TRAP: u32 = 9;
pub const EXCP_HVC: u32 = 11;
pub const EXCP_HYP_TRAP: u32 = 12;
pub const EXCP_SMC: u32 = 13;
pub const EXCP_SEMIHOST: u32 = 16;
/// M-profile NOCP UsageFault.
pub const EXCP_NOCP: u32 = 17;
/// M-profile INVSTATE UsageFault.
pub const EXCP_INVSTATE: u32 = 18;
pub const EXCP_UNALIGNED: u32 = 22;
pub const EXCP_DIVBYZERO: u32 = 23;

/// CPU halted (WFI).
pub const EXCP_HLT: u32 = 0x10001;
pub const EXCP_DEBUG: u32 = 0x10002;
pub const EXCP_YIELD: u32 = 0x10004;

// ── Exception classes ────────────────────────────────────────────

pub const EC_UNCATEGORIZED: u32 = 0x00;
pub const EC_WFX_TRAP: u32 = 0x01;
pub const EC_CP15RTTRAP: u32 = 0x03;
pub const EC_CP15RRTTRAP: u32 = 0x04;
pub const EC_CP14RTTRAP: u32 = 0x05;
pub const EC_CP14DTTRAP: u32 = 0x06;
pub const EC_ADVSIMDFPACCESSTRAP: u32 = 0x07;
pub const EC_CP14RRTTRAP: u32 = 0x0c;
pub const EC_ILLEGALSTATE: u32 = 0x0e;
pub const EC_AA32_SVC: u32 = 0x11;
pub const EC_AA32_HVC: u32 = 0x12;
pub const EC_AA32_SMC: u32 = 0x13;
pub const EC_INSNABORT: u32 = 0x20;
pub const EC_PCALIGNMENT: u32 = 0x22;
pub const EC_DATAABORT: u32 = 0x24;
pub const EC_SOFTWARESTEP: u32 = 0x32;
pub const EC_AA32_BKPT: u32 = 0x38;

pub const EC_SHIFT: u32 = 26;
/// Instruction length bit: set for 32-bit instructions.
pub const IL: u32 = 1 << 25;
/// Instruction syndrome valid (data aborts), condition valid (traps).
pub const ISV: u32 = 1 << 24;

/// Long-descriptor fault status codes.
pub const FSC_ALIGNMENT: u32 = 0x21;
pub const FSC_EXTERNAL: u32 = 0x10;
/// Short-descriptor FSR values for the same faults.
pub const FSR_ALIGNMENT: u32 = 0x01;
pub const FSR_EXTERNAL: u32 = 0x08;

const fn il(is_16bit: bool) -> u32 {
    if is_16bit {
        0
    } else {
        IL
    }
}

pub const fn syn_get_ec(syn: u32) -> u32 {
    syn >> EC_SHIFT
}

pub const fn syn_uncategorized() -> u32 {
    (EC_UNCATEGORIZED << EC_SHIFT) | IL
}

pub const fn syn_aa32_svc(imm16: u32, is_16bit: bool) -> u32 {
    (EC_AA32_SVC << EC_SHIFT) | il(is_16bit) | (imm16 & 0xffff)
}

pub const fn syn_aa32_hvc(imm16: u32) -> u32 {
    (EC_AA32_HVC << EC_SHIFT) | IL | (imm16 & 0xffff)
}

pub const fn syn_aa32_smc() -> u32 {
    (EC_AA32_SMC << EC_SHIFT) | IL
}

pub const fn syn_aa32_bkpt(imm16: u32, is_16bit: bool) -> u32 {
    (EC_AA32_BKPT << EC_SHIFT) | il(is_16bit) | (imm16 & 0xffff)
}

/// MCR/MRC trap (`ec` is `EC_CP14RTTRAP` or `EC_CP15RTTRAP`).
#[allow(clippy::too_many_arguments)]
pub const fn syn_cp_rt_trap(
    ec: u32,
    cv: bool,
    cond: u32,
    opc1: u32,
    opc2: u32,
    crn: u32,
    rt: u32,
    crm: u32,
    isread: bool,
    is_16bit: bool,
) -> u32 {
    (ec << EC_SHIFT)
        | il(is_16bit)
        | ((cv as u32) << 24)
        | (cond << 20)
        | (opc2 << 17)
        | (opc1 << 14)
        | (crn << 10)
        | (rt << 5)
        | (crm << 1)
        | isread as u32
}

/// MCRR/MRRC trap.
#[allow(clippy::too_many_arguments)]
pub const fn syn_cp_rrt_trap(
    ec: u32,
    cv: bool,
    cond: u32,
    opc1: u32,
    crm: u32,
    rt: u32,
    rt2: u32,
    isread: bool,
    is_16bit: bool,
) -> u32 {
    (ec << EC_SHIFT)
        | il(is_16bit)
        | ((cv as u32) << 24)
        | (cond << 20)
        | (opc1 << 16)
        | (rt2 << 10)
        | (rt << 5)
        | (crm << 1)
        | isread as u32
}

pub const fn syn_fp_access_trap(cv: bool, cond: u32, is_16bit: bool, coproc: u32) -> u32 {
    (EC_ADVSIMDFPACCESSTRAP << EC_SHIFT)
        | il(is_16bit)
        | ((cv as u32) << 24)
        | (cond << 20)
        | coproc
}

pub const fn syn_simd_access_trap(cv: bool, cond: u32, is_16bit: bool) -> u32 {
    (EC_ADVSIMDFPACCESSTRAP << EC_SHIFT)
        | il(is_16bit)
        | ((cv as u32) << 24)
        | (cond << 20)
        | (1 << 5)
        | 0xa
}

pub const fn syn_wfx(cv: bool, cond: u32, ti: u32, is_16bit: bool) -> u32 {
    (EC_WFX_TRAP << EC_SHIFT) | il(is_16bit) | ((cv as u32) << 24) | (cond << 20) | ti
}

pub const fn syn_swstep(same_el: bool, isv: bool, ex: bool) -> u32 {
    ((EC_SOFTWARESTEP + same_el as u32) << EC_SHIFT)
        | IL
        | ((isv as u32) << 24)
        | ((ex as u32) << 6)
        | 0x22
}

pub const fn syn_pcalignment() -> u32 {
    (EC_PCALIGNMENT << EC_SHIFT) | IL
}

pub const fn syn_illegalstate() -> u32 {
    (EC_ILLEGALSTATE << EC_SHIFT) | IL
}

pub const fn syn_insn_abort(same_el: bool, fsc: u32) -> u32 {
    ((EC_INSNABORT + same_el as u32) << EC_SHIFT) | IL | fsc
}

/// Data abort syndrome with a valid instruction syndrome. The
/// translator records this per load/store with `wnr` and `fsc` zero;
/// the fault path fills those in.
#[allow(clippy::too_many_arguments)]
pub const fn syn_data_abort_with_iss(
    same_el: bool,
    sas: u32,
    sse: bool,
    srt: u32,
    ar: bool,
    wnr: bool,
    fsc: u32,
    is_16bit: bool,
) -> u32 {
    ((EC_DATAABORT + same_el as u32) << EC_SHIFT)
        | il(is_16bit)
        | ISV
        | (sas << 22)
        | ((sse as u32) << 21)
        | (srt << 16)
        | ((ar as u32) << 14)
        | ((wnr as u32) << 6)
        | fsc
}

pub const fn syn_data_abort_no_iss(same_el: bool, wnr: bool, fsc: u32) -> u32 {
    ((EC_DATAABORT + same_el as u32) << EC_SHIFT) | IL | ((wnr as u32) << 6) | fsc
}

/// Combine the per-instruction template recorded at translation time
/// with the fault details known only at access time.
pub const fn merge_syn_data_abort(template: u32, same_el: bool, wnr: bool, fsc: u32) -> u32 {
    if template & ISV != 0 {
        let ec = (EC_DATAABORT + same_el as u32) << EC_SHIFT;
        (template & !(0x3f << EC_SHIFT)) | ec | ((wnr as u32) << 6) | fsc
    } else {
        syn_data_abort_no_iss(same_el, wnr, fsc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svc_syndrome_il_tracks_length() {
        assert_eq!(syn_aa32_svc(0x12, false), 0x4600_0012);
        assert_eq!(syn_aa32_svc(0x12, true), 0x4400_0012);
    }

    #[test]
    fn merge_keeps_register_fields() {
        let t = syn_data_abort_with_iss(false, 2, false, 3, false, false, 0, false);
        let s = merge_syn_data_abort(t, true, true, FSC_ALIGNMENT);
        assert_eq!(syn_get_ec(s), EC_DATAABORT + 1);
        assert_eq!((s >> 16) & 0x1f, 3);
        assert_eq!((s >> 22) & 3, 2);
        assert_ne!(s & (1 << 6), 0);
        assert_eq!(s & 0x3f, FSC_ALIGNMENT);
    }

    #[test]
    fn merge_without_iss_drops_template() {
        let s = merge_syn_data_abort(0, false, false, FSC_EXTERNAL);
        assert_eq!(s & ISV, 0);
        assert_eq!(s & 0x3f, FSC_EXTERNAL);
    }
}
