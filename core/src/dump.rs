//! IR dump — human-readable text output for TCG ops.
//!
//! Mirrors QEMU's `tcg_dump_ops()` in `tcg/tcg.c`.

use std::io::Write;

use crate::context::Context;
use crate::op::Op;
use crate::opcode::Opcode;
use crate::temp::{TempIdx, TempKind};
use crate::types::{Cond, MemOp, Type};

fn cond_name(c: u32) -> &'static str {
    match Cond::from_raw(c) {
        Some(Cond::Never) => "never",
        Some(Cond::Always) => "always",
        Some(Cond::Eq) => "eq",
        Some(Cond::Ne) => "ne",
        Some(Cond::Lt) => "lt",
        Some(Cond::Ge) => "ge",
        Some(Cond::Le) => "le",
        Some(Cond::Gt) => "gt",
        Some(Cond::Ltu) => "ltu",
        Some(Cond::Geu) => "geu",
        Some(Cond::Leu) => "leu",
        Some(Cond::Gtu) => "gtu",
        Some(Cond::TstEq) => "tsteq",
        Some(Cond::TstNe) => "tstne",
        None => "???",
    }
}

/// Short memop mnemonic, e.g. `ub`, `sw`, `beul`, `al+ul`.
fn memop_name(bits: u32) -> String {
    let mop = MemOp::new(bits as u16);
    let mut s = String::new();
    if mop.align_bytes() > 1 {
        s.push_str("al+");
    }
    if mop.is_bswap() {
        s.push_str("be");
    }
    s.push(if mop.is_signed() { 's' } else { 'u' });
    s.push(match mop.size() {
        0 => 'b',
        1 => 'w',
        2 => 'l',
        _ => 'q',
    });
    s
}

/// Format a temp reference for display.
fn fmt_temp(ctx: &Context, idx: TempIdx) -> String {
    let i = idx.0 as usize;
    if i >= ctx.nb_temps() as usize {
        return format!("$0x{:x}", idx.0);
    }
    let t = ctx.temp(idx);
    match t.kind {
        TempKind::Const => format!("$0x{:x}", t.val),
        TempKind::Global | TempKind::Fixed => match t.name {
            Some(name) => name.to_string(),
            None => format!("g{i}"),
        },
        TempKind::Ebb | TempKind::Tb => {
            format!("tmp{}", i as u32 - ctx.nb_globals())
        }
    }
}

/// Build the opcode name with type suffix for polymorphic ops.
fn op_name(op: &Op) -> String {
    let def = op.opc.def();
    if op.opc.is_int_polymorphic() {
        let suffix = match op.op_type {
            Type::I32 => "_i32",
            Type::I64 => "_i64",
        };
        format!("{}{suffix}", def.name)
    } else {
        def.name.to_string()
    }
}

/// Dump all IR ops in `ctx` to the given writer.
pub fn dump_ops(ctx: &Context, w: &mut impl Write) -> std::io::Result<()> {
    dump_ops_with(ctx, w, |_, _| Ok(()))
}

/// Dump IR ops with an annotation callback for `InsnStart`.
///
/// `insn_anno` is called at each guest instruction boundary with
/// `(pc, writer)`, e.g. to print the disassembly on the
/// `---- 0x...` header line.
pub fn dump_ops_with(
    ctx: &Context,
    w: &mut impl Write,
    insn_anno: impl Fn(u32, &mut dyn Write) -> std::io::Result<()>,
) -> std::io::Result<()> {
    for op in ctx.ops() {
        match op.opc {
            Opcode::InsnStart => {
                let cargs = op.cargs();
                let pc = cargs[0].0;
                write!(w, " ---- 0x{pc:08x}")?;
                insn_anno(pc, w)?;
                writeln!(w)?;
                writeln!(
                    w,
                    " insn_start $0x{pc:x}, $0x{:x}, $0x{:x}",
                    cargs[1].0, cargs[2].0
                )?;
                continue;
            }
            Opcode::SetLabel => {
                writeln!(w, " L{}:", op.cargs()[0].0)?;
                continue;
            }
            _ => {}
        }

        write!(w, " {}", op_name(op))?;

        let oargs = op.oargs();
        let iargs = op.iargs();
        for (i, &a) in oargs.iter().chain(iargs).enumerate() {
            let sep = if i > 0 { ", " } else { " " };
            write!(w, "{sep}{}", fmt_temp(ctx, a))?;
        }
        let has_prev = !oargs.is_empty() || !iargs.is_empty();
        let sep = if has_prev { ", " } else { " " };

        let cargs = op.cargs();
        match op.opc {
            Opcode::BrCond => {
                let cond = cond_name(cargs[0].0);
                write!(w, ", {cond}, L{}", cargs[1].0)?;
            }
            Opcode::SetCond | Opcode::NegSetCond | Opcode::MovCond => {
                write!(w, ", {}", cond_name(cargs[0].0))?;
            }
            Opcode::Br => write!(w, " L{}", cargs[0].0)?,
            Opcode::Call => write!(w, "{sep}helper#{}", cargs[0].0)?,
            Opcode::QemuLd
            | Opcode::QemuSt
            | Opcode::AtomicCmpXchg
            | Opcode::AtomicXchg => {
                let mop = memop_name(cargs[0].0);
                write!(w, ", {mop}, {}", cargs[1].0)?;
            }
            _ => {
                for (i, &c) in cargs.iter().enumerate() {
                    let sep = if has_prev || i > 0 { ", " } else { " " };
                    write!(w, "{sep}$0x{:x}", c.0)?;
                }
            }
        }

        writeln!(w)?;
    }
    Ok(())
}

/// Dump IR to a string; convenient for logging.
pub fn dump_to_string(ctx: &Context) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = dump_ops(ctx, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}
