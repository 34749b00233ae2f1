//! A small port of QEMU's `scripts/decodetree.py`.
//!
//! Reads `.decode` files (fields, argument sets, formats, patterns)
//! and emits a Rust decoder: one `ArgsX` struct per argument set, a
//! `Decode` trait with one `trans_*` method per pattern, and a
//! `decode` function that tries the patterns in file order.
//!
//! Pattern groups (`{ }` and `[ ]`) are flattened: patterns are tried
//! in order and a `trans_*` returning `false` falls through to the
//! next matching pattern, which gives QEMU's overlap-group semantics.
//!
//! Several decode files can share one trait and one set of argument
//! structs through [`generate_set`]; each file then gets its own
//! module holding its field extractors and `decode` function.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

// ── Data structures ─────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSegment {
    pub pos: u32,
    pub len: u32,
    pub signed: bool,
}

/// `%name seg... [!function=f]`. A field with no segments and a
/// function is computed by the function alone.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub segments: Vec<FieldSegment>,
    pub func: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgSet {
    pub name: String,
    pub fields: Vec<String>,
    pub is_extern: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldMapping {
    FieldRef(String),
    Inline { pos: u32, len: u32, signed: bool },
    Const(i64),
}

#[derive(Clone, Debug)]
pub struct Format {
    #[allow(dead_code)]
    pub name: String,
    pub fixedbits: u32,
    pub fixedmask: u32,
    pub args_name: String,
    pub field_map: BTreeMap<String, FieldMapping>,
}

#[derive(Clone, Debug)]
pub struct Pattern {
    pub name: String,
    pub fixedbits: u32,
    pub fixedmask: u32,
    pub args_name: String,
    pub field_map: BTreeMap<String, FieldMapping>,
}

#[derive(Debug)]
pub struct Parsed {
    pub width: u32,
    pub fields: BTreeMap<String, Field>,
    pub argsets: BTreeMap<String, ArgSet>,
    pub patterns: Vec<Pattern>,
}

/// One input file for [`generate_set`].
pub struct DecodeUnit<'a> {
    /// Module the file's decoder is emitted into.
    pub module: &'a str,
    /// Contents of the `.decode` file.
    pub input: &'a str,
    /// Instruction width in bits (16 or 32).
    pub width: u32,
}

// ── Bit-pattern parsing ─────────────────────────────────────────

pub fn is_bit_char(c: char) -> bool {
    matches!(c, '0' | '1' | '.' | '-')
}

pub fn is_bit_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_bit_char)
}

/// `name:len` or `name:slen`.
pub fn is_inline_field(s: &str) -> bool {
    if let Some(idx) = s.find(':') {
        let name = &s[..idx];
        let rest = &s[idx + 1..];
        let rest = rest.strip_prefix('s').unwrap_or(rest);
        !name.is_empty()
            && name.chars().all(|c| c.is_alphanumeric() || c == '_')
            && !rest.is_empty()
            && rest.chars().all(|c| c.is_ascii_digit())
    } else {
        false
    }
}

pub struct BitPatternResult {
    pub fixedbits: u32,
    pub fixedmask: u32,
    /// name -> (pos, len, signed)
    pub inline_fields: BTreeMap<String, (u32, u32, bool)>,
}

pub fn parse_bit_tokens(
    tokens: &[&str],
    width: u32,
) -> Result<BitPatternResult, String> {
    let mut fixedbits: u32 = 0;
    let mut fixedmask: u32 = 0;
    let mut inline_fields = BTreeMap::new();
    let mut bit_pos: i32 = width as i32 - 1;

    for &tok in tokens {
        if is_bit_token(tok) {
            for c in tok.chars() {
                if bit_pos < 0 {
                    return Err(format!("bit pattern exceeds {width} bits"));
                }
                match c {
                    '1' => {
                        fixedbits |= 1 << bit_pos;
                        fixedmask |= 1 << bit_pos;
                    }
                    '0' => {
                        fixedmask |= 1 << bit_pos;
                    }
                    _ => {}
                }
                bit_pos -= 1;
            }
        } else if let Some((name, rest)) = tok.split_once(':') {
            if !is_inline_field(tok) {
                break;
            }
            let (signed, len_str) = match rest.strip_prefix('s') {
                Some(l) => (true, l),
                None => (false, rest),
            };
            let len: u32 = len_str
                .parse()
                .map_err(|e| format!("bad inline field len: {e}"))?;
            if bit_pos + 1 < len as i32 {
                return Err(format!("bit pattern exceeds {width} bits"));
            }
            let pos = (bit_pos - len as i32 + 1) as u32;
            inline_fields.insert(name.to_string(), (pos, len, signed));
            bit_pos -= len as i32;
        } else {
            break;
        }
    }
    if bit_pos != -1 {
        return Err(format!(
            "bit pattern covers {} of {width} bits",
            width as i32 - 1 - bit_pos
        ));
    }
    Ok(BitPatternResult {
        fixedbits,
        fixedmask,
        inline_fields,
    })
}

pub fn count_bit_tokens(tokens: &[&str]) -> usize {
    tokens
        .iter()
        .take_while(|t| is_bit_token(t) || is_inline_field(t))
        .count()
}

// ── Field segment parsing ──────────────────────────────────────

pub fn parse_field_segment(s: &str) -> Result<FieldSegment, String> {
    let (pos_str, rest) = s
        .split_once(':')
        .ok_or_else(|| format!("bad segment: {s}"))?;
    let signed = rest.starts_with('s');
    let len_str = if signed { &rest[1..] } else { rest };
    let pos: u32 =
        pos_str.parse().map_err(|_| format!("bad pos: {pos_str}"))?;
    let len: u32 =
        len_str.parse().map_err(|_| format!("bad len: {len_str}"))?;
    Ok(FieldSegment { pos, len, signed })
}

pub fn parse_field(line: &str) -> Result<Field, String> {
    // %name seg1 seg2 ... [!function=func]
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let name = tokens[0][1..].to_string(); // skip %
    let mut segments = Vec::new();
    let mut func = None;
    for &tok in &tokens[1..] {
        if let Some(f) = tok.strip_prefix("!function=") {
            func = Some(f.to_string());
        } else {
            segments.push(parse_field_segment(tok)?);
        }
    }
    if segments.is_empty() && func.is_none() {
        return Err(format!("field %{name} has no segments"));
    }
    Ok(Field {
        name,
        segments,
        func,
    })
}

pub fn parse_argset(line: &str) -> Result<ArgSet, String> {
    // &name field1 field2 ... [!extern]
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let name = tokens[0][1..].to_string(); // skip &
    let is_extern = tokens.last() == Some(&"!extern");
    let end = if is_extern {
        tokens.len() - 1
    } else {
        tokens.len()
    };
    let fields = tokens[1..end].iter().map(|s| s.to_string()).collect();
    Ok(ArgSet {
        name,
        fields,
        is_extern,
    })
}

/// Parse trailing attributes after bit tokens.
/// Returns (args_name, field_map).
fn parse_attrs(
    tokens: &[&str],
    fields: &BTreeMap<String, Field>,
) -> Result<(String, BTreeMap<String, FieldMapping>), String> {
    let mut args_name = String::new();
    let mut field_map = BTreeMap::new();
    for &tok in tokens {
        if let Some(a) = tok.strip_prefix('&') {
            args_name = a.to_string();
        } else if let Some(f) = tok.strip_prefix('%') {
            if !fields.contains_key(f) {
                return Err(format!("unknown field %{f}"));
            }
            field_map
                .insert(f.to_string(), FieldMapping::FieldRef(f.to_string()));
        } else if let Some((key, val)) = tok.split_once('=') {
            if let Some(fref) = val.strip_prefix('%') {
                if !fields.contains_key(fref) {
                    return Err(format!("unknown field %{fref}"));
                }
                field_map.insert(
                    key.to_string(),
                    FieldMapping::FieldRef(fref.to_string()),
                );
            } else if let Ok(c) = val.parse::<i64>() {
                field_map.insert(key.to_string(), FieldMapping::Const(c));
            } else {
                return Err(format!("bad attr: {tok}"));
            }
        } else if tok.starts_with('@') {
            // format reference, resolved by the caller
        } else {
            return Err(format!("unknown token: {tok}"));
        }
    }
    Ok((args_name, field_map))
}

fn inline_mappings(
    bp: &BitPatternResult,
) -> impl Iterator<Item = (String, FieldMapping)> + '_ {
    bp.inline_fields.iter().map(|(n, &(pos, len, signed))| {
        (n.clone(), FieldMapping::Inline { pos, len, signed })
    })
}

fn parse_format(
    line: &str,
    fields: &BTreeMap<String, Field>,
    width: u32,
) -> Result<(String, Format), String> {
    // @name bit_tokens... &argset [mappings...]
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let name = tokens[0][1..].to_string(); // skip @
    let bit_count = count_bit_tokens(&tokens[1..]);
    let bp = parse_bit_tokens(&tokens[1..1 + bit_count], width)?;
    let rest = &tokens[1 + bit_count..];
    let (args_name, attrs) = parse_attrs(rest, fields)?;
    let mut field_map: BTreeMap<_, _> = inline_mappings(&bp).collect();
    field_map.extend(attrs);
    Ok((
        name.clone(),
        Format {
            name,
            fixedbits: bp.fixedbits,
            fixedmask: bp.fixedmask,
            args_name,
            field_map,
        },
    ))
}

fn parse_pattern(
    line: &str,
    formats: &BTreeMap<String, Format>,
    fields: &BTreeMap<String, Field>,
    auto_args: &mut BTreeMap<String, ArgSet>,
    width: u32,
) -> Result<Pattern, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let name = tokens[0].to_string();
    let bit_count = count_bit_tokens(&tokens[1..]);
    let bp = parse_bit_tokens(&tokens[1..1 + bit_count], width)?;
    let rest = &tokens[1 + bit_count..];

    // Find @format reference
    let fmt_ref = rest
        .iter()
        .find_map(|t| t.strip_prefix('@').map(|s| s.to_string()));

    let (an, attrs) = parse_attrs(rest, fields)?;
    let (mut args_name, mut field_map, fmt_bits, fmt_mask) = match fmt_ref {
        Some(ref fname) => {
            let fmt = formats
                .get(fname)
                .ok_or_else(|| format!("unknown format @{fname}"))?;
            (
                fmt.args_name.clone(),
                fmt.field_map.clone(),
                fmt.fixedbits,
                fmt.fixedmask,
            )
        }
        None => (String::new(), BTreeMap::new(), 0, 0),
    };
    field_map.extend(inline_mappings(&bp));
    field_map.extend(attrs);
    if !an.is_empty() {
        args_name = an;
    }

    if args_name.is_empty() && !field_map.is_empty() {
        // Auto-generate argset
        let aname = format!("_auto_{name}");
        let afields: Vec<String> = field_map.keys().cloned().collect();
        let set = ArgSet {
            name: aname.clone(),
            fields: afields,
            is_extern: false,
        };
        if let Some(prev) = auto_args.get(&aname) {
            if prev.fields != set.fields {
                return Err(format!("{name}: conflicting implicit argsets"));
            }
        }
        auto_args.insert(aname.clone(), set);
        args_name = aname;
    }

    if fmt_mask & bp.fixedmask & (fmt_bits ^ bp.fixedbits) != 0 {
        return Err(format!("{name}: pattern contradicts its format"));
    }

    Ok(Pattern {
        name,
        fixedbits: bp.fixedbits | fmt_bits,
        fixedmask: bp.fixedmask | fmt_mask,
        args_name,
        field_map,
    })
}

/// Merge backslash-continuation lines into single logical
/// lines.  A trailing `\` joins the next line.
pub fn merge_continuations(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cont = false;
    for line in input.lines() {
        if cont {
            // Append to previous logical line (space-separated).
            out.push(' ');
            out.push_str(line.trim());
        } else {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line);
        }
        cont = out.ends_with('\\');
        if cont {
            out.pop(); // remove trailing backslash
            while out.ends_with(' ') {
                out.pop();
            }
        }
    }
    out
}

pub fn parse_with_width(input: &str, width: u32) -> Result<Parsed, String> {
    let merged = merge_continuations(input);
    let mut fields = BTreeMap::new();
    let mut argsets = BTreeMap::new();
    let mut formats = BTreeMap::new();
    let mut patterns = Vec::new();
    let mut auto_args = BTreeMap::new();

    for (lineno, raw) in merged.lines().enumerate() {
        let line = match raw.find('#') {
            Some(i) => &raw[..i],
            None => raw,
        };
        let line = line.trim();
        let Some(first) = line.chars().next() else {
            continue;
        };
        let result: Result<(), String> = match first {
            '%' => parse_field(line).map(|f| {
                fields.insert(f.name.clone(), f);
            }),
            '&' => parse_argset(line).map(|a| {
                argsets.insert(a.name.clone(), a);
            }),
            '@' => parse_format(line, &fields, width).map(|(n, f)| {
                formats.insert(n, f);
            }),
            '{' | '}' | '[' | ']' => Ok(()),
            _ => parse_pattern(
                line,
                &formats,
                &fields,
                &mut auto_args,
                width,
            )
            .map(|p| patterns.push(p)),
        };
        result.map_err(|e: String| format!("line {}: {e}", lineno + 1))?;
    }
    argsets.extend(auto_args);
    for p in &patterns {
        if let Some(a) = argsets.get(&p.args_name) {
            for k in p.field_map.keys() {
                if !a.fields.contains(k) {
                    return Err(format!(
                        "{}: field {k} not in &{}",
                        p.name, p.args_name
                    ));
                }
            }
        } else if !p.args_name.is_empty() {
            return Err(format!("{}: unknown argset &{}", p.name, p.args_name));
        }
    }
    Ok(Parsed {
        width,
        fields,
        argsets,
        patterns,
    })
}

// ── Code generation ────────────────────────────────────────────

pub fn format_hex(val: u32, width: u32) -> String {
    if width <= 16 {
        format!("{val:#06x}")
    } else {
        format!("{val:#010x}")
    }
}

pub fn to_camel(s: &str) -> String {
    let mut result = String::new();
    let mut upper = true;
    for c in s.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            result.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            result.push(c);
        }
    }
    result
}

fn struct_name(args_name: &str) -> String {
    if args_name.is_empty() {
        "ArgsEmpty".to_string()
    } else {
        format!("Args{}", to_camel(args_name))
    }
}

fn insn_types(width: u32) -> (&'static str, &'static str) {
    if width <= 16 {
        ("u16", "i16")
    } else {
        ("u32", "i32")
    }
}

fn emit_arg_structs<'a>(
    w: &mut dyn Write,
    argsets: impl Iterator<Item = &'a ArgSet>,
    need_empty: bool,
) -> std::io::Result<()> {
    let mut have_empty = false;
    for a in argsets {
        if a.is_extern {
            continue;
        }
        let sname = struct_name(&a.name);
        have_empty |= sname == "ArgsEmpty";
        writeln!(w, "#[derive(Debug, Clone, Copy, Default)]")?;
        writeln!(w, "pub struct {sname} {{")?;
        for f in &a.fields {
            writeln!(w, "    pub {f}: i64,")?;
        }
        writeln!(w, "}}\n")?;
    }
    if need_empty && !have_empty {
        writeln!(w, "#[derive(Debug, Clone, Copy, Default)]")?;
        writeln!(w, "pub struct ArgsEmpty {{}}\n")?;
    }
    Ok(())
}

/// Expression extracting one segment from `insn`.
fn segment_expr(s: &FieldSegment, width: u32) -> String {
    let (_, signed_ty) = insn_types(width);
    if s.signed {
        let lshift = width - s.pos - s.len;
        let rshift = width - s.len;
        if lshift == 0 {
            format!("((insn as {signed_ty}) >> {rshift}) as i64")
        } else {
            format!(
                "(((insn as {signed_ty}) << {lshift}) >> {rshift}) as i64"
            )
        }
    } else {
        let mask = if s.len >= 32 { u32::MAX } else { (1u32 << s.len) - 1 };
        format!("((insn >> {}) & {:#x}) as i64", s.pos, mask)
    }
}

fn emit_extract_field(
    w: &mut dyn Write,
    field: &Field,
    width: u32,
    trait_name: &str,
) -> std::io::Result<()> {
    let (insn_ty, _) = insn_types(width);
    let unused = if field.segments.is_empty() { "_" } else { "" };
    if field.func.is_some() {
        writeln!(
            w,
            "fn extract_{}<Ir, T: {trait_name}<Ir> + ?Sized>(\
             ctx: &T, {unused}insn: {insn_ty}) -> i64 {{",
            field.name
        )?;
    } else {
        writeln!(w, "fn extract_{}(insn: {insn_ty}) -> i64 {{", field.name)?;
    }
    let segs = &field.segments;
    match segs.split_first() {
        None => writeln!(w, "    let val: i64 = 0;")?,
        Some((s0, more)) => {
            writeln!(w, "    let mut val: i64 = {};", segment_expr(s0, width))?;
            for s in more {
                let unsigned = FieldSegment {
                    signed: false,
                    ..s.clone()
                };
                writeln!(
                    w,
                    "    val = (val << {}) | {};",
                    s.len,
                    segment_expr(&unsigned, width)
                )?;
            }
        }
    }
    match field.func {
        Some(ref func) => writeln!(w, "    ctx.{func}(val)")?,
        None => writeln!(w, "    val")?,
    }
    writeln!(w, "}}\n")
}

fn emit_field_expr(
    w: &mut dyn Write,
    mapping: &FieldMapping,
    fields: &BTreeMap<String, Field>,
    width: u32,
) -> std::io::Result<()> {
    match mapping {
        FieldMapping::FieldRef(r) => {
            let needs_ctx = fields.get(r).is_some_and(|f| f.func.is_some());
            if needs_ctx {
                write!(w, "extract_{r}::<Ir, T>(ctx, insn)")?;
            } else {
                write!(w, "extract_{r}(insn)")?;
            }
        }
        FieldMapping::Inline { pos, len, signed } => {
            let seg = FieldSegment {
                pos: *pos,
                len: *len,
                signed: *signed,
            };
            write!(w, "{}", segment_expr(&seg, width))?;
        }
        FieldMapping::Const(c) => {
            write!(w, "{c}_i64")?;
        }
    }
    Ok(())
}

/// Emit the shared trait: one `trans_*` per distinct pattern name
/// and one hook per distinct `!function`.
fn emit_decode_trait<'a>(
    w: &mut dyn Write,
    trait_name: &str,
    patterns: impl Iterator<Item = &'a Pattern>,
    funcs: &BTreeSet<String>,
) -> std::io::Result<()> {
    writeln!(w, "pub trait {trait_name}<Ir> {{")?;
    let mut seen = BTreeSet::new();
    for p in patterns {
        if !seen.insert(p.name.clone()) {
            continue; // skip duplicate trait methods
        }
        writeln!(
            w,
            "    fn trans_{}(&mut self, ir: &mut Ir, a: &{}) -> bool;",
            p.name,
            struct_name(&p.args_name)
        )?;
    }
    for f in funcs {
        writeln!(w, "    fn {f}(&self, x: i64) -> i64;")?;
    }
    writeln!(w, "}}\n")
}

fn emit_decode_fn(
    w: &mut dyn Write,
    parsed: &Parsed,
    fn_name: &str,
    trait_name: &str,
) -> std::io::Result<()> {
    let width = parsed.width;
    let (insn_ty, _) = insn_types(width);
    let full_mask: u32 = if width <= 16 { 0xffff } else { 0xffff_ffff };
    writeln!(
        w,
        "pub fn {fn_name}<Ir, T: {trait_name}<Ir>>(\
         ctx: &mut T, ir: &mut Ir, insn: {insn_ty}) -> bool {{"
    )?;
    for p in &parsed.patterns {
        let sname = struct_name(&p.args_name);
        let bits = format_hex(p.fixedbits, width);
        if p.fixedmask == full_mask {
            writeln!(w, "    if insn == {bits} {{")?;
        } else {
            let mask = format_hex(p.fixedmask, width);
            writeln!(w, "    if insn & {mask} == {bits} {{")?;
        }
        let arg_fields = parsed
            .argsets
            .get(&p.args_name)
            .map(|a| a.fields.clone())
            .unwrap_or_default();
        if arg_fields.is_empty() {
            writeln!(
                w,
                "        if ctx.trans_{}(ir, &{sname} {{}}) {{",
                p.name
            )?;
        } else {
            writeln!(w, "        let a = {sname} {{")?;
            for af in &arg_fields {
                write!(w, "            {af}: ")?;
                match p.field_map.get(af) {
                    Some(mapping) => {
                        emit_field_expr(w, mapping, &parsed.fields, width)?
                    }
                    None => write!(w, "0")?,
                }
                writeln!(w, ",")?;
            }
            writeln!(w, "        }};")?;
            writeln!(w, "        if ctx.trans_{}(ir, &a) {{", p.name)?;
        }
        writeln!(w, "            return true;")?;
        writeln!(w, "        }}")?;
        writeln!(w, "    }}")?;
    }
    writeln!(w, "    false")?;
    writeln!(w, "}}\n")
}

fn used_funcs<'a>(parsed: impl Iterator<Item = &'a Parsed>) -> BTreeSet<String> {
    parsed
        .flat_map(|p| p.fields.values())
        .filter_map(|f| f.func.clone())
        .collect()
}

fn emit_extractors(
    w: &mut dyn Write,
    parsed: &Parsed,
    trait_name: &str,
) -> std::io::Result<()> {
    for field in parsed.fields.values() {
        emit_extract_field(w, field, parsed.width, trait_name)?;
    }
    Ok(())
}

// ── Public API ─────────────────────────────────────────────────

pub fn generate_with_width(
    input: &str,
    output: &mut dyn Write,
    width: u32,
) -> Result<(), String> {
    let parsed = parse_with_width(input, width)?;
    let (trait_name, fn_name) = if width <= 16 {
        ("Decode16", "decode16")
    } else {
        ("Decode", "decode")
    };
    let funcs = used_funcs(std::iter::once(&parsed));
    let need_empty = parsed.patterns.iter().any(|p| p.args_name.is_empty());
    let io = |e: std::io::Error| e.to_string();
    writeln!(output, "// Auto-generated by decodetree.").map_err(io)?;
    writeln!(output, "// Do not edit.\n").map_err(io)?;
    emit_arg_structs(output, parsed.argsets.values(), need_empty).map_err(io)?;
    emit_extractors(output, &parsed, trait_name).map_err(io)?;
    emit_decode_trait(output, trait_name, parsed.patterns.iter(), &funcs)
        .map_err(io)?;
    emit_decode_fn(output, &parsed, fn_name, trait_name).map_err(io)?;
    Ok(())
}

pub fn generate(input: &str, output: &mut dyn Write) -> Result<(), String> {
    generate_with_width(input, output, 32)
}

/// Generate decoders for several files sharing one trait.
///
/// Argument sets with the same name must agree across files;
/// `!extern` declarations only reference a set defined elsewhere.
pub fn generate_set(
    units: &[DecodeUnit],
    trait_name: &str,
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut parsed = Vec::with_capacity(units.len());
    for u in units {
        let p = parse_with_width(u.input, u.width)
            .map_err(|e| format!("{}: {e}", u.module))?;
        parsed.push(p);
    }

    let mut argsets: BTreeMap<String, ArgSet> = BTreeMap::new();
    for a in parsed.iter().flat_map(|p| p.argsets.values()) {
        if a.is_extern {
            continue;
        }
        match argsets.get(&a.name) {
            Some(prev) if prev.fields != a.fields => {
                return Err(format!("argset &{} defined twice", a.name));
            }
            _ => {
                argsets.insert(a.name.clone(), a.clone());
            }
        }
    }
    let mut sigs: BTreeMap<&str, &str> = BTreeMap::new();
    for p in parsed.iter().flat_map(|p| p.patterns.iter()) {
        if let Some(prev) = sigs.insert(&p.name, &p.args_name) {
            if prev != p.args_name {
                return Err(format!("{}: argsets differ between uses", p.name));
            }
        }
    }

    let funcs = used_funcs(parsed.iter());
    let need_empty = parsed
        .iter()
        .flat_map(|p| p.patterns.iter())
        .any(|p| p.args_name.is_empty());
    let io = |e: std::io::Error| e.to_string();
    writeln!(output, "// Auto-generated by decodetree.").map_err(io)?;
    writeln!(output, "// Do not edit.\n").map_err(io)?;
    emit_arg_structs(output, argsets.values(), need_empty).map_err(io)?;
    emit_decode_trait(
        output,
        trait_name,
        parsed.iter().flat_map(|p| p.patterns.iter()),
        &funcs,
    )
    .map_err(io)?;
    for (u, p) in units.iter().zip(&parsed) {
        writeln!(output, "pub mod {} {{", u.module).map_err(io)?;
        writeln!(output, "use super::*;\n").map_err(io)?;
        emit_extractors(output, p, trait_name).map_err(io)?;
        emit_decode_fn(output, p, "decode", trait_name).map_err(io)?;
        writeln!(output, "}}\n").map_err(io)?;
    }
    Ok(())
}
