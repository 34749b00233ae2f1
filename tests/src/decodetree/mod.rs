use decodetree::*;

fn parse(input: &str) -> Result<Parsed, String> {
    parse_with_width(input, 32)
}

fn generate_str(input: &str, width: u32) -> String {
    let mut out = Vec::new();
    generate_with_width(input, &mut out, width).unwrap();
    String::from_utf8(out).unwrap()
}

// ── Helpers ──────────────────────────────────────────────────

#[test]
fn is_bit_token_coverage() {
    assert!(is_bit_token("01.-"));
    assert!(is_bit_token("0000000"));
    assert!(!is_bit_token(""));
    assert!(!is_bit_token("rd:4"));
}

#[test]
fn is_inline_field_coverage() {
    assert!(is_inline_field("imm:24"));
    assert!(is_inline_field("imm:s24"));
    assert!(!is_inline_field("imm"));
    assert!(!is_inline_field(":4"));
    assert!(!is_inline_field("imm:"));
    assert!(!is_inline_field("imm:sx"));
}

#[test]
fn to_camel_only_uppercases_after_underscore() {
    assert_eq!(to_camel("s_rrr_shi"), "SRrrShi");
    assert_eq!(to_camel("neon_3same"), "Neon3same");
    assert_eq!(to_camel("_auto_B"), "AutoB");
}

#[test]
fn format_hex_tracks_width() {
    assert_eq!(format_hex(0x4700, 16), "0x4700");
    assert_eq!(format_hex(0x0a00_0000, 32), "0x0a000000");
}

// ── Bit patterns and fields ──────────────────────────────────

#[test]
fn bit_pattern_with_signed_inline_field() {
    // B<c> label: cond 1010 imm24
    let toks = ["....", "1010", "imm:s24"];
    let r = parse_bit_tokens(&toks, 32).unwrap();
    assert_eq!(r.fixedbits, 0x0a00_0000);
    assert_eq!(r.fixedmask, 0x0f00_0000);
    assert_eq!(r.inline_fields["imm"], (0, 24, true));
}

#[test]
fn bit_pattern_must_cover_width() {
    assert!(parse_bit_tokens(&["0100", "0111"], 16).is_err());
    assert!(parse_bit_tokens(&["0100011100000000", "0"], 16).is_err());
    assert!(parse_bit_tokens(&["0100", "0111", "0", "rm:4", "000"], 16).is_ok());
}

#[test]
fn parse_field_with_function() {
    let f = parse_field("%imm8m 0:8 !function=expand_imm").unwrap();
    assert_eq!(f.segments, vec![FieldSegment { pos: 0, len: 8, signed: false }]);
    assert_eq!(f.func.as_deref(), Some("expand_imm"));
}

#[test]
fn parse_field_function_only() {
    let f = parse_field("%sreg !function=vfp_sreg").unwrap();
    assert!(f.segments.is_empty());
    assert!(parse_field("%bad").is_err());
}

#[test]
fn parse_field_multi_segment_signed() {
    // T32 branch offset: S:imm10 then imm11.
    let f = parse_field("%imm21 26:s1 16:6 0:11").unwrap();
    assert_eq!(f.segments.len(), 3);
    assert!(f.segments[0].signed);
    assert!(!f.segments[1].signed);
}

#[test]
fn parse_argset_extern() {
    let a = parse_argset("&s_rrr_shi s rd rn rm shim shty !extern").unwrap();
    assert!(a.is_extern);
    assert_eq!(a.fields, ["s", "rd", "rn", "rm", "shim", "shty"]);
}

#[test]
fn merge_continuations_joins_lines() {
    let m = merge_continuations("ADD_rri ---- 001 0100 . .... .... \\\n    ............ @s_rri");
    assert_eq!(m, "ADD_rri ---- 001 0100 . .... .... ............ @s_rri");
}

// ── Whole files ──────────────────────────────────────────────

const MINI_A32: &str = r"
&s_rri_rot   s rd rn imm rot
&r           rm
&i           imm

@s_rri_rot   ---- ... .... s:1 rn:4 rd:4 rot:4 imm:8 &s_rri_rot

{
  MOV_rxi    ---- 001 1101 . 0000 .... ............ @s_rri_rot
  ADD_rri    ---- 001 0100 . .... .... ............ @s_rri_rot
}
BX           ---- 0001 0010 1111 1111 1111 0001 rm:4 &r
B            ---- 1010 imm:s24 &i
NOP          ---- 0011 0010 0000 1111 0000 0000 0000
";

#[test]
fn parse_mini_a32() {
    let p = parse(MINI_A32).unwrap();
    let names: Vec<&str> = p.patterns.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["MOV_rxi", "ADD_rri", "BX", "B", "NOP"]);
    let mov = &p.patterns[0];
    assert_eq!(mov.fixedbits, 0x03a0_0000);
    assert_eq!(mov.fixedmask, 0x0fef_0000);
    assert_eq!(mov.args_name, "s_rri_rot");
    let nop = &p.patterns[4];
    assert_eq!(nop.fixedmask, 0x0fff_ffff);
    assert!(nop.args_name.is_empty());
}

#[test]
fn format_conflict_is_rejected() {
    let input = "@f .... 0000 ........................ &i\n&i imm\nX .... 1111 imm:24 @f\n";
    assert!(parse(input).unwrap_err().contains("contradicts"));
}

#[test]
fn unknown_references_are_rejected() {
    assert!(parse("X ---- 1010 imm:24 @nope\n").is_err());
    assert!(parse("X ---- 1010 ........................ %nope\n").is_err());
    assert!(parse("X ---- 1010 ........................ &nope\n").is_err());
}

#[test]
fn generated_decoder_shape() {
    let src = generate_str(MINI_A32, 32);
    assert!(src.contains("pub struct ArgsSRriRot {"));
    assert!(src.contains("pub trait Decode<Ir> {"));
    assert!(src.contains("fn trans_B(&mut self, ir: &mut Ir, a: &ArgsI) -> bool;"));
    assert!(src.contains("fn trans_NOP(&mut self, ir: &mut Ir, a: &ArgsEmpty) -> bool;"));
    // Signed inline field uses an arithmetic shift.
    assert!(src.contains("(((insn as i32) << 8) >> 8) as i64"));
    // Patterns are tried in file order.
    let mov = src.find("trans_MOV_rxi(ir").unwrap();
    let add = src.find("trans_ADD_rri(ir").unwrap();
    assert!(mov < add);
}

#[test]
fn generated_t16_decoder_uses_u16() {
    let input = "&r rm\nBX 0100 0111 0 rm:4 000 &r\n";
    let src = generate_str(input, 16);
    assert!(src.contains("pub trait Decode16<Ir>"));
    assert!(src.contains("insn: u16"));
    assert!(src.contains("insn & 0xff87 == 0x4700"));
}

#[test]
fn function_fields_become_trait_hooks() {
    let input = "%imm12 0:12 !function=expand_imm\nMOV .... 0011 1010 0000 .... ............ %imm12\n";
    let src = generate_str(input, 32);
    assert!(src.contains("fn expand_imm(&self, x: i64) -> i64;"));
    assert!(src.contains("ctx.expand_imm(val)"));
}

// ── Decoder sets ─────────────────────────────────────────────

#[test]
fn set_shares_argsets_and_trait() {
    let a32 = "&r rm\nBX ---- 0001 0010 1111 1111 1111 0001 rm:4 &r\n";
    let t16 = "&r rm !extern\nBX 0100 0111 0 rm:4 000 &r\n";
    let units = [
        DecodeUnit { module: "a32", input: a32, width: 32 },
        DecodeUnit { module: "t16", input: t16, width: 16 },
    ];
    let mut out = Vec::new();
    generate_set(&units, "Decode", &mut out).unwrap();
    let src = String::from_utf8(out).unwrap();
    assert_eq!(src.matches("pub struct ArgsR {").count(), 1);
    assert_eq!(src.matches("fn trans_BX(").count(), 1);
    assert!(src.contains("pub mod a32 {"));
    assert!(src.contains("pub mod t16 {"));
}

#[test]
fn set_rejects_conflicting_argsets() {
    let units = [
        DecodeUnit { module: "a", input: "&r rm\n", width: 32 },
        DecodeUnit { module: "b", input: "&r rn\n", width: 32 },
    ];
    let mut out = Vec::new();
    let err = generate_set(&units, "Decode", &mut out).unwrap_err();
    assert!(err.contains("defined twice"));
}
