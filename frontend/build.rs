use std::env;
use std::fs;
use std::path::Path;

use decodetree::DecodeUnit;

/// One generated decoder: every file in the set shares a trait and
/// the argument structs.
struct DecodeSet {
    out: &'static str,
    trait_name: &'static str,
    files: &'static [(&'static str, u32)],
}

const SETS: &[DecodeSet] = &[
    DecodeSet {
        out: "arm_decode.rs",
        trait_name: "Decode",
        files: &[("a32", 32), ("a32_uncond", 32), ("t32", 32), ("t16", 16)],
    },
    DecodeSet {
        out: "vfp_decode.rs",
        trait_name: "DecodeVfp",
        files: &[("vfp", 32), ("vfp_uncond", 32)],
    },
    DecodeSet {
        out: "neon_decode.rs",
        trait_name: "DecodeNeon",
        files: &[("neon_dp", 32), ("neon_ls", 32)],
    },
];

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();

    for set in SETS {
        let mut inputs = Vec::with_capacity(set.files.len());
        for &(name, _) in set.files {
            let path = format!("decode/{name}.decode");
            println!("cargo::rerun-if-changed={path}");
            let text = fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("failed to read {path}: {e}"));
            inputs.push(text);
        }
        let units: Vec<DecodeUnit> = set
            .files
            .iter()
            .zip(&inputs)
            .map(|(&(module, width), input)| DecodeUnit {
                module,
                input,
                width,
            })
            .collect();

        let mut output = Vec::new();
        decodetree::generate_set(&units, set.trait_name, &mut output)
            .unwrap_or_else(|e| panic!("decodetree: {e}"));

        let out_path = Path::new(&out_dir).join(set.out);
        fs::write(&out_path, output).expect("failed to write generated decoder");
    }
}
