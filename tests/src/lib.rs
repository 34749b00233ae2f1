//! Cross-crate tests: IR core, decoder generator, execution loop and
//! the AArch32 frontend run end to end through `ArmMachine`.

#[cfg(test)]
mod core;
#[cfg(test)]
mod decodetree;
#[cfg(test)]
mod exec;
#[cfg(test)]
mod frontend;
