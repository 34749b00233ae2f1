mod context;
mod opcode;
mod tb;
mod types;
