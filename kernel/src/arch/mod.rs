// kernel/src/arch/mod.rs: architecture support; only x86_64 is targeted.
pub mod x86_64;
