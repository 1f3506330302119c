// src/algorithms/mod.rs

pub mod mul_accum;
pub mod pairwise;
pub mod smooth_parts;
pub mod smooth_parts_lowmem;

pub use mul_accum::mul_accum_gcd;
pub use pairwise::basic_pairwise_gcd;
pub use smooth_parts::smooth_parts_gcd;
pub use smooth_parts_lowmem::low_mem_smooth_parts_gcd;
