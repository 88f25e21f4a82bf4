pub mod keyed_block;    // NI_BEGIN/NI_END tokenizer shared by .par and .his
pub mod fine_design;    // FINE/Design3D history and results files
pub mod fine_turbo;     // FINE/Turbo structure mode files
pub mod igg;            // IGG block name dumps
