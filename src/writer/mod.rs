pub mod par_writer;     // .par uncertainty patcher
pub mod dat_writer;     // moments and per-quantity tables
pub mod sge_writer;     // SGE job scripts
pub mod macro_writer;   // IGG and CFView batch scripts
pub mod xml_writer;     // VTK XML output of displacement fields
