pub mod his;
pub mod results;
