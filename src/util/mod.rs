pub mod ids;
pub mod unicode;
