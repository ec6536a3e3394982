pub mod load;
pub mod reshape;
