pub mod attachment;
pub mod errors;
pub mod ports;
pub mod product;
pub mod supplier;
