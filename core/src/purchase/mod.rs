// checkout/src/purchase/mod.rs

pub mod confirm;
pub mod line_item;
pub mod request;
