pub mod align;
pub mod sanitize;
pub mod seed;
pub mod validation;
