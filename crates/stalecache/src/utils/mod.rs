pub mod defer;
pub mod lock;
