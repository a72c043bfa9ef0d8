//! Demo entities used by the binary and the tests.

mod order;
mod product;

pub use order::{Order, OrderLine};
pub use product::Product;
