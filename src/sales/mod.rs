pub mod line_item;
pub mod sale_line;

pub use line_item::{LineItemCalculator, SaleLineComputed, SaleLineInput};
pub use sale_line::{SaleLine, SaleLinePatch};
