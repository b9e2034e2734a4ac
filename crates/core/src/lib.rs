pub mod bill;
pub mod money;

pub use bill::{AmountInput, Bill, BillError, BillId, NewBill, ValidatedBill};
pub use money::{Money, MoneyError};
