pub mod history;
pub mod latest;
