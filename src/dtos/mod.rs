pub mod responsedtos;
pub mod surveydtos;
