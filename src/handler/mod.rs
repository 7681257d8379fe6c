pub mod responses;
pub mod surveys;
