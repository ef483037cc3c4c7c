pub mod choice;
pub mod json;
