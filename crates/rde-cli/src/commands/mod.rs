pub mod bej;
pub mod generate_dictionaries;
