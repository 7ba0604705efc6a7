pub mod constants;
pub mod time;
