// Connection serving for the two TCP endpoints

pub mod command;
pub mod stream;
