pub mod command;
pub mod paths;

#[cfg(test)]
pub mod testing;
