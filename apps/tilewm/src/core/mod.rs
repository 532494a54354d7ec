pub mod context;
pub mod display;
#[cfg(test)]
pub mod mock;
pub mod spawn;
