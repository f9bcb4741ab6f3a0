pub mod assignment;
pub mod associate;
pub mod route;
