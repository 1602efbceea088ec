pub mod descriptor;
pub mod mix;
pub mod processing_tap;
pub mod session;
