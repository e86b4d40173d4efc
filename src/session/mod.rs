pub mod controller;
pub mod guard;
pub mod input;
pub mod progress;
pub mod refresh;
pub mod result;
