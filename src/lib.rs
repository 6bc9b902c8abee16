pub mod geometry;
pub mod io;
pub mod registry;
pub mod scene;
pub mod sim;
pub mod system;
pub mod tracking;
pub mod ui;
pub mod viz;
