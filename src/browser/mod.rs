pub mod connection;
pub mod headless;
pub mod surface;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_headless_browser;
pub use surface::{BrowsingSurface, ChromeSurface};
