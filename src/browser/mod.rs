pub mod chromium;
pub mod driver;
pub mod headless;
pub mod session;

pub use chromium::{ChromiumDriver, ChromiumLauncher};
pub use driver::{BrowserDriver, BrowserLauncher, SelectOutcome};
pub use headless::launch_browser;
pub use session::{Session, SessionState};
