pub mod browser;
pub mod dynamic;
pub mod http;
pub mod webdriver;

pub use browser::{BrowserLauncher, BrowserPage, ElementInfo, Target};
pub use dynamic::{DynamicRenderer, Rendered};
pub use http::{HttpFetch, StaticFetcher};
pub use webdriver::{WebDriverLauncher, WebDriverPage};
