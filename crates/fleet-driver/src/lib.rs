//! The only crate that talks to a real browser process. Everything downstream
//! depends on `fleet_types::ports::BrowserDriver` instead of this crate directly,
//! so `fleet-testutil`'s fake can stand in during tests.

pub mod spider_chrome_driver;

pub use spider_chrome_driver::{SpiderChromeBrowserHandle, SpiderChromeDriver, SpiderChromePageHandle};
