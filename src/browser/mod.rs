#[cfg(feature = "chrome")]
pub mod chrome;
pub mod helpers;
pub mod html;

#[cfg(feature = "chrome")]
pub use chrome::ChromeEnvironment;
pub use html::HtmlEnvironment;
