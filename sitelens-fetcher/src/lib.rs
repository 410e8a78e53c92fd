pub mod artifact;
pub mod browser;
pub mod cookies;
pub mod error;
pub mod http;
pub mod links;
pub mod probes;
pub mod session;

pub use artifact::{FrameworkHints, LinkRecord, PageArtifact, ScriptTag};
pub use browser::{BrowserOptions, ChromiumFetcher};
pub use cookies::{SameSite, SessionCookie};
pub use error::FetchError;
pub use http::HttpFetcher;
pub use session::{FetchSession, Navigation, PageFetcher, SessionKind, WaitUntil};
