//! Authentication module for Twitter/X access.
//!
//! Provides the session cookie store and the authenticator that reuses or
//! refreshes it.

mod cookies;
mod session;

pub use cookies::{cookie_header, CookieStore, SessionCookie, DEFAULT_COOKIES_FILE};
pub use session::{SessionAuthenticator, SessionSource};
