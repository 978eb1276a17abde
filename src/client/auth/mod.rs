// Endpoint implementations for the credential lifecycle: sign-in mints the
// pair, refresh replaces it. Both speak the dashboard's response envelope
// (success flag plus human-readable message).

pub mod login;
pub mod refresh;

pub use login::login_impl;
pub use refresh::refresh_session_impl;
