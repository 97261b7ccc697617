//! Client sessions: cookie handling and the server-side store

mod cookie;
mod store;

pub use cookie::{get_cookie_value, session_cookie};
pub use store::{is_valid_session_id, SessionHandle, SessionStore};
