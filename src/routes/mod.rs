/// Router Module Index
///
/// Splits the routing table by access level. Each module maps to one guard, and
/// the guard is applied where the module is mounted in `create_router`.

/// Routes reachable without a session: health, login, logout.
pub mod public;

/// HTML routes behind the session guard. Requires a valid session cookie.
pub mod authenticated;

/// Routes restricted to admin sessions (user registration).
pub mod admin;

/// JSON API, nested under `/api`.
pub mod api;
