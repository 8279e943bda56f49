//! Page-session scenarios run against the in-memory adapters.

mod helpers;
