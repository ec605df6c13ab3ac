//! Request and response bodies shared by the HTTP layer and its clients.

pub mod api;
