use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("invitation token does not exist")]
    InvitationInvalid,

    #[error("username already taken")]
    UsernameTaken,

    #[error("no user holds this session token")]
    Unauthenticated,

    #[error("requester does not own this resource")]
    Forbidden,

    #[error("resource not found")]
    NotFound,

    #[error("snapshot lock poisoned")]
    Poisoned,
}
