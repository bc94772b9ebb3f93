//! Client side of the chat: transcript, request lifecycle and transport.

mod session;
mod transcript;
mod transport;

pub use session::{
    CLEARED_MESSAGE, ChatError, ChatSession, EMPTY_REPLY_PLACEHOLDER, ERROR_PREFIX,
    PendingRequest, RequestState, SendOutcome, WELCOME_MESSAGE,
};
pub use transcript::{Message, MessageRole, Transcript};
pub use transport::{ChatTransport, HttpTransport, TransportError};
