//! Wallet authentication: signature verification, challenges, sessions and the request gate.

pub mod challenge;
pub mod cookie;
pub mod middleware;
pub mod session;
pub mod verify;

pub use challenge::{ChallengeError, ChallengeManager, IssuedChallenge};
pub use middleware::{AppState, AuthSession};
pub use session::{NewSession, SessionManager};
pub use verify::verify_signature;
