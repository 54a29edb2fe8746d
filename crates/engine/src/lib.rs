//! Client-side domain logic for persfin.
//!
//! Everything here is independent of the HTTP layer: remote calls go through
//! the backend traits ([`itemization::ItemizationBackend`],
//! [`receipt::ReceiptBackend`]) and failures arrive as [`RemoteError`].

pub use currency::Currency;
pub use error::{EngineError, PERMISSION_DENIED_MESSAGE, RemoteError};
pub use itemization::{ItemRow, Itemization, ItemizationBackend, ItemizationError};
pub use notify::{BufferedSink, NotificationSink, Toast, ToastLevel};
pub use receipt::{ReceiptBackend, ReceiptFlow, ReceiptStep};
pub use session::SessionGuard;
pub use transactions::NewTransaction;
pub use wallet::{MemberRole, Wallet, WalletStatus};

mod currency;
mod error;

pub mod category;
pub mod itemization;
pub mod members;
pub mod money;
pub mod notify;
pub mod receipt;
pub mod session;
pub mod transactions;
pub mod wallet;
