//! Client-side object model for the VES vault service.
//!
//! A [`VaultItem`] is an opaque, potentially encrypted object (text, file,
//! password, or secret) stored remotely and selectively shared with other
//! principals ([`VaultKey`]s). This crate implements the client core around
//! it: the entity and its lifecycle flags, the share reconciliation engine
//! that turns a desired recipient list into an idempotent delta, the
//! canonical wire codec, the `ves://` addressing scheme, and the scoped
//! verify-token fetch contract. Cryptography and transport framing are
//! external collaborators behind the [`StreamCipher`] trait and the HTTP
//! client.
//!
//! ```no_run
//! use veskit_core::{ItemType, ResolveIntent, VesSession, VesUri};
//!
//! # fn main() -> Result<(), veskit_core::VesError> {
//! let session = VesSession::new("https://api.ves.host/v1")?
//!     .with_session_token(std::env::var("VES_TOKEN").unwrap_or_default());
//!
//! let uri = VesUri::parse("ves://example.com/item1")?;
//! let mut item = session.resolve(&uri, ResolveIntent::GetOrCreate)?;
//! item.set_value(b"hunter2".to_vec(), ItemType::Password)?;
//! session.post_item(&mut item)?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod cipher;
pub use cipher::*;

mod codec;

mod error;
pub use error::*;

mod flags;
pub use flags::*;

mod item;
pub use item::*;

mod item_type;
pub use item_type::*;

mod object;
pub use object::*;

mod session;
pub use session::*;

mod share;
pub use share::*;

mod uri;
pub use uri::*;
