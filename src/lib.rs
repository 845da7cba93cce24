//! Real-time collaborative plain text editing based on operational transformation.
//!
//! Multiple clients edit a shared document; each client's edits go to a central
//! coordinator which serializes them into a total order, and come back interleaved
//! with everyone else's. The algebra in [`operation`] rewrites concurrent edits so
//! that every client converges on the same document, the state machine in
//! [`client`] drives the send/ack protocol, [`undo`] keeps history meaningful
//! under concurrency, and [`editor`] ties it all to a concrete editor and
//! transport through two small adapter traits.
//!
//! The crate is synchronous and single-threaded; the host owns the event loop and
//! calls in when the editor or the coordinator has something to say.

pub mod attributes;
pub mod client;
pub mod cursor;
pub mod editor;
pub mod error;
pub mod events;
pub mod meta;
pub mod operation;
pub mod undo;

mod rle;
mod unicount;
#[cfg(feature = "serde")]
mod wire;

#[cfg(test)]
mod fuzzer_tools;

pub use attributes::{AttrValue, Attrs};
pub use client::{Client, ClientContext, ClientState};
pub use cursor::Cursor;
pub use editor::{
    CoordinatorAdapter, EditorAdapter, EditorClient, EditorClientOptions, MarkerId, RemoteClient,
};
pub use error::OtError;
pub use events::{Event, EventKind, ListenerId};
pub use meta::{OpMeta, WrappedOp};
pub use operation::{OpComponent, TextOperation};
pub use undo::UndoManager;

#[cfg(test)]
mod tests {
    // As per smartstring's documentation.
    #[test]
    fn validate_smartstring() {
        smartstring::validate();
    }
}
