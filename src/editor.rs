//! The editor client: glue between a concrete editor, the sync state machine, the
//! undo history and the coordinator.
//!
//! The host owns the event loop. When the editor fires a change or cursor
//! callback, the host calls the matching `on_*` method here; when the coordinator
//! delivers something, the host calls the matching `server_*` method. Everything
//! in between — buffering, transforming, undo bookkeeping, cursor broadcast — is
//! handled internally and synchronously.

use std::collections::HashMap;

use smartstring::alias::String as SmartString;
use tracing::debug;

use crate::client::{Client, ClientContext, ClientState};
use crate::cursor::Cursor;
use crate::error::OtError;
use crate::events::{Event, EventEmitter, EventKind, ListenerId};
use crate::meta::{OpMeta, WrappedOp};
use crate::operation::TextOperation;
use crate::undo::UndoManager;
use crate::unicount::count_chars;

/// Opaque handle for a rendered remote cursor, issued by the editor adapter.
pub type MarkerId = u64;

/// What the core needs from a concrete editor.
///
/// Positions and lengths are in unicode scalar values. An editor which counts in
/// utf-16 code units (most browser editors) must convert in its adapter.
pub trait EditorAdapter {
    fn get_text(&self) -> String;
    fn set_text(&mut self, text: &str);
    fn get_cursor(&self) -> Option<Cursor>;
    fn set_cursor(&mut self, cursor: &Cursor);
    /// Render a peer's cursor or selection; the returned marker removes it again.
    fn set_other_cursor(
        &mut self,
        client_id: &str,
        cursor: &Cursor,
        color: &str,
        name: Option<&str>,
    ) -> MarkerId;
    fn remove_other_cursor(&mut self, marker: MarkerId);
    fn apply_operation(&mut self, op: &TextOperation) -> Result<(), OtError>;
    fn invert_operation(&self, op: &TextOperation) -> Result<TextOperation, OtError> {
        op.invert(&self.get_text())
    }
}

/// What the core needs from the coordinator (database) connection.
pub trait CoordinatorAdapter {
    fn send_operation(&mut self, op: &TextOperation);
    fn send_cursor(&mut self, cursor: Option<&Cursor>);
    fn is_current_user(&self, client_id: &str) -> bool;
    fn is_history_empty(&self) -> bool;
    fn set_user_id(&mut self, user_id: &str);
    fn set_user_color(&mut self, color: &str);
    fn set_user_name(&mut self, name: &str);
}

/// A peer as last reported by the coordinator. The record survives cursor removal
/// (a blurred peer is still present); it goes away when the peer leaves.
#[derive(Debug)]
pub struct RemoteClient {
    pub id: SmartString,
    pub color: SmartString,
    pub name: Option<SmartString>,
    pub cursor: Option<Cursor>,
    marker: Option<MarkerId>,
}

#[derive(Debug, Clone, Default)]
pub struct EditorClientOptions {
    pub user_id: SmartString,
    pub user_color: SmartString,
    pub user_name: Option<SmartString>,
    /// Seeded into the editor when the coordinator's history is empty.
    pub default_text: Option<String>,
}

pub struct EditorClient<E: EditorAdapter, S: CoordinatorAdapter> {
    editor: E,
    server: S,
    client: Client,
    undo: UndoManager,
    peers: HashMap<SmartString, RemoteClient>,
    cursor: Option<Cursor>,
    focused: bool,
    emitter: EventEmitter,
    disposed: bool,
}

/// The [`ClientContext`] the state machine sees: sends go to the coordinator
/// adapter, applies go to the editor and rewrite the undo stacks.
struct AdapterCtx<'a, E: EditorAdapter, S: CoordinatorAdapter> {
    editor: &'a mut E,
    server: &'a mut S,
    undo: Option<&'a mut UndoManager>,
    cursor: &'a mut Option<Cursor>,
}

impl<E: EditorAdapter, S: CoordinatorAdapter> ClientContext for AdapterCtx<'_, E, S> {
    fn send_operation(&mut self, op: &TextOperation) -> Result<(), OtError> {
        self.server.send_operation(op);
        Ok(())
    }

    fn apply_operation(&mut self, op: &TextOperation) -> Result<(), OtError> {
        self.editor.apply_operation(op)?;
        *self.cursor = self.editor.get_cursor();
        if let Some(undo) = self.undo.as_mut() {
            undo.transform(op)?;
        }
        Ok(())
    }
}

impl<E: EditorAdapter, S: CoordinatorAdapter> EditorClient<E, S> {
    pub fn new(mut editor: E, mut server: S, options: EditorClientOptions) -> Self {
        server.set_user_id(&options.user_id);
        server.set_user_color(&options.user_color);
        if let Some(name) = &options.user_name {
            server.set_user_name(name);
        }
        if let Some(text) = &options.default_text {
            if server.is_history_empty() {
                editor.set_text(text);
            }
        }
        EditorClient {
            editor,
            server,
            client: Client::new(),
            undo: UndoManager::new(),
            peers: HashMap::new(),
            cursor: None,
            focused: true,
            emitter: EventEmitter::default(),
            disposed: false,
        }
    }

    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&Event) + 'static) -> ListenerId {
        self.emitter.on(kind, Box::new(listener))
    }

    pub fn off(&mut self, id: ListenerId) {
        self.emitter.off(id);
    }

    pub fn get_text(&self) -> String {
        self.editor.get_text()
    }

    /// Replace the whole document, as a regular undoable, synced edit.
    pub fn set_text(&mut self, text: &str) -> Result<(), OtError> {
        self.check_live()?;
        let old = self.editor.get_text();
        if old == text {
            return Ok(());
        }
        let mut op = TextOperation::new();
        op.delete(count_chars(&old)).insert(text);
        let mut inverse = TextOperation::new();
        inverse.delete(count_chars(text)).insert(&old);
        self.editor.set_text(text);
        self.on_change(op, inverse)
    }

    pub fn is_history_empty(&self) -> bool {
        self.server.is_history_empty()
    }

    pub fn set_user_id(&mut self, user_id: &str) {
        self.server.set_user_id(user_id);
    }

    pub fn set_user_color(&mut self, color: &str) {
        self.server.set_user_color(color);
    }

    pub fn set_user_name(&mut self, name: &str) {
        self.server.set_user_name(name);
    }

    pub fn client_state(&self) -> &ClientState {
        self.client.state()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn remote_client(&self, client_id: &str) -> Option<&RemoteClient> {
        self.peers.get(client_id)
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn clear_undo_redo_stack(&mut self) {
        self.undo.dispose();
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// The editor reported a user edit: `op` is what happened, `inverse` undoes it.
    /// The edit is already present in the editor when this is called.
    pub fn on_change(&mut self, op: TextOperation, inverse: TextOperation) -> Result<(), OtError> {
        self.check_live()?;
        let cursor_before = self.cursor;
        self.cursor = self.editor.get_cursor();
        let compose = self
            .undo
            .last()
            .is_some_and(|top| inverse.should_be_composed_with_inverted(&top.op));
        // Applying the stored inverse moves the cursor from where it is now back
        // to where it was before the edit.
        let meta = OpMeta::new(self.cursor, cursor_before);
        let result = self.undo.add(WrappedOp::new(inverse, Some(meta)), compose);
        if let Err(err) = result {
            return Err(self.fail(err, Some(&op)));
        }

        let result = {
            let Self { editor, server, undo, cursor, client, .. } = self;
            let mut ctx = AdapterCtx { editor, server, undo: Some(undo), cursor };
            client.apply_client(&mut ctx, op)
        };
        result.map_err(|err| self.fail(err, None))
    }

    pub fn on_cursor_activity(&mut self) -> Result<(), OtError> {
        self.check_live()?;
        self.cursor = self.editor.get_cursor();
        self.send_cursor();
        Ok(())
    }

    pub fn on_blur(&mut self) -> Result<(), OtError> {
        self.check_live()?;
        self.focused = false;
        self.cursor = None;
        self.send_cursor();
        Ok(())
    }

    pub fn on_focus(&mut self) -> Result<(), OtError> {
        self.check_live()?;
        self.focused = true;
        self.on_cursor_activity()
    }

    pub fn undo(&mut self) -> Result<(), OtError> {
        self.check_live()?;
        match self.replay_history(true) {
            Ok(description) => {
                self.emit(Event::Undo(description));
                Ok(())
            }
            Err(err) => Err(self.fail(err, None)),
        }
    }

    pub fn redo(&mut self) -> Result<(), OtError> {
        self.check_live()?;
        match self.replay_history(false) {
            Ok(description) => {
                self.emit(Event::Redo(description));
                Ok(())
            }
            Err(err) => Err(self.fail(err, None)),
        }
    }

    /// The coordinator acknowledged our outstanding operation.
    pub fn server_ack(&mut self) -> Result<(), OtError> {
        self.check_live()?;
        let result = {
            let Self { editor, server, undo, cursor, client, .. } = self;
            let mut ctx = AdapterCtx { editor, server, undo: Some(undo), cursor };
            client.server_ack(&mut ctx)
        };
        if let Err(err) = result {
            return Err(self.fail(err, None));
        }
        self.cursor = self.editor.get_cursor();
        self.send_cursor();
        let synced = self.client.is_synchronized();
        self.emit(Event::Synced(synced));
        Ok(())
    }

    /// The coordinator could not persist our operation and asks us to resend.
    pub fn server_retry(&mut self) -> Result<(), OtError> {
        self.check_live()?;
        let result = {
            let Self { editor, server, undo, cursor, client, .. } = self;
            let mut ctx = AdapterCtx { editor, server, undo: Some(undo), cursor };
            client.server_retry(&mut ctx)
        };
        result.map_err(|err| self.fail(err, None))
    }

    /// The coordinator delivered another client's operation.
    pub fn server_operation(&mut self, op: &TextOperation) -> Result<(), OtError> {
        self.check_live()?;
        let result = {
            let Self { editor, server, undo, cursor, client, .. } = self;
            let mut ctx = AdapterCtx { editor, server, undo: Some(undo), cursor };
            client.apply_server(&mut ctx, op)
        };
        if let Err(err) = result {
            return Err(self.fail(err, Some(op)));
        }
        let synced = self.client.is_synchronized();
        self.emit(Event::Synced(synced));
        Ok(())
    }

    /// The coordinator broadcast a peer's cursor. `None` means the peer blurred.
    pub fn server_cursor(
        &mut self,
        client_id: &str,
        cursor: Option<Cursor>,
        color: Option<&str>,
        name: Option<&str>,
    ) -> Result<(), OtError> {
        self.check_live()?;
        if self.server.is_current_user(client_id) {
            return Ok(());
        }
        // While we have unacknowledged edits a peer cursor would be positioned
        // against the wrong document version; it will be broadcast again.
        if !self.client.is_synchronized() {
            debug!(client_id, "ignoring peer cursor while out of sync");
            return Ok(());
        }

        let Self { peers, editor, .. } = self;
        let peer = peers.entry(client_id.into()).or_insert_with(|| RemoteClient {
            id: client_id.into(),
            color: SmartString::new(),
            name: None,
            cursor: None,
            marker: None,
        });
        if let Some(color) = color {
            peer.color = color.into();
        }
        if let Some(name) = name {
            peer.name = Some(name.into());
        }
        if let Some(old) = peer.marker.take() {
            editor.remove_other_cursor(old);
        }
        peer.cursor = cursor;
        if let Some(cursor) = &cursor {
            peer.marker =
                Some(editor.set_other_cursor(client_id, cursor, &peer.color, peer.name.as_deref()));
        }
        Ok(())
    }

    /// The coordinator reported that a peer has left the session.
    pub fn server_client_left(&mut self, client_id: &str) -> Result<(), OtError> {
        self.check_live()?;
        if let Some(mut peer) = self.peers.remove(client_id) {
            if let Some(marker) = peer.marker.take() {
                self.editor.remove_other_cursor(marker);
            }
        }
        Ok(())
    }

    /// The coordinator reported a failure (e.g. a rejected transaction). Re-emitted
    /// as an error event; whether to retry stays with the coordinator.
    pub fn server_error(&mut self, message: &str) {
        if self.disposed {
            return;
        }
        let state = format!("{:?}", self.client.state());
        self.emitter.emit(&Event::Error(format!("{message} (state: {state})")));
    }

    /// Idempotent teardown: removes rendered cursors, clears history, listeners and
    /// peers. Afterwards every other method fails with [`OtError::Disposed`].
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for peer in self.peers.values_mut() {
            if let Some(marker) = peer.marker.take() {
                self.editor.remove_other_cursor(marker);
            }
        }
        self.peers.clear();
        self.undo.dispose();
        self.emitter.clear();
        self.cursor = None;
        self.disposed = true;
    }

    fn replay_history(&mut self, is_undo: bool) -> Result<String, OtError> {
        let Self { editor, server, undo, cursor, client, .. } = self;
        let mut description = String::new();
        let replay = |undo: &mut UndoManager, entry: WrappedOp| -> Result<(), OtError> {
            description = format!("{:?}", entry.op);
            let inverse_op = editor.invert_operation(&entry.op)?;
            let inverse = WrappedOp::new(inverse_op, entry.meta.as_ref().map(OpMeta::invert));
            undo.add(inverse, false)?;
            editor.apply_operation(&entry.op)?;
            if let Some(c) = entry.meta.as_ref().and_then(|m| m.cursor_after) {
                *cursor = Some(c);
                editor.set_cursor(&c);
            }
            let mut ctx = AdapterCtx { editor, server, undo: None, cursor };
            client.apply_client(&mut ctx, entry.op)
        };
        if is_undo {
            undo.perform_undo(replay)?;
        } else {
            undo.perform_redo(replay)?;
        }
        Ok(description)
    }

    /// Broadcast the local cursor — unless local edits are still buffered, in
    /// which case the update is withheld and the acknowledgement path re-sends the
    /// cursor once it describes a document version the coordinator knows about.
    fn send_cursor(&mut self) {
        if self.client.has_buffer() {
            debug!("deferring cursor broadcast until the buffer flushes");
            return;
        }
        self.server.send_cursor(self.cursor.as_ref());
    }

    fn emit(&mut self, event: Event) {
        self.emitter.emit(&event);
    }

    fn fail(&mut self, err: OtError, op: Option<&TextOperation>) -> OtError {
        let state = format!("{:?}", self.client.state());
        self.emitter.emit(&Event::Error(match op {
            Some(op) => format!("{err} (op: {op:?}, state: {state})"),
            None => format!("{err} (state: {state})"),
        }));
        err
    }

    fn check_live(&self) -> Result<(), OtError> {
        if self.disposed {
            Err(OtError::Disposed)
        } else {
            Ok(())
        }
    }
}
