//! The client side of the sync protocol.
//!
//! A client is always in one of three states with respect to the coordinator:
//!
//! ```text
//! ┌──────────────┐ apply_client: send  ┌─────────────────┐
//! │ Synchronized │────────────────────▶│ AwaitingConfirm │◀─┐
//! └──────────────┘                     └─────────────────┘  │ server_ack:
//!        ▲                 apply_client: buffer │           │ send buffer
//!        │ server_ack                           ▼           │
//!        │                            ┌────────────────────┐│
//!        └────────────────────────────│ AwaitingWithBuffer │┘
//!                                     └────────────────────┘
//! ```
//!
//! Remote operations can arrive in any state; they are transformed against whatever
//! is outstanding (and buffered) so the local edits stay valid against the
//! coordinator's order. All transitions are synchronous — the only suspension
//! points are the two [`ClientContext`] calls.

use std::mem::take;

use tracing::{debug, warn};

use crate::error::OtError;
use crate::operation::TextOperation;

/// What the state machine needs from its host: a way to ship local operations to
/// the coordinator, and a way to apply transformed remote operations to the editor.
pub trait ClientContext {
    fn send_operation(&mut self, op: &TextOperation) -> Result<(), OtError>;
    fn apply_operation(&mut self, op: &TextOperation) -> Result<(), OtError>;
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub enum ClientState {
    /// Everything we've authored has been acknowledged.
    #[default]
    Synchronized,
    /// One operation is in flight, waiting for the coordinator's acknowledgement.
    AwaitingConfirm { outstanding: TextOperation },
    /// One operation is in flight, and local edits made since are composed into a
    /// buffer to be sent once the outstanding one is acknowledged.
    AwaitingWithBuffer { outstanding: TextOperation, buffer: TextOperation },
}

#[derive(Debug, Clone, Default)]
pub struct Client {
    state: ClientState,
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn is_synchronized(&self) -> bool {
        matches!(self.state, ClientState::Synchronized)
    }

    pub fn has_buffer(&self) -> bool {
        matches!(self.state, ClientState::AwaitingWithBuffer { .. })
    }

    /// The user edited the document locally.
    pub fn apply_client(
        &mut self,
        ctx: &mut dyn ClientContext,
        op: TextOperation,
    ) -> Result<(), OtError> {
        match take(&mut self.state) {
            ClientState::Synchronized => {
                debug!("sending operation to coordinator");
                self.state = ClientState::AwaitingConfirm { outstanding: op };
                if let ClientState::AwaitingConfirm { outstanding } = &self.state {
                    ctx.send_operation(outstanding)?;
                }
                Ok(())
            }
            ClientState::AwaitingConfirm { outstanding } => {
                self.state = ClientState::AwaitingWithBuffer { outstanding, buffer: op };
                Ok(())
            }
            ClientState::AwaitingWithBuffer { outstanding, buffer } => match buffer.compose(&op) {
                Ok(buffer) => {
                    self.state = ClientState::AwaitingWithBuffer { outstanding, buffer };
                    Ok(())
                }
                Err(err) => {
                    self.state = ClientState::AwaitingWithBuffer { outstanding, buffer };
                    Err(err)
                }
            },
        }
    }

    /// The coordinator delivered an operation from another client.
    pub fn apply_server(
        &mut self,
        ctx: &mut dyn ClientContext,
        op: &TextOperation,
    ) -> Result<(), OtError> {
        match take(&mut self.state) {
            ClientState::Synchronized => ctx.apply_operation(op),
            ClientState::AwaitingConfirm { outstanding } => {
                match outstanding.transform(op) {
                    Ok((outstanding, op)) => {
                        self.state = ClientState::AwaitingConfirm { outstanding };
                        ctx.apply_operation(&op)
                    }
                    Err(err) => {
                        self.state = ClientState::AwaitingConfirm { outstanding };
                        Err(err)
                    }
                }
            }
            ClientState::AwaitingWithBuffer { outstanding, buffer } => {
                let transformed = outstanding
                    .transform(op)
                    .and_then(|(outstanding, op)| {
                        buffer.transform(&op).map(|(buffer, op)| (outstanding, buffer, op))
                    });
                match transformed {
                    Ok((outstanding, buffer, op)) => {
                        self.state = ClientState::AwaitingWithBuffer { outstanding, buffer };
                        ctx.apply_operation(&op)
                    }
                    Err(err) => {
                        self.state = ClientState::AwaitingWithBuffer { outstanding, buffer };
                        Err(err)
                    }
                }
            }
        }
    }

    /// The coordinator acknowledged our outstanding operation.
    pub fn server_ack(&mut self, ctx: &mut dyn ClientContext) -> Result<(), OtError> {
        match take(&mut self.state) {
            ClientState::Synchronized => {
                warn!("acknowledgement received with nothing outstanding");
                Err(OtError::NoPendingOp)
            }
            ClientState::AwaitingConfirm { .. } => Ok(()),
            ClientState::AwaitingWithBuffer { buffer, .. } => {
                debug!("acknowledged; sending buffered operation");
                self.state = ClientState::AwaitingConfirm { outstanding: buffer };
                if let ClientState::AwaitingConfirm { outstanding } = &self.state {
                    ctx.send_operation(outstanding)?;
                }
                Ok(())
            }
        }
    }

    /// The coordinator asked us to resend. Outstanding and buffered work are folded
    /// into a single operation so the retry carries everything local.
    pub fn server_retry(&mut self, ctx: &mut dyn ClientContext) -> Result<(), OtError> {
        match take(&mut self.state) {
            ClientState::Synchronized => {
                warn!("retry requested with nothing outstanding");
                Err(OtError::NoPendingOp)
            }
            ClientState::AwaitingConfirm { outstanding } => {
                debug!("resending outstanding operation");
                self.state = ClientState::AwaitingConfirm { outstanding };
                if let ClientState::AwaitingConfirm { outstanding } = &self.state {
                    ctx.send_operation(outstanding)?;
                }
                Ok(())
            }
            ClientState::AwaitingWithBuffer { outstanding, buffer } => {
                match outstanding.compose(&buffer) {
                    Ok(merged) => {
                        debug!("resending outstanding and buffer as one operation");
                        self.state = ClientState::AwaitingConfirm { outstanding: merged };
                        if let ClientState::AwaitingConfirm { outstanding } = &self.state {
                            ctx.send_operation(outstanding)?;
                        }
                        Ok(())
                    }
                    Err(err) => {
                        self.state = ClientState::AwaitingWithBuffer { outstanding, buffer };
                        Err(err)
                    }
                }
            }
        }
    }
}
