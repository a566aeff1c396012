//! Isolated execution of the engine.
//!
//! Every request is handled in its own unit on the blocking worker pool,
//! so a panic inside the engine unwinds that unit only. The caller waits
//! for the unit to terminate and reads the response back exactly once.
//!
//! Output the engine writes to the [`OutputBuffer`] instead of the
//! response itself is appended to the response body when the unit
//! terminates. The flush is done by a drop guard, so it also happens when
//! the engine panics:
//!
//! ```text
//! caller ──spawn──> unit: ResponseSlot ─ engine.process(request, response, output)
//!    │                       │ (drop, normal return or unwind)
//!    │                       └─ response.body += output ──reply──┐
//!    └──join──────────────────────────────────────────────────────┴─> RoutedResponse
//! ```

use std::{any::Any, fmt, io, mem, sync::Arc, time::Instant};

use bytes::{Bytes, BytesMut};
use log::{debug, error, warn};
use thiserror::Error;
use tokio::{sync::oneshot, task};
use tokio_util::sync::CancellationToken;

use crate::{
    errors::ExecutionError,
    server::dispatch::{RoutedRequest, RoutedResponse},
};

/// The servlet engine locating and servicing the servlet for a request.
///
/// Implementations run inside an isolated unit; anything written to
/// `output` ends up in the response body after the engine returns.
///
/// # Examples
///
/// ```rust,ignore
/// use std::io::Write;
/// use servlet_dispatch::server::execution::{Engine, OutputBuffer};
///
/// struct HelloEngine;
///
/// impl Engine for HelloEngine {
///     fn process(
///         &self,
///         request: &RoutedRequest,
///         response: &mut RoutedResponse,
///         output: &mut OutputBuffer,
///     ) -> Result<(), ExecutionError> {
///         write!(output, "Hello from {}", request.servlet_path())
///             .map_err(|e| ExecutionError::Engine(e.to_string()))
///     }
/// }
/// ```
pub trait Engine: Send + Sync + 'static {
    fn process(
        &self,
        request: &RoutedRequest,
        response: &mut RoutedResponse,
        output: &mut OutputBuffer,
    ) -> Result<(), ExecutionError>;
}

/// Buffer capturing the output an engine writes outside the response.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    buffer: BytesMut,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer
            .is_empty()
    }

    /// Takes the buffered output, leaving the buffer empty.
    pub fn take(&mut self) -> Bytes {
        self.buffer
            .split()
            .freeze()
    }
}

impl io::Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Write for OutputBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer
            .extend_from_slice(s.as_bytes());
        Ok(())
    }
}

/// The failure of an execution unit.
///
/// Carries the response produced up to the failure, with the buffered
/// output flushed into its body, unless the caller stopped waiting.
#[derive(Debug, Error)]
#[error("{cause}")]
pub struct ExecutionFailure {
    cause: ExecutionError,
    response: Option<RoutedResponse>,
}

impl ExecutionFailure {
    pub fn new(cause: ExecutionError, response: Option<RoutedResponse>) -> Self {
        Self { cause, response }
    }

    pub fn cause(&self) -> &ExecutionError {
        &self.cause
    }

    pub fn response(&self) -> Option<&RoutedResponse> {
        self.response
            .as_ref()
    }

    pub fn into_parts(self) -> (ExecutionError, Option<RoutedResponse>) {
        (self.cause, self.response)
    }
}

/// Owns the response while the engine runs and hands it back on drop.
struct ResponseSlot {
    response: RoutedResponse,
    output: OutputBuffer,
    reply: Option<oneshot::Sender<RoutedResponse>>,
}

impl ResponseSlot {
    fn new(reply: oneshot::Sender<RoutedResponse>) -> Self {
        Self { response: RoutedResponse::new(), output: OutputBuffer::new(), reply: Some(reply) }
    }
}

impl Drop for ResponseSlot {
    fn drop(&mut self) {
        if let Some(reply) = self
            .reply
            .take()
        {
            let mut response = mem::take(&mut self.response);
            response.append_body(&self.output.take());
            // The receiver is gone only if the caller stopped waiting.
            let _ = reply.send(response);
        }
    }
}

/// Runs the engine for one request in an isolated unit.
#[derive(Clone)]
pub struct IsolatedExecutionUnit {
    engine: Arc<dyn Engine>,
}

impl IsolatedExecutionUnit {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Handles `request` and waits for the unit to terminate.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionFailure`] if the engine reports an error or
    /// panics. Engine failures are never retried.
    pub async fn execute(&self, request: RoutedRequest) -> Result<RoutedResponse, ExecutionFailure> {
        self.run(request, None)
            .await
    }

    /// Like [`IsolatedExecutionUnit::execute`], but stops waiting once
    /// `token` is cancelled.
    ///
    /// The unit itself cannot be interrupted; the request's own token is
    /// cancelled so a cooperative engine can stop early.
    pub async fn execute_with_cancellation(
        &self,
        request: RoutedRequest,
        token: CancellationToken,
    ) -> Result<RoutedResponse, ExecutionFailure> {
        self.run(request, Some(token))
            .await
    }

    async fn run(
        &self,
        request: RoutedRequest,
        token: Option<CancellationToken>,
    ) -> Result<RoutedResponse, ExecutionFailure> {
        let application = request
            .application()
            .name()
            .to_string();
        let servlet_path = request
            .servlet_path()
            .to_string();
        let request_token = request
            .cancellation_token()
            .clone();

        let (reply_tx, reply_rx) = oneshot::channel();
        let engine = self
            .engine
            .clone();

        let started = Instant::now();
        let unit = task::spawn_blocking(move || {
            let mut slot = ResponseSlot::new(reply_tx);
            engine.process(&request, &mut slot.response, &mut slot.output)
        });

        let joined = match token {
            Some(token) => {
                tokio::select! {
                    joined = unit => joined,
                    _ = token.cancelled() => {
                        warn!("Execution of {}{} cancelled", application, servlet_path);
                        request_token.cancel();
                        return Err(ExecutionFailure::new(ExecutionError::Cancelled, None));
                    }
                }
            }
            None => unit.await,
        };

        let response = reply_rx
            .await
            .map_err(|_| {
                ExecutionFailure::new(
                    ExecutionError::Interrupted("unit terminated without a response".to_string()),
                    None,
                )
            })?;

        let cause = match joined {
            Ok(Ok(())) => {
                debug!(
                    "Executed {}{} in {}ms",
                    application,
                    servlet_path,
                    started
                        .elapsed()
                        .as_millis()
                );
                return Ok(response);
            }
            Ok(Err(e)) => e,
            Err(join_error) if join_error.is_panic() => {
                ExecutionError::Panicked(panic_message(join_error.into_panic()))
            }
            Err(join_error) => ExecutionError::Interrupted(join_error.to_string()),
        };

        error!("Handling {}{} failed: {}", application, servlet_path, cause);
        Err(ExecutionFailure::new(cause, Some(response)))
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
