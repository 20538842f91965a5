//! The boundary between admission and the connection layer.

use crate::admission::error::AdmissionError;
use crate::admission::request::AdmissionRequest;

/// Actions the pipeline hands back to whoever owns the connection.
///
/// Exactly one method is called per admitted request.
pub trait Handoff {
    /// Obtain a backend session and start forwarding.
    fn checkout_session(&mut self, req: &AdmissionRequest<'_>);

    /// Read the full request body before checkout.
    fn begin_buffering_body(&mut self, req: &AdmissionRequest<'_>);

    /// Send an error response and close the connection. The request is
    /// already ended when this is called.
    fn terminate_with_error(&mut self, req: &AdmissionRequest<'_>, error: &AdmissionError);
}
