// src/acquire/sources/mod.rs
//! Acquisition strategies. Each one implements `ProfileSource` on top of a
//! provider boundary trait, so tests can drive them with in-process fakes.

pub mod direct;
pub mod job;
pub mod live;
pub mod multi_input;

pub use direct::DirectSource;
pub use job::JobSource;
pub use live::LiveSessionSource;
pub use multi_input::MultiInputSource;

use super::types::{is_profile_reference, AcquisitionRequest, SourceFailure};

/// Common preamble: credential present and reference well-formed.
pub(crate) fn precheck(
    name: &'static str,
    missing_credential: Option<&'static str>,
    request: &AcquisitionRequest,
) -> Result<(), SourceFailure> {
    if let Some(cred) = missing_credential {
        return Err(SourceFailure::not_configured(name, cred));
    }
    if !is_profile_reference(request.reference()) {
        return Err(SourceFailure::invalid_reference(name));
    }
    Ok(())
}
