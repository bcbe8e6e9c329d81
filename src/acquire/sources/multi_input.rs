// src/acquire/sources/multi_input.rs
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::precheck;
use crate::acquire::normalize::normalize;
use crate::acquire::providers::{result_rows, CallReply, SingleCallApi};
use crate::acquire::types::{
    AcquisitionOutcome, AcquisitionRequest, FailureKind, ProfileSource, SourceFailure,
};

/// Tries an ordered list of request bodies against one synchronous endpoint.
/// The first body that comes back as a non-empty array wins; an HTTP
/// rejection moves on to the next body, a transport fault ends the attempt.
pub struct MultiInputSource<A> {
    name: &'static str,
    api: A,
    shapes: fn(&str) -> Vec<Value>,
}

impl<A: SingleCallApi> MultiInputSource<A> {
    pub fn new(name: &'static str, api: A, shapes: fn(&str) -> Vec<Value>) -> Self {
        Self { name, api, shapes }
    }
}

#[async_trait]
impl<A: SingleCallApi> ProfileSource for MultiInputSource<A> {
    async fn attempt_acquire(&self, request: &AcquisitionRequest) -> AcquisitionOutcome {
        precheck(self.name, self.api.missing_credential(), request)?;

        for (idx, shape) in (self.shapes)(request.reference()).into_iter().enumerate() {
            debug!(target: "acquire", source = self.name, shape = idx, "trying input shape");
            match self.api.call(shape).await {
                Ok(CallReply::Data(body)) => {
                    if let Some(first) = result_rows(body).into_iter().next() {
                        info!(target: "acquire", source = self.name, shape = idx, "input shape accepted");
                        return Ok(normalize(&self.api.wrap(first)));
                    }
                    debug!(target: "acquire", source = self.name, shape = idx, "empty result");
                }
                Ok(CallReply::Rejected(status)) => {
                    debug!(target: "acquire", source = self.name, shape = idx, status, "input shape rejected");
                }
                Err(e) => return Err(SourceFailure::transport(self.name, &e)),
            }
        }

        Err(SourceFailure::new(
            self.name,
            FailureKind::NoData,
            "All input shapes failed",
        ))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
