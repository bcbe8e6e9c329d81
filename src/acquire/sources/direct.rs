// src/acquire/sources/direct.rs
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::precheck;
use crate::acquire::normalize::normalize;
use crate::acquire::providers::{CallReply, SingleCallApi};
use crate::acquire::types::{
    AcquisitionOutcome, AcquisitionRequest, FailureKind, ProfileSource, SourceFailure,
};

/// One request, one response, no polling.
pub struct DirectSource<A> {
    name: &'static str,
    api: A,
}

impl<A: SingleCallApi> DirectSource<A> {
    pub fn new(name: &'static str, api: A) -> Self {
        Self { name, api }
    }
}

#[async_trait]
impl<A: SingleCallApi> ProfileSource for DirectSource<A> {
    async fn attempt_acquire(&self, request: &AcquisitionRequest) -> AcquisitionOutcome {
        precheck(self.name, self.api.missing_credential(), request)?;

        let reply = self
            .api
            .call(json!({ "url": request.reference() }))
            .await
            .map_err(|e| SourceFailure::transport(self.name, &e))?;

        match reply {
            CallReply::Data(body) => {
                let payload = self.api.wrap(body);
                if payload.is_empty() {
                    return Err(SourceFailure::new(
                        self.name,
                        FailureKind::NoData,
                        "empty profile body",
                    ));
                }
                info!(target: "acquire", source = self.name, "direct call returned profile");
                Ok(normalize(&payload))
            }
            CallReply::Rejected(status) => Err(SourceFailure::new(
                self.name,
                FailureKind::Transport,
                format!("HTTP {status}"),
            )),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::normalize::RawProviderPayload;
    use serde_json::Value;

    struct Fixed(CallReply);

    #[async_trait]
    impl SingleCallApi for Fixed {
        async fn call(&self, body: Value) -> anyhow::Result<CallReply> {
            assert!(body.get("url").is_some());
            Ok(self.0.clone())
        }
        fn missing_credential(&self) -> Option<&'static str> {
            None
        }
        fn wrap(&self, item: Value) -> RawProviderPayload {
            RawProviderPayload::PhantomDirect(item)
        }
    }

    const REF: &str = "https://www.linkedin.com/in/direct";

    #[tokio::test]
    async fn data_is_normalized_with_direct_schema() {
        let src = DirectSource::new(
            "direct",
            Fixed(CallReply::Data(serde_json::json!({
                "fullName": "Dee Rect",
                "recentPost": "Hiring!"
            }))),
        );
        let rec = src.attempt_acquire(&AcquisitionRequest::new(REF)).await.unwrap();
        assert_eq!(rec.full_name(), "Dee Rect");
        assert_eq!(rec.recent_post_text(), "Hiring!");
    }

    #[tokio::test]
    async fn http_rejection_and_empty_body_fail() {
        let src = DirectSource::new("direct", Fixed(CallReply::Rejected(503)));
        let err = src.attempt_acquire(&AcquisitionRequest::new(REF)).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Transport);
        assert_eq!(err.message, "HTTP 503");

        let src = DirectSource::new("direct", Fixed(CallReply::Data(serde_json::json!({}))));
        let err = src.attempt_acquire(&AcquisitionRequest::new(REF)).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::NoData);
    }
}
