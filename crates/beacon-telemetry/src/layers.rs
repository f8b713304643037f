//! Request ID middleware helpers for Tower-compatible stacks.
//!
//! The CLI stamps every call with `x-request-id`; these layers keep that
//! identifier on the server side and echo it back, generating one when a
//! caller did not send it.

use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Factory for the `x-request-id` generator layer.
#[must_use]
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that propagates an incoming `x-request-id` header.
#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceBuilder;

    #[test]
    fn request_id_layers_compose_into_a_stack() {
        let _stack = ServiceBuilder::new()
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer());
    }
}
