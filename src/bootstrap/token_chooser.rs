use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;
use tracing::info;

use super::BootstrapContext;
use crate::ring::Token;
use crate::BootstrapError;
use crate::Message;
use crate::NetworkError;
use crate::Result;
use crate::Verb;

/// Ask the most-loaded peer for a token splitting its primary range
/// roughly in half, and adopt the answer.
///
/// Ties on load break toward the peer seen first. The request carries
/// a bounded deadline; an unreachable peer fails the join instead of
/// hanging it.
pub async fn choose_bootstrap_token(ctx: &BootstrapContext) -> Result<Token> {
    let mut max: Option<(crate::ring::Endpoint, f64)> = None;
    for (endpoint, load) in ctx.load_balancer.load_info() {
        if endpoint == ctx.local {
            continue;
        }
        match &max {
            Some((_, max_load)) if load <= *max_load => {}
            _ => max = Some((endpoint, load)),
        }
    }

    let Some((max_endpoint, max_load)) = max else {
        return Err(BootstrapError::NoSourcesFound.into());
    };
    info!(endpoint = %max_endpoint, load = max_load, "requesting split token from most-loaded peer");

    let request = Message::new(Verb::BootstrapToken, &ctx.local, Bytes::new());
    let deadline = Duration::from_millis(ctx.config.bootstrap.token_request_timeout_ms);
    let reply = match timeout(deadline, ctx.transport.send_request(request, &max_endpoint)).await
    {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            return Err(BootstrapError::TokenRequestFailed {
                endpoint: max_endpoint.to_string(),
                detail: e.to_string(),
            }
            .into())
        }
        Err(_) => {
            return Err(NetworkError::Timeout {
                endpoint: max_endpoint.to_string(),
                duration: deadline,
            }
            .into())
        }
    };

    let token_str = std::str::from_utf8(&reply.body)
        .map_err(|e| NetworkError::MalformedMessage(format!("token reply: {e}")))?;
    let token = ctx.partitioner.token_from_string(token_str)?;

    info!(%token, endpoint = %max_endpoint, "setting token to assume load");
    Ok(token)
}
