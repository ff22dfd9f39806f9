use lambda_http::request::RequestContext;
use lambda_http::{Body, Error, Request, RequestExt, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::claims::Principal;
use crate::error::ClubError;

/// What a handler produced; turned into an API Gateway response by [`respond`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json { status: u16, body: Value },
    NoContent,
}

impl Reply {
    pub fn ok<T: Serialize>(value: &T) -> Result<Reply, ClubError> {
        Reply::with_status(200, value)
    }

    pub fn created<T: Serialize>(value: &T) -> Result<Reply, ClubError> {
        Reply::with_status(201, value)
    }

    pub fn with_status<T: Serialize>(status: u16, value: &T) -> Result<Reply, ClubError> {
        let body = serde_json::to_value(value).map_err(|e| ClubError::Malformed(e.to_string()))?;
        Ok(Reply::Json { status, body })
    }

    pub fn status(&self) -> u16 {
        match self {
            Reply::Json { status, .. } => *status,
            Reply::NoContent => 204,
        }
    }
}

/// The caller as set by the authorizer. A request without a REST API context
/// has no caller.
pub fn principal(event: &Request) -> Result<Principal, ClubError> {
    match event.extensions().get::<RequestContext>() {
        Some(RequestContext::ApiGatewayV1(ctx)) => {
            Principal::from_authorizer(&ctx.authorizer).ok_or(ClubError::Unauthorized)
        }
        _ => Err(ClubError::Unauthorized),
    }
}

pub fn parse_body<T: DeserializeOwned>(event: &Request) -> Result<T, ClubError> {
    let parsed = match event.body() {
        Body::Text(s) => serde_json::from_str(s),
        Body::Binary(b) => serde_json::from_slice(b),
        Body::Empty => return Err(ClubError::bad_request("Expected a request body.")),
    };
    Ok(parsed?)
}

pub fn path_param(event: &Request, name: &str) -> Option<String> {
    event.path_parameters().first(name).map(str::to_string)
}

pub fn query_param(event: &Request, name: &str) -> Option<String> {
    event
        .query_string_parameters()
        .first(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn builder(status: u16) -> lambda_http::http::response::Builder {
    Response::builder()
        .status(status)
        .header("access-control-allow-origin", "*")
}

pub fn error_body(err: &ClubError) -> Value {
    if err.status_code() >= 500 {
        json!({ "error": "Internal Server Error" })
    } else {
        json!({ "error": err.to_string() })
    }
}

pub fn respond(result: Result<Reply, ClubError>) -> Result<Response<Body>, Error> {
    let resp = match result {
        Ok(Reply::Json { status, body }) => builder(status)
            .header("content-type", "application/json")
            .body(body.to_string().into())
            .map_err(Box::new)?,
        Ok(Reply::NoContent) => builder(204).body(Body::Empty).map_err(Box::new)?,
        Err(e) => {
            let status = e.status_code();
            if status >= 500 {
                error!("request failed: {}", e);
            } else {
                info!("request refused ({}): {}", status, e);
            }
            builder(status)
                .header("content-type", "application/json")
                .body(error_body(&e).to_string().into())
                .map_err(Box::new)?
        }
    };
    Ok(resp)
}
