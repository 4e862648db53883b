//! HTTP transport for the JSON API.
//!
//! Only moves bytes: every answer is computed by [`crate::api`].  Handlers
//! always reply `200 OK`; callers read the `success` flag.

use std::sync::Arc;

use anyhow::Result;
use esp_idf_svc::http::server::{Configuration, EspHttpConnection, EspHttpServer, Request};
use esp_idf_svc::http::Method;
use esp_idf_svc::io::{Read, Write};
use log::info;
use serde::Serialize;

use crate::api;
use crate::app::ports::ControlSurface;

const HTTP_STACK_SIZE: usize = 8 * 1024;

/// Register `/api/temperature` and `/api/power` and start listening.
/// The returned server must be kept alive.
pub fn start<C>(surface: Arc<C>, port: u16) -> Result<EspHttpServer<'static>>
where
    C: ControlSurface + Send + Sync + 'static,
{
    let conf = Configuration {
        http_port: port,
        stack_size: HTTP_STACK_SIZE,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&conf)?;

    {
        let surface = surface.clone();
        server.fn_handler::<anyhow::Error, _>("/api/temperature", Method::Get, move |req| {
            write_json(req, &api::temperature_response(surface.as_ref()))
        })?;
    }

    server.fn_handler::<anyhow::Error, _>("/api/power", Method::Post, move |mut req| {
        let response = match read_body(&mut req)? {
            Some(body) => api::power_response(surface.as_ref(), &body),
            None => api::PowerResponse {
                success: false,
                power: None,
                error: Some(api::ERR_INVALID_INPUT),
            },
        };
        write_json(req, &response)
    })?;

    info!("HTTP API listening on port {}", port);
    Ok(server)
}

/// `None` if the body exceeds [`api::MAX_BODY_LEN`].
fn read_body(req: &mut Request<&mut EspHttpConnection<'_>>) -> Result<Option<Vec<u8>>> {
    let mut body = Vec::with_capacity(api::MAX_BODY_LEN);
    let mut chunk = [0u8; 64];
    loop {
        let n = req.read(&mut chunk)?;
        if n == 0 {
            return Ok(Some(body));
        }
        if body.len() + n > api::MAX_BODY_LEN {
            return Ok(None);
        }
        body.extend_from_slice(&chunk[..n]);
    }
}

fn write_json<T: Serialize>(req: Request<&mut EspHttpConnection<'_>>, payload: &T) -> Result<()> {
    let body = serde_json::to_vec(payload)?;
    req.into_response(200, Some("OK"), &[("Content-Type", "application/json")])?
        .write_all(&body)?;
    Ok(())
}
