//! Requests to the model generation backend

use bevy::prelude::*;
use gearview_core::{DispatchError, GenerateResponse, ParamSet, RequestTicket};
use std::sync::{Arc, Mutex};

use crate::app::{ActiveRequest, Alerts, Catalog};
use crate::config::ViewerConfig;
use crate::models::{load_model_by_type, LoadModel, ModelSource};

pub struct NetworkPlugin;

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingReplies>()
            .init_resource::<PendingCatalog>()
            .init_resource::<PendingFont>()
            .add_message::<SubmitCommand>()
            .add_message::<SubmitParams>()
            .add_systems(Startup, (fetch_catalog, fetch_font))
            .add_systems(Update, (
                process_catalog,
                load_startup_model,
                handle_commands,
                handle_param_updates,
                process_replies,
            ).chain());
    }
}

/// Free text to match against the keyword map and send to the backend
#[derive(Message, Debug, Clone)]
pub struct SubmitCommand(pub String);

/// Validated parameters to regenerate a part with
#[derive(Message, Debug, Clone)]
pub struct SubmitParams {
    pub part_type: String,
    pub params: ParamSet,
}

/// A finished backend request
#[derive(Debug)]
pub struct BackendReply {
    pub ticket: RequestTicket,
    /// Part type the request was made for
    pub requested_part: String,
    pub result: Result<GenerateResponse, String>,
}

/// Replies waiting to be processed
#[derive(Resource, Default, Clone)]
pub struct PendingReplies(pub Arc<Mutex<Vec<BackendReply>>>);

/// Catalog download state
#[derive(Resource, Default, Clone)]
pub struct PendingCatalog {
    pub body: Arc<Mutex<Option<Result<String, String>>>>,
    /// True until a configured catalog URL has been answered
    pub waiting: bool,
}

/// Font bytes downloaded for the UI
#[derive(Resource, Default, Clone)]
pub struct PendingFont(pub Arc<Mutex<Option<Vec<u8>>>>);

/// Match commands to a part and send them to `/generate-model`
fn handle_commands(
    mut commands_in: MessageReader<SubmitCommand>,
    catalog: Res<Catalog>,
    config: Res<ViewerConfig>,
    mut active: ResMut<ActiveRequest>,
    mut alerts: ResMut<Alerts>,
    replies: Res<PendingReplies>,
) {
    for SubmitCommand(text) in commands_in.read() {
        let dispatch = match catalog.dispatcher.dispatch(text) {
            Ok(dispatch) => dispatch,
            Err(DispatchError::Empty) => continue,
            Err(e @ DispatchError::NoMatch(_)) => {
                tracing::info!("{}", e);
                alerts.push("No part recognised in the command. Try \"画个齿轮\" or \"make a gear\".");
                continue;
            }
        };

        let ticket = active.0.issue();
        tracing::info!("Command {:?} matched {} ({:?})", dispatch.command, dispatch.intent, ticket);
        let body = serde_json::json!({ "command": dispatch.command });
        post_generation(
            config.endpoint.generate_url(),
            body,
            ticket,
            dispatch.intent.as_str().to_string(),
            replies.clone(),
        );
    }
}

/// Send validated parameters to `/<part_type>`
fn handle_param_updates(
    mut updates: MessageReader<SubmitParams>,
    config: Res<ViewerConfig>,
    mut active: ResMut<ActiveRequest>,
    replies: Res<PendingReplies>,
) {
    for update in updates.read() {
        let ticket = active.0.issue();
        tracing::info!("Regenerating {} with {:?} ({:?})", update.part_type, update.params, ticket);
        let body = match serde_json::to_value(&update.params) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to encode parameters: {}", e);
                continue;
            }
        };
        post_generation(
            config.endpoint.part_url(&update.part_type),
            body,
            ticket,
            update.part_type.clone(),
            replies.clone(),
        );
    }
}

/// POST a JSON body and queue the parsed reply
fn post_generation(
    url: String,
    body: serde_json::Value,
    ticket: RequestTicket,
    requested_part: String,
    replies: PendingReplies,
) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        spawn_local(async move {
            let result = send_json(&url, &body).await;
            if let Ok(mut pending) = replies.0.lock() {
                pending.push(BackendReply {
                    ticket,
                    requested_part,
                    result,
                });
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        tracing::warn!("Backend requests not available in native mode: POST {} {}", url, body);
        if let Ok(mut pending) = replies.0.lock() {
            pending.push(BackendReply {
                ticket,
                requested_part,
                result: Err("Backend requests are only available in the browser".to_string()),
            });
        }
    }
}

#[cfg(target_arch = "wasm32")]
async fn send_json(url: &str, body: &serde_json::Value) -> Result<GenerateResponse, String> {
    let request = gloo_net::http::Request::post(url)
        .json(body)
        .map_err(|e| format!("Failed to build request: {}", e))?;
    let response = request
        .send()
        .await
        .map_err(|e| format!("Request to {} failed: {}", url, e))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| format!("Failed to read response: {}", e))?;
    gearview_core::parse_generate_response(status, &text).map_err(|e| e.to_string())
}

/// Turn current replies into model loads; stale ones are dropped
fn process_replies(
    replies: Res<PendingReplies>,
    mut active: ResMut<ActiveRequest>,
    mut alerts: ResMut<Alerts>,
    mut load_events: MessageWriter<LoadModel>,
) {
    let drained: Vec<BackendReply> = match replies.0.lock() {
        Ok(mut pending) => pending.drain(..).collect(),
        Err(_) => return,
    };

    for reply in drained {
        if !active.0.is_current(reply.ticket) {
            tracing::info!("Discarding stale response for {} ({:?})", reply.requested_part, reply.ticket);
            continue;
        }

        let model = reply
            .result
            .and_then(|response| response.into_model(Some(&reply.requested_part)).map_err(|e| e.to_string()));

        match model {
            Ok(model) => {
                tracing::info!(
                    "Received {} byte model for {:?}",
                    model.bytes.len(),
                    model.part_type
                );
                load_events.write(LoadModel {
                    ticket: reply.ticket,
                    source: ModelSource::Bytes(model.bytes),
                    part_type: model.part_type,
                    params: model.params,
                });
            }
            Err(error) => {
                active.0.complete(reply.ticket);
                tracing::error!("Model generation failed: {}", error);
                alerts.push(format!("Model generation failed: {}", error));
            }
        }
    }
}

/// Start downloading the catalog named by `?catalog=`
fn fetch_catalog(config: Res<ViewerConfig>, mut pending: ResMut<PendingCatalog>) {
    let Some(url) = config.catalog_url.clone() else { return };
    pending.waiting = true;
    tracing::info!("Fetching part catalog from {}", url);

    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let slot = pending.body.clone();
        spawn_local(async move {
            let result = match gloo_net::http::Request::get(&url).send().await {
                Ok(response) if response.ok() => response.text().await.map_err(|e| e.to_string()),
                Ok(response) => Err(format!("HTTP {}", response.status())),
                Err(e) => Err(e.to_string()),
            };
            if let Ok(mut body) = slot.lock() {
                *body = Some(result);
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        tracing::warn!("Catalog download not available in native mode");
        if let Ok(mut body) = pending.body.lock() {
            *body = Some(Err("not available in native mode".to_string()));
        }
    }
}

/// Replace the built-in catalog once the download finishes
fn process_catalog(
    mut pending: ResMut<PendingCatalog>,
    mut catalog: ResMut<Catalog>,
    mut alerts: ResMut<Alerts>,
) {
    if !pending.waiting {
        return;
    }
    let Some(result) = pending.body.lock().ok().and_then(|mut body| body.take()) else {
        return;
    };
    pending.waiting = false;

    match result.and_then(|text| gearview_core::PartCatalog::from_toml(&text).map_err(|e| e.to_string())) {
        Ok(parts) => {
            tracing::info!("Loaded part catalog with {} parts", parts.part.len());
            *catalog = Catalog::new(parts);
        }
        Err(e) => {
            tracing::error!("Failed to load part catalog: {}", e);
            alerts.push(format!("Failed to load part catalog, using built-in parts: {}", e));
        }
    }
}

/// Show the `?model=` part once the catalog is settled
fn load_startup_model(
    config: Res<ViewerConfig>,
    pending: Res<PendingCatalog>,
    catalog: Res<Catalog>,
    mut active: ResMut<ActiveRequest>,
    mut load_events: MessageWriter<LoadModel>,
    mut done: Local<bool>,
) {
    if *done || pending.waiting {
        return;
    }
    *done = true;
    if let Some(part_type) = &config.startup_model {
        load_model_by_type(part_type, &catalog, &mut active, &mut load_events);
    }
}

/// Start downloading the font named by `?font=`
#[cfg_attr(not(target_arch = "wasm32"), allow(unused_variables))]
fn fetch_font(config: Res<ViewerConfig>, pending: Res<PendingFont>) {
    let Some(url) = config.font_url.clone() else { return };
    tracing::info!("Fetching UI font from {}", url);

    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let slot = pending.0.clone();
        spawn_local(async move {
            match gloo_net::http::Request::get(&url).send().await {
                Ok(response) if response.ok() => match response.binary().await {
                    Ok(bytes) => {
                        if let Ok(mut font) = slot.lock() {
                            *font = Some(bytes);
                        }
                    }
                    Err(e) => tracing::error!("Failed to read font {}: {}", url, e),
                },
                Ok(response) => tracing::error!("Failed to fetch font {}: HTTP {}", url, response.status()),
                Err(e) => tracing::error!("Failed to fetch font {}: {}", url, e),
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    tracing::warn!("Font download not available in native mode");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let mut app = App::new();
        app.insert_resource(ViewerConfig::default())
            .init_resource::<Catalog>()
            .init_resource::<ActiveRequest>()
            .init_resource::<Alerts>()
            .init_resource::<PendingReplies>()
            .add_message::<SubmitCommand>()
            .add_message::<LoadModel>()
            .add_systems(Update, (handle_commands, process_replies).chain());
        app
    }

    #[test]
    fn test_unmatched_command_sends_nothing() {
        let mut app = test_app();
        app.world_mut().write_message(SubmitCommand("hello there".to_string()));
        app.update();

        assert!(!app.world().resource::<ActiveRequest>().0.is_pending());
        assert_eq!(app.world().resource::<Alerts>().queue.len(), 1);
    }

    #[test]
    fn test_stale_reply_is_dropped() {
        let mut app = test_app();
        let (stale, current) = {
            let mut active = app.world_mut().resource_mut::<ActiveRequest>();
            (active.0.issue(), active.0.issue())
        };
        let replies = app.world().resource::<PendingReplies>().clone();
        replies.0.lock().unwrap().push(BackendReply {
            ticket: stale,
            requested_part: "gear".to_string(),
            result: Err("late failure".to_string()),
        });
        app.update();

        // The stale failure neither alerts nor clears the current request
        assert!(app.world().resource::<Alerts>().queue.is_empty());
        assert!(app.world().resource::<ActiveRequest>().0.is_current(current));
        assert!(app.world().resource::<ActiveRequest>().0.is_pending());
    }

    #[test]
    fn test_current_failure_alerts() {
        let mut app = test_app();
        let ticket = app.world_mut().resource_mut::<ActiveRequest>().0.issue();
        let replies = app.world().resource::<PendingReplies>().clone();
        replies.0.lock().unwrap().push(BackendReply {
            ticket,
            requested_part: "gear".to_string(),
            result: Err("Backend returned HTTP 500: boom".to_string()),
        });
        app.update();

        assert!(!app.world().resource::<ActiveRequest>().0.is_pending());
        assert_eq!(app.world().resource::<Alerts>().queue.len(), 1);
    }
}
