//! UI overlays using bevy_egui

use std::sync::Arc;

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use gearview_core::ParamForm;

use crate::app::{ActiveRequest, Alerts, Catalog};
use crate::camera::{CameraInitialReady, ResetCamera};
use crate::config::ViewerConfig;
use crate::models::{load_model_by_type, LoadModel, ModelLoadError, ModelLoadedWithParams};
use crate::network::{PendingFont, SubmitCommand, SubmitParams};
use crate::scene::CadPart;
use crate::speech::SpeechState;

const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 100, 100);

/// Name the downloaded font is registered under
const CUSTOM_FONT: &str = "custom";

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<UiState>()
            .add_systems(Update, track_model_events)
            // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, (install_custom_font, ui_system).chain());
    }
}

/// State owned by the UI
#[derive(Resource, Default)]
pub struct UiState {
    pub command_input: String,
    /// The first model has been framed, so reset has somewhere to go
    pub camera_ready: bool,
    /// Parameter form of the part on screen, if the catalog describes it
    pub param_form: Option<ParamForm>,
    pub param_error: Option<String>,
    pub last_load_error: Option<String>,
}

/// Grouped system parameters for the main UI system to work around Bevy's 16-param limit
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub state: ResMut<'w, UiState>,
    pub config: Res<'w, ViewerConfig>,
    pub catalog: Res<'w, Catalog>,
    pub active: ResMut<'w, ActiveRequest>,
    pub alerts: ResMut<'w, Alerts>,
    pub speech: ResMut<'w, SpeechState>,
    pub submit_command: MessageWriter<'w, SubmitCommand>,
    pub submit_params: MessageWriter<'w, SubmitParams>,
    pub load_model: MessageWriter<'w, LoadModel>,
    pub reset_camera: MessageWriter<'w, ResetCamera>,
}

/// Keep the parameter panel and status in step with what the scene shows
fn track_model_events(
    mut state: ResMut<UiState>,
    catalog: Res<Catalog>,
    mut loaded_events: MessageReader<ModelLoadedWithParams>,
    mut error_events: MessageReader<ModelLoadError>,
    mut ready_events: MessageReader<CameraInitialReady>,
    new_parts: Query<&CadPart, Added<CadPart>>,
) {
    for part in &new_parts {
        state.last_load_error = None;
        let described = part
            .part_type
            .as_deref()
            .is_some_and(|part_type| catalog.parts.get(part_type).is_some());
        if !described {
            state.param_form = None;
        }
    }

    for event in loaded_events.read() {
        if let Some(entry) = catalog.parts.get(&event.part_type) {
            state.param_form = Some(ParamForm::new(&event.part_type, &entry.field, &event.params));
            state.param_error = None;
        }
    }

    for event in error_events.read() {
        state.last_load_error = Some(format!("{}: {}", event.model_type, event.error));
    }

    if ready_events.read().count() > 0 {
        state.camera_ready = true;
    }
}

/// Add the `?font=` font as a fallback for every text family
fn install_custom_font(
    mut contexts: EguiContexts,
    pending: Res<PendingFont>,
    mut installed: Local<bool>,
) {
    if *installed {
        return;
    }
    let Some(bytes) = pending.0.lock().ok().and_then(|mut font| font.take()) else {
        return;
    };
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let mut fonts = egui::FontDefinitions::default();
    fonts.font_data.insert(
        CUSTOM_FONT.to_owned(),
        Arc::new(egui::FontData::from_owned(bytes)),
    );
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        fonts.families.entry(family).or_default().push(CUSTOM_FONT.to_owned());
    }
    ctx.set_fonts(fonts);
    *installed = true;
    tracing::info!("Custom UI font installed");
}

fn ui_system(mut params: UiParams) {
    let Ok(ctx) = params.contexts.ctx_mut() else { return };
    let ctx = ctx.clone();

    egui::Window::new("Gearview")
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
        .resizable(false)
        .collapsible(true)
        .show(&ctx, |ui| {
            ui.label("Describe a part:");
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut params.state.command_input)
                        .hint_text("画个齿轮 / make a gear")
                        .desired_width(220.0),
                );
                let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Generate").clicked() || enter {
                    let text = std::mem::take(&mut params.state.command_input);
                    if !text.trim().is_empty() {
                        params.submit_command.write(SubmitCommand(text));
                    }
                }
            });

            ui.horizontal(|ui| {
                if params.speech.listening {
                    ui.add_enabled(false, egui::Button::new("Listening..."));
                    if ui.button("Stop").clicked() {
                        params.speech.stop();
                    }
                } else if ui.button("Voice").clicked() {
                    let lang = params.config.speech_lang.clone();
                    params.speech.start(&lang);
                }

                if ui
                    .add_enabled(params.state.camera_ready, egui::Button::new("Reset View"))
                    .clicked()
                {
                    params.reset_camera.write(ResetCamera);
                }
            });

            if let Some(transcript) = &params.speech.last_transcript {
                ui.label(egui::RichText::new(format!("Heard: {}", transcript)).small());
            }

            if params.active.0.is_pending() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Generating...");
                });
            }

            if let Some(error) = &params.state.last_load_error {
                ui.label(egui::RichText::new(error).small().color(ERROR_COLOR));
            }

            let static_parts: Vec<(String, String)> = params
                .catalog
                .parts
                .static_parts()
                .map(|part| (part.id.clone(), part.label.clone()))
                .collect();
            if !static_parts.is_empty() {
                ui.separator();
                ui.label("Sample models:");
                ui.horizontal_wrapped(|ui| {
                    for (id, label) in &static_parts {
                        if ui.button(label.as_str()).clicked() {
                            load_model_by_type(id, &params.catalog, &mut params.active, &mut params.load_model);
                        }
                    }
                });
            }
        });

    param_panel(&ctx, &mut params);
    alert_window(&ctx, &mut params.alerts);
}

/// Editable parameters of the part on screen
fn param_panel(ctx: &egui::Context, params: &mut UiParams) {
    let Some(mut form) = params.state.param_form.take() else { return };
    let error = params.state.param_error.clone();
    let title = params
        .catalog
        .parts
        .get(&form.part_type)
        .map(|entry| format!("{} parameters", entry.label))
        .unwrap_or_else(|| format!("{} parameters", form.part_type));

    let mut submitted = None;
    egui::Window::new(title)
        .id(egui::Id::new("param_panel"))
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .resizable(false)
        .show(ctx, |ui| {
            egui::Grid::new("param_grid").num_columns(3).show(ui, |ui| {
                for entry in &mut form.entries {
                    ui.label(entry.field.label.as_str());
                    ui.add(egui::TextEdit::singleline(&mut entry.text).desired_width(70.0));
                    ui.label(
                        egui::RichText::new(format!("{} .. {}", entry.field.min, entry.field.max))
                            .small()
                            .weak(),
                    );
                    ui.end_row();
                }
            });

            if let Some(error) = &error {
                ui.label(egui::RichText::new(error).small().color(ERROR_COLOR));
            }

            if ui.button("Update").clicked() {
                submitted = Some(form.submit());
            }
        });

    match submitted {
        Some(Ok(values)) => {
            params.state.param_error = None;
            let part_type = form.part_type.clone();
            params.submit_params.write(SubmitParams {
                part_type,
                params: values,
            });
        }
        Some(Err(e)) => {
            tracing::info!("Rejected parameters: {}", e);
            params.state.param_error = Some(e.to_string());
            params.alerts.push(e.to_string());
        }
        None => {}
    }
    params.state.param_form = Some(form);
}

/// Show the oldest queued alert until it is acknowledged
fn alert_window(ctx: &egui::Context, alerts: &mut Alerts) {
    let Some(message) = alerts.queue.first().cloned() else { return };

    egui::Window::new("Notice")
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(message.as_str());
            if ui.button("OK").clicked() {
                alerts.queue.remove(0);
            }
        });
}
