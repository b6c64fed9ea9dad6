//! Voice commands through the browser's Web Speech API

use bevy::prelude::*;
use std::sync::{Arc, Mutex};

use crate::app::Alerts;
use crate::network::SubmitCommand;

pub struct SpeechPlugin;

impl Plugin for SpeechPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SpeechState>()
            .add_systems(Update, process_speech_events);
    }
}

/// Something the recognizer reported
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    Transcript(String),
    Error(String),
    Ended,
}

/// Queue the recognizer's callbacks write into
pub type SpeechEvents = Arc<Mutex<Vec<SpeechEvent>>>;

/// Entry points of the platform recognizer
#[derive(Clone, Copy)]
pub struct Recognizer {
    pub start: fn(&str, SpeechEvents) -> Result<(), String>,
    pub stop: fn(),
    /// Detach the finished session and free its callbacks
    pub release: fn(),
}

impl Default for Recognizer {
    fn default() -> Self {
        Self {
            start: start_recognition,
            stop: stop_recognition,
            release: release_recognition,
        }
    }
}

/// Recognition session state
#[derive(Resource, Default)]
pub struct SpeechState {
    pub listening: bool,
    /// Last transcript, shown in the UI
    pub last_transcript: Option<String>,
    pub events: SpeechEvents,
    pub recognizer: Recognizer,
}

impl SpeechState {
    /// Ask for the microphone and start listening in `lang`
    pub fn start(&mut self, lang: &str) {
        if self.listening {
            return;
        }
        match (self.recognizer.start)(lang, self.events.clone()) {
            Ok(()) => {
                tracing::info!("Speech recognition started ({})", lang);
                self.listening = true;
            }
            Err(e) => self.push(SpeechEvent::Error(e)),
        }
    }

    /// Stop the current session; its final result may still arrive
    pub fn stop(&self) {
        (self.recognizer.stop)();
    }

    fn push(&self, event: SpeechEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

fn process_speech_events(
    mut state: ResMut<SpeechState>,
    mut alerts: ResMut<Alerts>,
    mut submit: MessageWriter<SubmitCommand>,
) {
    let events: Vec<SpeechEvent> = match state.events.lock() {
        Ok(mut events) => events.drain(..).collect(),
        Err(_) => return,
    };

    for event in events {
        match event {
            SpeechEvent::Transcript(text) => {
                tracing::info!("Heard: {}", text);
                state.last_transcript = Some(text.clone());
                submit.write(SubmitCommand(text));
            }
            SpeechEvent::Error(error) => {
                tracing::error!("Speech recognition error: {}", error);
                alerts.push(format!("Speech recognition error: {}", error));
                state.listening = false;
            }
            SpeechEvent::Ended => {
                state.listening = false;
                (state.recognizer.release)();
            }
        }
    }
}

/// A running recognizer and the callbacks it calls into
#[cfg(target_arch = "wasm32")]
struct Session {
    recognition: wasm_bindgen::JsValue,
    _callbacks: Vec<wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>>,
}

#[cfg(target_arch = "wasm32")]
const HANDLERS: [&str; 3] = ["onresult", "onerror", "onend"];

#[cfg(target_arch = "wasm32")]
thread_local! {
    static ACTIVE: std::cell::RefCell<Option<Session>> = const { std::cell::RefCell::new(None) };
}

#[cfg(target_arch = "wasm32")]
fn start_recognition(lang: &str, events: SpeechEvents) -> Result<(), String> {
    use js_sys::{Array, Function, Reflect};
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};

    let window = web_sys::window().ok_or("no window")?;

    let constructor = ["SpeechRecognition", "webkitSpeechRecognition"]
        .iter()
        .filter_map(|name| Reflect::get(&window, &JsValue::from_str(name)).ok())
        .find(|value| value.is_function())
        .ok_or("Speech recognition is not supported in this browser (try Chrome or Edge)")?;
    let constructor: Function = constructor.unchecked_into();

    // Prompt for the microphone up front; the recognizer itself only reports "not-allowed"
    if let Ok(devices) = window.navigator().media_devices() {
        let constraints = web_sys::MediaStreamConstraints::new();
        constraints.set_audio(&JsValue::TRUE);
        if let Err(e) = devices.get_user_media_with_constraints(&constraints) {
            tracing::warn!("Microphone request failed: {:?}", e);
        }
    }

    let recognition = Reflect::construct(&constructor, &Array::new())
        .map_err(|e| format!("Failed to create recognizer: {:?}", e))?;
    let set = |key: &str, value: &JsValue| {
        Reflect::set(&recognition, &JsValue::from_str(key), value)
            .map(|_| ())
            .map_err(|e| format!("Failed to set {}: {:?}", key, e))
    };
    set("lang", &JsValue::from_str(lang))?;
    set("interimResults", &JsValue::FALSE)?;
    set("maxAlternatives", &JsValue::from_f64(1.0))?;

    // A session that never reported its end must not keep firing into this one
    release_recognition();

    let push = move |events: &SpeechEvents, event: SpeechEvent| {
        if let Ok(mut events) = events.lock() {
            events.push(event);
        }
    };

    let result_events = events.clone();
    let on_result = Closure::wrap(Box::new(move |event: JsValue| {
        // event.results[0][0].transcript
        let transcript = Reflect::get(&event, &JsValue::from_str("results"))
            .and_then(|results| Reflect::get_u32(&results, 0))
            .and_then(|result| Reflect::get_u32(&result, 0))
            .and_then(|alternative| Reflect::get(&alternative, &JsValue::from_str("transcript")))
            .ok()
            .and_then(|t| t.as_string());
        match transcript {
            Some(text) if !text.trim().is_empty() => push(&result_events, SpeechEvent::Transcript(text)),
            _ => push(&result_events, SpeechEvent::Error("no speech recognised".to_string())),
        }
    }) as Box<dyn FnMut(JsValue)>);

    let error_events = events.clone();
    let on_error = Closure::wrap(Box::new(move |event: JsValue| {
        let error = Reflect::get(&event, &JsValue::from_str("error"))
            .ok()
            .and_then(|e| e.as_string())
            .unwrap_or_else(|| "unknown".to_string());
        push(&error_events, SpeechEvent::Error(error));
    }) as Box<dyn FnMut(JsValue)>);

    // Released from the frame loop once Ended is processed
    let on_end = Closure::wrap(Box::new(move |_event: JsValue| {
        push(&events, SpeechEvent::Ended);
    }) as Box<dyn FnMut(JsValue)>);

    let callbacks = vec![on_result, on_error, on_end];
    for (key, callback) in HANDLERS.into_iter().zip(&callbacks) {
        set(key, callback.as_ref())?;
    }

    let start: Function = Reflect::get(&recognition, &JsValue::from_str("start"))
        .map_err(|e| format!("{:?}", e))?
        .unchecked_into();
    start
        .call0(&recognition)
        .map_err(|e| format!("Failed to start recognition: {:?}", e))?;

    ACTIVE.with(|active| {
        *active.borrow_mut() = Some(Session {
            recognition,
            _callbacks: callbacks,
        })
    });
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn stop_recognition() {
    ACTIVE.with(|active| {
        if let Some(session) = active.borrow().as_ref() {
            call_method(&session.recognition, "stop");
        }
    });
}

#[cfg(target_arch = "wasm32")]
fn release_recognition() {
    use js_sys::Reflect;
    use wasm_bindgen::JsValue;

    let Some(session) = ACTIVE.with(|active| active.borrow_mut().take()) else { return };
    for key in HANDLERS {
        let _ = Reflect::set(&session.recognition, &JsValue::from_str(key), &JsValue::NULL);
    }
    call_method(&session.recognition, "abort");
    // Callbacks are dropped with the session
}

#[cfg(target_arch = "wasm32")]
fn call_method(target: &wasm_bindgen::JsValue, name: &str) {
    use js_sys::{Function, Reflect};
    use wasm_bindgen::{JsCast, JsValue};

    if let Ok(method) = Reflect::get(target, &JsValue::from_str(name)) {
        if let Some(method) = method.dyn_ref::<Function>() {
            let _ = method.call0(target);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn start_recognition(_lang: &str, _events: SpeechEvents) -> Result<(), String> {
    tracing::warn!("Speech recognition not available in native mode");
    Err("Speech recognition is only available in the browser".to_string())
}

#[cfg(not(target_arch = "wasm32"))]
fn stop_recognition() {}

#[cfg(not(target_arch = "wasm32"))]
fn release_recognition() {}
