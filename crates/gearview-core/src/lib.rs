//! Gearview Core - renderer-independent logic for the CAD part viewer
//!
//! This crate provides the pieces of the viewer that do not need a GPU:
//! - Camera auto-framing from a model's bounding box
//! - Ownership registry for the scene nodes of the current model
//! - Part catalog, keyword dispatch, and parameter validation
//! - Wire types for the model generation backend

pub mod api;
pub mod catalog;
pub mod dispatch;
pub mod endpoint;
pub mod framing;
pub mod glb;
pub mod params;
pub mod registry;
pub mod request;

pub use api::{decode_glb, parse_generate_response, ApiError, GenerateRequest, GenerateResponse, GeneratedModel, ParsedCommand};
pub use catalog::{CatalogError, Keyword, PartCatalog, PartEntry};
pub use dispatch::{CommandDispatcher, Dispatch, DispatchError, Intent};
pub use endpoint::{Endpoint, EndpointError, DEFAULT_BACKEND};
pub use framing::{frame_bounds, framing_distance, BoundingBox, CameraFrame, CameraHome, Orbit};
pub use glb::{GlbError, GlbHeader};
pub use params::{FieldSpec, ParamError, ParamForm, ParamSet};
pub use registry::{Generation, SceneRegistry, SceneTag};
pub use request::{LatestRequest, RequestTicket};
