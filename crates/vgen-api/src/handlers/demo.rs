//! Canned demo requests, callable from a browser.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use vgen_provider::{ImageRequest, ImageToVideoRequest, StartEndVideoRequest, TextToVideoRequest, VideoSettings};
use vgen_tracker::JobTags;

use crate::error::ApiResult;
use crate::state::AppState;

const DEMO_FIRST_FRAME: &str =
    "https://filecdn.minimax.chat/public/fe9d04da-f60e-444d-a2e0-18ae743add33.jpeg";
const DEMO_LAST_FRAME: &str =
    "https://filecdn.minimax.chat/public/97b7cd08-764e-4b8b-a7bf-87a0bd898575.jpeg";

const DEMO_IMAGE_PROMPT: &str = "A serene Japanese garden with cherry blossoms, koi pond, and \
     traditional wooden bridge. Soft morning light, photorealistic, 8k quality.";
const DEMO_T2V_PROMPT: &str = "A golden puppy walks toward a street-food stall, hesitating, then \
     decides to help the cook. [Push in] Then the camera tracks sideways as he starts working. \
     [Tracking shot]";
const DEMO_I2V_PROMPT: &str = "The mouse blinks, smiles, and runs toward the camera through soft \
     morning light. [Pedestal up,Push in]";
const DEMO_START_END_PROMPT: &str = "A little girl grows up across seasons; begin on a close-up, \
     end on a wide shot near a lake. [Pan right,Pedestal up] then [Pull out]";

#[derive(Serialize)]
pub struct DemoTask {
    pub task_id: String,
}

pub fn demo_image_request() -> ImageRequest {
    let mut request = ImageRequest::new(DEMO_IMAGE_PROMPT);
    request.aspect_ratio = Some("16:9".to_string());
    request.n = 3;
    request.prompt_optimizer = true;
    request
}

pub async fn demo_t2i(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let result = state.tracker.provider().text_to_image(&demo_image_request()).await?;
    Ok(Json(result))
}

pub async fn demo_t2v(State(state): State<AppState>) -> ApiResult<Json<DemoTask>> {
    let request = TextToVideoRequest::new(DEMO_T2V_PROMPT);
    let accepted = state
        .tracker
        .submit_text_to_video(&request, JobTags::default())
        .await?;
    Ok(Json(DemoTask {
        task_id: accepted.task_id,
    }))
}

pub async fn demo_i2v(State(state): State<AppState>) -> ApiResult<Json<DemoTask>> {
    let request = ImageToVideoRequest {
        first_frame_image: DEMO_FIRST_FRAME.to_string(),
        prompt: DEMO_I2V_PROMPT.to_string(),
        settings: VideoSettings::default(),
    };
    let accepted = state
        .tracker
        .submit_image_to_video(&request, JobTags::default())
        .await?;
    Ok(Json(DemoTask {
        task_id: accepted.task_id,
    }))
}

pub async fn demo_start_end(State(state): State<AppState>) -> ApiResult<Json<DemoTask>> {
    let request = StartEndVideoRequest {
        first_frame_image: DEMO_FIRST_FRAME.to_string(),
        last_frame_image: DEMO_LAST_FRAME.to_string(),
        prompt: DEMO_START_END_PROMPT.to_string(),
        settings: VideoSettings::default(),
    };
    let accepted = state
        .tracker
        .submit_start_end_video(&request, JobTags::default())
        .await?;
    Ok(Json(DemoTask {
        task_id: accepted.task_id,
    }))
}
