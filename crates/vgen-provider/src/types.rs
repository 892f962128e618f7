//! Request and response types for the MiniMax API.
//!
//! Request types double as the gateway's request bodies: every optional
//! field carries the provider default, so callers can send only what
//! they care about.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::{Validate, ValidationError};

use vgen_models::BaseResp;

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_VIDEO_MODEL: &str = "MiniMax-Hailuo-02";
pub const DEFAULT_IMAGE_MODEL: &str = "image-01";
pub const DEFAULT_SPEECH_MODEL: &str = "speech-2.5-hd-preview";
pub const DEFAULT_VOICE_ID: &str = "English_expressive_narrator";

fn default_video_model() -> String {
    DEFAULT_VIDEO_MODEL.to_string()
}

fn default_duration() -> u32 {
    6
}

fn default_resolution() -> String {
    "1080P".to_string()
}

fn default_video_aspect() -> String {
    "16:9".to_string()
}

fn default_true() -> bool {
    true
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_image_aspect() -> Option<String> {
    Some("1:1".to_string())
}

fn default_response_format() -> String {
    "url".to_string()
}

fn default_image_count() -> u32 {
    1
}

fn default_speech_model() -> String {
    DEFAULT_SPEECH_MODEL.to_string()
}

fn default_voice_id() -> String {
    DEFAULT_VOICE_ID.to_string()
}

fn default_unit() -> f32 {
    1.0
}

fn empty_object() -> Value {
    json!({})
}

fn not_null(value: &Value) -> Result<(), ValidationError> {
    if value.is_null() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

// =============================================================================
// Video
// =============================================================================

/// Knobs shared by every video generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    #[serde(default = "default_video_model")]
    pub model: String,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_resolution")]
    pub resolution: String,
    #[serde(default = "default_video_aspect")]
    pub aspect_ratio: String,
    #[serde(default = "default_true")]
    pub prompt_optimizer: bool,
    #[serde(default)]
    pub fast_pretreatment: bool,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            model: default_video_model(),
            duration: default_duration(),
            resolution: default_resolution(),
            aspect_ratio: default_video_aspect(),
            prompt_optimizer: true,
            fast_pretreatment: false,
        }
    }
}

impl VideoSettings {
    fn job_params(&self) -> Value {
        json!({
            "duration": self.duration,
            "resolution": self.resolution,
            "aspect_ratio": self.aspect_ratio,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TextToVideoRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "prompt is required"))]
    pub prompt: String,
    #[serde(flatten)]
    pub settings: VideoSettings,
}

impl TextToVideoRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            settings: VideoSettings::default(),
        }
    }

    /// Parameters recorded on the job.
    pub fn job_params(&self) -> Value {
        self.settings.job_params()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ImageToVideoRequest {
    /// Image URL or data URL
    #[serde(default)]
    #[validate(length(min = 1, message = "first_frame_image is required"))]
    pub first_frame_image: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(flatten)]
    pub settings: VideoSettings,
}

impl ImageToVideoRequest {
    pub fn job_params(&self) -> Value {
        let mut params = self.settings.job_params();
        params["has_first_frame"] = json!(true);
        params
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StartEndVideoRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "first_frame_image is required"))]
    pub first_frame_image: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "last_frame_image is required"))]
    pub last_frame_image: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(flatten)]
    pub settings: VideoSettings,
}

impl StartEndVideoRequest {
    pub fn job_params(&self) -> Value {
        let mut params = self.settings.job_params();
        params["has_start_end"] = json!(true);
        params
    }
}

/// Wire body for `/v1/video_generation`.
#[derive(Debug, Serialize)]
pub(crate) struct VideoGenerationBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub prompt_optimizer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_pretreatment: Option<bool>,
    pub duration: u32,
    pub resolution: &'a str,
    pub aspect_ratio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_frame_image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame_image: Option<&'a str>,
    pub callback_url: &'a str,
}

impl<'a> VideoGenerationBody<'a> {
    pub(crate) fn new(prompt: &'a str, settings: &'a VideoSettings, callback_url: &'a str) -> Self {
        Self {
            model: &settings.model,
            prompt,
            prompt_optimizer: settings.prompt_optimizer,
            fast_pretreatment: Some(settings.fast_pretreatment),
            duration: settings.duration,
            resolution: &settings.resolution,
            aspect_ratio: &settings.aspect_ratio,
            first_frame_image: None,
            last_frame_image: None,
            callback_url,
        }
    }
}

// =============================================================================
// Template
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TemplateRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "template_id is required"))]
    pub template_id: String,
    #[serde(default)]
    #[validate(custom(function = "not_null", message = "media_inputs is required"))]
    pub media_inputs: Value,
    #[serde(default)]
    #[validate(custom(function = "not_null", message = "text_inputs is required"))]
    pub text_inputs: Value,
}

impl TemplateRequest {
    pub fn job_params(&self) -> Value {
        json!({ "template_id": self.template_id })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TemplateBody<'a> {
    pub template_id: &'a str,
    pub media_inputs: &'a Value,
    pub text_inputs: &'a Value,
    pub callback_url: &'a str,
}

// =============================================================================
// Image
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ImageRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "prompt is required"))]
    pub prompt: String,
    #[serde(default = "default_image_model")]
    pub model: String,
    /// Takes priority over `width`/`height` when set
    #[serde(default = "default_image_aspect")]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    #[validate(range(min = 512, max = 2048))]
    pub width: Option<u32>,
    #[serde(default)]
    #[validate(range(min = 512, max = 2048))]
    pub height: Option<u32>,
    #[serde(default = "default_response_format")]
    pub response_format: String,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default = "default_image_count")]
    #[validate(range(min = 1, max = 9))]
    pub n: u32,
    #[serde(default)]
    pub prompt_optimizer: bool,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: default_image_model(),
            aspect_ratio: default_image_aspect(),
            width: None,
            height: None,
            response_format: default_response_format(),
            seed: None,
            n: 1,
            prompt_optimizer: false,
        }
    }

    /// Wire body for `/v1/image_generation`.
    pub fn body(&self) -> Value {
        let mut body = json!({
            "model": self.model,
            "prompt": self.prompt,
            "response_format": self.response_format,
            "n": self.n,
            "prompt_optimizer": self.prompt_optimizer,
        });

        match (&self.aspect_ratio, self.width, self.height) {
            (Some(aspect), _, _) if !aspect.is_empty() => {
                body["aspect_ratio"] = json!(aspect);
            }
            (_, Some(width), Some(height)) => {
                body["width"] = json!(width);
                body["height"] = json!(height);
            }
            _ => {}
        }

        if let Some(seed) = self.seed {
            body["seed"] = json!(seed);
        }
        body
    }
}

// =============================================================================
// Speech
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSetting {
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_unit")]
    pub speed: f32,
    #[serde(default = "default_unit")]
    pub vol: f32,
    #[serde(default)]
    pub pitch: i32,
}

impl Default for VoiceSetting {
    fn default() -> Self {
        Self {
            voice_id: default_voice_id(),
            speed: 1.0,
            vol: 1.0,
            pitch: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSetting {
    #[serde(default = "AudioSetting::default_sample_rate")]
    pub audio_sample_rate: u32,
    #[serde(default = "AudioSetting::default_bitrate")]
    pub bitrate: u32,
    #[serde(default = "AudioSetting::default_format")]
    pub format: String,
    #[serde(default = "AudioSetting::default_channel")]
    pub channel: u8,
}

impl AudioSetting {
    fn default_sample_rate() -> u32 {
        32000
    }

    fn default_bitrate() -> u32 {
        128000
    }

    fn default_format() -> String {
        "mp3".to_string()
    }

    fn default_channel() -> u8 {
        2
    }
}

impl Default for AudioSetting {
    fn default() -> Self {
        Self {
            audio_sample_rate: Self::default_sample_rate(),
            bitrate: Self::default_bitrate(),
            format: Self::default_format(),
            channel: Self::default_channel(),
        }
    }
}

/// Text-to-speech request, shared by the sync and async endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SpeechRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "text is required"))]
    pub text: String,
    #[serde(default = "default_speech_model")]
    pub model: String,
    #[serde(default)]
    pub voice_setting: VoiceSetting,
    #[serde(default)]
    pub audio_setting: AudioSetting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_modify: Option<Value>,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: default_speech_model(),
            voice_setting: VoiceSetting::default(),
            audio_setting: AudioSetting::default(),
            voice_modify: None,
        }
    }

    pub fn job_params(&self) -> Value {
        json!({
            "model": self.model,
            "voice_id": self.voice_setting.voice_id,
        })
    }
}

// =============================================================================
// Voice clone
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct VoiceCloneRequest {
    /// Provider file handle of the uploaded sample
    #[serde(default)]
    #[validate(custom(function = "not_null", message = "file_id is required"))]
    pub file_id: Value,
    #[serde(default)]
    #[validate(length(min = 1, message = "voice_id is required"))]
    pub voice_id: String,
    #[serde(default = "empty_object")]
    pub clone_prompt: Value,
    #[serde(default)]
    #[validate(length(min = 1, message = "text is required"))]
    pub text: String,
    #[serde(default = "default_speech_model")]
    pub model: String,
}

// =============================================================================
// Responses
// =============================================================================

/// Async submission accepted by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAccepted {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_resp: Option<BaseResp>,
}

/// Metadata of a provider-hosted file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub file_id: Value,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRetrieveResponse {
    pub file: FileInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_resp: Option<BaseResp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_defaults_from_minimal_body() {
        let req: TextToVideoRequest = serde_json::from_value(json!({"prompt": "a cat"})).unwrap();
        assert_eq!(req.settings, VideoSettings::default());
        assert_eq!(req.settings.model, DEFAULT_VIDEO_MODEL);
        assert_eq!(
            req.job_params(),
            json!({"duration": 6, "resolution": "1080P", "aspect_ratio": "16:9"})
        );
    }

    #[test]
    fn test_missing_prompt_fails_validation() {
        let req: TextToVideoRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_image_aspect_ratio_beats_dimensions() {
        let mut req = ImageRequest::new("garden");
        req.width = Some(1024);
        req.height = Some(768);
        let body = req.body();
        assert_eq!(body["aspect_ratio"], "1:1");
        assert!(body.get("width").is_none());

        req.aspect_ratio = None;
        let body = req.body();
        assert_eq!(body["width"], 1024);
        assert_eq!(body["height"], 768);
        assert!(body.get("seed").is_none());
    }

    #[test]
    fn test_speech_defaults() {
        let req: SpeechRequest = serde_json::from_value(json!({"text": "hi"})).unwrap();
        assert_eq!(req.voice_setting.voice_id, DEFAULT_VOICE_ID);
        assert_eq!(req.audio_setting.audio_sample_rate, 32000);
        assert_eq!(req.audio_setting.format, "mp3");
        let wire = serde_json::to_value(&req).unwrap();
        assert!(wire.get("voice_modify").is_none());
    }

    #[test]
    fn test_template_requires_inputs() {
        let req: TemplateRequest =
            serde_json::from_value(json!({"template_id": "tpl", "media_inputs": []})).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("text_inputs"));
    }

    #[test]
    fn test_start_end_params() {
        let req: StartEndVideoRequest = serde_json::from_value(json!({
            "first_frame_image": "https://a/1.jpg",
            "last_frame_image": "https://a/2.jpg"
        }))
        .unwrap();
        assert_eq!(req.job_params()["has_start_end"], true);
    }
}
