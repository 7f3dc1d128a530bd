//! Permission-gated microphone acquisition via `getUserMedia`.

use std::fmt;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{MediaStream, MediaStreamConstraints, MediaStreamTrack};

pub enum AcquireError {
    /// The user (or a platform policy) refused capture.
    PermissionDenied,
    /// No device, no media-devices API, or any other platform failure.
    DeviceError(String),
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireError::PermissionDenied => write!(f, "microphone permission denied"),
            AcquireError::DeviceError(detail) => write!(f, "microphone unavailable: {detail}"),
        }
    }
}

/// DOMException names that mean "the user said no" rather than "it broke".
pub(crate) fn classify_rejection(name: &str, detail: String) -> AcquireError {
    match name {
        "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
            AcquireError::PermissionDenied
        }
        _ => AcquireError::DeviceError(detail),
    }
}

fn rejection_to_error(err: JsValue) -> AcquireError {
    let name = js_sys::Reflect::get(&err, &JsValue::from_str("name"))
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_default();
    classify_rejection(&name, format!("{err:?}"))
}

/// Request an audio capture stream. Suspends at the permission prompt; on
/// failure no resource is held, so the caller's state is unchanged.
pub async fn acquire() -> Result<MediaStream, AcquireError> {
    let window =
        web_sys::window().ok_or_else(|| AcquireError::DeviceError("no window".into()))?;
    let media_devices = window
        .navigator()
        .media_devices()
        .map_err(|e| AcquireError::DeviceError(format!("no media devices: {e:?}")))?;

    let constraints = MediaStreamConstraints::new();
    constraints.set_audio(&JsValue::TRUE);

    let promise = media_devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|e| AcquireError::DeviceError(format!("getUserMedia failed: {e:?}")))?;

    let stream_js = JsFuture::from(promise).await.map_err(rejection_to_error)?;
    stream_js
        .dyn_into::<MediaStream>()
        .map_err(|_| AcquireError::DeviceError("getUserMedia returned a non-stream".into()))
}

/// Stop every track so the capture indicator goes away and the device is freed.
pub fn release(stream: &MediaStream) {
    let tracks = stream.get_tracks();
    for i in 0..tracks.length() {
        if let Ok(track) = tracks.get(i).dyn_into::<MediaStreamTrack>() {
            track.stop();
        }
    }
    log::info!("Microphone stream released");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_names_classify_as_denied() {
        for name in ["NotAllowedError", "PermissionDeniedError", "SecurityError"] {
            assert!(matches!(
                classify_rejection(name, String::new()),
                AcquireError::PermissionDenied
            ));
        }
    }

    #[test]
    fn other_names_classify_as_device_error() {
        for name in ["NotFoundError", "NotReadableError", "AbortError", ""] {
            assert!(matches!(
                classify_rejection(name, "detail".into()),
                AcquireError::DeviceError(_)
            ));
        }
    }

    #[test]
    fn display_is_user_presentable() {
        assert_eq!(
            AcquireError::PermissionDenied.to_string(),
            "microphone permission denied"
        );
        assert!(AcquireError::DeviceError("no device".into())
            .to_string()
            .contains("no device"));
    }
}
