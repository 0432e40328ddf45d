//! JNI exports for `com.nativeweb.RustBridge`
//!
//! `nativeInit` boxes a [`NativeWebCore`] and hands the pointer back to
//! Kotlin as a `long`. Every other call takes that handle; a zero handle is
//! logged and answered with a neutral value.

use std::sync::Arc;

use jni::objects::{JClass, JObject, JString};
use jni::sys::{jboolean, jint, jlong, jstring, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use log::{debug, error, warn};
use shared::traits::LoadTicket;

use crate::host::JniHost;
use crate::keys::embedded_url;
use crate::{init_logger, BridgeError, CoreConfig, NativeWebCore};

fn core_from<'a>(handle: jlong, caller: &str) -> Option<&'a NativeWebCore> {
    if handle == 0 {
        warn!("{caller} called without a core handle");
        return None;
    }
    // SAFETY: non-zero handles come from `nativeInit` and stay valid until
    // `nativeDestroy`, which Kotlin calls once after the last use.
    Some(unsafe { &*(handle as *const NativeWebCore) })
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    if value.is_null() {
        return None;
    }
    match env.get_string(value) {
        Ok(s) => Some(s.into()),
        Err(e) => {
            error!("Failed to read Java string: {:?}", e);
            None
        }
    }
}

fn to_jboolean(value: bool) -> jboolean {
    if value {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

fn build_core(env: &mut JNIEnv, host: &JObject, config: &JString) -> Result<NativeWebCore, BridgeError> {
    let config = match read_string(env, config) {
        Some(json) => CoreConfig::from_json(&json)?,
        None => CoreConfig::default(),
    };
    init_logger(config.log_level);

    let host = Arc::new(JniHost::new(env, host)?);
    NativeWebCore::new(&config.bridge, host.clone(), host)
}

/// Create the core on the WebView's thread
///
/// Called from Kotlin:
/// ```kotlin
/// external fun nativeInit(host: Any, configJson: String?): Long
/// ```
///
/// Returns: Handle for the other calls, or 0 on error
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeInit(
    mut env: JNIEnv,
    _class: JClass,
    host: JObject,
    config: JString,
) -> jlong {
    match build_core(&mut env, &host, &config) {
        Ok(core) => Box::into_raw(Box::new(core)) as jlong,
        Err(e) => {
            error!("Failed to create native web core: {}", e);
            0
        }
    }
}

/// ```kotlin
/// external fun nativeDestroy(handle: Long)
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeDestroy(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle == 0 {
        return;
    }
    // SAFETY: the handle was produced by `Box::into_raw` in `nativeInit` and
    // Kotlin drops its copy after this call.
    drop(unsafe { Box::from_raw(handle as *mut NativeWebCore) });
    debug!("Native web core destroyed");
}

/// Forward a URI from the page's `AppInterface.handleURI`
///
/// ```kotlin
/// external fun nativeHandleUri(handle: Long, uri: String): Boolean
/// ```
///
/// Returns: false only when a recognised command carried bad arguments
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeHandleUri(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    uri: JString,
) -> jboolean {
    let Some(core) = core_from(handle, "nativeHandleUri") else {
        return JNI_FALSE;
    };
    let Some(uri) = read_string(&mut env, &uri) else {
        return JNI_FALSE;
    };

    match core.handle_uri(&uri) {
        Ok(()) => JNI_TRUE,
        Err(e) => {
            warn!("Rejected {}: {}", uri, e);
            JNI_FALSE
        }
    }
}

/// Deliver queued page updates; the host calls this from `requestDrain`
///
/// ```kotlin
/// external fun nativeDrain(handle: Long): Int
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeDrain(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jint {
    core_from(handle, "nativeDrain").map_or(0, |core| core.drain() as jint)
}

/// Rebind the render thread when the WebView moves to another looper
///
/// ```kotlin
/// external fun nativeBindRenderThread(handle: Long)
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeBindRenderThread(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if let Some(core) = core_from(handle, "nativeBindRenderThread") {
        core.bind_render_thread();
    }
}

/// `OnPreparedListener` callback; `ticket` is the value given to `prepareAsync`
///
/// ```kotlin
/// external fun nativeOnPrepared(handle: Long, ticket: Long)
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeOnPrepared(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    ticket: jlong,
) {
    if let Some(core) = core_from(handle, "nativeOnPrepared") {
        core.on_prepared(LoadTicket(ticket as u64));
    }
}

/// ```kotlin
/// external fun nativeOnBufferingUpdate(handle: Long, percent: Int)
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeOnBufferingUpdate(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    percent: jint,
) {
    if let Some(core) = core_from(handle, "nativeOnBufferingUpdate") {
        core.on_buffering_update(percent);
    }
}

/// `WebViewClient.onPageStarted`
///
/// ```kotlin
/// external fun nativePageChanged(handle: Long, url: String)
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativePageChanged(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    url: JString,
) {
    let Some(core) = core_from(handle, "nativePageChanged") else {
        return;
    };
    let url = read_string(&mut env, &url).unwrap_or_default();
    core.page_changed(&url);
}

/// ```kotlin
/// external fun nativeCanGoBack(handle: Long): Boolean
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeCanGoBack(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    to_jboolean(core_from(handle, "nativeCanGoBack").is_some_and(NativeWebCore::can_go_back))
}

/// Back button; stops playback if it is running
///
/// ```kotlin
/// external fun nativeGoBack(handle: Long)
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeGoBack(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if let Some(core) = core_from(handle, "nativeGoBack") {
        core.go_back();
    }
}

/// Route a key event from `dispatchKeyEvent`
///
/// ```kotlin
/// external fun nativeKeyEvent(handle: Long, keyCode: Int, keyUp: Boolean): Boolean
/// ```
///
/// Returns: true when the host must consume the event
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeKeyEvent(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    key_code: jint,
    key_up: jboolean,
) -> jboolean {
    let Some(core) = core_from(handle, "nativeKeyEvent") else {
        return JNI_FALSE;
    };
    to_jboolean(core.key_event(key_code, key_up == JNI_TRUE))
}

/// ```kotlin
/// external fun nativeEmbeddedUrl(url: String): String
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeEmbeddedUrl(
    mut env: JNIEnv,
    _class: JClass,
    url: JString,
) -> jstring {
    let Some(url) = read_string(&mut env, &url) else {
        return std::ptr::null_mut();
    };

    match env.new_string(embedded_url(&url)) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            error!("Failed to create URL string: {:?}", e);
            std::ptr::null_mut()
        }
    }
}

/// `Activity.onPause`: stops polling and releases the player
///
/// ```kotlin
/// external fun nativePause(handle: Long)
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativePause(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if let Some(core) = core_from(handle, "nativePause") {
        core.suspend();
    }
}

/// `Activity.onResume`: reloads the page
///
/// ```kotlin
/// external fun nativeResume(handle: Long)
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeResume(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if let Some(core) = core_from(handle, "nativeResume") {
        core.resume();
    }
}

/// Current playback state as JSON
///
/// ```kotlin
/// external fun nativeSnapshot(handle: Long): String?
/// ```
#[no_mangle]
pub extern "system" fn Java_com_nativeweb_RustBridge_nativeSnapshot(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let Some(core) = core_from(handle, "nativeSnapshot") else {
        return std::ptr::null_mut();
    };

    let json = match serde_json::to_string(&core.snapshot()) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize snapshot: {}", e);
            return std::ptr::null_mut();
        }
    };

    match env.new_string(json) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            error!("Failed to create snapshot string: {:?}", e);
            std::ptr::null_mut()
        }
    }
}
