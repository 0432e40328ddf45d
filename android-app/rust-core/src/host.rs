//! # JNI Host Adapter
//!
//! Implements [`PlaybackEngine`] and [`ContentSurface`] on top of a Kotlin
//! host object that wraps the `MediaPlayer` and the `WebView`.
//!
//! Expected host methods:
//!
//! | Rust call            | Java method                            |
//! |----------------------|----------------------------------------|
//! | `reset`              | `void reset()`                         |
//! | `set_source`         | `void setDataSource(String)`           |
//! | `prepare_async`      | `void prepareAsync(long ticket)`       |
//! | `play` / `pause`     | `void start()` / `void pause()`        |
//! | `seek_to`            | `void seekTo(int)`                     |
//! | `current_position`   | `int getCurrentPosition()`             |
//! | `duration`           | `int getDuration()`                    |
//! | `is_playing`         | `boolean isPlaying()`                  |
//! | `release`            | `void release()`                       |
//! | `load_url`           | `void loadUrl(String)`                 |
//! | `reload`             | `void reload()`                        |
//! | `can_go_back`        | `boolean canGoBack()`                  |
//! | `go_back`            | `void goBack()`                        |
//! | `request_drain`      | `void requestDrain()`                  |
//!
//! Java exceptions are cleared and mapped onto [`EngineError`] the way the
//! player reports them: `IllegalStateException`, `IllegalArgumentException`
//! and `IOException`.

use jni::errors::Error as JniError;
use jni::objects::{GlobalRef, JObject, JValue};
use jni::{JNIEnv, JavaVM};
use log::{error, warn};
use shared::traits::{ContentSurface, EngineError, EngineResult, LoadTicket, PlaybackEngine};

// One string argument per call at most
const LOCAL_FRAME_CAPACITY: i32 = 4;

/// Kotlin host object reachable from any thread
pub struct JniHost {
    vm: JavaVM,
    host: GlobalRef,
}

impl JniHost {
    pub fn new(env: &mut JNIEnv, host: &JObject) -> Result<Self, JniError> {
        Ok(Self {
            vm: env.get_java_vm()?,
            host: env.new_global_ref(host)?,
        })
    }

    fn call<T>(
        &self,
        method: &'static str,
        f: impl FnOnce(&mut JNIEnv, &JObject<'static>) -> Result<T, JniError>,
    ) -> EngineResult<T> {
        // Poller workers stay attached for the life of the runtime; a no-op on
        // threads the JVM already knows
        let mut env = self
            .vm
            .attach_current_thread_permanently()
            .map_err(|e| EngineError::Host(format!("attach for {method}: {e}")))?;

        // Native threads never return to Java, so local refs are freed with the frame
        let host = self.host.as_obj();
        match env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| f(env, host)) {
            Ok(value) => Ok(value),
            Err(JniError::JavaException) => Err(take_exception(&mut env, method)),
            Err(e) => Err(EngineError::Host(format!("{method}: {e}"))),
        }
    }

    fn call_void(&self, method: &'static str) -> EngineResult<()> {
        self.call(method, |env, host| env.call_method(host, method, "()V", &[])?.v())
    }

    fn call_bool(&self, method: &'static str) -> EngineResult<bool> {
        self.call(method, |env, host| env.call_method(host, method, "()Z", &[])?.z())
    }

    fn call_int(&self, method: &'static str) -> EngineResult<i32> {
        self.call(method, |env, host| env.call_method(host, method, "()I", &[])?.i())
    }

    fn call_with_string(&self, method: &'static str, value: &str) -> EngineResult<()> {
        self.call(method, |env, host| {
            let value = env.new_string(value)?;
            env.call_method(host, method, "(Ljava/lang/String;)V", &[JValue::Object(&value)])?
                .v()
        })
    }
}

fn take_exception(env: &mut JNIEnv, method: &'static str) -> EngineError {
    let throwable = match env.exception_occurred() {
        Ok(throwable) => throwable,
        Err(e) => return EngineError::Host(format!("{method}: {e}")),
    };
    if let Err(e) = env.exception_clear() {
        return EngineError::Host(format!("{method}: {e}"));
    }

    let mut is_a = |class: &str| env.is_instance_of(&throwable, class).unwrap_or(false);
    let mapped = if is_a("java/lang/IllegalStateException") {
        EngineError::IllegalState(method)
    } else if is_a("java/lang/IllegalArgumentException") {
        EngineError::InvalidSource(format!("{method} rejected its argument"))
    } else if is_a("java/io/IOException") {
        EngineError::Io(format!("{method} failed"))
    } else {
        EngineError::Host(format!("{method} threw"))
    };

    if let Err(e) = env.delete_local_ref(throwable) {
        warn!("Failed to free exception ref from {method}: {e}");
    }
    mapped
}

impl PlaybackEngine for JniHost {
    fn reset(&self) -> EngineResult<()> {
        self.call_void("reset")
    }

    fn set_source(&self, url: &str) -> EngineResult<()> {
        self.call_with_string("setDataSource", url)
    }

    fn prepare_async(&self, ticket: LoadTicket) -> EngineResult<()> {
        self.call("prepareAsync", |env, host| {
            env.call_method(host, "prepareAsync", "(J)V", &[JValue::Long(ticket.0 as i64)])?
                .v()
        })
    }

    fn play(&self) -> EngineResult<()> {
        self.call_void("start")
    }

    fn pause(&self) -> EngineResult<()> {
        self.call_void("pause")
    }

    fn seek_to(&self, position_ms: i64) -> EngineResult<()> {
        let position = position_ms.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        self.call("seekTo", |env, host| {
            env.call_method(host, "seekTo", "(I)V", &[JValue::Int(position)])?.v()
        })
    }

    fn current_position(&self) -> i64 {
        self.call_int("getCurrentPosition").map_or_else(
            |e| {
                warn!("getCurrentPosition failed: {e}");
                0
            },
            i64::from,
        )
    }

    fn duration(&self) -> i64 {
        self.call_int("getDuration").map_or_else(
            |e| {
                warn!("getDuration failed: {e}");
                0
            },
            i64::from,
        )
    }

    fn is_playing(&self) -> bool {
        self.call_bool("isPlaying").unwrap_or_else(|e| {
            warn!("isPlaying failed: {e}");
            false
        })
    }

    fn release(&self) {
        if let Err(e) = self.call_void("release") {
            error!("release failed: {e}");
        }
    }
}

impl ContentSurface for JniHost {
    fn load_url(&self, url: &str) {
        if let Err(e) = self.call_with_string("loadUrl", url) {
            error!("loadUrl failed: {e}");
        }
    }

    fn reload(&self) {
        if let Err(e) = self.call_void("reload") {
            error!("reload failed: {e}");
        }
    }

    fn can_go_back(&self) -> bool {
        self.call_bool("canGoBack").unwrap_or_else(|e| {
            warn!("canGoBack failed: {e}");
            false
        })
    }

    fn go_back(&self) {
        if let Err(e) = self.call_void("goBack") {
            error!("goBack failed: {e}");
        }
    }

    fn request_drain(&self) {
        if let Err(e) = self.call_void("requestDrain") {
            error!("requestDrain failed: {e}");
        }
    }
}
